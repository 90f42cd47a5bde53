//! Die temperature decoding.
//!
//! TEMP_OUT is a big-endian signed count. The datasheet conversion is
//! `((count - RoomTemp_Offset) / Temp_Sensitivity) + 21`, evaluated here
//! with truncating integer division.

/// Count offset at room temperature
pub const ROOM_TEMP_OFFSET: i32 = 21;

/// Counts per degree Celsius
pub const TEMP_SENSITIVITY: i32 = 334;

/// Reference point of the conversion, degrees Celsius
const ROOM_TEMP_C: i32 = 21;

/// Decode the two TEMP_OUT bytes (high byte first) into whole degrees Celsius
pub fn decode(high: u8, low: u8) -> i16 {
    celsius_from_count(i16::from_be_bytes([high, low]))
}

/// Convert a raw signed temperature count into whole degrees Celsius
pub fn celsius_from_count(raw: i16) -> i16 {
    // |result| stays well inside i16 for any i16 count
    (((i32::from(raw) - ROOM_TEMP_OFFSET) / TEMP_SENSITIVITY) + ROOM_TEMP_C) as i16
}
