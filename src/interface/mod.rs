pub mod i2c;

pub use self::i2c::I2cInterface;

/// A method of communicating with the sensor
pub trait SensorInterface {
    /// Interface error type
    type InterfaceError;

    /// Write a single byte value to a register, as one `[reg, val]` message
    fn register_write(&mut self, reg: u8, val: u8) -> Result<(), Self::InterfaceError>;

    /// Select `reg` and read back into `buffer` as a single composite
    /// (write-then-read) transaction.
    /// Returns the number of reply bytes actually delivered.
    fn register_read_block(
        &mut self,
        reg: u8,
        buffer: &mut [u8],
    ) -> Result<usize, Self::InterfaceError>;
}
