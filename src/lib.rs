/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Bring-up driver for the MPU-9250 / MPU-9260 IMU on I2C, plus an
//! optional character-stream bridge that exposes one shared message buffer.
//!
//! The driver and the bridge are independent: attach the driver to the
//! sensor, and create a [`DeviceBridge`] only where a byte-stream node is
//! wanted.

#![cfg_attr(not(test), no_std)]

use embedded_hal as hal;

// supplies the critical-section implementation behind `CriticalSectionRawMutex`
#[cfg(feature = "cortex-m-single-core")]
use cortex_m as _;

#[macro_use]
mod diag;

pub mod bridge;
mod interface;
mod report;
pub mod temperature;

pub use bridge::{BufferState, CopyFault, DeviceBridge, OpenHandle, UserSink, UserSource};
pub use interface::{I2cInterface, SensorInterface};
pub use report::{BringUpReport, BringUpStep, StepOutcome};

/// Device node name
pub const DEVICE_NAME: &str = "acel9260";
/// Device class the node is created under
pub const CLASS_NAME: &str = "acel";
/// Device tree compatible string
pub const COMPATIBLE: &str = "mse,acl9260";
/// I2C driver name
pub const I2C_DRIVER_NAME: &str = "acel9260_i2c";

/// I2C address with AD0 tied low
pub const DEFAULT_ADDRESS: u8 = 0x68;
/// I2C address with AD0 tied high
pub const ALT_ADDRESS: u8 = 0x69;

/// Errors in this crate
#[derive(Debug)]
pub enum Error<CommE> {
    /// Sensor communication error
    Comm(CommE),
    /// A composite transaction delivered fewer reply bytes than requested
    ShortTransfer { expected: usize, actual: usize },
}

pub struct Builder {}

impl Builder {
    /// Create a new driver using I2C interface
    pub fn new_i2c<I2C, CommE>(i2c: I2C, address: u8) -> Mpu9260<I2cInterface<I2C>>
    where
        I2C: hal::blocking::i2c::Write<Error = CommE>
            + hal::blocking::i2c::WriteRead<Error = CommE>,
        CommE: core::fmt::Debug,
    {
        let iface = interface::I2cInterface::new(i2c, address);
        Mpu9260::new_with_interface(iface)
    }
}

/// Ranges written during bring-up
#[derive(Copy, Clone, Debug)]
pub struct BringUpConfig {
    pub accel_range: AccelRange,
    pub gyro_range: GyroRange,
}

impl Default for BringUpConfig {
    fn default() -> Self {
        Self {
            accel_range: AccelRange::Range_16g,
            gyro_range: GyroRange::Range_2000dps,
        }
    }
}

/// Result of a die temperature read
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TemperatureReading {
    /// TEMP_OUT_H, TEMP_OUT_L as received
    pub raw: [u8; 2],
    /// Reply bytes the bus reported transferred.
    /// Always 2 here; shorter replies come back as `Error::ShortTransfer`.
    pub transferred: usize,
    /// Whole degrees Celsius
    pub celsius: i16,
}

/// Everything the attach sequence observed
#[derive(Debug)]
pub struct ProbeReport<E> {
    pub bring_up: BringUpReport<E>,
    pub temperature: Result<TemperatureReading, E>,
}

pub struct Mpu9260<SI> {
    pub(crate) si: SI,
}

impl<SI, CommE> Mpu9260<SI>
where
    SI: SensorInterface<InterfaceError = Error<CommE>>,
    CommE: core::fmt::Debug,
{
    /// Create a driver over any sensor interface
    pub fn new_with_interface(sensor_interface: SI) -> Self {
        Self {
            si: sensor_interface,
        }
    }

    /// Attach sequence: bring the sensor up, then take one temperature
    /// reading for diagnostics. Neither part failing stops the other.
    pub fn probe(&mut self) -> ProbeReport<SI::InterfaceError> {
        diag!(Info, "acel9260_probe");
        let bring_up = self.initialize();
        let temperature = self.read_temperature();
        ProbeReport {
            bring_up,
            temperature,
        }
    }

    /// Configure the sensor with the default ranges (±16g, ±2000dps)
    pub fn initialize(&mut self) -> BringUpReport<SI::InterfaceError> {
        self.initialize_with(BringUpConfig::default())
    }

    /// Write accel range, gyro range, then enable both sensors.
    ///
    /// Every write is attempted even if an earlier one fails;
    /// the report holds each outcome in order.
    pub fn initialize_with(&mut self, config: BringUpConfig) -> BringUpReport<SI::InterfaceError> {
        let accel = self.bring_up_step(BringUpStep::AccelRange, config.accel_range.bits());
        let gyro = self.bring_up_step(BringUpStep::GyroRange, config.gyro_range.bits());
        let power = self.bring_up_step(BringUpStep::PowerEnable, SENSOR_ENABLE_ALL);
        BringUpReport::new([accel, gyro, power])
    }

    fn bring_up_step(&mut self, step: BringUpStep, value: u8) -> StepOutcome<SI::InterfaceError> {
        let register = step.register();
        let result = self.si.register_write(register, value);
        match &result {
            Ok(()) => diag!(Info, "{:?}: reg 0x{:02X} <- 0x{:02X}", step, register, value),
            Err(e) => diag!(Warn, "{:?}: reg 0x{:02X} failed: {:?}", step, register, e),
        }
        StepOutcome {
            step,
            register,
            value,
            result,
        }
    }

    /// Read the die temperature in one write-then-read transaction
    pub fn read_temperature(&mut self) -> Result<TemperatureReading, SI::InterfaceError> {
        let mut raw = [0u8; 2];
        let transferred = self.si.register_read_block(REG_TEMP_OUT_H, &mut raw)?;
        if transferred < raw.len() {
            diag!(Warn, "Read temp: short reply {} of {}", transferred, raw.len());
            return Err(Error::ShortTransfer {
                expected: raw.len(),
                actual: transferred,
            });
        }

        let celsius = temperature::decode(raw[0], raw[1]);
        diag!(
            Info,
            "Read temp: {} data: 0x{:02X} 0x{:02X} temp: {} C",
            transferred,
            raw[0],
            raw[1],
            celsius
        );
        Ok(TemperatureReading {
            raw,
            transferred,
            celsius,
        })
    }

    /// Release owned resources
    pub fn release(self) -> SI {
        self.si
    }
}

/// Common registers
///
pub(crate) const REG_GYRO_CONFIG: u8 = 0x1B;
pub(crate) const REG_ACCEL_CONFIG: u8 = 0x1C;

const REG_TEMP_OUT_H: u8 = 0x41;

pub(crate) const REG_PWR_MGMT_2: u8 = 0x6C;

/// PWR_MGMT_2: no accel or gyro axis disabled
const SENSOR_ENABLE_ALL: u8 = 0x00;

#[repr(u8)]
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug)]
/// The gyroscope has a programmable full-scale range of ±250, ±500, ±1000, or ±2000 degrees/sec.
pub enum GyroRange {
    /// ±250
    Range_250dps = 0b00,
    /// ±500
    Range_500dps = 0b01,
    /// ±1000
    Range_1000dps = 0b10,
    /// ±2000
    Range_2000dps = 0b11,
}

impl GyroRange {
    /// GYRO_FS_SEL occupies bits 4:3 of GYRO_CONFIG
    pub fn bits(self) -> u8 {
        (self as u8) << 3
    }
}

#[repr(u8)]
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug)]
/// The accelerometer has a user-programmable accelerometer full-scale range
/// of ±2g, ±4g, ±8g, and ±16g.
/// The numeric values of these enums correspond to ACCEL_FS_SEL
pub enum AccelRange {
    /// ±2g
    Range_2g = 0b00,
    /// ±4g
    Range_4g = 0b01,
    /// ±8g
    Range_8g = 0b10,
    /// ±16g
    Range_16g = 0b11,
}

impl AccelRange {
    /// ACCEL_FS_SEL occupies bits 4:3 of ACCEL_CONFIG
    pub fn bits(self) -> u8 {
        (self as u8) << 3
    }
}
