use embedded_hal as hal;

use super::SensorInterface;
use crate::Error;

/// Sensor interface over a blocking I2C bus.
///
/// Every transaction is addressed to the same bus address, fixed when the
/// interface is created.
pub struct I2cInterface<I2C> {
    /// i2c port
    i2c_port: I2C,
    /// address for i2c communications
    address: u8,
}

impl<I2C, CommE> I2cInterface<I2C>
where
    I2C: hal::blocking::i2c::Write<Error = CommE> + hal::blocking::i2c::WriteRead<Error = CommE>,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c_port: i2c,
            address,
        }
    }

    /// Bus address this interface talks to
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Release owned resources
    pub fn release(self) -> I2C {
        self.i2c_port
    }
}

impl<I2C, CommE> SensorInterface for I2cInterface<I2C>
where
    I2C: hal::blocking::i2c::Write<Error = CommE> + hal::blocking::i2c::WriteRead<Error = CommE>,
{
    type InterfaceError = Error<CommE>;

    fn register_write(&mut self, reg: u8, val: u8) -> Result<(), Self::InterfaceError> {
        let block: [u8; 2] = [reg, val];
        self.i2c_port
            .write(self.address, &block)
            .map_err(Error::Comm)
    }

    fn register_read_block(
        &mut self,
        reg: u8,
        buffer: &mut [u8],
    ) -> Result<usize, Self::InterfaceError> {
        // repeated start: the register select and the reply stay one transaction
        self.i2c_port
            .write_read(self.address, &[reg], buffer)
            .map_err(Error::Comm)?;
        Ok(buffer.len())
    }
}
