use rppal::i2c::{self, I2c};

use crate::error::BusError;

const EREMOTEIO: i32 = 121;
const ENXIO: i32 = 6;

/// Addressed-bus transfers to a single device.
///
/// Every call is one complete transaction: `write` sends all bytes and
/// releases the bus, `read` requests `buffer.len()` bytes and returns how
/// many the device actually delivered.
pub trait Transport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError>;

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, BusError>;
}

impl Transport for I2c {
    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        let written = I2c::write(self, bytes)?;
        if written != bytes.len() {
            return Err(BusError::Nack);
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, BusError> {
        Ok(I2c::read(self, buffer)?)
    }
}

impl From<i2c::Error> for BusError {
    fn from(err: i2c::Error) -> Self {
        match err {
            i2c::Error::Io(io) if matches!(io.raw_os_error(), Some(EREMOTEIO | ENXIO)) => {
                BusError::Nack
            }
            other => BusError::Transport(other.to_string()),
        }
    }
}

/// Open `/dev/i2c-<bus>` and address the compass at `address`.
pub fn open_i2c(bus: u8, address: u16) -> Result<I2c, BusError> {
    let mut i2c = I2c::with_bus(bus)?;
    i2c.set_slave_address(address)?;
    Ok(i2c)
}
