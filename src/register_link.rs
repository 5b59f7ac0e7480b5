use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::error::BusError;
use crate::registers::{self, Timing};
use crate::transport::Transport;

/// Synchronous register access to the CMPS14.
///
/// Owns the transport. Every write to the command register is followed by
/// the settle delay from [`Timing`] before the bus is used again.
pub struct RegisterLink<T> {
    transport: T,
    timing: Timing,
}

impl<T: Transport> RegisterLink<T> {
    pub fn new(transport: T) -> Self {
        Self::with_timing(transport, Timing::PROTOCOL)
    }

    pub fn with_timing(transport: T, timing: Timing) -> Self {
        Self { transport, timing }
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Write one byte to the command register as its own transaction.
    ///
    /// The settle delay runs even when the device NACKs.
    pub fn write_command(&mut self, byte: u8) -> Result<(), BusError> {
        let result = self.transport.write(&[registers::COMMAND, byte]);
        self.pause(self.timing.settle);
        result.inspect_err(|e| warn!("command 0x{byte:02X} failed: {e}"))
    }

    /// Write each byte of `bytes` to the command register, stopping at the
    /// first failure.
    pub fn write_command_sequence(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        for &byte in bytes {
            self.write_command(byte)?;
        }
        Ok(())
    }

    /// Select `address` and read the `N`-byte window starting there.
    pub fn read_register_window<const N: usize>(
        &mut self,
        address: u8,
    ) -> Result<[u8; N], BusError> {
        self.transport
            .write(&[address])
            .inspect_err(|e| warn!("selecting register 0x{address:02X} failed: {e}"))?;
        self.read_bytes()
    }

    /// Like [`read_register_window`](Self::read_register_window), but the
    /// register select is a full command-style transaction: the settle delay
    /// runs before the read, and also after a failed select.
    pub fn read_settled_window<const N: usize>(
        &mut self,
        address: u8,
    ) -> Result<[u8; N], BusError> {
        let selected = self.transport.write(&[address]);
        self.pause(self.timing.settle);
        selected.inspect_err(|e| warn!("selecting register 0x{address:02X} failed: {e}"))?;
        self.read_bytes()
    }

    /// Read `N` bytes from wherever the device's pointer currently is.
    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], BusError> {
        let mut buffer = [0u8; N];
        let received = self.transport.read(&mut buffer)?;
        if received < N {
            let err = BusError::ShortRead {
                expected: N,
                received,
            };
            warn!("{err}");
            return Err(err);
        }
        Ok(buffer)
    }

    pub(crate) fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}
