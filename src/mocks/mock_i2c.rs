// This file is only compiled during tests

use crate::error::BusError;
use crate::registers;
use crate::transport::Transport;

/// Simulated CMPS14: a 32-byte register file behind a register pointer.
///
/// Records every write transaction so tests can assert the exact bytes
/// that reached the bus.
pub struct MockCmps14 {
    pub registers: [u8; 32],
    pub writes: Vec<Vec<u8>>,
    pub version: u8,
    /// Fail every write with a NACK.
    pub nack: bool,
    /// Deliver at most this many bytes per read.
    pub read_limit: Option<usize>,
    pointer: usize,
    version_pending: bool,
}

impl MockCmps14 {
    pub fn new() -> Self {
        Self {
            registers: [0; 32],
            writes: Vec::new(),
            version: 0x05,
            nack: false,
            read_limit: None,
            pointer: 0,
            version_pending: false,
        }
    }

    pub fn set_bearing_tenths(&mut self, tenths: u16) {
        self.set_word(registers::BEARING, tenths as i16);
    }

    pub fn set_word(&mut self, address: u8, value: i16) {
        let [high, low] = value.to_be_bytes();
        self.registers[address as usize] = high;
        self.registers[address as usize + 1] = low;
    }

    /// Command bytes written to the command register, in order.
    pub fn commands(&self) -> Vec<u8> {
        self.writes
            .iter()
            .filter(|w| w.len() == 2 && w[0] == registers::COMMAND)
            .map(|w| w[1])
            .collect()
    }
}

impl Transport for MockCmps14 {
    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        self.writes.push(bytes.to_vec());
        if self.nack {
            return Err(BusError::Nack);
        }
        match bytes {
            [registers::COMMAND, registers::VERSION_REQUEST] => self.version_pending = true,
            [address] => self.pointer = *address as usize,
            _ => {}
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, BusError> {
        let count = self.read_limit.map_or(buffer.len(), |l| l.min(buffer.len()));
        if self.version_pending {
            self.version_pending = false;
            if count > 0 {
                buffer[0] = self.version;
            }
            return Ok(count.min(1));
        }
        for (i, slot) in buffer.iter_mut().take(count).enumerate() {
            *slot = self.registers[(self.pointer + i) % self.registers.len()];
        }
        Ok(count)
    }
}
