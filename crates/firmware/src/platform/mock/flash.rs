//! In-memory flash used by unit tests and host builds

use crate::platform::{error::FlashError, traits::FlashInterface, Result};
use std::vec;
use std::vec::Vec;

/// Flash block size (4 KB)
pub const BLOCK_SIZE: u32 = 4096;

/// Simulated capacity (512 KB)
pub const FLASH_CAPACITY: u32 = 512 * 1024;

/// Protected firmware area at the start of flash
const FIRMWARE_SIZE: u32 = 0x40000;

/// Mock flash
///
/// Storage starts erased (0xFF). Writes only clear bits, like the real part.
/// Faults can be injected for the next write: a hard failure or a power loss
/// that leaves the write half done.
///
/// ```ignore
/// use kugle_firmware::platform::mock::MockFlash;
/// use kugle_firmware::platform::FlashInterface;
///
/// let mut flash = MockFlash::new();
/// flash.erase(0x040000, 4096).unwrap();
/// flash.write(0x040000, &[0x43, 0x00]).unwrap();
///
/// let mut buf = [0u8; 2];
/// flash.read(0x040000, &mut buf).unwrap();
/// assert_eq!(buf, [0x43, 0x00]);
/// assert_eq!(flash.erase_count(0x040000), 1);
/// ```
#[derive(Debug)]
pub struct MockFlash {
    storage: Vec<u8>,
    erase_counts: Vec<u32>,
    write_count: u32,
    power_loss: bool,
    fail_next_write: bool,
    fail_reads: bool,
}

impl MockFlash {
    pub fn new() -> Self {
        Self {
            storage: vec![0xFF; FLASH_CAPACITY as usize],
            erase_counts: vec![0; (FLASH_CAPACITY / BLOCK_SIZE) as usize],
            write_count: 0,
            power_loss: false,
            fail_next_write: false,
            fail_reads: false,
        }
    }

    /// Raw contents (for test verification)
    pub fn contents(&self, address: u32, len: usize) -> &[u8] {
        &self.storage[address as usize..address as usize + len]
    }

    /// Overwrite contents directly, bypassing erase semantics
    pub fn inject(&mut self, address: u32, data: &[u8]) {
        let start = address as usize;
        self.storage[start..start + data.len()].copy_from_slice(data);
    }

    /// Number of times the block containing `address` was erased
    pub fn erase_count(&self, address: u32) -> u32 {
        self.erase_counts[(address / BLOCK_SIZE) as usize]
    }

    /// Number of successful write calls
    pub fn write_count(&self) -> u32 {
        self.write_count
    }

    /// The next write only stores the first half of its data
    pub fn simulate_power_loss(&mut self) {
        self.power_loss = true;
    }

    /// The next write fails without touching storage
    pub fn fail_next_write(&mut self) {
        self.fail_next_write = true;
    }

    /// Make every read fail until cleared
    pub fn set_read_failure(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    fn is_writable(&self, address: u32, len: usize) -> bool {
        address >= FIRMWARE_SIZE && address as usize + len <= FLASH_CAPACITY as usize
    }
}

impl Default for MockFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashInterface for MockFlash {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        if self.fail_reads {
            return Err(FlashError::ReadFailed.into());
        }
        if address as usize + buf.len() > FLASH_CAPACITY as usize {
            return Err(FlashError::InvalidAddress.into());
        }
        buf.copy_from_slice(self.contents(address, buf.len()));
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        if !self.is_writable(address, data.len()) {
            return Err(FlashError::InvalidAddress.into());
        }
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(FlashError::WriteFailed.into());
        }

        let write_len = if self.power_loss {
            self.power_loss = false;
            data.len() / 2
        } else {
            data.len()
        };

        let start = address as usize;
        for (cell, byte) in self.storage[start..start + write_len].iter_mut().zip(data) {
            *cell &= *byte;
        }
        self.write_count += 1;
        Ok(())
    }

    fn erase(&mut self, address: u32, size: u32) -> Result<()> {
        if !self.is_writable(address, size as usize)
            || !address.is_multiple_of(BLOCK_SIZE)
            || !size.is_multiple_of(BLOCK_SIZE)
        {
            return Err(FlashError::InvalidAddress.into());
        }

        let start = address as usize;
        self.storage[start..start + size as usize].fill(0xFF);

        let first = (address / BLOCK_SIZE) as usize;
        for count in &mut self.erase_counts[first..first + (size / BLOCK_SIZE) as usize] {
            *count += 1;
        }
        Ok(())
    }

    fn block_size(&self) -> u32 {
        BLOCK_SIZE
    }

    fn capacity(&self) -> u32 {
        FLASH_CAPACITY
    }
}
