//! Flash-backed persistence region
//!
//! The parameter image lives in one contiguous flash block. Every write
//! erases the block, programs the new region and reads it back.

use crate::platform::{error::FlashError, FlashInterface, PlatformError, Result};

/// Start of the parameter region (256 KB offset, after the firmware)
pub const PARAM_REGION_ADDRESS: u32 = 0x040000;

/// Chunk size used when verifying a write
const VERIFY_CHUNK: usize = 32;

/// Byte-range access to non-volatile storage holding the parameter region
///
/// The store owns exactly one backend once it is attached and only calls it
/// while both store permits are held.
pub trait ParamStorage {
    /// Reserve a region of `len` bytes
    ///
    /// Called once when the backend is attached. A backend that cannot hold
    /// the region reports an error and is not used.
    fn reserve(&mut self, len: usize) -> Result<()>;

    /// Read the start of the region into `buf`
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Replace the start of the region with `data`
    fn write(&mut self, data: &[u8]) -> Result<()>;
}

/// Storage statistics for wear monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Completed region writes
    pub total_saves: u32,
    /// Region erases, including those of failed writes
    pub erase_count: u32,
}

/// Flash parameter storage
///
/// # Example
///
/// ```ignore
/// use kugle_firmware::core::parameters::storage::{FlashParamStorage, ParamStorage};
/// use kugle_firmware::platform::mock::MockFlash;
///
/// let mut storage = FlashParamStorage::new(MockFlash::new());
/// storage.reserve(69).unwrap();
/// storage.write(&[0x43, 0x00, 0x00]).unwrap();
///
/// let mut buf = [0u8; 3];
/// storage.read(&mut buf).unwrap();
/// assert_eq!(buf, [0x43, 0x00, 0x00]);
/// ```
pub struct FlashParamStorage<F: FlashInterface> {
    flash: F,
    address: u32,
    reserved: usize,
    stats: StorageStats,
}

impl<F: FlashInterface> FlashParamStorage<F> {
    /// Storage at the default region address
    pub fn new(flash: F) -> Self {
        Self::with_address(flash, PARAM_REGION_ADDRESS)
    }

    /// Storage at a block-aligned `address`
    pub fn with_address(flash: F, address: u32) -> Self {
        Self {
            flash,
            address,
            reserved: 0,
            stats: StorageStats::default(),
        }
    }

    /// Get storage statistics
    pub fn stats(&self) -> StorageStats {
        self.stats
    }

    /// Get Flash interface reference (for testing)
    pub fn flash(&self) -> &F {
        &self.flash
    }

    /// Get mutable Flash interface reference (for testing)
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len > self.reserved {
            return Err(FlashError::InvalidAddress.into());
        }
        Ok(())
    }

    fn verify(&mut self, data: &[u8]) -> Result<()> {
        let mut buf = [0u8; VERIFY_CHUNK];
        for (i, chunk) in data.chunks(VERIFY_CHUNK).enumerate() {
            let readback = &mut buf[..chunk.len()];
            self.flash
                .read(self.address + (i * VERIFY_CHUNK) as u32, readback)?;
            if readback != chunk {
                return Err(FlashError::VerifyFailed.into());
            }
        }
        Ok(())
    }
}

impl<F: FlashInterface> ParamStorage for FlashParamStorage<F> {
    fn reserve(&mut self, len: usize) -> Result<()> {
        let block = self.flash.block_size();
        let fits_block = len as u32 <= block;
        let in_bounds = self
            .address
            .checked_add(block)
            .is_some_and(|end| end <= self.flash.capacity());

        if !fits_block || !in_bounds || !self.address.is_multiple_of(block) {
            return Err(PlatformError::ResourceUnavailable);
        }
        self.reserved = len;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.check_len(buf.len())?;
        self.flash.read(self.address, buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.check_len(data.len())?;

        self.flash.erase(self.address, self.flash.block_size())?;
        self.stats.erase_count += 1;

        self.flash.write(self.address, data)?;
        self.verify(data)?;

        self.stats.total_saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockFlash;

    fn reserved_storage(len: usize) -> FlashParamStorage<MockFlash> {
        let mut storage = FlashParamStorage::new(MockFlash::new());
        storage.reserve(len).unwrap();
        storage
    }

    #[test]
    fn test_write_and_read_region() {
        let mut storage = reserved_storage(16);
        storage.write(&[1, 2, 3, 4]).unwrap();

        let mut buf = [0u8; 4];
        storage.read(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn test_rewrite_erases_first() {
        let mut storage = reserved_storage(16);
        storage.write(&[0x00, 0x0F]).unwrap();
        storage.write(&[0xF0, 0xFF]).unwrap();

        assert_eq!(storage.flash().contents(PARAM_REGION_ADDRESS, 2), &[0xF0, 0xFF]);
        assert_eq!(
            storage.stats(),
            StorageStats {
                total_saves: 2,
                erase_count: 2
            }
        );
    }

    #[test]
    fn test_unreserved_access_rejected() {
        let mut storage = FlashParamStorage::new(MockFlash::new());
        assert_eq!(
            storage.write(&[0x00]),
            Err(PlatformError::Flash(FlashError::InvalidAddress))
        );

        let mut storage = reserved_storage(2);
        let mut buf = [0u8; 3];
        assert!(storage.read(&mut buf).is_err());
    }

    #[test]
    fn test_reserve_limits() {
        let mut storage = FlashParamStorage::new(MockFlash::new());
        assert_eq!(
            storage.reserve(4097),
            Err(PlatformError::ResourceUnavailable)
        );

        let mut storage = FlashParamStorage::with_address(MockFlash::new(), 0x040100);
        assert_eq!(storage.reserve(16), Err(PlatformError::ResourceUnavailable));

        let mut storage = FlashParamStorage::with_address(MockFlash::new(), 0x100000);
        assert_eq!(storage.reserve(16), Err(PlatformError::ResourceUnavailable));
    }

    #[test]
    fn test_power_loss_detected_by_verify() {
        let mut storage = reserved_storage(64);
        storage.flash_mut().simulate_power_loss();

        assert_eq!(
            storage.write(&[0x11; 40]),
            Err(PlatformError::Flash(FlashError::VerifyFailed))
        );
        assert_eq!(storage.stats().total_saves, 0);
    }

    #[test]
    fn test_write_failure_propagates() {
        let mut storage = reserved_storage(8);
        storage.flash_mut().fail_next_write();
        assert_eq!(
            storage.write(&[0x00; 8]),
            Err(PlatformError::Flash(FlashError::WriteFailed))
        );
    }
}
