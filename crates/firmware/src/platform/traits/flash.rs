//! Flash interface trait
//!
//! Non-volatile storage interface that platform implementations must provide.
//! The parameter store persists its image through this trait.

use crate::platform::Result;

/// Flash interface trait
///
/// # Flash Characteristics
///
/// - Flash is organized in blocks (typically 4 KB)
/// - Erase operations set all bytes to 0xFF
/// - Write operations can only change bits from 1 to 0 (erase first)
/// - Operations are blocking and may take tens of milliseconds
///
/// # Memory Layout
///
/// ```text
/// [Firmware]           0x000000 - 0x040000 (256 KB) - DO NOT WRITE
/// [Parameter Region]   0x040000 - 0x041000 (4 KB)
/// ```
pub trait FlashInterface {
    /// Read `buf.len()` bytes starting at `address`
    ///
    /// # Errors
    ///
    /// `FlashError::InvalidAddress` if the range is out of bounds,
    /// `FlashError::ReadFailed` if the read fails.
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at `address`
    ///
    /// The target range must have been erased; writes only clear bits.
    ///
    /// # Errors
    ///
    /// `FlashError::InvalidAddress` for the firmware region or out of bounds,
    /// `FlashError::WriteFailed` if the write fails.
    fn write(&mut self, address: u32, data: &[u8]) -> Result<()>;

    /// Erase `size` bytes starting at `address`
    ///
    /// Address and size must be multiples of [`block_size`](Self::block_size).
    fn erase(&mut self, address: u32, size: u32) -> Result<()>;

    /// Minimum erasable unit in bytes
    fn block_size(&self) -> u32;

    /// Total capacity in bytes
    fn capacity(&self) -> u32;
}
