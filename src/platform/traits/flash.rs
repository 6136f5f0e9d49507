//! Flash interface trait
//!
//! Raw flash access consumed by the reference key-value store.

use crate::platform::Result;

/// Flash interface trait
///
/// # Flash Characteristics
///
/// - Flash is organized in blocks (typically 4 KB)
/// - Erase sets all bytes of a block to 0xFF
/// - Write can only change bits from 1→0 (erase first to reset to 1)
///
/// # Memory Layout
///
/// ```text
/// [Firmware]        0x000000 - 0x040000 (256 KB) - DO NOT WRITE
/// [nvs block 0]     0x040000 - 0x041000 (4 KB)
/// [nvs block 1]     0x041000 - 0x042000 (4 KB)
/// [nvs block 2]     0x042000 - 0x043000 (4 KB)
/// [nvs block 3]     0x043000 - 0x044000 (4 KB)
/// ```
pub trait FlashInterface {
    /// Read `buf.len()` bytes starting at `address`
    ///
    /// # Errors
    ///
    /// `FlashError::InvalidAddress` if the range is out of bounds,
    /// `FlashError::ReadFailed` if the read itself fails.
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at `address`
    ///
    /// The target region must have been erased. Returns
    /// `FlashError::InvalidAddress` for writes into the firmware region.
    fn write(&mut self, address: u32, data: &[u8]) -> Result<()>;

    /// Erase `size` bytes starting at `address`
    ///
    /// Both must be multiples of [`block_size`](Self::block_size).
    fn erase(&mut self, address: u32, size: u32) -> Result<()>;

    /// Minimum erasable unit in bytes
    fn block_size(&self) -> u32;

    /// Total flash capacity in bytes
    fn capacity(&self) -> u32;
}
