//! Mock Flash implementation for testing
//!
//! In-memory flash simulation backing the reference key-value store in tests.

use crate::platform::{error::FlashError, traits::FlashInterface, Result};
use alloc::vec;
use alloc::vec::Vec;

/// Flash block size (4 KB)
pub const BLOCK_SIZE: u32 = 4096;

/// Flash capacity (1 MB)
pub const FLASH_CAPACITY: u32 = 1024 * 1024;

/// Protected firmware region (first 256 KB)
pub const FIRMWARE_SIZE: u32 = 0x40000;

/// Mock Flash implementation
///
/// Supports:
/// - Read/write/erase with 1→0 write semantics
/// - Corruption injection
/// - Erase count tracking per block
/// - Power-loss simulation (torn writes)
/// - Failing the next N writes
///
/// Cloning captures the full flash image, which is how tests simulate a
/// reboot onto the same chip.
///
/// # Example
///
/// ```
/// use flash_prefs::platform::mock::MockFlash;
/// use flash_prefs::platform::traits::FlashInterface;
///
/// let mut flash = MockFlash::new();
/// flash.erase(0x040000, 4096).unwrap();
/// flash.write(0x040000, b"NVSP").unwrap();
///
/// let mut buf = [0u8; 4];
/// flash.read(0x040000, &mut buf).unwrap();
/// assert_eq!(&buf, b"NVSP");
/// assert_eq!(flash.erase_count(0x040000), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockFlash {
    /// Flash storage (0xFF when erased)
    storage: Vec<u8>,
    /// Erase count per block
    erase_counts: Vec<u32>,
    /// Next write is torn halfway
    power_loss: bool,
    /// Number of upcoming writes that fail
    failing_writes: u32,
}

impl MockFlash {
    /// Create a fully erased flash
    pub fn new() -> Self {
        let block_count = (FLASH_CAPACITY / BLOCK_SIZE) as usize;
        Self {
            storage: vec![0xFF; FLASH_CAPACITY as usize],
            erase_counts: vec![0; block_count],
            power_loss: false,
            failing_writes: 0,
        }
    }

    /// Copy of `len` bytes at `address`
    pub fn contents(&self, address: u32, len: usize) -> Vec<u8> {
        self.storage[address as usize..address as usize + len].to_vec()
    }

    /// Overwrite `len` bytes at `address` with a corrupt pattern
    pub fn inject_corruption(&mut self, address: u32, len: usize) {
        let start = address as usize;
        self.storage[start..start + len].fill(0xAA);
    }

    /// Number of times the block containing `address` was erased
    pub fn erase_count(&self, address: u32) -> u32 {
        self.erase_counts[(address / BLOCK_SIZE) as usize]
    }

    /// Total erase count across all blocks
    pub fn total_erase_count(&self) -> u32 {
        self.erase_counts.iter().sum()
    }

    /// Tear the next write: only its first half reaches flash
    pub fn simulate_power_loss(&mut self) {
        self.power_loss = true;
    }

    /// Fail the next `count` writes with `FlashError::WriteFailed`
    pub fn fail_next_writes(&mut self, count: u32) {
        self.failing_writes = count;
    }

    fn is_writable(&self, address: u32) -> bool {
        (FIRMWARE_SIZE..FLASH_CAPACITY).contains(&address)
    }

    fn in_bounds(&self, address: u32, len: usize) -> bool {
        (address as usize)
            .checked_add(len)
            .is_some_and(|end| end <= FLASH_CAPACITY as usize)
    }
}

impl Default for MockFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashInterface for MockFlash {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        if !self.in_bounds(address, buf.len()) {
            return Err(FlashError::InvalidAddress.into());
        }
        let start = address as usize;
        buf.copy_from_slice(&self.storage[start..start + buf.len()]);
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        if !self.is_writable(address) || !self.in_bounds(address, data.len()) {
            return Err(FlashError::InvalidAddress.into());
        }
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(FlashError::WriteFailed.into());
        }

        let write_len = if core::mem::take(&mut self.power_loss) {
            data.len() / 2
        } else {
            data.len()
        };

        // Flash can only clear bits
        let start = address as usize;
        for (cell, byte) in self.storage[start..start + write_len].iter_mut().zip(data) {
            *cell &= *byte;
        }
        Ok(())
    }

    fn erase(&mut self, address: u32, size: u32) -> Result<()> {
        if !self.is_writable(address)
            || address % BLOCK_SIZE != 0
            || size % BLOCK_SIZE != 0
            || !self.in_bounds(address, size as usize)
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
