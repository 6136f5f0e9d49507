//! Snapshot block storage
//!
//! Reads and writes whole-partition snapshots into a ring of flash blocks
//! with round-robin rotation for wear leveling.

use crate::log_trace;
use crate::platform::error::FlashError;
use crate::platform::{FlashInterface, Result};
use alloc::vec;
use alloc::vec::Vec;
use flash_prefs_core::block::{self, BlockHeader, BlockState, Entry, CRC_SIZE};

/// Named flash region holding one key-value partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionEntry {
    /// Partition label
    pub label: &'static str,
    /// Flash address of block 0 (block-aligned)
    pub base: u32,
    /// Number of blocks in the ring
    pub block_count: u32,
}

impl PartitionEntry {
    pub const fn new(label: &'static str, base: u32, block_count: u32) -> Self {
        Self {
            label,
            base,
            block_count,
        }
    }

    fn block_address(&self, block: u32, block_size: u32) -> u32 {
        self.base + block * block_size
    }
}

/// Default partition table: `"nvs"` at 256 KB, four 4 KB blocks
pub const DEFAULT_PARTITIONS: [PartitionEntry; 1] = [PartitionEntry::new("nvs", 0x040000, 4)];

/// Result of reading one block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRead {
    /// Never written since the last erase
    Erased,
    /// Intact snapshot
    Valid {
        header: BlockHeader,
        entries: Vec<Entry>,
    },
    /// Current-format header with a bad CRC or payload (torn write)
    Corrupt,
    /// Snapshot written by another format version
    Incompatible(u16),
    /// Unrecognizable contents
    Garbage,
}

/// Newest intact snapshot of a partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub block: u32,
    pub sequence: u16,
    pub entries: Vec<Entry>,
}

/// Result of scanning every block of a partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Every block is erased
    Empty,
    /// Newest intact snapshot
    Found(Snapshot),
    /// A block was written by another format version
    Incompatible(u16),
    /// No intact snapshot, but blocks are not erased either
    Unusable,
}

/// Storage statistics for wear leveling monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of snapshots written since mount
    pub total_commits: u32,
    /// Block holding the current snapshot
    pub active_block: Option<u32>,
    /// Erase count per block
    pub erase_counts: Vec<u32>,
}

impl StorageStats {
    pub fn for_partition(partition: &PartitionEntry) -> Self {
        Self {
            total_commits: 0,
            active_block: None,
            erase_counts: vec![0; partition.block_count as usize],
        }
    }
}

/// `a` was written after `b`, accounting for sequence wrap-around
pub fn is_newer(a: u16, b: u16) -> bool {
    (a.wrapping_sub(b) as i16) > 0
}

/// Next block in round-robin order
pub fn choose_next_block(partition: &PartitionEntry, current: Option<u32>) -> u32 {
    current.map_or(0, |block| (block + 1) % partition.block_count)
}

/// Flash block storage
pub struct BlockStorage<F: FlashInterface> {
    flash: F,
}

impl<F: FlashInterface> BlockStorage<F> {
    pub fn new(flash: F) -> Self {
        Self { flash }
    }

    /// Flash block size
    pub fn block_size(&self) -> u32 {
        self.flash.block_size()
    }

    /// Largest snapshot image a block can hold
    pub fn capacity(&self) -> usize {
        self.flash.block_size() as usize
    }

    /// Erase `block` and write `image` into it
    ///
    /// # Errors
    ///
    /// `FlashError::InvalidAddress` if the block is outside the partition or
    /// the image does not fit; any flash erase/write error.
    pub fn write_block(
        &mut self,
        partition: &PartitionEntry,
        block: u32,
        image: &[u8],
    ) -> Result<()> {
        let block_size = self.flash.block_size();
        if block >= partition.block_count || image.len() > block_size as usize {
            return Err(FlashError::InvalidAddress.into());
        }

        let address = partition.block_address(block, block_size);
        self.flash.erase(address, block_size)?;
        self.flash.write(address, image)
    }

    /// Read and validate one block
    pub fn read_block(&mut self, partition: &PartitionEntry, block: u32) -> Result<BlockRead> {
        let block_size = self.flash.block_size();
        if block >= partition.block_count {
            return Err(FlashError::InvalidAddress.into());
        }
        let address = partition.block_address(block, block_size);

        let mut header_buf = [0u8; BlockHeader::SIZE];
        self.flash.read(address, &mut header_buf)?;

        let header = match block::classify(&header_buf) {
            BlockState::Erased => return Ok(BlockRead::Erased),
            BlockState::Garbage => return Ok(BlockRead::Garbage),
            BlockState::Incompatible(version) => return Ok(BlockRead::Incompatible(version)),
            BlockState::Current(header) => header,
        };

        let body_len = header.payload_len as usize + CRC_SIZE;
        if BlockHeader::SIZE + body_len > block_size as usize {
            return Ok(BlockRead::Corrupt);
        }

        let mut body = vec![0u8; body_len];
        self.flash.read(address + BlockHeader::SIZE as u32, &mut body)?;

        Ok(match block::decode_snapshot(&header, &body) {
            Some(entries) => BlockRead::Valid { header, entries },
            None => BlockRead::Corrupt,
        })
    }

    /// Scan every block and pick the newest intact snapshot
    ///
    /// A corrupt newest block falls back to the next newest intact one.
    pub fn scan(&mut self, partition: &PartitionEntry) -> Result<ScanOutcome> {
        let mut newest: Option<Snapshot> = None;
        let mut dirty = false;

        for block in 0..partition.block_count {
            match self.read_block(partition, block)? {
                BlockRead::Erased => {}
                BlockRead::Incompatible(version) => return Ok(ScanOutcome::Incompatible(version)),
                BlockRead::Corrupt | BlockRead::Garbage => {
                    log_trace!("nvs: {} block {} holds no intact snapshot", partition.label, block);
                    dirty = true;
                }
                BlockRead::Valid { header, entries } => {
                    if newest
                        .as_ref()
                        .map_or(true, |current| is_newer(header.sequence, current.sequence))
                    {
                        newest = Some(Snapshot {
                            block,
                            sequence: header.sequence,
                            entries,
                        });
                    }
                }
            }
        }

        Ok(match (newest, dirty) {
            (Some(snapshot), _) => ScanOutcome::Found(snapshot),
            (None, false) => ScanOutcome::Empty,
            (None, true) => ScanOutcome::Unusable,
        })
    }

    /// Erase every block of the partition
    pub fn erase_partition(&mut self, partition: &PartitionEntry) -> Result<()> {
        let block_size = self.flash.block_size();
        self.flash
            .erase(partition.base, block_size * partition.block_count)
    }

    /// Flash interface reference
    pub fn flash(&self) -> &F {
        &self.flash
    }

    /// Mutable flash interface reference
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Release the flash interface
    pub fn into_flash(self) -> F {
        self.flash
    }
}
