//! Reference flash key-value store
//!
//! [`FlashKvStore`] implements [`KvStore`] on top of a raw [`FlashInterface`].
//! Each mounted partition keeps its entries in RAM; `commit` writes the whole
//! partition image as a snapshot into the next block of the ring, so a torn
//! commit leaves the previous snapshot intact.
//!
//! # Example
//!
//! ```
//! use flash_prefs::core::nvs::FlashKvStore;
//! use flash_prefs::platform::mock::MockFlash;
//! use flash_prefs::platform::traits::{KvStore, OpenMode};
//!
//! let mut store = FlashKvStore::new(MockFlash::new());
//! store.init_partition("nvs").unwrap();
//! let handle = store.open("nvs", "app", OpenMode::ReadWrite).unwrap();
//! store.set::<u32>(handle, "BootCount", 1).unwrap();
//! store.commit(handle).unwrap();
//!
//! // Remount from the same flash contents
//! let mut store = FlashKvStore::new(store.into_flash());
//! store.init_partition("nvs").unwrap();
//! let handle = store.open("nvs", "app", OpenMode::ReadOnly).unwrap();
//! assert_eq!(store.get::<u32>(handle, "BootCount"), Ok(1));
//! ```

pub mod storage;

use crate::platform::error::{KvError, KvResult};
use crate::platform::traits::{KvHandle, KvStore, OpenMode};
use crate::platform::FlashInterface;
use crate::{log_debug, log_info, log_warn};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use flash_prefs_core::block;
use flash_prefs_core::name::{bounded_name, Key, Namespace};
use flash_prefs_core::value::{Value, ValueKind, MAX_STR_LEN};
use storage::{choose_next_block, BlockStorage, ScanOutcome};

pub use storage::{PartitionEntry, StorageStats, DEFAULT_PARTITIONS};

type EntryKey = (Namespace, Key);

/// RAM image of a mounted partition
#[derive(Debug, Default)]
struct Image {
    entries: BTreeMap<EntryKey, Value>,
    sequence: u16,
    dirty: bool,
}

struct PartitionState {
    entry: PartitionEntry,
    image: Option<Image>,
    stats: StorageStats,
}

struct OpenNamespace {
    partition: usize,
    namespace: Namespace,
    mode: OpenMode,
}

/// Flash-backed key-value store
pub struct FlashKvStore<F: FlashInterface> {
    storage: BlockStorage<F>,
    partitions: Vec<PartitionState>,
    handles: BTreeMap<u32, OpenNamespace>,
    next_handle: u32,
}

impl<F: FlashInterface> FlashKvStore<F> {
    /// Create a store with the default partition table
    pub fn new(flash: F) -> Self {
        Self::with_partitions(flash, &DEFAULT_PARTITIONS)
    }

    /// Create a store with a custom partition table
    pub fn with_partitions(flash: F, table: &[PartitionEntry]) -> Self {
        let partitions = table
            .iter()
            .map(|entry| PartitionState {
                entry: *entry,
                image: None,
                stats: StorageStats::for_partition(entry),
            })
            .collect();

        Self {
            storage: BlockStorage::new(flash),
            partitions,
            handles: BTreeMap::new(),
            next_handle: 1,
        }
    }

    /// Storage statistics of a partition
    pub fn stats(&self, label: &str) -> Option<&StorageStats> {
        self.partitions
            .iter()
            .find(|p| p.entry.label == label)
            .map(|p| &p.stats)
    }

    /// Whether the partition is mounted
    pub fn is_mounted(&self, label: &str) -> bool {
        self.partitions
            .iter()
            .any(|p| p.entry.label == label && p.image.is_some())
    }

    /// Flash interface reference
    pub fn flash(&self) -> &F {
        self.storage.flash()
    }

    /// Mutable flash interface reference
    pub fn flash_mut(&mut self) -> &mut F {
        self.storage.flash_mut()
    }

    /// Release the flash interface, dropping uncommitted writes
    pub fn into_flash(self) -> F {
        self.storage.into_flash()
    }

    fn partition_index(&self, label: &str) -> KvResult<usize> {
        self.partitions
            .iter()
            .position(|p| p.entry.label == label)
            .ok_or(KvError::PartitionNotFound)
    }

    fn resolve(&mut self, handle: KvHandle) -> KvResult<(&mut Image, &OpenNamespace)> {
        let open = self
            .handles
            .get(&handle.raw())
            .ok_or(KvError::InvalidHandle)?;
        let image = self.partitions[open.partition]
            .image
            .as_mut()
            .ok_or(KvError::NotInitialized)?;
        Ok((image, open))
    }

    fn resolve_writable(&mut self, handle: KvHandle) -> KvResult<(&mut Image, Namespace)> {
        let (image, open) = self.resolve(handle)?;
        if open.mode == OpenMode::ReadOnly {
            return Err(KvError::ReadOnly);
        }
        let namespace = open.namespace.clone();
        Ok((image, namespace))
    }
}

impl<F: FlashInterface> KvStore for FlashKvStore<F> {
    fn init_partition(&mut self, label: &str) -> KvResult<()> {
        let index = self.partition_index(label)?;
        if self.partitions[index].image.is_some() {
            return Ok(());
        }

        let entry = self.partitions[index].entry;
        let image = match self.storage.scan(&entry)? {
            ScanOutcome::Empty => {
                log_info!("nvs: partition {} is empty", entry.label);
                Image::default()
            }
            ScanOutcome::Found(snapshot) => {
                log_info!(
                    "nvs: mounted {} from block {} (seq {}, {} entries)",
                    entry.label,
                    snapshot.block,
                    snapshot.sequence,
                    snapshot.entries.len()
                );
                self.partitions[index].stats.active_block = Some(snapshot.block);
                Image {
                    entries: snapshot
                        .entries
                        .into_iter()
                        .map(|e| ((e.namespace, e.key), e.value))
                        .collect(),
                    sequence: snapshot.sequence,
                    dirty: false,
                }
            }
            ScanOutcome::Incompatible(version) => {
                log_warn!(
                    "nvs: partition {} has format version {}",
                    entry.label,
                    version
                );
                return Err(KvError::NewVersionFound);
            }
            ScanOutcome::Unusable => {
                log_warn!("nvs: partition {} has no intact snapshot", entry.label);
                return Err(KvError::NoFreePages);
            }
        };

        self.partitions[index].image = Some(image);
        Ok(())
    }

    fn erase_partition(&mut self, label: &str) -> KvResult<()> {
        let index = self.partition_index(label)?;
        let state = &mut self.partitions[index];

        self.storage.erase_partition(&state.entry)?;
        for count in &mut state.stats.erase_counts {
            *count += 1;
        }
        state.stats.active_block = None;
        state.image = None;
        self.handles.retain(|_, open| open.partition != index);

        log_info!("nvs: erased partition {}", label);
        Ok(())
    }

    fn open(&mut self, label: &str, namespace: &str, mode: OpenMode) -> KvResult<KvHandle> {
        let namespace = bounded_name(namespace)?;
        let partition = self.partition_index(label)?;
        let image = self.partitions[partition]
            .image
            .as_ref()
            .ok_or(KvError::NotInitialized)?;

        if mode == OpenMode::ReadOnly && !image.entries.keys().any(|(ns, _)| *ns == namespace) {
            return Err(KvError::NotFound);
        }

        let raw = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1).max(1);
        self.handles.insert(
            raw,
            OpenNamespace {
                partition,
                namespace,
                mode,
            },
        );
        Ok(KvHandle::new(raw))
    }

    fn close(&mut self, handle: KvHandle) {
        self.handles.remove(&handle.raw());
    }

    fn get_value(&mut self, handle: KvHandle, key: &str, kind: ValueKind) -> KvResult<Value> {
        let key = bounded_name(key)?;
        let (image, open) = self.resolve(handle)?;
        let value = image
            .entries
            .get(&(open.namespace.clone(), key))
            .ok_or(KvError::NotFound)?;

        if value.kind() != kind {
            return Err(KvError::TypeMismatch);
        }
        Ok(value.clone())
    }

    fn set_value(&mut self, handle: KvHandle, key: &str, value: Value) -> KvResult<()> {
        let key = bounded_name(key)?;
        if matches!(&value, Value::Str(s) if s.len() > MAX_STR_LEN) {
            return Err(KvError::ValueTooLong);
        }
        let capacity = self.storage.capacity();
        let (image, namespace) = self.resolve_writable(handle)?;
        let slot = (namespace, key);
        if image.entries.get(&slot) == Some(&value) {
            return Ok(());
        }

        let projected = block::snapshot_len(
            image
                .entries
                .iter()
                .filter(|(existing, _)| **existing != slot)
                .map(|((ns, key), value)| (ns.as_str(), key.as_str(), value))
                .chain(core::iter::once((slot.0.as_str(), slot.1.as_str(), &value))),
        );
        if projected > capacity {
            log_warn!(
                "nvs: write of {} would grow snapshot to {} bytes",
                slot.1.as_str(),
                projected
            );
            return Err(KvError::NotEnoughSpace);
        }

        image.entries.insert(slot, value);
        image.dirty = true;
        Ok(())
    }

    fn erase_key(&mut self, handle: KvHandle, key: &str) -> KvResult<()> {
        let key = bounded_name(key)?;
        let (image, namespace) = self.resolve_writable(handle)?;
        image
            .entries
            .remove(&(namespace, key))
            .ok_or(KvError::NotFound)?;
        image.dirty = true;
        Ok(())
    }

    fn commit(&mut self, handle: KvHandle) -> KvResult<()> {
        let partition = self
            .handles
            .get(&handle.raw())
            .ok_or(KvError::InvalidHandle)?
            .partition;
        let state = &mut self.partitions[partition];
        let image = state.image.as_mut().ok_or(KvError::NotInitialized)?;
        if !image.dirty {
            return Ok(());
        }

        let sequence = image.sequence.wrapping_add(1);
        let snapshot = block::encode_snapshot(
            sequence,
            image
                .entries
                .iter()
                .map(|((ns, key), value)| (ns.as_str(), key.as_str(), value)),
        );
        if snapshot.len() > self.storage.capacity() {
            log_warn!(
                "nvs: snapshot of {} bytes exceeds block size",
                snapshot.len()
            );
            return Err(KvError::NotEnoughSpace);
        }

        let block = choose_next_block(&state.entry, state.stats.active_block);
        self.storage.write_block(&state.entry, block, &snapshot)?;

        image.sequence = sequence;
        image.dirty = false;
        state.stats.total_commits += 1;
        state.stats.active_block = Some(block);
        state.stats.erase_counts[block as usize] += 1;

        log_debug!("nvs: wrote snapshot seq {} to block {}", sequence, block);
        Ok(())
    }
}
