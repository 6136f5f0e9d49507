//! Mock key-value store for testing
//!
//! In-memory NVS-style store with operation counters and fault injection.

use crate::platform::error::{FlashError, KvError, KvResult};
use crate::platform::traits::{KvHandle, KvStore, OpenMode};
use alloc::collections::{BTreeMap, VecDeque};
use alloc::rc::Rc;
use alloc::string::String;
use core::cell::RefCell;
use flash_prefs_core::name::{bounded_name, Key, Namespace};
use flash_prefs_core::value::{Value, ValueKind, MAX_STR_LEN};

/// Partition label the mock knows by default
pub const DEFAULT_PARTITION: &str = "nvs";

bitflags::bitflags! {
    /// Injected backend faults, active until cleared
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Faults: u8 {
        /// `get_value` fails with a flash read error
        const FAIL_READ = 1 << 0;
        /// `set_value` and `erase_key` fail with a flash write error
        const FAIL_WRITE = 1 << 1;
        /// `commit` fails with a flash write error
        const FAIL_COMMIT = 1 << 2;
        /// `open` fails with `NotEnoughSpace`
        const FAIL_OPEN = 1 << 3;
    }
}

/// Operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockKvStats {
    pub inits: u32,
    pub erases: u32,
    pub opens: u32,
    pub closes: u32,
    pub reads: u32,
    pub writes: u32,
    pub commits: u32,
}

type EntryKey = (Namespace, Key);

#[derive(Debug, Default)]
struct Partition {
    mounted: bool,
    /// Image that survives a power cycle
    committed: BTreeMap<EntryKey, Value>,
    /// Image seen by open handles
    working: BTreeMap<EntryKey, Value>,
}

#[derive(Debug)]
struct OpenNamespace {
    partition: String,
    namespace: Namespace,
    mode: OpenMode,
}

#[derive(Debug, Default)]
struct MockState {
    partitions: BTreeMap<String, Partition>,
    handles: BTreeMap<u32, OpenNamespace>,
    next_handle: u32,
    stats: MockKvStats,
    faults: Faults,
    init_failures: VecDeque<KvError>,
}

impl MockState {
    fn resolve(&mut self, handle: KvHandle) -> KvResult<(&mut Partition, &OpenNamespace)> {
        let open = self
            .handles
            .get(&handle.raw())
            .ok_or(KvError::InvalidHandle)?;
        let partition = self
            .partitions
            .get_mut(&open.partition)
            .ok_or(KvError::InvalidHandle)?;
        Ok((partition, open))
    }
}

/// Mock key-value store
///
/// Clones share state, so a test can keep one clone for inspection while a
/// controller owns another, and can hand a clone to a fresh controller to
/// simulate a reboot.
///
/// # Example
///
/// ```
/// use flash_prefs::platform::mock::MockKvStore;
/// use flash_prefs::platform::traits::{KvStore, OpenMode};
///
/// let mut store = MockKvStore::new();
/// store.init_partition("nvs").unwrap();
/// let handle = store.open("nvs", "app", OpenMode::ReadWrite).unwrap();
/// store.set::<u32>(handle, "BootCount", 3).unwrap();
/// store.commit(handle).unwrap();
///
/// assert_eq!(store.get::<u32>(handle, "BootCount"), Ok(3));
/// assert_eq!(store.stats().commits, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockKvStore {
    state: Rc<RefCell<MockState>>,
}

impl MockKvStore {
    /// Create a store with an empty, unmounted default partition
    pub fn new() -> Self {
        let mut state = MockState {
            next_handle: 1,
            ..Default::default()
        };
        state
            .partitions
            .insert(String::from(DEFAULT_PARTITION), Partition::default());
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Add another partition label
    pub fn with_partition(self, label: &str) -> Self {
        self.state
            .borrow_mut()
            .partitions
            .insert(String::from(label), Partition::default());
        self
    }

    /// Operation counters so far
    pub fn stats(&self) -> MockKvStats {
        self.state.borrow().stats
    }

    /// Reset operation counters
    pub fn reset_stats(&self) {
        self.state.borrow_mut().stats = MockKvStats::default();
    }

    /// Activate faults until [`clear_faults`](Self::clear_faults)
    pub fn inject(&self, faults: Faults) {
        self.state.borrow_mut().faults.insert(faults);
    }

    /// Deactivate all faults
    pub fn clear_faults(&self) {
        self.state.borrow_mut().faults = Faults::empty();
    }

    /// Fail the next partition init with `error`
    ///
    /// Calls queue up, so two calls fail the next two inits.
    pub fn fail_next_init(&self, error: KvError) {
        self.state.borrow_mut().init_failures.push_back(error);
    }

    /// Write a committed value behind the back of any open handle
    pub fn insert(&self, namespace: &str, key: &str, value: Value) {
        let Some(entry) = entry_key(namespace, key) else {
            return;
        };
        let mut state = self.state.borrow_mut();
        if let Some(partition) = state.partitions.get_mut(DEFAULT_PARTITION) {
            partition.working.insert(entry.clone(), value.clone());
            partition.committed.insert(entry, value);
        }
    }

    /// Committed value in the default partition
    pub fn committed(&self, namespace: &str, key: &str) -> Option<Value> {
        let entry = entry_key(namespace, key)?;
        let state = self.state.borrow();
        state.partitions.get(DEFAULT_PARTITION)?.committed.get(&entry).cloned()
    }

    /// Value visible to open handles in the default partition
    pub fn current(&self, namespace: &str, key: &str) -> Option<Value> {
        let entry = entry_key(namespace, key)?;
        let state = self.state.borrow();
        state.partitions.get(DEFAULT_PARTITION)?.working.get(&entry).cloned()
    }

    /// Number of open handles
    pub fn open_handles(&self) -> usize {
        self.state.borrow().handles.len()
    }

    /// Whether the partition is mounted
    pub fn is_mounted(&self, partition: &str) -> bool {
        self.state
            .borrow()
            .partitions
            .get(partition)
            .is_some_and(|p| p.mounted)
    }

    /// Simulate a reset: uncommitted writes are lost and every handle and
    /// mount is dropped
    pub fn power_cycle(&self) {
        let mut state = self.state.borrow_mut();
        state.handles.clear();
        for partition in state.partitions.values_mut() {
            partition.mounted = false;
            partition.working = partition.committed.clone();
        }
    }
}

impl Default for MockKvStore {
    fn default() -> Self {
        Self::new()
    }
}

fn entry_key(namespace: &str, key: &str) -> Option<EntryKey> {
    Some((bounded_name(namespace).ok()?, bounded_name(key).ok()?))
}

impl KvStore for MockKvStore {
    fn init_partition(&mut self, partition: &str) -> KvResult<()> {
        let mut state = self.state.borrow_mut();
        state.stats.inits += 1;
        if let Some(error) = state.init_failures.pop_front() {
            return Err(error);
        }
        let partition = state
            .partitions
            .get_mut(partition)
            .ok_or(KvError::PartitionNotFound)?;
        partition.mounted = true;
        Ok(())
    }

    fn erase_partition(&mut self, label: &str) -> KvResult<()> {
        let mut state = self.state.borrow_mut();
        state.stats.erases += 1;
        let partition = state
            .partitions
            .get_mut(label)
            .ok_or(KvError::PartitionNotFound)?;
        *partition = Partition::default();
        state.handles.retain(|_, open| open.partition != label);
        Ok(())
    }

    fn open(&mut self, partition: &str, namespace: &str, mode: OpenMode) -> KvResult<KvHandle> {
        let namespace = bounded_name(namespace)?;
        let mut state = self.state.borrow_mut();
        state.stats.opens += 1;

        let mounted = state
            .partitions
            .get(partition)
            .ok_or(KvError::PartitionNotFound)?;
        if !mounted.mounted {
            return Err(KvError::NotInitialized);
        }
        if state.faults.contains(Faults::FAIL_OPEN) {
            return Err(KvError::NotEnoughSpace);
        }
        if mode == OpenMode::ReadOnly && !mounted.working.keys().any(|(ns, _)| *ns == namespace) {
            return Err(KvError::NotFound);
        }

        let raw = state.next_handle;
        state.next_handle += 1;
        state.handles.insert(
            raw,
            OpenNamespace {
                partition: String::from(partition),
                namespace,
                mode,
            },
        );
        Ok(KvHandle::new(raw))
    }

    fn close(&mut self, handle: KvHandle) {
        let mut state = self.state.borrow_mut();
        if state.handles.remove(&handle.raw()).is_some() {
            state.stats.closes += 1;
        }
    }

    fn get_value(&mut self, handle: KvHandle, key: &str, kind: ValueKind) -> KvResult<Value> {
        let key = bounded_name(key)?;
        let mut state = self.state.borrow_mut();
        let faults = state.faults;
        let (partition, open) = state.resolve(handle)?;
        if faults.contains(Faults::FAIL_READ) {
            return Err(KvError::Flash(FlashError::ReadFailed));
        }
        let value = partition
            .working
            .get(&(open.namespace.clone(), key))
            .cloned();
        state.stats.reads += 1;

        let value = value.ok_or(KvError::NotFound)?;
        if value.kind() != kind {
            return Err(KvError::TypeMismatch);
        }
        Ok(value)
    }

    fn set_value(&mut self, handle: KvHandle, key: &str, value: Value) -> KvResult<()> {
        let key = bounded_name(key)?;
        if matches!(&value, Value::Str(s) if s.len() > MAX_STR_LEN) {
            return Err(KvError::ValueTooLong);
        }
        let mut state = self.state.borrow_mut();
        let faults = state.faults;
        let (partition, open) = state.resolve(handle)?;
        if open.mode == OpenMode::ReadOnly {
            return Err(KvError::ReadOnly);
        }
        if faults.contains(Faults::FAIL_WRITE) {
            return Err(KvError::Flash(FlashError::WriteFailed));
        }
        let namespace = open.namespace.clone();
        partition.working.insert((namespace, key), value);
        state.stats.writes += 1;
        Ok(())
    }

    fn erase_key(&mut self, handle: KvHandle, key: &str) -> KvResult<()> {
        let key = bounded_name(key)?;
        let mut state = self.state.borrow_mut();
        let faults = state.faults;
        let (partition, open) = state.resolve(handle)?;
        if open.mode == OpenMode::ReadOnly {
            return Err(KvError::ReadOnly);
        }
        if faults.contains(Faults::FAIL_WRITE) {
            return Err(KvError::Flash(FlashError::WriteFailed));
        }
        let namespace = open.namespace.clone();
        partition
            .working
            .remove(&(namespace, key))
            .ok_or(KvError::NotFound)?;
        state.stats.writes += 1;
        Ok(())
    }

    fn commit(&mut self, handle: KvHandle) -> KvResult<()> {
        let mut state = self.state.borrow_mut();
        let faults = state.faults;
        let (partition, _) = state.resolve(handle)?;
        if faults.contains(Faults::FAIL_COMMIT) {
            return Err(KvError::Flash(FlashError::WriteFailed));
        }
        partition.committed = partition.working.clone();
        state.stats.commits += 1;
        Ok(())
    }
}
