//! Versioned store controller
//!
//! [`Prefs`] owns one namespace of a key-value store. `init` mounts the
//! partition, opens the namespace, reads the stored schema version and runs
//! the migration hook before the variables are used.
//!
//! ```text
//! Uninitialized ──init──► Opening ──┬──► Ready ──end──► Closed
//!                                   └──► Failed
//! ```

use crate::core::prefs::adapter::KvAdapter;
use crate::core::prefs::config::PrefsConfig;
use crate::core::prefs::error::{InitError, MigrationError, PrefsError, RegistryError};
use crate::core::prefs::registry::Registry;
use crate::core::prefs::variable::{PrefValue, Variable};
use crate::platform::traits::{KvStore, OpenMode};
use crate::{log_error, log_info, log_warn};
use alloc::rc::Rc;
use alloc::string::String;
use core::cell::{Cell, Ref, RefCell};
use flash_prefs_core::name::{bounded_name, is_reserved, VERSION_KEY};

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// Constructed, `init` not called yet
    Uninitialized,
    /// `init` in progress (migration hook running)
    Opening,
    /// Namespace open and migrated
    Ready,
    /// Last `init` failed; the handle is closed
    Failed,
    /// Closed by `end` after being ready
    Closed,
}

impl Status {
    pub fn is_ready(self) -> bool {
        self == Status::Ready
    }

    pub const fn name(self) -> &'static str {
        match self {
            Status::Uninitialized => "uninitialized",
            Status::Opening => "opening",
            Status::Ready => "ready",
            Status::Failed => "failed",
            Status::Closed => "closed",
        }
    }
}

/// Migration hook run on every successful open
///
/// `on_init` is called once per `init`, whether or not the versions match.
/// Returning an error fails the init and leaves the stored version untouched,
/// so the next boot retries the same migration.
pub trait MigrationHook<S: KvStore + 'static> {
    /// Migrate from `stored` (0 for a new namespace) to `current`
    fn on_init(
        &mut self,
        prefs: &Prefs<S>,
        stored: u32,
        current: u32,
    ) -> Result<(), MigrationError> {
        let _ = (prefs, stored, current);
        Ok(())
    }

    /// Restore variables to their defaults; no-op unless overridden
    fn reset(&mut self, prefs: &Prefs<S>) -> Result<(), MigrationError> {
        let _ = prefs;
        Ok(())
    }
}

/// Hook that accepts every version without touching the variables
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMigration;

impl<S: KvStore + 'static> MigrationHook<S> for NoMigration {}

/// Hook that writes every default on first boot (stored version 0)
#[derive(Debug, Default, Clone, Copy)]
pub struct ResetOnFirstBoot;

impl<S: KvStore + 'static> MigrationHook<S> for ResetOnFirstBoot {
    fn on_init(
        &mut self,
        prefs: &Prefs<S>,
        stored: u32,
        _current: u32,
    ) -> Result<(), MigrationError> {
        if stored == 0 {
            self.reset(prefs)?;
        }
        Ok(())
    }

    fn reset(&mut self, prefs: &Prefs<S>) -> Result<(), MigrationError> {
        prefs.reset_all();
        Ok(())
    }
}

/// Closure-backed `on_init` hook
pub struct FnHook<F>(pub F);

impl<S, F> MigrationHook<S> for FnHook<F>
where
    S: KvStore + 'static,
    F: FnMut(&Prefs<S>, u32, u32) -> Result<(), MigrationError>,
{
    fn on_init(
        &mut self,
        prefs: &Prefs<S>,
        stored: u32,
        current: u32,
    ) -> Result<(), MigrationError> {
        (self.0)(prefs, stored, current)
    }
}

/// Typed, versioned preferences over one key-value namespace
///
/// # Example
///
/// ```
/// use flash_prefs::core::prefs::{Prefs, PrefsConfig, ResetOnFirstBoot};
/// use flash_prefs::platform::mock::MockKvStore;
///
/// let prefs = Prefs::with_config(MockKvStore::new(), PrefsConfig::new("App", 2).unwrap());
/// let name = prefs.declare("DeviceName", String::from("rover")).unwrap();
/// let volume = prefs.declare("Volume", 5u8).unwrap();
///
/// prefs.init(&mut ResetOnFirstBoot).unwrap();
/// assert!(prefs.status().is_ready());
///
/// volume.set(7);
/// assert_eq!(prefs.get("Volume"), "7");
/// assert_eq!(name.get(), "rover");
/// ```
pub struct Prefs<S: KvStore + 'static> {
    config: PrefsConfig,
    adapter: Rc<KvAdapter<S>>,
    registry: RefCell<Registry>,
    status: Cell<Status>,
    stored_version: Cell<Option<u32>>,
    last_error: RefCell<Option<InitError>>,
}

impl<S: KvStore + 'static> Prefs<S> {
    /// Controller for `namespace` at schema `version`
    pub fn new(store: S, namespace: &str, version: u32) -> Result<Self, PrefsError> {
        Ok(Self::with_config(store, PrefsConfig::new(namespace, version)?))
    }

    pub fn with_config(store: S, config: PrefsConfig) -> Self {
        Self {
            config,
            adapter: Rc::new(KvAdapter::new(store)),
            registry: RefCell::new(Registry::new()),
            status: Cell::new(Status::Uninitialized),
            stored_version: Cell::new(None),
            last_error: RefCell::new(None),
        }
    }

    /// Declare a variable and register it
    ///
    /// # Errors
    ///
    /// - `InvalidKey` if the key is empty, too long or contains NUL
    /// - `ReservedKey` for the schema version key
    /// - `DuplicateKey` if the key is already declared
    pub fn declare<T: PrefValue>(&self, key: &str, default: T) -> Result<Rc<Variable<T>>, PrefsError> {
        let bounded = bounded_name(key).map_err(|source| PrefsError::InvalidKey {
            key: String::from(key),
            source,
        })?;
        if is_reserved(key) {
            return Err(PrefsError::ReservedKey(String::from(key)));
        }
        if self.registry.borrow().find(key).is_some() {
            return Err(PrefsError::DuplicateKey(String::from(key)));
        }

        let reader = Rc::clone(&self.adapter);
        let writer = Rc::clone(&self.adapter);
        let variable = Rc::new(Variable::new(
            bounded,
            default,
            move |key, default| reader.load(key, default),
            move |key, value| writer.store(key, value),
        ));
        self.registry.borrow_mut().register(variable.clone());
        Ok(variable)
    }

    /// Open the configured partition and namespace and run `hook`
    pub fn init(&self, hook: &mut dyn MigrationHook<S>) -> Result<(), InitError> {
        let partition = self.config.partition.clone();
        self.init_partition(&partition, hook)
    }

    /// Open `partition` and the configured namespace and run `hook`
    ///
    /// A partition that reports it needs erasing is erased and initialized
    /// once more. An already open namespace is closed first.
    pub fn init_partition(
        &self,
        partition: &str,
        hook: &mut dyn MigrationHook<S>,
    ) -> Result<(), InitError> {
        if self.adapter.is_open() {
            log_info!(
                "prefs: reinitializing namespace {}",
                self.config.namespace.as_str()
            );
            self.close_handle();
        }

        self.status.set(Status::Opening);
        self.stored_version.set(None);

        let result = self.open(partition, hook);
        match &result {
            Ok(()) => {
                self.status.set(Status::Ready);
                *self.last_error.borrow_mut() = None;
            }
            Err(e) => {
                log_error!(
                    "prefs: init of namespace {} failed",
                    self.config.namespace.as_str()
                );
                self.close_handle();
                self.status.set(Status::Failed);
                *self.last_error.borrow_mut() = Some(e.clone());
            }
        }
        result
    }

    fn open(&self, partition: &str, hook: &mut dyn MigrationHook<S>) -> Result<(), InitError> {
        self.mount(partition)?;

        let namespace = self.config.namespace.as_str();
        let handle = self
            .adapter
            .with_store(|store| store.open(partition, namespace, OpenMode::ReadWrite))
            .map_err(|error| InitError::Open {
                namespace: String::from(namespace),
                error,
            })?;
        self.adapter.set_handle(Some(handle));

        let current = self.config.version;
        let stored = self.adapter.get_u32(VERSION_KEY, 0);
        self.stored_version.set(Some(stored));
        log_info!(
            "prefs: namespace {} stored version {}, current {}",
            namespace,
            stored,
            current
        );

        hook.on_init(self, stored, current)
            .map_err(|source| InitError::Migration {
                stored,
                current,
                source,
            })?;
        if !self.adapter.is_open() {
            return Err(InitError::ClosedDuringMigration {
                namespace: String::from(namespace),
            });
        }

        if stored != current {
            if self.adapter.put_u32(VERSION_KEY, current) == 0 {
                log_warn!("prefs: could not persist version {}", current);
            }
            self.adapter.commit();
            log_info!(
                "prefs: namespace {} migrated from {} to {}",
                namespace,
                stored,
                current
            );
        }
        Ok(())
    }

    fn mount(&self, partition: &str) -> Result<(), InitError> {
        let to_error = |error| InitError::Partition {
            partition: String::from(partition),
            error,
        };

        let error = match self.adapter.with_store(|store| store.init_partition(partition)) {
            Ok(()) => return Ok(()),
            Err(error) if error.needs_erase() => error,
            Err(error) => return Err(to_error(error)),
        };

        log_warn!(
            "prefs: partition {} needs erase ({})",
            partition,
            error.name()
        );
        self.adapter
            .with_store(|store| {
                store.erase_partition(partition)?;
                store.init_partition(partition)
            })
            .map_err(to_error)
    }

    fn close_handle(&self) {
        if let Some(handle) = self.adapter.handle() {
            self.adapter.with_store(|store| store.close(handle));
            self.adapter.set_handle(None);
        }
    }

    /// Close the namespace; safe to call repeatedly
    pub fn end(&self) {
        if self.adapter.is_open() {
            self.close_handle();
            log_info!(
                "prefs: closed namespace {}",
                self.config.namespace.as_str()
            );
        }
        if self.status.get() == Status::Ready {
            self.status.set(Status::Closed);
        }
    }

    pub fn status(&self) -> Status {
        self.status.get()
    }

    /// Why the last `init` failed
    pub fn last_error(&self) -> Option<InitError> {
        self.last_error.borrow().clone()
    }

    /// Version read from the store by the last `init`
    pub fn stored_version(&self) -> Option<u32> {
        self.stored_version.get()
    }

    /// Compiled-in schema version
    pub fn version(&self) -> u32 {
        self.config.version
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn config(&self) -> &PrefsConfig {
        &self.config
    }

    /// Declared variables
    ///
    /// # Panics
    ///
    /// If a variable is declared while the returned guard is alive.
    pub fn registry(&self) -> Ref<'_, Registry> {
        self.registry.borrow()
    }

    /// Text of `key`, or an empty string if unknown
    pub fn get(&self, key: &str) -> String {
        self.registry.borrow().get(key)
    }

    /// Render `key` into `buf` as NUL-terminated bytes
    pub fn get_into(&self, key: &str, buf: &mut [u8]) -> bool {
        self.registry.borrow().get_into(key, buf)
    }

    /// Parse and store `text` into `key`; 0 if unknown
    pub fn set(&self, key: &str, text: &str) -> usize {
        self.registry.borrow().set(key, text)
    }

    /// Text of `key`, with unknown keys reported as an error
    pub fn try_get(&self, key: &str) -> Result<String, RegistryError> {
        self.registry.borrow().try_get(key)
    }

    /// Parse and store `text` into `key`, with unknown keys reported as an
    /// error
    pub fn try_set(&self, key: &str, text: &str) -> Result<usize, RegistryError> {
        self.registry.borrow().try_set(key, text)
    }

    /// Write every default under a single commit
    pub fn reset_all(&self) -> usize {
        let _batch = self.batch();
        self.registry.borrow().reset_all()
    }

    /// Remove a stored key that is no longer declared
    pub fn erase_key(&self, key: &str) -> bool {
        self.adapter.erase_key(key)
    }

    /// Defer commits until the returned guard is dropped
    pub fn batch(&self) -> Batch<'_, S> {
        self.adapter.begin_batch();
        Batch {
            adapter: &self.adapter,
        }
    }

    /// Run `f` with exclusive access to the underlying store
    pub fn with_store<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        self.adapter.with_store(f)
    }
}

impl<S: KvStore + 'static> Drop for Prefs<S> {
    fn drop(&mut self) {
        self.end();
    }
}

/// Commit-deferring scope
///
/// Variable writes inside the scope skip their per-write commit; one commit
/// is issued when the outermost guard drops. This is not a transaction:
/// every write is applied immediately.
#[must_use = "commits resume as soon as the batch is dropped"]
pub struct Batch<'a, S: KvStore> {
    adapter: &'a KvAdapter<S>,
}

impl<S: KvStore> Drop for Batch<'_, S> {
    fn drop(&mut self) {
        self.adapter.end_batch();
    }
}
