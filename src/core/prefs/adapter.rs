//! Key-value backend adapter
//!
//! Typed get/put accessors over the open namespace handle. Backend failures
//! never surface as errors here: reads degrade to the caller's default, writes
//! report 0 bytes, and commit failures are logged.

use crate::core::prefs::variable::PrefValue;
use crate::platform::traits::{KvHandle, KvStore};
use crate::{log_debug, log_warn};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use flash_prefs_core::value::{Scalar, ValueKind};

/// Shared access to a key-value store and its open namespace handle
pub struct KvAdapter<S: KvStore> {
    store: RefCell<S>,
    handle: Cell<Option<KvHandle>>,
    batch_depth: Cell<u32>,
}

macro_rules! scalar_accessors {
    ($($get:ident, $put:ident => $t:ty);* $(;)?) => {
        $(
            #[doc = concat!("Read a `", stringify!($t), "`, or `default` on any error")]
            pub fn $get(&self, key: &str, default: $t) -> $t {
                self.get_scalar(key, default)
            }

            #[doc = concat!("Write a `", stringify!($t), "`; 1 on success, 0 on failure")]
            pub fn $put(&self, key: &str, value: $t) -> usize {
                self.put_scalar(key, value)
            }
        )*
    };
}

impl<S: KvStore> KvAdapter<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: RefCell::new(store),
            handle: Cell::new(None),
            batch_depth: Cell::new(0),
        }
    }

    /// Open namespace handle, if any
    pub fn handle(&self) -> Option<KvHandle> {
        self.handle.get()
    }

    /// Whether a namespace handle is open
    pub fn is_open(&self) -> bool {
        self.handle.get().is_some()
    }

    pub(crate) fn set_handle(&self, handle: Option<KvHandle>) {
        self.handle.set(handle);
    }

    /// Run `f` with exclusive access to the store
    ///
    /// # Panics
    ///
    /// If called re-entrantly from inside another `with_store` closure.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.store.borrow_mut())
    }

    /// Read a fixed-width integer, or `default` on any error
    pub fn get_scalar<T: Scalar>(&self, key: &str, default: T) -> T {
        let Some(handle) = self.handle.get() else {
            return default;
        };
        self.with_store(|store| store.get::<T>(handle, key))
            .unwrap_or(default)
    }

    /// Write a fixed-width integer; 1 on success, 0 on failure
    pub fn put_scalar<T: Scalar>(&self, key: &str, value: T) -> usize {
        let Some(handle) = self.handle.get() else {
            log_warn!("prefs: write to {} while closed", key);
            return 0;
        };
        match self.with_store(|store| store.set(handle, key, value)) {
            Ok(()) => 1,
            Err(e) => {
                log_warn!(
                    "prefs: writing {} ({}) failed: {}",
                    key,
                    T::KIND.name(),
                    e.name()
                );
                0
            }
        }
    }

    /// Read a boolean stored as `i8`
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get_scalar::<i8>(key, default as i8) != 0
    }

    /// Write a boolean as `i8` (0/1)
    pub fn put_bool(&self, key: &str, value: bool) -> usize {
        self.put_scalar::<i8>(key, value as i8)
    }

    scalar_accessors! {
        get_u8, put_u8 => u8;
        get_i8, put_i8 => i8;
        get_u16, put_u16 => u16;
        get_i16, put_i16 => i16;
        get_u32, put_u32 => u32;
        get_i32, put_i32 => i32;
        get_u64, put_u64 => u64;
        get_i64, put_i64 => i64;
    }

    /// Read a string, or `default` on any error
    ///
    /// Queries the stored size first and allocates fallibly, so a corrupt
    /// length cannot abort on allocation failure.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        let Some(handle) = self.handle.get() else {
            return String::from(default);
        };

        self.with_store(|store| {
            let needed = store.str_len(handle, key).ok()?;
            let mut buf = Vec::new();
            buf.try_reserve_exact(needed).ok()?;
            buf.resize(needed, 0);

            let written = store.get_str(handle, key, &mut buf).ok()?;
            buf.truncate(written.saturating_sub(1));
            String::from_utf8(buf).ok()
        })
        .unwrap_or_else(|| String::from(default))
    }

    /// Write a string; its length in bytes on success, 0 on failure
    pub fn put_string(&self, key: &str, value: &str) -> usize {
        let Some(handle) = self.handle.get() else {
            log_warn!("prefs: write to {} while closed", key);
            return 0;
        };
        match self.with_store(|store| store.set_str(handle, key, value)) {
            Ok(()) => value.len(),
            Err(e) => {
                log_warn!(
                    "prefs: writing {} ({}) failed: {}",
                    key,
                    ValueKind::Str.name(),
                    e.name()
                );
                0
            }
        }
    }

    /// Remove `key` and commit; false if it was absent or the store is closed
    pub fn erase_key(&self, key: &str) -> bool {
        let Some(handle) = self.handle.get() else {
            return false;
        };
        let erased = self
            .with_store(|store| store.erase_key(handle, key))
            .is_ok();
        if erased {
            self.commit_unless_batched();
        }
        erased
    }

    /// Read a preference value, `None` while no namespace is open
    pub fn load<T: PrefValue>(&self, key: &str, default: &T) -> Option<T> {
        self.is_open().then(|| T::load(self, key, default))
    }

    /// Write a preference value and commit unless a batch is open
    pub fn store<T: PrefValue>(&self, key: &str, value: &T) -> usize {
        let written = T::store(self, key, value);
        self.commit_unless_batched();
        written
    }

    /// Flush pending writes; failures are logged, never returned
    pub fn commit(&self) {
        let Some(handle) = self.handle.get() else {
            return;
        };
        log_debug!("prefs: committing changes");
        if let Err(e) = self.with_store(|store| store.commit(handle)) {
            log_warn!("prefs: commit failed: {}", e.name());
        }
    }

    pub(crate) fn commit_unless_batched(&self) {
        if self.batch_depth.get() == 0 {
            self.commit();
        }
    }

    pub(crate) fn begin_batch(&self) {
        self.batch_depth.set(self.batch_depth.get() + 1);
    }

    /// Close one batch level; commits when the outermost batch ends
    pub(crate) fn end_batch(&self) {
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        if depth == 0 {
            self.commit();
        }
    }

    /// Whether a batch is open
    pub fn in_batch(&self) -> bool {
        self.batch_depth.get() > 0
    }
}
