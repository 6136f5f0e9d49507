//! Key-value store trait
//!
//! The flash key-value engine the preferences layer persists through. The
//! shape follows an NVS-style API: a partition is initialized once, namespaces
//! are opened as handles, values are typed, and writes become durable only
//! after `commit`.

use crate::platform::error::{KvError, KvResult};
use alloc::string::String;
use flash_prefs_core::value::{Scalar, Value, ValueKind};

/// Open namespace handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KvHandle(u32);

impl KvHandle {
    /// Wrap a backend handle number
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Backend handle number
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Namespace open mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// Flash-backed key-value store
///
/// Implementations provide [`get_value`](Self::get_value) and
/// [`set_value`](Self::set_value); the typed accessors are built on top.
///
/// # Contract
///
/// - `init_partition` fails with an error for which
///   [`KvError::needs_erase`] is true when the partition must be erased first
/// - values written through a handle are readable immediately and survive a
///   restart only once `commit` succeeded
/// - reading a key stored with a different kind yields `TypeMismatch`
pub trait KvStore {
    /// Initialize (mount) a partition
    fn init_partition(&mut self, partition: &str) -> KvResult<()>;

    /// Erase a partition, dropping every namespace in it
    fn erase_partition(&mut self, partition: &str) -> KvResult<()>;

    /// Open `namespace` in an initialized partition
    fn open(&mut self, partition: &str, namespace: &str, mode: OpenMode) -> KvResult<KvHandle>;

    /// Close a handle; closing an unknown handle is a no-op
    fn close(&mut self, handle: KvHandle);

    /// Read the value stored under `key` as `kind`
    fn get_value(&mut self, handle: KvHandle, key: &str, kind: ValueKind) -> KvResult<Value>;

    /// Write `value` under `key`, replacing any previous entry
    fn set_value(&mut self, handle: KvHandle, key: &str, value: Value) -> KvResult<()>;

    /// Remove `key` from the namespace
    fn erase_key(&mut self, handle: KvHandle, key: &str) -> KvResult<()>;

    /// Persist all writes made through `handle`
    fn commit(&mut self, handle: KvHandle) -> KvResult<()>;

    /// Read a fixed-width integer
    fn get<T: Scalar>(&mut self, handle: KvHandle, key: &str) -> KvResult<T> {
        let value = self.get_value(handle, key, T::KIND)?;
        T::from_value(&value).ok_or(KvError::TypeMismatch)
    }

    /// Write a fixed-width integer
    fn set<T: Scalar>(&mut self, handle: KvHandle, key: &str, value: T) -> KvResult<()> {
        self.set_value(handle, key, value.into_value())
    }

    /// Buffer size needed for the string under `key`, terminator included
    fn str_len(&mut self, handle: KvHandle, key: &str) -> KvResult<usize> {
        match self.get_value(handle, key, ValueKind::Str)? {
            Value::Str(s) => Ok(s.len() + 1),
            _ => Err(KvError::TypeMismatch),
        }
    }

    /// Copy the string under `key` into `buf` as NUL-terminated bytes
    ///
    /// Returns the number of bytes written, terminator included.
    fn get_str(&mut self, handle: KvHandle, key: &str, buf: &mut [u8]) -> KvResult<usize> {
        let Value::Str(s) = self.get_value(handle, key, ValueKind::Str)? else {
            return Err(KvError::TypeMismatch);
        };
        let needed = s.len() + 1;
        if buf.len() < needed {
            return Err(KvError::InvalidLength);
        }
        buf[..s.len()].copy_from_slice(s.as_bytes());
        buf[s.len()] = 0;
        Ok(needed)
    }

    /// Write a string
    fn set_str(&mut self, handle: KvHandle, key: &str, value: &str) -> KvResult<()> {
        if value.len() > flash_prefs_core::value::MAX_STR_LEN {
            return Err(KvError::ValueTooLong);
        }
        self.set_value(handle, key, Value::Str(String::from(value)))
    }
}
