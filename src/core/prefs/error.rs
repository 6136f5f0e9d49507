//! Preferences error types

use crate::platform::error::KvError;
use alloc::string::String;
use flash_prefs_core::NameError;

/// Declaration and access errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrefsError {
    #[error("invalid key `{key}`: {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: NameError,
    },

    #[error("key `{0}` is reserved for the schema version")]
    ReservedKey(String),

    #[error("key `{0}` is already declared")]
    DuplicateKey(String),

    #[error("invalid namespace `{namespace}`: {source}")]
    InvalidNamespace {
        namespace: String,
        #[source]
        source: NameError,
    },

    #[error("invalid partition label `{0}`")]
    InvalidPartition(String),
}

/// Registry lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no variable with key `{0}`")]
    NotFound(String),

    #[error("key `{0}` is already registered")]
    Duplicate(String),
}

/// Failure reported by a migration hook
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    #[error("no migration path from version {from} to {to}")]
    Unsupported { from: u32, to: u32 },

    #[error("migration aborted: {0}")]
    Aborted(&'static str),

    #[error("failed to persist `{0}`")]
    WriteFailed(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Reason the controller failed to become ready
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    #[error("partition `{partition}` could not be initialized: {error}")]
    Partition { partition: String, error: KvError },

    #[error("namespace `{namespace}` could not be opened: {error}")]
    Open { namespace: String, error: KvError },

    #[error("migration from version {stored} to {current} failed: {source}")]
    Migration {
        stored: u32,
        current: u32,
        #[source]
        source: MigrationError,
    },

    #[error("namespace `{namespace}` was closed by the migration hook")]
    ClosedDuringMigration { namespace: String },
}
