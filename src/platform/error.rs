//! Platform error types
//!
//! This module defines error types for flash and key-value store operations.

use core::fmt;

/// Result type for platform operations
pub type Result<T> = core::result::Result<T, PlatformError>;

/// Result type for key-value store operations
pub type KvResult<T> = core::result::Result<T, KvError>;

/// Platform-level errors
///
/// All platform implementations map their HAL-specific errors to these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlatformError {
    /// Flash operation failed
    Flash(FlashError),
}

/// Flash-specific errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Write operation failed
    WriteFailed,
    /// Read operation failed
    ReadFailed,
    /// Invalid address (out of bounds)
    InvalidAddress,
}

/// Key-value store errors
///
/// Mirrors the error codes of an NVS-style flash key-value engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KvError {
    /// Partition was not initialized before use
    NotInitialized,
    /// Key does not exist in the namespace
    NotFound,
    /// Key exists with a different stored type
    TypeMismatch,
    /// Handle was opened read-only
    ReadOnly,
    /// Not enough space left in the partition
    NotEnoughSpace,
    /// Key or namespace name is invalid
    InvalidName,
    /// Handle is closed or unknown
    InvalidHandle,
    /// Destination buffer is too small
    InvalidLength,
    /// Partition has no free pages and must be erased
    NoFreePages,
    /// Partition was written by a newer format and must be erased
    NewVersionFound,
    /// Partition label is not in the partition table
    PartitionNotFound,
    /// String value exceeds the maximum stored length
    ValueTooLong,
    /// Underlying flash access failed
    Flash(FlashError),
}

impl KvError {
    /// NVS-style diagnostic name
    pub const fn name(&self) -> &'static str {
        match self {
            KvError::NotInitialized => "ESP_ERR_NVS_NOT_INITIALIZED",
            KvError::NotFound => "ESP_ERR_NVS_NOT_FOUND",
            KvError::TypeMismatch => "ESP_ERR_NVS_TYPE_MISMATCH",
            KvError::ReadOnly => "ESP_ERR_NVS_READ_ONLY",
            KvError::NotEnoughSpace => "ESP_ERR_NVS_NOT_ENOUGH_SPACE",
            KvError::InvalidName => "ESP_ERR_NVS_INVALID_NAME",
            KvError::InvalidHandle => "ESP_ERR_NVS_INVALID_HANDLE",
            KvError::InvalidLength => "ESP_ERR_NVS_INVALID_LENGTH",
            KvError::NoFreePages => "ESP_ERR_NVS_NO_FREE_PAGES",
            KvError::NewVersionFound => "ESP_ERR_NVS_NEW_VERSION_FOUND",
            KvError::PartitionNotFound => "ESP_ERR_NVS_PART_NOT_FOUND",
            KvError::ValueTooLong => "ESP_ERR_NVS_VALUE_TOO_LONG",
            KvError::Flash(_) => "ESP_ERR_FLASH_OP_FAIL",
        }
    }

    /// Whether the partition must be erased before it can be initialized
    pub const fn needs_erase(&self) -> bool {
        matches!(self, KvError::NoFreePages | KvError::NewVersionFound)
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Flash(e) => write!(f, "Flash error: {:?}", e),
        }
    }
}

impl fmt::Display for KvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvError::Flash(e) => write!(f, "{} ({:?})", self.name(), e),
            _ => f.write_str(self.name()),
        }
    }
}

// From implementations for error conversion
impl From<FlashError> for PlatformError {
    fn from(error: FlashError) -> Self {
        PlatformError::Flash(error)
    }
}

impl From<FlashError> for KvError {
    fn from(error: FlashError) -> Self {
        KvError::Flash(error)
    }
}

impl From<PlatformError> for KvError {
    fn from(error: PlatformError) -> Self {
        match error {
            PlatformError::Flash(e) => KvError::Flash(e),
        }
    }
}

impl From<flash_prefs_core::NameError> for KvError {
    fn from(_: flash_prefs_core::NameError) -> Self {
        KvError::InvalidName
    }
}
