//! Platform abstraction layer
//!
//! Storage backends the preferences layer persists through: raw flash and
//! the key-value store built on it.

pub mod error;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types
pub use error::{FlashError, KvError, KvResult, PlatformError, Result};
pub use traits::{FlashInterface, KvHandle, KvStore, OpenMode};
