//! Platform abstraction traits
//!
//! This module defines the traits that platform implementations must provide.

pub mod flash;
pub mod kv;

// Re-export trait interfaces
pub use flash::FlashInterface;
pub use kv::{KvHandle, KvStore, OpenMode};
