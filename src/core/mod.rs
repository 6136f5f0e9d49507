//! Core preferences functionality
//!
//! The reference flash key-value engine, the typed preferences layer built on
//! any [`KvStore`](crate::platform::traits::KvStore), and the logging macros
//! both use.

pub mod logging;
pub mod nvs;
pub mod prefs;
