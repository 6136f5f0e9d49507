//! flash_prefs_core - Pure no_std logic for typed flash preferences
//!
//! This crate contains the platform-agnostic pieces of the preferences
//! layer and can be tested on host without any feature flags.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives allowed
//! - **no_std + alloc**: Strings and snapshot images use `alloc`
//!
//! # Modules
//!
//! - [`codec`]: Text parsing and rendering of preference values
//! - [`value`]: Stored value kinds and their binary encoding
//! - [`name`]: Bounded key and namespace names, reserved version key
//! - [`block`]: On-flash snapshot block format
//! - [`crc`]: CRC32 for snapshot validation

#![no_std]

extern crate alloc;

pub mod block;
pub mod codec;
pub mod crc;
pub mod error;
pub mod name;
pub mod value;

pub use error::NameError;
pub use name::{Key, Namespace, MAX_NAME_LEN, VERSION_KEY};
pub use value::{Scalar, Value, ValueKind};
