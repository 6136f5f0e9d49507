//! Mock platform implementation for testing
//!
//! # Feature Gate
//!
//! This module is available in two contexts:
//! - During test builds (`#[cfg(test)]`)
//! - When the `mock` feature is enabled

#![cfg(any(test, feature = "mock"))]

mod flash;
mod kv;

pub use flash::{MockFlash, BLOCK_SIZE, FIRMWARE_SIZE, FLASH_CAPACITY};
pub use kv::{Faults, MockKvStats, MockKvStore, DEFAULT_PARTITION};
