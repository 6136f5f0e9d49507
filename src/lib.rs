#![cfg_attr(not(test), no_std)]

//! flash_prefs - Typed, versioned preferences for flash key-value storage
//!
//! This library provides strongly-typed configuration variables persisted in
//! an NVS-style key-value store, with schema versioning and a migration hook
//! run when a namespace is opened.

extern crate alloc;

// Platform abstraction layer (flash, key-value store, test doubles)
pub mod platform;

// Core systems (flash key-value engine, preferences)
pub mod core;
