//! Typed, versioned preferences
//!
//! The preferences layer sits between application code and a [`KvStore`]:
//!
//! - [`Variable<T>`]: typed value with a compiled-in default and a lazily
//!   loaded cache
//! - [`Registry`]: declared variables, addressable by key as text
//! - [`Prefs`]: owns one namespace, runs schema migrations on `init`
//! - [`KvAdapter`]: typed accessors over the open namespace handle
//!
//! [`KvStore`]: crate::platform::traits::KvStore

pub mod adapter;
pub mod config;
pub mod controller;
pub mod error;
pub mod registry;
pub mod variable;

pub use adapter::KvAdapter;
pub use config::{PrefsConfig, DEFAULT_NAMESPACE, DEFAULT_PARTITION};
pub use controller::{
    Batch, FnHook, MigrationHook, NoMigration, Prefs, ResetOnFirstBoot, Status,
};
pub use error::{InitError, MigrationError, PrefsError, RegistryError};
pub use registry::Registry;
pub use variable::{PrefValue, TextVariable, Variable};
