//! Variable registry
//!
//! Ordered collection of type-erased variables with lookup by key. Order is
//! declaration order; lookups are linear and the first match wins.

use crate::core::prefs::error::RegistryError;
use crate::core::prefs::variable::TextVariable;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

/// Registry of declared variables
#[derive(Default)]
pub struct Registry {
    variables: Vec<Rc<dyn TextVariable>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a variable without a duplicate check
    pub fn register(&mut self, variable: Rc<dyn TextVariable>) {
        self.variables.push(variable);
    }

    /// Append a variable, rejecting a key that is already registered
    pub fn register_unique(&mut self, variable: Rc<dyn TextVariable>) -> Result<(), RegistryError> {
        if self.find(variable.key()).is_some() {
            return Err(RegistryError::Duplicate(String::from(variable.key())));
        }
        self.variables.push(variable);
        Ok(())
    }

    /// First variable registered under `key`
    pub fn find(&self, key: &str) -> Option<&Rc<dyn TextVariable>> {
        self.variables.iter().find(|v| v.key() == key)
    }

    /// Text of `key`, or an empty string if unknown
    pub fn get(&self, key: &str) -> String {
        self.find(key).map(|v| v.to_text()).unwrap_or_default()
    }

    /// Render `key` into `buf`; false if unknown or the buffer is too small
    pub fn get_into(&self, key: &str, buf: &mut [u8]) -> bool {
        self.find(key).is_some_and(|v| v.copy_to_buffer(buf))
    }

    /// Parse and store `text` into `key`; 0 if unknown
    pub fn set(&self, key: &str, text: &str) -> usize {
        self.find(key).map_or(0, |v| v.from_text(text))
    }

    /// Text of `key`, with unknown keys reported as an error
    pub fn try_get(&self, key: &str) -> Result<String, RegistryError> {
        self.find(key)
            .map(|v| v.to_text())
            .ok_or_else(|| RegistryError::NotFound(String::from(key)))
    }

    /// Parse and store `text` into `key`, with unknown keys reported as an
    /// error
    pub fn try_set(&self, key: &str, text: &str) -> Result<usize, RegistryError> {
        self.find(key)
            .map(|v| v.from_text(text))
            .ok_or_else(|| RegistryError::NotFound(String::from(key)))
    }

    /// Variables in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Rc<dyn TextVariable>> {
        self.variables.iter()
    }

    /// Keys in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.key())
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Persist every default; returns how many setters reported bytes
    /// written
    ///
    /// An empty string default reports 0 bytes and is not counted.
    pub fn reset_all(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.set_default() > 0)
            .count()
    }
}
