//! Controller configuration
//!
//! Defaults are fixed at build time by `build.rs` and can be overridden with
//! the `PREFS_NAMESPACE`, `PREFS_VERSION` and `PREFS_PARTITION` environment
//! variables.

use crate::core::prefs::error::PrefsError;
use alloc::string::String;
use flash_prefs_core::name::{bounded_name, Namespace};

/// Maximum partition label length
pub const MAX_PARTITION_LEN: usize = 16;

/// Partition label
pub type PartitionLabel = heapless::String<MAX_PARTITION_LEN>;

/// Build-time default namespace
pub const DEFAULT_NAMESPACE: &str = env!("PREFS_NAMESPACE");

/// Build-time default partition label
pub const DEFAULT_PARTITION: &str = env!("PREFS_PARTITION");

/// Build-time default schema version (decimal text)
const DEFAULT_VERSION: &str = env!("PREFS_VERSION");

/// Preferences controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefsConfig {
    /// Namespace owned by the controller
    pub namespace: Namespace,
    /// Compiled-in schema version
    pub version: u32,
    /// Partition the namespace lives in
    pub partition: PartitionLabel,
}

impl PrefsConfig {
    /// Configuration for `namespace` at schema `version` in the default
    /// partition
    pub fn new(namespace: &str, version: u32) -> Result<Self, PrefsError> {
        let namespace =
            bounded_name(namespace).map_err(|source| PrefsError::InvalidNamespace {
                namespace: String::from(namespace),
                source,
            })?;
        Ok(Self {
            namespace,
            version,
            partition: partition_label(DEFAULT_PARTITION).unwrap_or_default(),
        })
    }

    /// Use another partition
    pub fn with_partition(mut self, partition: &str) -> Result<Self, PrefsError> {
        self.partition = partition_label(partition)
            .ok_or_else(|| PrefsError::InvalidPartition(String::from(partition)))?;
        Ok(self)
    }
}

impl Default for PrefsConfig {
    fn default() -> Self {
        Self {
            namespace: bounded_name(DEFAULT_NAMESPACE)
                .or_else(|_| bounded_name("zPref"))
                .unwrap_or_default(),
            version: DEFAULT_VERSION.parse().unwrap_or(1),
            partition: partition_label(DEFAULT_PARTITION)
                .or_else(|| partition_label("nvs"))
                .unwrap_or_default(),
        }
    }
}

fn partition_label(label: &str) -> Option<PartitionLabel> {
    if label.is_empty() {
        return None;
    }
    let mut bounded = PartitionLabel::new();
    bounded.push_str(label).ok()?;
    Some(bounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_time_defaults() {
        let config = PrefsConfig::default();
        assert_eq!(config.namespace.as_str(), DEFAULT_NAMESPACE);
        assert_eq!(config.partition.as_str(), DEFAULT_PARTITION);
        assert_eq!(config.version.to_string(), DEFAULT_VERSION);
    }

    #[test]
    fn test_new_validates_namespace() {
        assert!(PrefsConfig::new("App", 2).is_ok());
        assert!(matches!(
            PrefsConfig::new("", 1),
            Err(PrefsError::InvalidNamespace { .. })
        ));
        assert!(matches!(
            PrefsConfig::new("NamespaceTooLong", 1),
            Err(PrefsError::InvalidNamespace { .. })
        ));
    }

    #[test]
    fn test_with_partition() {
        let config = PrefsConfig::new("App", 1)
            .unwrap()
            .with_partition("data")
            .unwrap();
        assert_eq!(config.partition.as_str(), "data");
        assert!(PrefsConfig::new("App", 1)
            .unwrap()
            .with_partition("")
            .is_err());
    }
}
