//! Bounded key and namespace names
//!
//! Backend keys and namespaces are limited to 15 bytes. Names are stored in
//! fixed-capacity strings so a declared key can never outgrow the backend.

use crate::error::NameError;
use heapless::String;

/// Maximum key / namespace length in bytes
pub const MAX_NAME_LEN: usize = 15;

/// Reserved key holding the schema version of a namespace
///
/// Part of the on-flash contract: renaming it breaks upgrades of deployed
/// devices.
pub const VERSION_KEY: &str = "CfgVersion";

/// Variable key within a namespace
pub type Key = String<MAX_NAME_LEN>;

/// Namespace identifier
pub type Namespace = String<MAX_NAME_LEN>;

/// Validate `name` and copy it into a bounded string
///
/// # Example
///
/// ```
/// use flash_prefs_core::name::bounded_name;
/// use flash_prefs_core::NameError;
///
/// assert_eq!(bounded_name("DeviceName").unwrap().as_str(), "DeviceName");
/// assert_eq!(bounded_name(""), Err(NameError::Empty));
/// assert_eq!(bounded_name("ThisNameIsTooLong"), Err(NameError::TooLong));
/// ```
pub fn bounded_name(name: &str) -> Result<String<MAX_NAME_LEN>, NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.bytes().any(|b| b == 0) {
        return Err(NameError::InvalidChar);
    }
    let mut bounded = String::new();
    bounded.push_str(name).map_err(|_| NameError::TooLong)?;
    Ok(bounded)
}

/// Check whether `key` is the reserved version key
pub fn is_reserved(key: &str) -> bool {
    key == VERSION_KEY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_key_fits() {
        assert!(VERSION_KEY.len() <= MAX_NAME_LEN);
        assert!(bounded_name(VERSION_KEY).is_ok());
    }

    #[test]
    fn test_length_limit() {
        assert!(bounded_name("fifteen_chars__").is_ok());
        assert_eq!(bounded_name("sixteen_chars___"), Err(NameError::TooLong));
    }

    #[test]
    fn test_rejects_nul() {
        assert_eq!(bounded_name("a\0b"), Err(NameError::InvalidChar));
    }

    #[test]
    fn test_reserved() {
        assert!(is_reserved("CfgVersion"));
        assert!(!is_reserved("cfgversion"));
    }
}
