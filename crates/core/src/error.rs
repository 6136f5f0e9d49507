//! Core error types

/// Invalid key or namespace name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    /// Name is empty
    Empty,
    /// Name exceeds the backend length limit
    TooLong,
    /// Name contains a NUL byte
    InvalidChar,
}

impl NameError {
    /// Static description, usable by log backends without `Display`
    pub const fn as_str(&self) -> &'static str {
        match self {
            NameError::Empty => "name is empty",
            NameError::TooLong => "name exceeds 15 bytes",
            NameError::InvalidChar => "name contains NUL",
        }
    }
}

impl core::fmt::Display for NameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::error::Error for NameError {}
