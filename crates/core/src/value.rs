//! Stored value kinds
//!
//! A key-value backend stores each entry with a type tag. The tags follow the
//! NVS type codes so images stay readable by tooling that knows that format.

use alloc::string::String;
use alloc::vec::Vec;

/// Maximum encoded string length (bytes, excluding terminator)
pub const MAX_STR_LEN: usize = 1984;

/// Type tag of a stored entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValueKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    Str,
}

impl ValueKind {
    /// On-flash type tag
    pub const fn tag(self) -> u8 {
        match self {
            ValueKind::U8 => 0x01,
            ValueKind::I8 => 0x11,
            ValueKind::U16 => 0x02,
            ValueKind::I16 => 0x12,
            ValueKind::U32 => 0x04,
            ValueKind::I32 => 0x14,
            ValueKind::U64 => 0x08,
            ValueKind::I64 => 0x18,
            ValueKind::Str => 0x21,
        }
    }

    /// Kind for an on-flash type tag
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(ValueKind::U8),
            0x11 => Some(ValueKind::I8),
            0x02 => Some(ValueKind::U16),
            0x12 => Some(ValueKind::I16),
            0x04 => Some(ValueKind::U32),
            0x14 => Some(ValueKind::I32),
            0x08 => Some(ValueKind::U64),
            0x18 => Some(ValueKind::I64),
            0x21 => Some(ValueKind::Str),
            _ => None,
        }
    }

    /// Encoded width for fixed-size kinds, `None` for strings
    pub const fn width(self) -> Option<usize> {
        match self {
            ValueKind::U8 | ValueKind::I8 => Some(1),
            ValueKind::U16 | ValueKind::I16 => Some(2),
            ValueKind::U32 | ValueKind::I32 => Some(4),
            ValueKind::U64 | ValueKind::I64 => Some(8),
            ValueKind::Str => None,
        }
    }

    /// Short name used in diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            ValueKind::U8 => "u8",
            ValueKind::I8 => "i8",
            ValueKind::U16 => "u16",
            ValueKind::I16 => "i16",
            ValueKind::U32 => "u32",
            ValueKind::I32 => "i32",
            ValueKind::U64 => "u64",
            ValueKind::I64 => "i64",
            ValueKind::Str => "str",
        }
    }
}

/// A stored entry value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    Str(String),
}

impl Value {
    /// Kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::U8(_) => ValueKind::U8,
            Value::I8(_) => ValueKind::I8,
            Value::U16(_) => ValueKind::U16,
            Value::I16(_) => ValueKind::I16,
            Value::U32(_) => ValueKind::U32,
            Value::I32(_) => ValueKind::I32,
            Value::U64(_) => ValueKind::U64,
            Value::I64(_) => ValueKind::I64,
            Value::Str(_) => ValueKind::Str,
        }
    }

    /// Number of bytes [`Value::encode`] appends
    pub fn encoded_len(&self) -> usize {
        match self {
            Value::Str(s) => 2 + s.len(),
            other => other.kind().width().unwrap_or(0),
        }
    }

    /// Append the little-endian payload (strings: u16 length + bytes)
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Value::U8(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::I8(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::I16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::I64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::Str(s) => {
                out.extend_from_slice(&(s.len() as u16).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
        }
    }

    /// Decode a payload of `kind` starting at `*offset`
    ///
    /// Advances `offset` past the payload. Returns `None` on truncated input
    /// or invalid UTF-8.
    pub fn decode(kind: ValueKind, buf: &[u8], offset: &mut usize) -> Option<Self> {
        let len = match kind.width() {
            Some(width) => width,
            None => {
                let raw = buf.get(*offset..*offset + 2)?;
                *offset += 2;
                u16::from_le_bytes([raw[0], raw[1]]) as usize
            }
        };
        let bytes = buf.get(*offset..*offset + len)?;
        *offset += len;

        let value = match kind {
            ValueKind::U8 => Value::U8(bytes[0]),
            ValueKind::I8 => Value::I8(bytes[0] as i8),
            ValueKind::U16 => Value::U16(u16::from_le_bytes(bytes.try_into().ok()?)),
            ValueKind::I16 => Value::I16(i16::from_le_bytes(bytes.try_into().ok()?)),
            ValueKind::U32 => Value::U32(u32::from_le_bytes(bytes.try_into().ok()?)),
            ValueKind::I32 => Value::I32(i32::from_le_bytes(bytes.try_into().ok()?)),
            ValueKind::U64 => Value::U64(u64::from_le_bytes(bytes.try_into().ok()?)),
            ValueKind::I64 => Value::I64(i64::from_le_bytes(bytes.try_into().ok()?)),
            ValueKind::Str => Value::Str(String::from(core::str::from_utf8(bytes).ok()?)),
        };
        Some(value)
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Fixed-width integer kinds a backend stores natively
///
/// Sealed: the set of backend scalar kinds is part of the storage contract.
pub trait Scalar: sealed::Sealed + Copy {
    /// Stored kind
    const KIND: ValueKind;

    /// Wrap into a [`Value`]
    fn into_value(self) -> Value;

    /// Unwrap from a [`Value`] of the same kind
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_scalar {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl Scalar for $t {
                const KIND: ValueKind = ValueKind::$variant;

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_scalar!(
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
);
