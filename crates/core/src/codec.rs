//! Text codec for preference values
//!
//! Converts between the textual form used by the generic string get/set path
//! and each supported value type. Parsing never fails: malformed input maps
//! to a well-defined value (usually zero or `false`).
//!
//! # Parse rules
//!
//! | Type | Rule |
//! |------|------|
//! | `String` | verbatim |
//! | `bool` | `"true"`, `"1"`, `"True"` are true, anything else false |
//! | `u8`, `u16` | base-prefix unsigned parse, truncated to width |
//! | `i64` | base-prefix signed parse, clamped on overflow |
//! | other integers | decimal stream parse, clamped on overflow, 0 if no digits |

use alloc::string::{String, ToString};

/// Parse a value from its textual form
pub trait FromText: Sized {
    /// Parse `text`; never fails
    fn from_text(text: &str) -> Self;
}

/// Render a value to its textual form
pub trait ToText {
    /// Canonical text for this value
    fn to_text(&self) -> String;
}

/// Parse `text` into `T`
///
/// # Example
///
/// ```
/// use flash_prefs_core::codec::parse;
///
/// assert!(parse::<bool>("True"));
/// assert_eq!(parse::<u16>("0x1F"), 31);
/// assert_eq!(parse::<i32>("  -42abc"), -42);
/// ```
pub fn parse<T: FromText>(text: &str) -> T {
    T::from_text(text)
}

impl FromText for String {
    fn from_text(text: &str) -> Self {
        String::from(text)
    }
}

impl ToText for String {
    fn to_text(&self) -> String {
        self.clone()
    }
}

impl FromText for bool {
    fn from_text(text: &str) -> Self {
        matches!(text, "true" | "1" | "True")
    }
}

impl ToText for bool {
    fn to_text(&self) -> String {
        let text = if *self { "true" } else { "false" };
        text.to_string()
    }
}

/// C whitespace set (space, \t, \n, \v, \f, \r)
fn is_c_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0B | 0x0C | b'\r')
}

/// Split leading whitespace and an optional sign
///
/// Returns `(negative, rest)`.
fn split_sign(text: &str) -> (bool, &[u8]) {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| !is_c_space(b)).unwrap_or(bytes.len());
    let bytes = &bytes[start..];
    match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    }
}

/// Detect the radix from a `0x`/`0` prefix
///
/// Returns `(radix, digits)`. A bare `0x` without a following hex digit is
/// treated as the decimal/octal digit `0` followed by garbage.
fn detect_radix(bytes: &[u8]) -> (u32, &[u8]) {
    match bytes {
        [b'0', b'x' | b'X', next, ..] if (*next as char).is_ascii_hexdigit() => (16, &bytes[2..]),
        [b'0', ..] => (8, bytes),
        _ => (10, bytes),
    }
}

/// Accumulate digits of `radix` until the first invalid one
///
/// Returns `(magnitude, overflowed, any_digit)`.
fn accumulate(bytes: &[u8], radix: u32) -> (u64, bool, bool) {
    let mut value: u64 = 0;
    let mut overflow = false;
    let mut any = false;

    for &b in bytes {
        let Some(digit) = (b as char).to_digit(radix) else {
            break;
        };
        any = true;
        match value
            .checked_mul(radix as u64)
            .and_then(|v| v.checked_add(digit as u64))
        {
            Some(v) => value = v,
            None => overflow = true,
        }
    }

    (value, overflow, any)
}

/// Base-prefix aware unsigned parse (`strtoul` with base 0)
///
/// Overflow saturates at `u64::MAX`; a leading `-` negates with wrap-around.
pub fn parse_unsigned_prefixed(text: &str) -> u64 {
    let (negative, rest) = split_sign(text);
    let (radix, digits) = detect_radix(rest);
    let (magnitude, overflow, _) = accumulate(digits, radix);

    if overflow {
        u64::MAX
    } else if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    }
}

/// Base-prefix aware signed parse (`strtoll` with base 0)
///
/// Overflow clamps to `i64::MIN` / `i64::MAX`.
pub fn parse_signed_prefixed(text: &str) -> i64 {
    let (negative, rest) = split_sign(text);
    let (radix, digits) = detect_radix(rest);
    let (magnitude, overflow, _) = accumulate(digits, radix);

    if negative {
        if overflow || magnitude > i64::MIN.unsigned_abs() {
            i64::MIN
        } else {
            (magnitude as i128).wrapping_neg() as i64
        }
    } else if overflow || magnitude > i64::MAX as u64 {
        i64::MAX
    } else {
        magnitude as i64
    }
}

/// Decimal stream-style parse into the `[min, max]` range
///
/// No digits yields 0, overflow clamps. When `min` is 0 (unsigned target) a
/// leading `-` wraps the magnitude modulo `max + 1`.
fn parse_stream_decimal(text: &str, min: i128, max: i128) -> i128 {
    let (negative, rest) = split_sign(text);
    let (magnitude, overflow, any) = accumulate(rest, 10);

    if !any {
        return 0;
    }
    if overflow || magnitude as i128 > max - min {
        return if negative && min < 0 { min } else { max };
    }

    let magnitude = magnitude as i128;
    match (negative, min < 0) {
        (false, _) => magnitude.min(max),
        (true, true) => (-magnitude).max(min),
        (true, false) if magnitude > max => max,
        (true, false) => (max + 1 - magnitude) % (max + 1),
    }
}

macro_rules! impl_text_for_prefixed_unsigned {
    ($($t:ty),*) => {
        $(
            impl FromText for $t {
                fn from_text(text: &str) -> Self {
                    parse_unsigned_prefixed(text) as $t
                }
            }
        )*
    };
}

macro_rules! impl_text_for_stream {
    ($($t:ty),*) => {
        $(
            impl FromText for $t {
                fn from_text(text: &str) -> Self {
                    parse_stream_decimal(text, <$t>::MIN as i128, <$t>::MAX as i128) as $t
                }
            }
        )*
    };
}

macro_rules! impl_to_text_decimal {
    ($($t:ty),*) => {
        $(
            impl ToText for $t {
                fn to_text(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_text_for_prefixed_unsigned!(u8, u16);
impl_text_for_stream!(i8, i16, i32, u32, u64);
impl_to_text_decimal!(u8, i8, u16, i16, u32, i32, u64, i64);

impl FromText for i64 {
    fn from_text(text: &str) -> Self {
        parse_signed_prefixed(text)
    }
}
