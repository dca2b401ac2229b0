//! Classification of description tokens
//!
//! Descriptions are made of bare tokens: identifiers that name constants,
//! numeric literals, integer type names such as `int32be`, and `lo:hi` ranges.

use crate::error::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Integer kinds a resource may bottom out at
pub const PRIMITIVE_KINDS: [&str; 5] = ["int8", "int16", "int32", "int64", "intptr"];

/// True if the token is shaped like a symbolic constant name
pub fn is_identifier(token: &str) -> bool {
    IDENTIFIER.is_match(token)
}

/// Parse a numeric literal
///
/// Accepts decimal, `0x` hex, `0o` or leading-zero octal and `0b` binary,
/// with an optional leading minus (stored two's complement).
pub fn parse_literal(token: &str) -> Option<u64> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let value = parse_unsigned(digits)?;
    Some(if negative { value.wrapping_neg() } else { value })
}

fn parse_unsigned(digits: &str) -> Option<u64> {
    let lower = digits.to_ascii_lowercase();
    let (radix, body) = if let Some(hex) = lower.strip_prefix("0x") {
        (16, hex)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        (8, oct)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (2, bin)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..])
    } else {
        (10, lower.as_str())
    };
    if body.is_empty() {
        return None;
    }
    u64::from_str_radix(body, radix).ok()
}

/// Size and byte order of an integer type token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntType {
    /// Width in bytes
    pub size: u64,
    /// Big-endian encoding
    pub big_endian: bool,
}

impl IntType {
    /// Native pointer-width integer
    pub fn pointer(ptr_size: u64) -> Self {
        Self {
            size: ptr_size,
            big_endian: false,
        }
    }

    /// Decode `int8`..`int64`, `intptr` and their `be` variants
    pub fn decode(token: &str, ptr_size: u64) -> Result<Self> {
        let (base, big_endian) = match token.strip_suffix("be") {
            Some(base) => (base, true),
            None => (token, false),
        };
        let size = match base {
            "int8" => 1,
            "int16" => 2,
            "int32" => 4,
            "int64" => 8,
            "intptr" => ptr_size,
            _ => return Err(Error::UnknownIntType(token.to_string())),
        };
        Ok(Self { size, big_endian })
    }

    /// Largest value plus one, as a wide integer
    pub fn value_space(&self) -> u128 {
        u32::try_from(self.size * 8)
            .ok()
            .and_then(|bits| 1u128.checked_shl(bits))
            .unwrap_or(u128::MAX)
    }
}

/// Byte-granularity multiplier encoded in a `bytesize*` construct name
pub fn byte_size_multiplier(construct: &str) -> Option<u8> {
    match construct {
        "bytesize" => Some(1),
        "bytesize2" => Some(2),
        "bytesize4" => Some(4),
        "bytesize8" => Some(8),
        _ => None,
    }
}

/// Split a `lo:hi` or single-value range token
pub fn split_range(token: &str) -> Result<(&str, &str)> {
    let mut parts = token.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(single), None, None) => Ok((single, single)),
        (Some(lo), Some(hi), None) => Ok((lo, hi)),
        _ => Err(Error::BadRange(token.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_shapes() {
        assert!(is_identifier("O_RDONLY"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("0x10"));
        assert!(!is_identifier("-1"));
        assert!(!is_identifier("a-b"));
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse_literal("42"), Some(42));
        assert_eq!(parse_literal("0x10"), Some(16));
        assert_eq!(parse_literal("0X1f"), Some(31));
        assert_eq!(parse_literal("010"), Some(8));
        assert_eq!(parse_literal("0b101"), Some(5));
        assert_eq!(parse_literal("0"), Some(0));
        assert_eq!(parse_literal("-1"), Some(u64::MAX));
        assert_eq!(parse_literal("O_RDONLY"), None);
        assert_eq!(parse_literal("0x"), None);
    }

    #[test]
    fn test_decode_int_types() {
        assert_eq!(
            IntType::decode("int32", 8).unwrap(),
            IntType {
                size: 4,
                big_endian: false
            }
        );
        assert_eq!(
            IntType::decode("int16be", 8).unwrap(),
            IntType {
                size: 2,
                big_endian: true
            }
        );
        assert_eq!(IntType::decode("intptr", 4).unwrap().size, 4);
        assert_eq!(
            IntType::decode("int24", 8),
            Err(Error::UnknownIntType("int24".to_string()))
        );
    }

    #[test]
    fn test_ranges() {
        assert_eq!(split_range("5").unwrap(), ("5", "5"));
        assert_eq!(split_range("1:PAGE_SIZE").unwrap(), ("1", "PAGE_SIZE"));
        assert!(split_range("1:2:3").is_err());
        assert_eq!(byte_size_multiplier("bytesize4"), Some(4));
        assert_eq!(byte_size_multiplier("len"), None);
    }
}
