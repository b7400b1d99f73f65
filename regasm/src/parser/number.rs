//! Numeric and character literal parsing

use super::escape::unescape;
use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormat {
    Hexadecimal, // 0xFF
    Character,   // 'a' or "abc"
    Decimal,     // 255, -3
}

pub struct NumberParser;

impl NumberParser {
    /// Parse a literal token.
    ///
    /// Returns `Ok(None)` when the token is not a literal at all (a label,
    /// register or flag name), so the caller can try its other rules.
    pub fn parse(s: &str) -> Result<Option<i32>, ErrorKind> {
        let trimmed = s.trim();
        match Self::detect_format(trimmed) {
            Some(NumberFormat::Hexadecimal) => Self::parse_hex(&trimmed[2..]).map(Some),
            Some(NumberFormat::Character) => Self::parse_char(trimmed).map(Some),
            Some(NumberFormat::Decimal) => Self::parse_decimal(trimmed).map(Some),
            None => Ok(None),
        }
    }

    /// Hexadecimal without prefix. Values up to 0xFFFFFFFF wrap into `i32`.
    fn parse_hex(s: &str) -> Result<i32, ErrorKind> {
        u32::from_str_radix(s, 16)
            .map(|v| v as i32)
            .map_err(|_| ErrorKind::Lexical(format!("invalid hexadecimal: 0x{}", s)))
    }

    /// Value of the first byte of a quoted literal, escapes applied.
    fn parse_char(s: &str) -> Result<i32, ErrorKind> {
        let body = &s[1..s.len() - 1];
        let bytes = unescape(body)?;
        bytes
            .first()
            .map(|&b| b as i32)
            .ok_or_else(|| ErrorKind::Lexical(format!("empty literal {}", s)))
    }

    fn parse_decimal(s: &str) -> Result<i32, ErrorKind> {
        s.parse::<i32>()
            .map_err(|_| ErrorKind::Range(format!("{} does not fit in 32 bits", s)))
    }

    pub fn detect_format(s: &str) -> Option<NumberFormat> {
        if s.starts_with("0x") || s.starts_with("0X") {
            return Some(NumberFormat::Hexadecimal);
        }
        if is_quoted(s) {
            return Some(NumberFormat::Character);
        }
        let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return Some(NumberFormat::Decimal);
        }
        None
    }
}

/// `'...'` or `"..."` with matching delimiters.
pub fn is_quoted(s: &str) -> bool {
    s.len() >= 2
        && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
}
