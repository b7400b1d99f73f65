//! Backslash escapes inside character and string literals

use crate::error::ErrorKind;

/// Decode the body of a quoted literal (quotes already removed) into bytes.
///
/// Supported: `\a \b \f \n \r \t \v \\ \' \" \0`, octal `\NNN` (up to three
/// digits), `\xHH` and `\uHHHH`. Anything else is a lexical error.
pub fn unescape(s: &str) -> Result<Vec<u8>, ErrorKind> {
    let mut out = Vec::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        let esc = chars
            .next()
            .ok_or_else(|| ErrorKind::Lexical(format!("trailing backslash in \"{}\"", s)))?;
        match esc {
            'a' => out.push(0x07),
            'b' => out.push(0x08),
            'f' => out.push(0x0C),
            'n' => out.push(b'\n'),
            'r' => out.push(b'\r'),
            't' => out.push(b'\t'),
            'v' => out.push(0x0B),
            '\\' => out.push(b'\\'),
            '\'' => out.push(b'\''),
            '"' => out.push(b'"'),
            '0'..='7' => {
                let mut value = esc.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                let byte = u8::try_from(value).map_err(|_| {
                    ErrorKind::Lexical(format!("octal escape \\{:o} does not fit in a byte", value))
                })?;
                out.push(byte);
            }
            'x' => {
                let value = take_hex(&mut chars, 2, s)?;
                // Two hex digits always fit.
                out.push(value as u8);
            }
            'u' => {
                let value = take_hex(&mut chars, 4, s)?;
                let ch = char::from_u32(value).ok_or_else(|| {
                    ErrorKind::Lexical(format!("\\u{:04X} is not a valid character", value))
                })?;
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            other => {
                return Err(ErrorKind::Lexical(format!(
                    "unknown escape sequence \\{} in \"{}\"",
                    other, s
                )));
            }
        }
    }

    Ok(out)
}

fn take_hex(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    digits: usize,
    source: &str,
) -> Result<u32, ErrorKind> {
    let mut value = 0u32;
    for _ in 0..digits {
        let d = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| {
                ErrorKind::Lexical(format!(
                    "escape needs {} hex digits in \"{}\"",
                    digits, source
                ))
            })?;
        value = value * 16 + d;
    }
    Ok(value)
}
