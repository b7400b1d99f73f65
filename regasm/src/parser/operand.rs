//! Operand grammar: register tokens, bracketed address forms, modulo syntax

use crate::error::ErrorKind;

/// Number of addressable registers (R0..=R31).
pub const NUM_REGISTERS: u32 = 32;

/// Index of a register token `R<digits>`, or `None` when the token has a
/// different shape. The index is not range-checked here.
pub fn register_index(token: &str) -> Option<u32> {
    let digits = token.strip_prefix('R')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Overlong digit strings saturate so they still fail the range check.
    Some(digits.parse::<u32>().unwrap_or(u32::MAX))
}

pub fn is_register(token: &str) -> bool {
    register_index(token).is_some()
}

/// Inner text of `[ ... ]`, trimmed. Only one bracket level is removed.
pub fn strip_brackets(token: &str) -> Option<&str> {
    token
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .map(str::trim)
}

/// Register index of a register-indirect operand `[Rn]`.
pub fn register_indirect(token: &str) -> Option<u32> {
    strip_brackets(token).and_then(register_index)
}

/// The forms an address or immediate operand can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressForm<'a> {
    /// A bare value: `100`, `label`, `0x20`.
    Direct(&'a str),
    /// `[imm]`: encoded exactly like a bare value.
    Absolute(&'a str),
    /// `[Rn]`
    RegisterIndirect(u32),
    /// `[imm + Rn]`, folded into `[Rs]` by the macro expander.
    Indexed { base: &'a str, register: u32 },
}

impl<'a> AddressForm<'a> {
    pub fn parse(token: &'a str) -> Result<Self, ErrorKind> {
        let token = token.trim();
        if !token.starts_with('[') && !token.ends_with(']') {
            return Ok(AddressForm::Direct(token));
        }

        let malformed = || ErrorKind::Lexical(format!("malformed address expression {}", token));
        let inner = strip_brackets(token).ok_or_else(malformed)?;
        if inner.is_empty() || inner.contains(['[', ']']) {
            return Err(malformed());
        }

        if let Some(register) = register_index(inner) {
            return Ok(AddressForm::RegisterIndirect(register));
        }

        if let Some((base, reg)) = inner.split_once('+') {
            let (base, reg) = (base.trim(), reg.trim());
            return match register_index(reg) {
                Some(register) if is_plain_value(base) => {
                    Ok(AddressForm::Indexed { base, register })
                }
                _ => Err(malformed()),
            };
        }

        if is_plain_value(inner) {
            Ok(AddressForm::Absolute(inner))
        } else {
            Err(malformed())
        }
    }
}

/// A single value token that is neither a register nor an expression.
fn is_plain_value(s: &str) -> bool {
    !s.is_empty() && !is_register(s) && !s.contains(|c: char| c.is_whitespace() || c == '+')
}

/// Operands of the `MOV dest, X MOD Y` pseudo-instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modulo<'a> {
    pub dest: &'a str,
    pub dividend: &'a str,
    pub divisor: &'a str,
}

/// True when the operand text uses the `MOD` keyword as a separate word.
pub fn mentions_mod(args: &str) -> bool {
    args.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|word| word == "MOD")
}

/// Parse `Rd, X MOD Y` where X and Y are registers or decimal literals.
pub fn parse_modulo(args: &str) -> Option<Modulo<'_>> {
    let (dest, expr) = args.split_once(',')?;
    let dest = dest.trim();
    if !is_register(dest) {
        return None;
    }
    let mut words = expr.split_whitespace();
    let dividend = words.next()?;
    if words.next()? != "MOD" {
        return None;
    }
    let divisor = words.next()?;
    if words.next().is_some() {
        return None;
    }
    let operand_ok = |s: &str| is_register(s) || (!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()));
    if !operand_ok(dividend) || !operand_ok(divisor) {
        return None;
    }
    Some(Modulo { dest, dividend, divisor })
}
