//! Operand value resolution against the symbol table

use crate::error::ErrorKind;
use crate::opcodes;
use crate::parser::number::NumberParser;
use crate::parser::operand::{register_index, strip_brackets};
use crate::symbol::SymbolTable;

pub struct ValueResolver<'a> {
    symbols: &'a SymbolTable,
}

impl<'a> ValueResolver<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self { symbols }
    }

    /// Resolve one operand token to a signed 32-bit value.
    ///
    /// Precedence: flag name, one level of `[ ]` removed, hex / quoted /
    /// decimal literal, register number, label.
    pub fn resolve(&self, token: &str) -> Result<i32, ErrorKind> {
        let token = token.trim();
        if let Some(mask) = opcodes::flag(token) {
            return Ok(mask as i32);
        }

        let token = strip_brackets(token).unwrap_or(token);

        if let Some(value) = NumberParser::parse(token)? {
            return Ok(value);
        }

        if let Some(index) = register_index(token) {
            return i32::try_from(index)
                .map_err(|_| ErrorKind::Range(format!("register {} out of range", token)));
        }

        match self.symbols.get(token) {
            // Offsets are bounded by the code size, far below i32::MAX.
            Some(offset) => Ok(offset as i32),
            None => Err(ErrorKind::UnresolvedSymbol(token.to_string())),
        }
    }
}
