//! Main assembler implementation

use std::collections::HashMap;
use std::io::Write;

#[cfg(feature = "listing")]
use std::fs::File;
#[cfg(feature = "listing")]
use std::io::{self, BufWriter};
#[cfg(feature = "listing")]
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, trace};

use crate::addressing::{REGISTER_INDIRECT_MARKER, instruction_size, operand_encoded_width};
use crate::error::{AsmError, ErrorKind};
use crate::eval::ValueResolver;
use crate::macros;
use crate::opcodes::{self, InstructionDef, OperandKind};
use crate::output;
use crate::parser::escape::unescape;
use crate::parser::lexer::string_body;
use crate::parser::operand::{NUM_REGISTERS, register_index, register_indirect, strip_brackets};
use crate::parser::{DirectiveKind, Item, Line};
use crate::symbol::SymbolTable;

/// Address operands must fit the machine's 64 KiB address space.
const ADDRESS_LIMIT: i32 = 0x1_0000;

pub struct Assembler {
    symbols: SymbolTable,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
        }
    }

    // ===== Public API =====

    /// Assemble `src` and return the code bytes (without the length header).
    pub fn assemble_bytes(&mut self, src: &str) -> Result<Vec<u8>, AsmError> {
        let (bytes, _lines) = self.assemble(src)?;
        Ok(bytes)
    }

    pub fn assemble_into(&mut self, src: &str, out: &mut Vec<u8>) -> Result<(), AsmError> {
        out.clear();
        let (bytes, _lines) = self.assemble(src)?;
        out.extend_from_slice(&bytes);
        Ok(())
    }

    /// Code bytes together with the canonical lines they were encoded from.
    pub fn assemble_full(&mut self, src: &str) -> Result<(Vec<u8>, Vec<Line>), AsmError> {
        self.assemble(src)
    }

    pub fn assemble_with_symbols(
        &mut self,
        src: &str,
    ) -> Result<(Vec<u8>, HashMap<String, u32>), AsmError> {
        let (bytes, _lines) = self.assemble(src)?;
        Ok((bytes, self.symbols.clone_labels()))
    }

    /// Run only the preprocessing and macro expansion stage.
    pub fn expand_source(&self, src: &str) -> Result<Vec<Line>, AsmError> {
        macros::expand_source(src)
    }

    /// Labels bound by the last assembly.
    pub fn symbols(&self) -> &HashMap<String, u32> {
        self.symbols.labels()
    }

    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.symbols.get(name)
    }

    /// Write the output artifact: `u32` little-endian length, then the code.
    pub fn write_bin<W: Write>(bytes: &[u8], w: W) -> std::io::Result<()> {
        output::write_bin(bytes, w)
    }

    pub fn reset(&mut self) {
        self.symbols.clear();
    }

    // ===== Assembly core =====

    fn assemble(&mut self, src: &str) -> Result<(Vec<u8>, Vec<Line>), AsmError> {
        let lines = macros::expand_source(src)?;

        debug!("starting pass 1");
        let size = self.layout(&lines)?;
        debug!(bytes = size, labels = self.symbols.len(), "layout finished");

        debug!("starting pass 2");
        let code = self.generate(&lines)?;
        debug_assert_eq!(code.len(), size, "layout and emission disagree");

        Ok((code, lines))
    }

    /// Pass 1: bind every label to its offset and return the total code size.
    fn layout(&mut self, lines: &[Line]) -> Result<usize, AsmError> {
        self.symbols.clear();
        let mut offset = 0usize;

        for line in lines {
            let at_line = |kind: ErrorKind| AsmError::at(line.number, kind);
            if let Some(label) = &line.label {
                let bound = u32::try_from(offset)
                    .map_err(|_| at_line(ErrorKind::Range("program larger than 4 GiB".to_string())))?;
                self.symbols.define(label, bound).map_err(at_line)?;
                trace!(label = label.as_str(), offset, "bound label");
            }
            if let Some(item) = &line.item {
                offset += self.item_size(item).map_err(at_line)?;
            }
        }

        Ok(offset)
    }

    /// Pass 2: encode every line with the complete symbol table.
    fn generate(&self, lines: &[Line]) -> Result<Vec<u8>, AsmError> {
        let mut code = Vec::new();
        for line in lines {
            if let Some(item) = &line.item {
                self.emit_item(item, &mut code)
                    .map_err(|kind| AsmError::at(line.number, kind))?;
            }
        }
        Ok(code)
    }

    // ===== Sizing =====

    /// Encoded size of one canonical item, computed without emitting.
    fn item_size(&self, item: &Item) -> Result<usize, ErrorKind> {
        match item {
            Item::Instruction { mnemonic, operands } => {
                let def = lookup_instruction(mnemonic, operands)?;
                Ok(instruction_size(def, operands))
            }
            Item::Directive { kind, arg } => match kind {
                DirectiveKind::Asciiz => Ok(asciiz_bytes(arg)?.len() + 1),
                DirectiveKind::Space => self.space_count(arg),
                DirectiveKind::Byte => Ok(1),
                DirectiveKind::Word => Ok(4),
            },
        }
    }

    fn space_count(&self, arg: &str) -> Result<usize, ErrorKind> {
        let count = ValueResolver::new(&self.symbols).resolve(arg)?;
        usize::try_from(count)
            .map_err(|_| ErrorKind::Range(format!(".SPACE count {} is negative", count)))
    }

    // ===== Emission =====

    fn emit_item(&self, item: &Item, out: &mut Vec<u8>) -> Result<(), ErrorKind> {
        let resolver = ValueResolver::new(&self.symbols);
        match item {
            Item::Instruction { mnemonic, operands } => {
                let def = lookup_instruction(mnemonic, operands)?;
                out.push(def.opcode);
                for (&kind, token) in def.operands.iter().zip(operands) {
                    let start = out.len();
                    self.emit_operand(kind, token, &resolver, out)?;
                    debug_assert_eq!(out.len() - start, operand_encoded_width(kind, token));
                }
            }
            Item::Directive { kind, arg } => match kind {
                DirectiveKind::Asciiz => {
                    out.extend_from_slice(&asciiz_bytes(arg)?);
                    out.push(0);
                }
                DirectiveKind::Space => {
                    let count = self.space_count(arg)?;
                    out.resize(out.len() + count, 0);
                }
                DirectiveKind::Byte => {
                    let value = resolver.resolve(arg)?;
                    if !(-128..=255).contains(&value) {
                        return Err(ErrorKind::Range(format!(".BYTE value {} does not fit in a byte", value)));
                    }
                    out.push(value as u8);
                }
                DirectiveKind::Word => push_word(out, resolver.resolve(arg)?),
            },
        }
        Ok(())
    }

    fn emit_operand(
        &self,
        kind: OperandKind,
        token: &str,
        resolver: &ValueResolver<'_>,
        out: &mut Vec<u8>,
    ) -> Result<(), ErrorKind> {
        match kind {
            OperandKind::Register => {
                let inner = strip_brackets(token).unwrap_or(token);
                let index = register_index(inner).ok_or_else(|| {
                    ErrorKind::Lexical(format!("expected a register, found '{}'", token))
                })?;
                out.push(check_register(index, token)?);
            }
            OperandKind::Flags => {
                let value = resolver.resolve(token)?;
                if !(0..=0x0F).contains(&value) {
                    return Err(ErrorKind::Range(format!(
                        "flags {} (0x{:X}) do not fit in mask 0x0F",
                        token, value
                    )));
                }
                out.push(value as u8);
            }
            OperandKind::Address | OperandKind::Immediate => {
                if let Some(index) = register_indirect(token) {
                    out.push(REGISTER_INDIRECT_MARKER);
                    out.push(check_register(index, token)?);
                    return Ok(());
                }
                let value = resolver.resolve(token)?;
                if kind == OperandKind::Address && !(0..ADDRESS_LIMIT).contains(&value) {
                    return Err(ErrorKind::Range(format!(
                        "address {} is outside 0..{}",
                        value, ADDRESS_LIMIT
                    )));
                }
                push_word(out, value);
            }
        }
        Ok(())
    }

    // ===== Listing (feature-gated) =====

    #[cfg(feature = "listing")]
    pub fn write_listing<W: Write>(&self, lines: &[Line], mut w: W) -> Result<(), AsmError> {
        writeln!(w, "Offset  Line  Machine Code                Assembly")?;
        writeln!(w, "{}", "-".repeat(64))?;
        let mut offset = 0usize;
        for line in lines {
            let mut bytes = Vec::new();
            if let Some(item) = &line.item {
                self.emit_item(item, &mut bytes)
                    .map_err(|kind| AsmError::at(line.number, kind))?;
            }
            let mut hex = bytes
                .iter()
                .take(8)
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ");
            if bytes.len() > 8 {
                hex.push_str(" ...");
            }
            writeln!(w, "{:06X}  {:>4}  {:<26}  {}", offset, line.number, hex, line)?;
            offset += bytes.len();
        }
        w.flush()?;
        Ok(())
    }

    #[cfg(feature = "listing")]
    pub fn print_listing(&self, lines: &[Line]) -> Result<(), AsmError> {
        self.write_listing(lines, io::stdout().lock())
    }

    #[cfg(feature = "listing")]
    pub fn save_listing<P: AsRef<Path>>(&self, lines: &[Line], filename: P) -> Result<(), AsmError> {
        let file = File::create(filename)?;
        self.write_listing(lines, BufWriter::new(file))
    }
}

// ===== Helpers =====

/// Table entry for `mnemonic`, with the operand count already checked.
fn lookup_instruction(
    mnemonic: &str,
    operands: &[String],
) -> Result<&'static InstructionDef, ErrorKind> {
    let def = opcodes::instruction(mnemonic)
        .ok_or_else(|| ErrorKind::UnknownInstruction(mnemonic.to_string()))?;
    if operands.len() != def.operands.len() {
        return Err(ErrorKind::Arity(format!(
            "{} takes {} operand(s), found {}",
            mnemonic,
            def.operands.len(),
            operands.len()
        )));
    }
    Ok(def)
}

fn check_register(index: u32, token: &str) -> Result<u8, ErrorKind> {
    if index < NUM_REGISTERS {
        Ok(index as u8)
    } else {
        Err(ErrorKind::Range(format!(
            "register {} outside R0..R{}",
            token,
            NUM_REGISTERS - 1
        )))
    }
}

fn asciiz_bytes(arg: &str) -> Result<Vec<u8>, ErrorKind> {
    unescape(string_body(arg)?)
}

fn push_word(out: &mut Vec<u8>, value: i32) {
    let mut word = [0u8; 4];
    LittleEndian::write_i32(&mut word, value);
    out.extend_from_slice(&word);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(src: &str) -> Result<Vec<u8>, AsmError> {
        Assembler::new().assemble_bytes(src)
    }

    fn error_kind(src: &str) -> ErrorKind {
        assemble(src).unwrap_err().kind().cloned().unwrap()
    }

    #[test]
    fn test_control_flow_encoding() {
        assert_eq!(assemble("RET").unwrap(), vec![0x04]);
        assert_eq!(assemble("CALL 0x1234").unwrap(), vec![0x03, 0x34, 0x12, 0x00, 0x00]);
        assert_eq!(
            assemble("IF EQ, 10").unwrap(),
            vec![0x05, 0x01, 0x0A, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_register_indirect_operand() {
        assert_eq!(assemble("JUMP [R3]").unwrap(), vec![0x02, 0xFF, 0x03]);
        assert_eq!(assemble("LOAD R1, [R2]").unwrap(), vec![0x10, 0x01, 0xFF, 0x02]);
    }

    #[test]
    fn test_absolute_indirect_matches_direct() {
        assert_eq!(assemble("LOAD R1, [0x20]").unwrap(), assemble("LOAD R1, 0x20").unwrap());
    }

    #[test]
    fn test_immediate_is_signed() {
        assert_eq!(
            assemble("LOADI R1, -1").unwrap(),
            vec![0x15, 0x01, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            assemble("LOADI R2, 'A'").unwrap(),
            vec![0x15, 0x02, 0x41, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_seek_mixed_operands() {
        assert_eq!(
            assemble("SEEK R1, 16, [R4], R2").unwrap(),
            vec![0x74, 0x01, 0x10, 0x00, 0x00, 0x00, 0xFF, 0x04, 0x02]
        );
    }

    #[test]
    fn test_directives() {
        assert_eq!(assemble(".BYTE 0x7F").unwrap(), vec![0x7F]);
        assert_eq!(assemble(".BYTE -1").unwrap(), vec![0xFF]);
        assert_eq!(assemble(".WORD 0x01020304").unwrap(), vec![0x04, 0x03, 0x02, 0x01]);
        assert_eq!(assemble(".SPACE 3").unwrap(), vec![0, 0, 0]);
        assert_eq!(assemble(".ASCIIZ 'ok'").unwrap(), vec![b'o', b'k', 0]);
    }

    #[test]
    fn test_space_uses_known_label() {
        let bytes = assemble("start: .WORD 7\n.SPACE start\nHALT").unwrap();
        assert_eq!(bytes, vec![7, 0, 0, 0, 0x01]);
    }

    #[test]
    fn test_space_forward_reference_fails() {
        assert_eq!(
            error_kind(".SPACE later\nlater: NOP"),
            ErrorKind::UnresolvedSymbol("later".to_string())
        );
    }

    #[test]
    fn test_data_labels_resolve() {
        let src = "PRINTS msg\nHALT\nmsg: .ASCIIZ \"hey\"";
        let mut asm = Assembler::new();
        let bytes = asm.assemble_bytes(src).unwrap();
        assert_eq!(asm.lookup("msg"), Some(6));
        assert_eq!(&bytes[..6], &[0x52, 0x06, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(&bytes[6..], b"hey\0");
    }

    #[test]
    fn test_range_errors() {
        assert!(matches!(error_kind("PUSH R32"), ErrorKind::Range(_)));
        assert!(matches!(error_kind("JUMP [R40]"), ErrorKind::Range(_)));
        assert!(matches!(error_kind("JUMP 65536"), ErrorKind::Range(_)));
        assert!(matches!(error_kind("JUMP -1"), ErrorKind::Range(_)));
        assert!(matches!(error_kind("IF 16, 0"), ErrorKind::Range(_)));
        assert!(matches!(error_kind(".BYTE 256"), ErrorKind::Range(_)));
        assert!(matches!(error_kind(".SPACE -4"), ErrorKind::Range(_)));
        assert_eq!(assemble("JUMP 65535").unwrap(), vec![0x02, 0xFF, 0xFF, 0x00, 0x00]);
    }

    #[test]
    fn test_register_operand_format() {
        assert!(matches!(error_kind("PUSH 5"), ErrorKind::Lexical(_)));
        assert_eq!(assemble("PUSH [R5]").unwrap(), vec![0x13, 0x05]);
    }

    #[test]
    fn test_unknown_and_arity() {
        assert_eq!(error_kind("FLY R1"), ErrorKind::UnknownInstruction("FLY".to_string()));
        assert!(matches!(error_kind("PUSH R1, R2"), ErrorKind::Arity(_)));
        assert!(matches!(error_kind("NOP R1"), ErrorKind::Arity(_)));
    }

    #[test]
    fn test_unresolved_label_line_number() {
        let err = assemble("NOP\nJUMP nowhere").unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.kind(), Some(&ErrorKind::UnresolvedSymbol("nowhere".to_string())));
    }

    #[test]
    fn test_symbols_exposed() {
        let mut asm = Assembler::new();
        let (_, symbols) = asm.assemble_with_symbols("a: NOP\nb: HALT\nc:").unwrap();
        assert_eq!(symbols.get("a"), Some(&0));
        assert_eq!(symbols.get("b"), Some(&1));
        assert_eq!(symbols.get("c"), Some(&2));
        asm.reset();
        assert!(asm.symbols().is_empty());
    }

    #[test]
    fn test_assemble_into_replaces_buffer() {
        let mut out = vec![0xAA; 10];
        Assembler::new().assemble_into("HALT", &mut out).unwrap();
        assert_eq!(out, vec![0x01]);
    }

    #[cfg(feature = "listing")]
    #[test]
    fn test_listing_shows_offsets() {
        let mut asm = Assembler::new();
        let (_, lines) = asm.assemble_full("start: ADD R1, R2, 5\nHALT").unwrap();
        let mut text = Vec::new();
        asm.write_listing(&lines, &mut text).unwrap();
        let text = String::from_utf8(text).unwrap();
        assert!(text.contains("000000     1  15 1E 05 00 00 00"));
        assert!(text.contains("start: LOADI R30, 5"));
        assert!(text.contains("000006     1  20 01 02 1E"));
        assert!(text.contains("00000A     2  01"));
    }
}
