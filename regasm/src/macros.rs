//! Pseudo-instruction expansion
//!
//! Every source line is rewritten on its own into zero or more canonical
//! lines. The rewrites:
//! - `MOV Rd, X MOD Y` becomes `DIV` / `MUL` / `SUB` through R30 and R31.
//! - Non-register operands of `ADD SUB MUL DIV AND OR XOR` (operands 2 and 3)
//!   and of `READ` / `WRITE` are staged with `LOADI` into R30, then R31. A
//!   literal used twice on the same line is loaded once.
//! - `SUB Rd, Rs` is `SUB Rd, Rd, Rs`.
//! - `STORE [addr], Rs` is `STORE Rs, [addr]`.
//! - An address or immediate operand `[imm + Rn]` is computed into a scratch
//!   register and replaced by `[Rs]`.
//!
//! R30 and R31 are not protected: a line that reads R30 or R31 itself while
//! also needing a scratch register sees the staged value instead.

use tracing::{debug, trace};

use crate::error::{AsmError, ErrorKind};
use crate::opcodes;
use crate::parser::lexer::parse_directive;
use crate::parser::operand::{
    AddressForm, is_register, mentions_mod, parse_modulo, strip_brackets,
};
use crate::parser::{Line, preprocess_line, split_mnemonic, split_operands};

pub const SCRATCH_REGISTERS: [&str; 2] = ["R30", "R31"];

/// Scratch register allocation for one source line.
struct ScratchPool {
    next: usize,
    staged: Vec<(String, &'static str)>,
}

impl ScratchPool {
    fn new() -> Self {
        Self {
            next: 0,
            staged: Vec::new(),
        }
    }

    fn claim(&mut self) -> Result<&'static str, ErrorKind> {
        let reg = SCRATCH_REGISTERS.get(self.next).copied().ok_or_else(|| {
            ErrorKind::MacroExpansion(format!(
                "more than {} values need scratch registers on one line",
                SCRATCH_REGISTERS.len()
            ))
        })?;
        self.next += 1;
        Ok(reg)
    }

    /// Register holding `literal`, and whether it still has to be loaded.
    fn stage(&mut self, literal: &str) -> Result<(&'static str, bool), ErrorKind> {
        if let Some(&(_, reg)) = self.staged.iter().find(|(lit, _)| lit == literal) {
            return Ok((reg, false));
        }
        let reg = self.claim()?;
        self.staged.push((literal.to_string(), reg));
        Ok((reg, true))
    }
}

/// Output of one source line. The source label goes on the first line pushed.
struct Expansion {
    number: usize,
    label: Option<String>,
    lines: Vec<Line>,
}

impl Expansion {
    fn push<S: ToString>(&mut self, mnemonic: &str, operands: &[S]) {
        let operands = operands.iter().map(ToString::to_string).collect();
        let line = Line::instruction(self.number, mnemonic, operands).with_label(self.label.take());
        self.lines.push(line);
    }

    fn hoist(&mut self, pool: &mut ScratchPool, operand: &mut String) -> Result<(), ErrorKind> {
        if is_register(operand) {
            return Ok(());
        }
        let (reg, fresh) = pool.stage(operand)?;
        if fresh {
            self.push("LOADI", &[reg, operand.as_str()]);
        }
        *operand = reg.to_string();
        Ok(())
    }

    fn fold_address(&mut self, pool: &mut ScratchPool, operand: &mut String) -> Result<(), ErrorKind> {
        let (base, register) = match AddressForm::parse(operand)? {
            AddressForm::Indexed { base, register } => (base.to_string(), register),
            _ => return Ok(()),
        };
        let scratch = pool.claim()?;
        self.push("LOADI", &[scratch, base.as_str()]);
        self.push("ADD", &[scratch.to_string(), scratch.to_string(), format!("R{}", register)]);
        *operand = format!("[{}]", scratch);
        Ok(())
    }

    fn modulo(&mut self, args: &str) -> Result<(), ErrorKind> {
        let m = parse_modulo(args).ok_or_else(|| {
            ErrorKind::MacroExpansion(format!("expected MOV Rd, X MOD Y, found '{}'", args))
        })?;
        let [quotient, product] = SCRATCH_REGISTERS;

        // A literal divisor lives in R31 until the multiply consumes it.
        let divisor = if is_register(m.divisor) {
            m.divisor
        } else {
            self.push("LOADI", &[product, m.divisor]);
            product
        };
        // A literal dividend is loaded into R30 twice: the quotient overwrites it.
        let dividend = if is_register(m.dividend) {
            m.dividend
        } else {
            self.push("LOADI", &[quotient, m.dividend]);
            quotient
        };

        self.push("DIV", &[quotient, dividend, divisor]);
        self.push("MUL", &[product, quotient, divisor]);
        if !is_register(m.dividend) {
            self.push("LOADI", &[quotient, m.dividend]);
        }
        self.push("SUB", &[m.dest, dividend, product]);
        Ok(())
    }
}

/// Expand one raw source line into canonical lines.
pub fn expand_line(raw: &str, number: usize) -> Result<Vec<Line>, ErrorKind> {
    let (label, text) = preprocess_line(raw);
    let label = (!label.is_empty()).then(|| label.to_string());

    if text.is_empty() {
        return Ok(label
            .map(|label| Line { number, label: Some(label), item: None })
            .into_iter()
            .collect());
    }

    if text.starts_with('.') {
        let item = parse_directive(text)?;
        return Ok(vec![Line { number, label, item: Some(item) }]);
    }

    let (mnemonic, args) = split_mnemonic(text);
    let mut out = Expansion { number, label, lines: Vec::new() };

    if mnemonic == "MOV" && mentions_mod(args) {
        out.modulo(args)?;
        return Ok(out.lines);
    }

    let mut operands = split_operands(args);
    if operands.iter().any(String::is_empty) {
        return Err(ErrorKind::Arity(format!("empty operand in '{}'", text)));
    }

    if mnemonic == "PRINTS" && args.starts_with('"') {
        return Err(ErrorKind::UnsupportedPattern(
            "PRINTS \"...\": place the text with .ASCIIZ and pass its label".to_string(),
        ));
    }
    if mnemonic == "CMP" && operands.len() == 2 && is_register(&operands[1]) {
        return Err(ErrorKind::UnsupportedPattern(
            "CMP reg, reg: only CMP reg, imm can be encoded".to_string(),
        ));
    }

    let mut pool = ScratchPool::new();

    if opcodes::is_arithmetic(&mnemonic) {
        if mnemonic == "SUB" && operands.len() == 2 {
            operands.insert(0, operands[0].clone());
        }
        if operands.len() != 3 {
            return Err(ErrorKind::Arity(format!(
                "{} takes 3 operands, found {}",
                mnemonic,
                operands.len()
            )));
        }
        for operand in &mut operands[1..] {
            out.hoist(&mut pool, operand)?;
        }
    } else if mnemonic == "READ" || mnemonic == "WRITE" {
        for operand in &mut operands {
            out.hoist(&mut pool, operand)?;
        }
    }

    if mnemonic == "STORE"
        && operands.len() == 2
        && strip_brackets(&operands[0]).is_some()
        && is_register(&operands[1])
    {
        operands.swap(0, 1);
    }

    if let Some(def) = opcodes::instruction(&mnemonic) {
        for (kind, operand) in def.operands.iter().zip(operands.iter_mut()) {
            if kind.is_wide() {
                out.fold_address(&mut pool, operand)?;
            }
        }
    }

    out.push(&mnemonic, operands.as_slice());
    Ok(out.lines)
}

/// Expand a whole source text, attaching source line numbers to errors.
pub fn expand_source(source: &str) -> Result<Vec<Line>, AsmError> {
    let mut lines = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let number = idx + 1;
        let expanded = expand_line(raw, number).map_err(|kind| AsmError::at(number, kind))?;
        if expanded.len() > 1 {
            trace!(line = number, count = expanded.len(), "expanded pseudo-instruction");
        }
        lines.extend(expanded);
    }
    debug!(canonical_lines = lines.len(), "macro expansion finished");
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(src: &str) -> Vec<String> {
        expand_line(src, 1)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn expand_err(src: &str) -> ErrorKind {
        expand_line(src, 1).unwrap_err()
    }

    #[test]
    fn test_blank_and_label_only() {
        assert!(expand("   ; nothing").is_empty());
        assert_eq!(expand("end:"), vec!["end:"]);
    }

    #[test]
    fn test_plain_instruction_is_canonicalized() {
        assert_eq!(expand("  loop: move R1,R2 ; copy"), vec!["loop: MOVE R1, R2"]);
        assert_eq!(expand("halt"), vec!["HALT"]);
    }

    #[test]
    fn test_directive_passes_through() {
        assert_eq!(expand(r#"msg: .asciiz "a, b""#), vec![r#"msg: .ASCIIZ "a, b""#]);
        assert_eq!(expand_err(".ALIGN 4"), ErrorKind::UnknownDirective(".ALIGN".to_string()));
    }

    #[test]
    fn test_arithmetic_immediate_hoisting() {
        assert_eq!(expand("ADD R1, R2, 5"), vec!["LOADI R30, 5", "ADD R1, R2, R30"]);
        assert_eq!(
            expand("top: MUL R1, 3, 0x10"),
            vec!["top: LOADI R30, 3", "LOADI R31, 0x10", "MUL R1, R30, R31"]
        );
        assert_eq!(expand("XOR R1, R2, R3"), vec!["XOR R1, R2, R3"]);
    }

    #[test]
    fn test_repeated_literal_reuses_scratch_register() {
        assert_eq!(expand("ADD R1, 7, 7"), vec!["LOADI R30, 7", "ADD R1, R30, R30"]);
    }

    #[test]
    fn test_two_operand_sub() {
        assert_eq!(expand("SUB R4, R5"), vec!["SUB R4, R4, R5"]);
        assert_eq!(expand("SUB R4, 1"), vec!["LOADI R30, 1", "SUB R4, R4, R30"]);
    }

    #[test]
    fn test_arithmetic_arity() {
        assert!(matches!(expand_err("ADD R1, R2"), ErrorKind::Arity(_)));
        assert!(matches!(expand_err("AND R1, R2, R3, R4"), ErrorKind::Arity(_)));
        assert!(matches!(expand_err("ADD R1, , R2"), ErrorKind::Arity(_)));
    }

    #[test]
    fn test_read_write_hoisting() {
        assert_eq!(
            expand("READ R1, buf, 64, R2"),
            vec!["LOADI R30, buf", "LOADI R31, 64", "READ R1, R30, R31, R2"]
        );
        assert_eq!(expand("WRITE R1, 8, 8, R2"), vec!["LOADI R30, 8", "WRITE R1, R30, R30, R2"]);
        assert!(matches!(expand_err("WRITE 1, 2, 3, R2"), ErrorKind::MacroExpansion(_)));
    }

    #[test]
    fn test_store_reordering() {
        assert_eq!(expand("STORE [100], R2"), vec!["STORE R2, [100]"]);
        assert_eq!(expand("STORE R2, [R3]"), vec!["STORE R2, [R3]"]);
    }

    #[test]
    fn test_indexed_address_folding() {
        assert_eq!(
            expand("LOAD R1, [8 + R2]"),
            vec!["LOADI R30, 8", "ADD R30, R30, R2", "LOAD R1, [R30]"]
        );
        assert_eq!(
            expand("put: STORE [table + R4], R1"),
            vec!["put: LOADI R30, table", "ADD R30, R30, R4", "STORE R1, [R30]"]
        );
        assert_eq!(
            expand("SEEK R1, [4 + R2], [8 + R3], R5"),
            vec![
                "LOADI R30, 4",
                "ADD R30, R30, R2",
                "LOADI R31, 8",
                "ADD R31, R31, R3",
                "SEEK R1, [R30], [R31], R5"
            ]
        );
        assert_eq!(expand("JUMP [R7]"), vec!["JUMP [R7]"]);
        assert_eq!(expand("JUMP [64]"), vec!["JUMP [64]"]);
    }

    #[test]
    fn test_malformed_address() {
        assert!(matches!(expand_err("LOAD R1, [R2 + R3]"), ErrorKind::Lexical(_)));
        assert!(matches!(expand_err("JUMP []"), ErrorKind::Lexical(_)));
    }

    #[test]
    fn test_modulo_with_registers() {
        assert_eq!(
            expand("rem: MOV R1, R2 MOD R3"),
            vec!["rem: DIV R30, R2, R3", "MUL R31, R30, R3", "SUB R1, R2, R31"]
        );
    }

    #[test]
    fn test_modulo_with_literals() {
        assert_eq!(
            expand("MOV R1, R2 MOD 10"),
            vec!["LOADI R31, 10", "DIV R30, R2, R31", "MUL R31, R30, R31", "SUB R1, R2, R31"]
        );
        assert_eq!(
            expand("m: MOV R1, 17 MOD 5"),
            vec![
                "m: LOADI R31, 5",
                "LOADI R30, 17",
                "DIV R30, R30, R31",
                "MUL R31, R30, R31",
                "LOADI R30, 17",
                "SUB R1, R30, R31"
            ]
        );
    }

    #[test]
    fn test_malformed_modulo() {
        assert!(matches!(expand_err("MOV R1, R2 MOD"), ErrorKind::MacroExpansion(_)));
        assert!(matches!(expand_err("MOV R1 MOD R2"), ErrorKind::MacroExpansion(_)));
    }

    #[test]
    fn test_unsupported_patterns() {
        assert!(matches!(expand_err("CMP R1, R2"), ErrorKind::UnsupportedPattern(_)));
        assert!(matches!(expand_err(r#"PRINTS "hello""#), ErrorKind::UnsupportedPattern(_)));
        assert_eq!(expand("CMP R1, 10"), vec!["CMP R1, 10"]);
        assert_eq!(expand("PRINTS msg"), vec!["PRINTS msg"]);
    }

    #[test]
    fn test_scratch_collision_is_not_detected() {
        // The staged literal overwrites the R30 the source line reads.
        assert_eq!(expand("ADD R1, R30, 5"), vec!["LOADI R30, 5", "ADD R1, R30, R30"]);
    }

    #[test]
    fn test_expand_source_reports_line() {
        let err = expand_source("NOP\n\nCMP R1, R2\n").unwrap_err();
        assert_eq!(err.line(), Some(3));
        assert!(matches!(err.kind(), Some(ErrorKind::UnsupportedPattern(_))));
    }
}
