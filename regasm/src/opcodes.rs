//! Instruction and condition-flag tables

use std::collections::HashMap;

use lazy_static::lazy_static;

/// How an operand is parsed and how wide it is once encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Register,
    Address,
    Immediate,
    Flags,
}

impl OperandKind {
    /// Address and immediate operands share the 4-byte / `[Rn]` encoding.
    pub fn is_wide(self) -> bool {
        matches!(self, OperandKind::Address | OperandKind::Immediate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionDef {
    pub opcode: u8,
    pub operands: &'static [OperandKind],
}

use OperandKind::{Address as A, Flags as F, Immediate as I, Register as R};

lazy_static! {
    static ref INSTRUCTIONS: HashMap<&'static str, InstructionDef> = {
        let table: &[(&'static str, u8, &'static [OperandKind])] = &[
            // Control flow
            ("NOP", 0x00, &[]),
            ("HALT", 0x01, &[]),
            ("JUMP", 0x02, &[A]),
            ("CALL", 0x03, &[A]),
            ("RET", 0x04, &[]),
            ("IF", 0x05, &[F, A]),
            // Memory and registers
            ("LOAD", 0x10, &[R, A]),
            ("STORE", 0x11, &[R, A]),
            ("MOVE", 0x12, &[R, R]),
            ("PUSH", 0x13, &[R]),
            ("POP", 0x14, &[R]),
            ("LOADI", 0x15, &[R, I]),
            // Arithmetic and logic
            ("ADD", 0x20, &[R, R, R]),
            ("SUB", 0x21, &[R, R, R]),
            ("MUL", 0x22, &[R, R, R]),
            ("DIV", 0x23, &[R, R, R]),
            ("AND", 0x24, &[R, R, R]),
            ("OR", 0x25, &[R, R, R]),
            ("XOR", 0x26, &[R, R, R]),
            ("NOT", 0x27, &[R, R]),
            ("CMP", 0x28, &[R, I]),
            // Shifts
            ("SHL", 0x30, &[R, R, I]),
            ("SHR", 0x31, &[R, R, I]),
            ("BREAK", 0x32, &[]),
            // Host introspection
            ("FS_LIST", 0x34, &[A]),
            ("ENV_LIST", 0x42, &[A]),
            // Console I/O
            ("PRINT", 0x50, &[R]),
            ("INPUT", 0x51, &[R]),
            ("PRINTS", 0x52, &[A]),
            // Machine state
            ("SNAPSHOT", 0x60, &[]),
            ("RESTORE", 0x61, &[]),
            // Files
            ("OPEN", 0x70, &[R, R, R]),
            ("READ", 0x71, &[R, R, R, R]),
            ("WRITE", 0x72, &[R, R, R, R]),
            ("CLOSE", 0x73, &[R]),
            ("SEEK", 0x74, &[R, I, I, R]),
        ];
        table
            .iter()
            .map(|&(name, opcode, operands)| (name, InstructionDef { opcode, operands }))
            .collect()
    };

    static ref FLAGS: HashMap<&'static str, u8> = HashMap::from([
        ("EQ", 0x01),
        ("NE", 0x02),
        ("LT", 0x04),
        ("GT", 0x08),
        // Shares GT's bit; a consumer cannot tell the two apart.
        ("GE", 0x08),
    ]);
}

/// Look up an instruction by its upper-case mnemonic.
pub fn instruction(mnemonic: &str) -> Option<&'static InstructionDef> {
    INSTRUCTIONS.get(mnemonic)
}

pub fn flag(name: &str) -> Option<u8> {
    FLAGS.get(name).copied()
}

/// Mnemonics whose second and third operands are staged into scratch registers.
pub fn is_arithmetic(mnemonic: &str) -> bool {
    matches!(mnemonic, "ADD" | "SUB" | "MUL" | "DIV" | "AND" | "OR" | "XOR")
}
