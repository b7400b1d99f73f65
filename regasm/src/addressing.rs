//! Operand encoding widths shared by the layout and emission passes

use crate::opcodes::{InstructionDef, OperandKind};
use crate::parser::operand::register_indirect;

/// Marker byte that introduces a register-indirect operand.
pub const REGISTER_INDIRECT_MARKER: u8 = 0xFF;

/// Encoded size in bytes of one operand.
///
/// Register and flag operands take one byte. Address and immediate operands
/// take two bytes for `[Rn]` (marker + register) and four otherwise.
pub fn operand_encoded_width(kind: OperandKind, token: &str) -> usize {
    match kind {
        OperandKind::Register | OperandKind::Flags => 1,
        OperandKind::Address | OperandKind::Immediate => {
            if register_indirect(token).is_some() {
                2
            } else {
                4
            }
        }
    }
}

/// Encoded size of a whole instruction: opcode plus operands.
///
/// The caller checks arity first; extra or missing operands are not counted.
pub fn instruction_size(def: &InstructionDef, operands: &[String]) -> usize {
    1 + def
        .operands
        .iter()
        .zip(operands)
        .map(|(&kind, token)| operand_encoded_width(kind, token))
        .sum::<usize>()
}
