//! Parser module for assembly source

pub mod escape;
pub mod lexer;
pub mod number;
pub mod operand;

pub use lexer::{DirectiveKind, Item, Line, preprocess_line, split_mnemonic, split_operands};
