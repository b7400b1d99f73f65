//! Two-pass assembler for a 32-register virtual machine, with optional
//! human-readable listing (feature: "listing")
//!
//! ## Features
//! - **Literals**: decimal (`-5`), hex (`0x2A`), quoted characters with C
//!   escapes (`'\n'`, `'\x41'`).
//! - **Directives**:
//!   - `.ASCIIZ "text"`: escaped bytes followed by a zero byte.
//!   - `.SPACE n`: `n` zero bytes.
//!   - `.BYTE v` / `.WORD v`: one byte / one little-endian 32-bit word.
//! - **Pseudo-instructions** expanded through scratch registers R30 and R31:
//!   arithmetic with immediates, `SUB Rd, Rs`, `MOV Rd, X MOD Y`, indexed
//!   addresses `[imm + Rn]`, and `STORE [addr], Rs` operand order.
//! - **Register-indirect operands** `[Rn]` encode as `0xFF, n`.
//! - **Forward references**: labels are bound in a layout pass before any
//!   byte is emitted.
//!
//! ## Optional Features
//! - `listing`: enables functions to print and save human-readable assembly listings.
//!
//! ## Basic Usage
//! ```rust
//! use regasm::Assembler;
//!
//! fn main() -> Result<(), regasm::AsmError> {
//!     let mut assembler = Assembler::new();
//!     let src = r#"
//!         start: ADD R1, R2, 5   ; R1 = R2 + 5
//!                JUMP start
//!     "#;
//!
//!     let bytes = assembler.assemble_bytes(src)?;
//!     assert_eq!(
//!         bytes,
//!         vec![
//!             0x15, 0x1E, 0x05, 0x00, 0x00, 0x00, // LOADI R30, 5
//!             0x20, 0x01, 0x02, 0x1E,             // ADD R1, R2, R30
//!             0x02, 0x00, 0x00, 0x00, 0x00,       // JUMP start
//!         ]
//!     );
//!     assert_eq!(assembler.lookup("start"), Some(0));
//!
//!     let mut artifact = Vec::new();
//!     regasm::write_bin(&bytes, &mut artifact)?;
//!     assert_eq!(&artifact[..4], &[15, 0, 0, 0]);
//!     Ok(())
//! }
//! ```

mod addressing;
mod assembler;
mod error;
mod eval;
mod macros;
mod opcodes;
mod output;
mod parser;
mod symbol;

// Public exports
pub use addressing::{REGISTER_INDIRECT_MARKER, operand_encoded_width};
pub use assembler::Assembler;
pub use error::{AsmError, ErrorKind};
pub use macros::{SCRATCH_REGISTERS, expand_line, expand_source};
pub use opcodes::{InstructionDef, OperandKind, flag, instruction};
pub use output::write_bin;
pub use parser::{DirectiveKind, Item, Line};
