use parse_display::Display;
use thiserror::Error;

use crate::constants::Word;

/// Which side of an instruction an operand is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum OperandRole {
    Source,
    Destination,
}

/// Instruction word layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "kebab-case")]
pub enum Format {
    /// Single-operand instructions
    Unary,

    /// Conditional relative jumps
    Jump,

    /// Double-operand instructions
    Binary,

    /// A word that does not match any instruction family
    Unknown,
}

/// Faults raised while decoding or executing an instruction.
///
/// When one of those is returned, the instruction did not complete.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
    #[error("unsupported {role} addressing mode {mode}")]
    UnsupportedAddressingMode { role: OperandRole, mode: u8 },

    #[error("unimplemented {format} opcode {opcode:#x} in instruction {word:#06x}")]
    UnimplementedOpcode {
        format: Format,
        opcode: u8,
        word: Word,
    },
}
