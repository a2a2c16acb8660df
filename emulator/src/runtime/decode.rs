//! Instruction word decoding.
//!
//! Three families share the 16-bit instruction space:
//!
//! ```text
//!  15 14 13 12 11 10  9  8  7  6  5  4  3  2  1  0
//! | 0  0  0  1  0  0 | opcode | B/W | As  |  reg    |  unary
//! | 0  0  1 |             (reserved)                |  jump
//! |  opcode   |  src reg  | Ad | B/W | As  | dst reg |  binary (opcode >= 4)
//! ```
//!
//! Opcodes are looked up in fixed tables; an empty slot is an unimplemented
//! opcode. The jump family has no entries at all.

use parse_display::Display;

use super::exception::{Exception, Format};
use super::operand::{DestinationMode, SourceMode, Width};
use super::registers::Reg;
use crate::constants::Word;

/// Single-operand opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum UnaryOpcode {
    /// Rotate right through carry
    Rrc,
    /// Swap bytes
    Swpb,
    /// Arithmetic shift right
    Rra,
    /// Sign-extend the low byte
    Sxt,
    Push,
    Call,
}

impl UnaryOpcode {
    /// Indexed by the 3-bit opcode field
    const TABLE: [Option<UnaryOpcode>; 8] = [
        Some(UnaryOpcode::Rrc),
        Some(UnaryOpcode::Swpb),
        Some(UnaryOpcode::Rra),
        Some(UnaryOpcode::Sxt),
        Some(UnaryOpcode::Push),
        Some(UnaryOpcode::Call),
        None,
        None,
    ];

    /// Whether the result is stored back into the operand
    #[must_use]
    pub const fn writes_back(self) -> bool {
        matches!(
            self,
            UnaryOpcode::Rrc | UnaryOpcode::Swpb | UnaryOpcode::Rra | UnaryOpcode::Sxt
        )
    }

    /// `swpb`, `sxt` and `call` always operate on words
    #[must_use]
    pub const fn has_byte_variant(self) -> bool {
        matches!(self, UnaryOpcode::Rrc | UnaryOpcode::Rra | UnaryOpcode::Push)
    }
}

/// Double-operand opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum BinaryOpcode {
    Mov,
    Add,
    /// Add with carry
    Addc,
    /// Subtract with carry (borrow when carry is clear)
    Subc,
    Sub,
    Cmp,
}

impl BinaryOpcode {
    /// First opcode of the binary family
    const BASE: u8 = 4;

    /// Indexed by the 4-bit opcode field, minus [`Self::BASE`]
    const TABLE: [Option<BinaryOpcode>; 12] = [
        Some(BinaryOpcode::Mov),
        Some(BinaryOpcode::Add),
        Some(BinaryOpcode::Addc),
        Some(BinaryOpcode::Subc),
        Some(BinaryOpcode::Sub),
        Some(BinaryOpcode::Cmp),
        None,
        None,
        None,
        None,
        None,
        None,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceOperand {
    pub mode: SourceMode,
    pub reg: Reg,
}

impl std::fmt::Display for SourceOperand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.reg, self.mode) {
            (Reg::CG, SourceMode::Register) => write!(f, "#0"),
            (Reg::CG, SourceMode::Indexed) => write!(f, "#1"),
            (Reg::CG, SourceMode::Indirect) => write!(f, "#2"),
            (Reg::CG, SourceMode::IndirectIncrement) => write!(f, "#-1"),
            (Reg::SR, SourceMode::Indexed) => write!(f, "&x"),
            (Reg::SR, SourceMode::Indirect) => write!(f, "#4"),
            (Reg::SR, SourceMode::IndirectIncrement) => write!(f, "#8"),
            (Reg::PC, SourceMode::IndirectIncrement) => write!(f, "#x"),
            (reg, SourceMode::Register) => write!(f, "{reg}"),
            (reg, SourceMode::Indexed) => write!(f, "x({reg})"),
            (reg, SourceMode::Indirect) => write!(f, "@{reg}"),
            (reg, SourceMode::IndirectIncrement) => write!(f, "@{reg}+"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestinationOperand {
    pub mode: DestinationMode,
    pub reg: Reg,
}

impl std::fmt::Display for DestinationOperand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.reg, self.mode) {
            (reg, DestinationMode::Register) => write!(f, "{reg}"),
            (Reg::SR, DestinationMode::Indexed) => write!(f, "&x"),
            (reg, DestinationMode::Indexed) => write!(f, "x({reg})"),
        }
    }
}

/// A decoded instruction word.
///
/// Extension words are not part of it: they are fetched while the operands
/// get resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Unary {
        opcode: UnaryOpcode,
        width: Width,
        operand: SourceOperand,
    },

    Binary {
        opcode: BinaryOpcode,
        width: Width,
        source: SourceOperand,
        destination: DestinationOperand,
    },
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::Unary {
                opcode,
                width,
                operand,
            } => write!(f, "{opcode}{} {operand}", width.suffix()),
            Instruction::Binary {
                opcode,
                width,
                source,
                destination,
            } => write!(f, "{opcode}{} {source}, {destination}", width.suffix()),
        }
    }
}

/// Extract `bits` bits of `word`, starting at bit `shift`
#[allow(clippy::cast_possible_truncation)]
const fn field(word: Word, shift: u32, bits: u32) -> u8 {
    ((word >> shift) & ((1 << bits) - 1)) as u8
}

/// Classify an instruction word by its family
#[must_use]
pub fn format(word: Word) -> Format {
    match field(word, 12, 4) {
        4..=15 => Format::Binary,
        2 | 3 => Format::Jump,
        1 if field(word, 10, 2) == 0 => Format::Unary,
        _ => Format::Unknown,
    }
}

impl Instruction {
    /// Decode an instruction word.
    ///
    /// # Errors
    ///
    /// Fails with [`Exception::UnimplementedOpcode`] if the opcode has no
    /// handler, and with [`Exception::UnsupportedAddressingMode`] if an
    /// operand that gets written to uses a mode that cannot be a destination.
    pub fn decode(word: Word) -> Result<Self, Exception> {
        match format(word) {
            Format::Unary => Self::decode_unary(word),
            Format::Binary => Self::decode_binary(word),
            format @ (Format::Jump | Format::Unknown) => Err(Exception::UnimplementedOpcode {
                format,
                opcode: field(word, 12, 4),
                word,
            }),
        }
    }

    fn decode_unary(word: Word) -> Result<Self, Exception> {
        let reg = Reg::from_index(field(word, 0, 4));
        let mode = field(word, 4, 2);
        let byte = field(word, 6, 1) == 1;
        let index = field(word, 7, 3);

        let opcode = UnaryOpcode::TABLE[usize::from(index)].ok_or(
            Exception::UnimplementedOpcode {
                format: Format::Unary,
                opcode: index,
                word,
            },
        )?;

        // The result is written back through the same operand
        if opcode.writes_back() {
            DestinationMode::try_from(mode)?;
        }

        let width = if opcode.has_byte_variant() {
            Width::from_bit(byte)
        } else {
            Width::Word
        };

        Ok(Instruction::Unary {
            opcode,
            width,
            operand: SourceOperand {
                mode: SourceMode::try_from(mode)?,
                reg,
            },
        })
    }

    fn decode_binary(word: Word) -> Result<Self, Exception> {
        let dst_reg = Reg::from_index(field(word, 0, 4));
        let src_mode = field(word, 4, 2);
        let byte = field(word, 6, 1) == 1;
        let dst_mode = field(word, 7, 1);
        let src_reg = Reg::from_index(field(word, 8, 4));
        let index = field(word, 12, 4);

        let opcode = index
            .checked_sub(BinaryOpcode::BASE)
            .and_then(|i| BinaryOpcode::TABLE.get(usize::from(i)).copied().flatten())
            .ok_or(Exception::UnimplementedOpcode {
                format: Format::Binary,
                opcode: index,
                word,
            })?;

        Ok(Instruction::Binary {
            opcode,
            width: Width::from_bit(byte),
            source: SourceOperand {
                mode: SourceMode::try_from(src_mode)?,
                reg: src_reg,
            },
            destination: DestinationOperand {
                mode: DestinationMode::try_from(dst_mode)?,
                reg: dst_reg,
            },
        })
    }
}
