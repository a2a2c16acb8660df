//! Operand resolution.
//!
//! An addressing mode and a register are turned into an [`Operand`]: either a
//! literal produced by a constant generator, or a [`Location`] which is read
//! or written right away. Resolving may consume extension words from the
//! instruction stream and may post-increment the register.

use parse_display::Display;
use tracing::{debug, trace};

use super::exception::{Exception, OperandRole};
use super::registers::Reg;
use super::Computer;
use crate::constants::{Address, Word};

/// Operand width of an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum Width {
    Word,
    Byte,
}

impl Width {
    /// Width selected by the B/W bit of an instruction word
    #[must_use]
    pub const fn from_bit(byte: bool) -> Self {
        if byte {
            Width::Byte
        } else {
            Width::Word
        }
    }

    #[must_use]
    pub const fn mask(self) -> Word {
        match self {
            Width::Word => 0xFFFF,
            Width::Byte => 0x00FF,
        }
    }

    #[must_use]
    pub const fn sign_mask(self) -> Word {
        match self {
            Width::Word => 0x8000,
            Width::Byte => 0x0080,
        }
    }

    /// The bit just above the operand, set when an addition carries out
    #[must_use]
    pub const fn carry_mask(self) -> u32 {
        match self {
            Width::Word => 1 << 16,
            Width::Byte => 1 << 8,
        }
    }

    /// Keep the bits of a wide intermediate value that fit in this width
    #[must_use]
    pub fn truncate(self, value: u32) -> Word {
        let [low, high, ..] = value.to_le_bytes();
        match self {
            Width::Word => Word::from_le_bytes([low, high]),
            Width::Byte => Word::from(low),
        }
    }

    /// Assembly suffix
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Width::Word => "",
            Width::Byte => ".b",
        }
    }
}

/// Source addressing modes (the 2-bit `As` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// `Rn`
    Register,

    /// `X(Rn)`, followed by an extension word
    Indexed,

    /// `@Rn`
    Indirect,

    /// `@Rn+`
    IndirectIncrement,
}

impl TryFrom<u8> for SourceMode {
    type Error = Exception;

    fn try_from(mode: u8) -> Result<Self, Self::Error> {
        match mode {
            0 => Ok(Self::Register),
            1 => Ok(Self::Indexed),
            2 => Ok(Self::Indirect),
            3 => Ok(Self::IndirectIncrement),
            mode => Err(Exception::UnsupportedAddressingMode {
                role: OperandRole::Source,
                mode,
            }),
        }
    }
}

/// Destination addressing modes (the 1-bit `Ad` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationMode {
    /// `Rn`
    Register,

    /// `X(Rn)`, followed by an extension word
    Indexed,
}

impl TryFrom<u8> for DestinationMode {
    type Error = Exception;

    fn try_from(mode: u8) -> Result<Self, Self::Error> {
        match mode {
            0 => Ok(Self::Register),
            1 => Ok(Self::Indexed),
            mode => Err(Exception::UnsupportedAddressingMode {
                role: OperandRole::Destination,
                mode,
            }),
        }
    }
}

/// A resolved place that can be read or written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Register(Reg),
    Memory(Address),
}

/// A resolved source operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// A literal from a constant generator. Writes to it are discarded.
    Constant(Word),
    Location(Location),
}

impl Computer {
    /// Read the word at %pc and move %pc past it
    pub(crate) fn fetch(&mut self) -> Word {
        let pc = self.registers.pc();
        let word = self.memory.get_word(pc);
        self.registers.set_pc(pc.wrapping_add(2));
        trace!(address = pc, word, "fetch");
        word
    }

    /// Resolve a source operand.
    ///
    /// Constant generators are checked first and never touch memory nor the
    /// instruction stream, except for the absolute mode of %sr which reads its
    /// address from the extension word.
    pub(crate) fn resolve_source(&mut self, mode: SourceMode, reg: Reg) -> Operand {
        let location = match (reg, mode) {
            (Reg::CG, SourceMode::Register) => return Operand::Constant(0),
            (Reg::CG, SourceMode::Indexed) => return Operand::Constant(1),
            (Reg::CG, SourceMode::Indirect) => return Operand::Constant(2),
            (Reg::CG, SourceMode::IndirectIncrement) => return Operand::Constant(0xFFFF),
            (Reg::SR, SourceMode::Indirect) => return Operand::Constant(4),
            (Reg::SR, SourceMode::IndirectIncrement) => return Operand::Constant(8),

            (reg, SourceMode::Register) => Location::Register(reg),
            (reg, SourceMode::Indexed) => self.indexed(reg),
            (reg, SourceMode::Indirect) => Location::Memory(self.registers.get(reg)),
            (reg, SourceMode::IndirectIncrement) => {
                let address = self.registers.get(reg);
                // %pc always moves by a full word, other registers by one
                let step = if reg == Reg::PC { 2 } else { 1 };
                self.registers.set(reg, address.wrapping_add(step));
                Location::Memory(address)
            }
        };

        Operand::Location(location)
    }

    /// Resolve a destination operand
    pub(crate) fn resolve_destination(&mut self, mode: DestinationMode, reg: Reg) -> Location {
        match mode {
            DestinationMode::Register => Location::Register(reg),
            DestinationMode::Indexed => self.indexed(reg),
        }
    }

    /// `X(Rn)`, or `&X` when the base register is %sr
    fn indexed(&mut self, reg: Reg) -> Location {
        let offset = self.fetch();
        if reg == Reg::SR {
            Location::Memory(offset)
        } else {
            Location::Memory(self.registers.get(reg).wrapping_add(offset))
        }
    }

    /// Read a location, masked to the given width
    pub(crate) fn read_location(&self, location: Location, width: Width) -> Word {
        match (location, width) {
            (Location::Register(reg), width) => self.registers.get(reg) & width.mask(),
            (Location::Memory(address), Width::Word) => self.memory.get_word(address),
            (Location::Memory(address), Width::Byte) => {
                Word::from(self.memory.get_byte(address))
            }
        }
    }

    /// Read an operand, masked to the given width
    pub(crate) fn read_operand(&self, operand: Operand, width: Width) -> Word {
        match operand {
            Operand::Constant(value) => value & width.mask(),
            Operand::Location(location) => self.read_location(location, width),
        }
    }

    /// Write to a location.
    ///
    /// A byte written to a register clears its high byte; a byte written to
    /// memory leaves the neighbouring byte alone.
    pub(crate) fn write_location(&mut self, location: Location, width: Width, value: Word) {
        match (location, width) {
            (Location::Register(reg), width) => self.registers.set(reg, value & width.mask()),
            (Location::Memory(address), Width::Word) => self.memory.set_word(address, value),
            (Location::Memory(address), Width::Byte) => {
                let [low, _] = value.to_le_bytes();
                self.memory.set_byte(address, low);
            }
        }
    }

    /// Write back to an operand
    pub(crate) fn write_operand(&mut self, operand: Operand, width: Width, value: Word) {
        match operand {
            Operand::Constant(constant) => {
                debug!(constant, value, "Discarding write to a constant generator");
            }
            Operand::Location(location) => self.write_location(location, width, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CODE_START;
    use pretty_assertions::assert_eq;

    fn source(computer: &mut Computer, mode: u8, reg: Reg, width: Width) -> Word {
        let mode = SourceMode::try_from(mode).unwrap();
        let operand = computer.resolve_source(mode, reg);
        computer.read_operand(operand, width)
    }

    #[test]
    fn constant_generators() {
        let mut computer = Computer::default();
        computer.registers.set(Reg::CG, 0x1234);
        computer.registers.set(Reg::SR, 0x0107);

        assert_eq!(source(&mut computer, 0, Reg::CG, Width::Word), 0);
        assert_eq!(source(&mut computer, 1, Reg::CG, Width::Word), 1);
        assert_eq!(source(&mut computer, 2, Reg::CG, Width::Word), 2);
        assert_eq!(source(&mut computer, 3, Reg::CG, Width::Word), 0xFFFF);
        assert_eq!(source(&mut computer, 3, Reg::CG, Width::Byte), 0xFF);
        assert_eq!(source(&mut computer, 2, Reg::SR, Width::Word), 4);
        assert_eq!(source(&mut computer, 3, Reg::SR, Width::Word), 8);
        assert_eq!(source(&mut computer, 0, Reg::SR, Width::Word), 0x0107);

        // None of them consumed an extension word
        assert_eq!(computer.registers.pc(), CODE_START);
    }

    #[test]
    fn absolute_mode() {
        let mut computer = Computer::default();
        computer.registers.set(Reg::SR, 0x0100);
        computer.memory.set_word(CODE_START, 0x0200);
        computer.memory.set_word(0x0200, 0xCAFE);

        assert_eq!(source(&mut computer, 1, Reg::SR, Width::Word), 0xCAFE);
        assert_eq!(computer.registers.pc(), CODE_START + 2);
    }

    #[test]
    fn indexed_mode() {
        let mut computer = Computer::default();
        computer.registers.set(Reg::R4, 0x2004);
        // -2 as an extension word
        computer.memory.set_word(CODE_START, 0xFFFE);
        computer.memory.set_word(0x2002, 0x1234);

        assert_eq!(source(&mut computer, 1, Reg::R4, Width::Word), 0x1234);
        assert_eq!(computer.registers.pc(), CODE_START + 2);
    }

    #[test]
    fn post_increment() {
        let mut computer = Computer::default();
        computer.registers.set(Reg::R4, 0x2000);
        computer.memory.set_word(0x2000, 0xABCD);

        // Word mode still only moves general registers by one
        assert_eq!(source(&mut computer, 3, Reg::R4, Width::Word), 0xABCD);
        assert_eq!(computer.registers.get(Reg::R4), 0x2001);

        // Immediate values are @pc+, which moves by two
        computer.memory.set_word(CODE_START, 0x0042);
        assert_eq!(source(&mut computer, 3, Reg::PC, Width::Byte), 0x42);
        assert_eq!(computer.registers.pc(), CODE_START + 2);
    }

    #[test]
    fn byte_writes() {
        let mut computer = Computer::default();
        computer.registers.set(Reg::R5, 0xFFFF);
        computer.write_location(Location::Register(Reg::R5), Width::Byte, 0x1234);
        assert_eq!(computer.registers.get(Reg::R5), 0x0034);

        computer.memory.set_word(0x2000, 0xFFFF);
        computer.write_location(Location::Memory(0x2000), Width::Byte, 0x1234);
        assert_eq!(computer.memory.get_word(0x2000), 0xFF34);

        computer.write_location(Location::Memory(0x2000), Width::Word, 0x1234);
        assert_eq!(computer.memory.get_word(0x2000), 0x1234);
    }

    #[test]
    fn writes_to_constants_are_discarded() {
        let mut computer = Computer::default();
        computer.write_operand(Operand::Constant(4), Width::Word, 0x1234);
        assert_eq!(computer.registers, crate::runtime::Registers::default());
    }

    #[test]
    fn invalid_modes() {
        assert!(matches!(
            SourceMode::try_from(4),
            Err(Exception::UnsupportedAddressingMode {
                role: OperandRole::Source,
                mode: 4
            })
        ));
        assert!(matches!(
            DestinationMode::try_from(2),
            Err(Exception::UnsupportedAddressingMode {
                role: OperandRole::Destination,
                mode: 2
            })
        ));
    }
}
