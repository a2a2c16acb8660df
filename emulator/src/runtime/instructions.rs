//! Execution of decoded instructions against the [`Computer`] state.

use tracing::debug;

use super::alu::{self, AluOutput};
use super::decode::{BinaryOpcode, DestinationOperand, Instruction, SourceOperand, UnaryOpcode};
use super::operand::Width;
use super::registers::StatusRegister;
use super::Computer;
use crate::constants::Word;

impl Instruction {
    /// Execute the instruction.
    ///
    /// The instruction word has already been fetched; extension words are
    /// fetched here while resolving the operands.
    #[tracing::instrument(skip(computer))]
    pub(crate) fn execute(&self, computer: &mut Computer) {
        match *self {
            Instruction::Unary {
                opcode,
                width,
                operand,
            } => execute_unary(computer, opcode, width, operand),

            Instruction::Binary {
                opcode,
                width,
                source,
                destination,
            } => execute_binary(computer, opcode, width, source, destination),
        }
    }
}

fn execute_unary(computer: &mut Computer, opcode: UnaryOpcode, width: Width, operand: SourceOperand) {
    let target = computer.resolve_source(operand.mode, operand.reg);
    let value = computer.read_operand(target, width);

    match opcode {
        UnaryOpcode::Rrc => {
            let carry = computer.registers.sr().contains(StatusRegister::CARRY);
            let output = rotate_right_through_carry(width, value, carry);
            debug!("rrc({:#x}) = {:#x}", value, output.result);
            computer.registers.set_conditions(output.flags);
            computer.write_operand(target, width, output.result);
        }

        UnaryOpcode::Swpb => {
            let res = value.swap_bytes();
            debug!("swpb({:#x}) = {:#x}", value, res);
            computer.write_operand(target, Width::Word, res);
        }

        UnaryOpcode::Rra => {
            let output = arithmetic_shift_right(width, value);
            debug!("rra({:#x}) = {:#x}", value, output.result);
            computer.registers.set_conditions(output.flags);
            computer.write_operand(target, width, output.result);
        }

        UnaryOpcode::Sxt => {
            let output = sign_extend(value);
            debug!("sxt({:#x}) = {:#x}", value, output.result);
            computer.registers.set_conditions(output.flags);
            computer.write_operand(target, Width::Word, output.result);
        }

        UnaryOpcode::Push => {
            debug!("push({:#x})", value);
            computer.push(width, value);
        }

        UnaryOpcode::Call => {
            // %pc is already past the instruction and its extension word
            let pc = computer.registers.pc();
            computer.push(Width::Word, pc);
            debug!("Calling {:#06x}, returning to {:#06x}", value, pc);
            computer.registers.set_pc(value);
        }
    }
}

fn execute_binary(
    computer: &mut Computer,
    opcode: BinaryOpcode,
    width: Width,
    source: SourceOperand,
    destination: DestinationOperand,
) {
    let src = computer.resolve_source(source.mode, source.reg);
    let a = computer.read_operand(src, width);
    let dst = computer.resolve_destination(destination.mode, destination.reg);
    let b = computer.read_location(dst, width);
    let carry = computer.registers.sr().contains(StatusRegister::CARRY);

    let output = match opcode {
        BinaryOpcode::Mov => {
            debug!("mov {:#x}", a);
            computer.write_location(dst, width, a);
            return;
        }
        BinaryOpcode::Add => alu::add_with_carry(width, a, b, false),
        BinaryOpcode::Addc => alu::add_with_carry(width, a, b, carry),
        BinaryOpcode::Sub | BinaryOpcode::Cmp => alu::subtract_with_carry(width, a, b, true),
        BinaryOpcode::Subc => alu::subtract_with_carry(width, a, b, carry),
    };

    // Flags first: a result written to %sr takes precedence over them
    computer.registers.set_conditions(output.flags);

    if opcode == BinaryOpcode::Cmp {
        debug!("cmp({:#x}, {:#x}) => {}", a, b, output.flags);
    } else {
        computer.write_location(dst, width, output.result);
    }
}

/// Condition flags shared by the shift and rotate instructions: carry from
/// the bit shifted out, overflow cleared
fn shift_flags(width: Width, result: Word, carry: bool) -> StatusRegister {
    let mut flags = StatusRegister::empty();
    flags.set(StatusRegister::CARRY, carry);
    flags.set(StatusRegister::ZERO, result == 0);
    flags.set(StatusRegister::NEGATIVE, result & width.sign_mask() != 0);
    flags
}

/// `rrc`: the carry goes into the sign bit, the low bit goes into the carry
pub(crate) fn rotate_right_through_carry(width: Width, value: Word, carry: bool) -> AluOutput {
    let mut result = value >> 1;
    if carry {
        result |= width.sign_mask();
    }

    AluOutput {
        result,
        flags: shift_flags(width, result, value & 1 != 0),
    }
}

/// `rra`: shift right, keeping the sign bit
pub(crate) fn arithmetic_shift_right(width: Width, value: Word) -> AluOutput {
    let result = (value >> 1) | (value & width.sign_mask());

    AluOutput {
        result,
        flags: shift_flags(width, result, value & 1 != 0),
    }
}

/// `sxt`: replicate bit 7 over the high byte.
///
/// The carry is set whenever the result is not zero.
pub(crate) fn sign_extend(value: Word) -> AluOutput {
    let [low, _] = value.to_le_bytes();
    let negative = low & 0x80 != 0;
    let result = if negative {
        0xFF00 | Word::from(low)
    } else {
        Word::from(low)
    };

    let mut flags = StatusRegister::empty();
    flags.set(StatusRegister::NEGATIVE, negative);
    flags.set(StatusRegister::ZERO, result == 0);
    flags.set(StatusRegister::CARRY, result != 0);
    AluOutput { result, flags }
}
