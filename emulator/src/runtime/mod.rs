use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants as C;

mod alu;
mod decode;
mod exception;
mod instructions;
mod memory;
mod operand;
mod registers;

pub use self::alu::{add_with_carry, subtract_with_carry, AluOutput};
pub use self::decode::{
    format, BinaryOpcode, DestinationOperand, Instruction, SourceOperand, UnaryOpcode,
};
pub use self::exception::{Exception, Format, OperandRole};
pub use self::memory::Memory;
pub use self::operand::{DestinationMode, Location, Operand, SourceMode, Width};
pub use self::registers::{Reg, RegisterParseError, Registers, StatusRegister};

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("CPU exception: {0}")]
    Exception(#[from] Exception),

    #[error("program is {size} bytes long, but only {capacity} bytes fit after the code start")]
    ProgramTooLarge { size: usize, capacity: usize },
}

type Result<T> = std::result::Result<T, ProcessorError>;

#[derive(Default, Clone)]
pub struct Computer {
    pub registers: Registers,
    pub memory: Memory,

    /// Number of instructions executed so far
    pub steps: u64,
}

impl std::fmt::Debug for Computer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Computer {{ registers: {:?}, memory: [...], steps: {} }}",
            self.registers, self.steps
        )
    }
}

impl Computer {
    /// Create a computer with the given program loaded
    ///
    /// # Errors
    ///
    /// Fails if the program does not fit in memory.
    pub fn with_program(program: &[u8]) -> Result<Self> {
        let mut computer = Self::default();
        computer.load(program)?;
        Ok(computer)
    }

    /// Copy a raw program image at the start of the code area
    ///
    /// # Errors
    ///
    /// Fails if the program does not fit between the code start and the end
    /// of memory. The memory is left untouched in that case.
    pub fn load(&mut self, program: &[u8]) -> Result<()> {
        let capacity = C::MEMORY_SIZE - usize::from(C::CODE_START);
        if program.len() > capacity {
            return Err(ProcessorError::ProgramTooLarge {
                size: program.len(),
                capacity,
            });
        }

        self.memory.copy_from(C::CODE_START, program);
        info!(size = program.len(), start = C::CODE_START, "Loaded program");
        Ok(())
    }

    /// Fetch, decode and execute one instruction.
    ///
    /// # Errors
    ///
    /// Fails if the instruction can't be decoded. In that case %pc is moved
    /// back to the faulting instruction and nothing else changed.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn step(&mut self) -> Result<()> {
        let address = self.registers.pc();
        let word = self.fetch();

        let instruction = match Instruction::decode(word) {
            Ok(instruction) => instruction,
            Err(exception) => {
                self.registers.set_pc(address);
                return Err(exception.into());
            }
        };

        info!(address, "Executing instruction \"{}\"", instruction);
        instruction.execute(self);
        self.steps += 1;
        debug!("Register state {}", self.registers);
        Ok(())
    }

    /// Run at most `max_steps` instructions.
    ///
    /// Returns the number of instructions executed.
    ///
    /// # Errors
    ///
    /// Stops on the first fault and returns it.
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self, max_steps: u64) -> Result<u64> {
        for executed in 0..max_steps {
            if let Err(e) = self.step() {
                warn!(executed, pc = self.registers.pc(), "Halted");
                return Err(e);
            }
        }
        Ok(max_steps)
    }

    /// Current value of a register
    #[must_use]
    pub fn register(&self, reg: Reg) -> C::Word {
        self.registers.get(reg)
    }

    pub fn set_register(&mut self, reg: Reg, value: C::Word) {
        self.registers.set(reg, value);
    }

    #[must_use]
    pub fn read_byte(&self, address: C::Address) -> C::Byte {
        self.memory.get_byte(address)
    }

    #[must_use]
    pub fn read_word(&self, address: C::Address) -> C::Word {
        self.memory.get_word(address)
    }

    pub fn write_byte(&mut self, address: C::Address, value: C::Byte) {
        self.memory.set_byte(address, value);
    }

    pub fn write_word(&mut self, address: C::Address, value: C::Word) {
        self.memory.set_word(address, value);
    }

    /// Push a word on the stack
    pub fn stack_push_word(&mut self, value: C::Word) {
        self.push(Width::Word, value);
    }

    /// Push a byte on the stack. The stack pointer still moves by a word.
    pub fn stack_push_byte(&mut self, value: C::Byte) {
        self.push(Width::Byte, value.into());
    }

    /// Pop a word from the stack
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn stack_pop_word(&mut self) -> C::Word {
        let value = self.memory.get_word(self.registers.sp());
        debug!("Popping value: {:#06x}", value);
        self.registers.set_sp(self.registers.sp().wrapping_add(2));
        value
    }

    /// Pop a byte from the stack. The stack pointer still moves by a word.
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn stack_pop_byte(&mut self) -> C::Byte {
        let value = self.memory.get_byte(self.registers.sp());
        debug!("Popping value: {:#04x}", value);
        self.registers.set_sp(self.registers.sp().wrapping_add(2));
        value
    }

    #[tracing::instrument(skip(self), level = "debug")]
    fn push(&mut self, width: Width, value: C::Word) {
        // First move the stack
        let sp = self.registers.sp().wrapping_sub(2);
        self.registers.set_sp(sp);
        if sp < C::STACK_END {
            warn!(sp, "Stack grew past its end");
        }

        // And write the value on memory
        self.write_location(Location::Memory(sp), width, value);
    }

    /// Build a computer from a program given as instruction words
    #[cfg(test)]
    pub(crate) fn with_words(words: &[C::Word]) -> Result<Self> {
        let program: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        Self::with_program(&program)
    }
}
