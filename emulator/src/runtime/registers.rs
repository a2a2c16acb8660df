use bitflags::bitflags;
use parse_display::Display;
use thiserror::Error;

use crate::constants as C;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusRegister: C::Word {
        const CARRY    = 0b0000_0000_0001;
        const ZERO     = 0b0000_0000_0010;
        const NEGATIVE = 0b0000_0000_0100;
        const OVERFLOW = 0b0001_0000_0000;
    }
}

impl StatusRegister {
    /// The four condition flags computed by arithmetic instructions
    pub const CONDITIONS: Self = Self::CARRY
        .union(Self::ZERO)
        .union(Self::NEGATIVE)
        .union(Self::OVERFLOW);
}

impl std::fmt::Debug for StatusRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#011b}", self.bits())
    }
}

impl std::fmt::Display for StatusRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flag = |set: bool, name: char| if set { name } else { '-' };
        write!(
            f,
            "{}{}{}{}",
            flag(self.contains(Self::OVERFLOW), 'V'),
            flag(self.contains(Self::NEGATIVE), 'N'),
            flag(self.contains(Self::ZERO), 'Z'),
            flag(self.contains(Self::CARRY), 'C'),
        )
    }
}

/// The register file: sixteen word registers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    inner: [C::Word; 16],
}

impl Default for Registers {
    fn default() -> Self {
        let mut registers = Self { inner: [0; 16] };
        registers.set(Reg::PC, C::CODE_START);
        registers.set(Reg::SP, C::STACK_START);
        registers
    }
}

impl Registers {
    #[must_use]
    pub fn get(&self, reg: Reg) -> C::Word {
        self.inner[reg.index()]
    }

    pub fn set(&mut self, reg: Reg, value: C::Word) {
        self.inner[reg.index()] = value;
    }

    /// Program counter
    #[must_use]
    pub fn pc(&self) -> C::Address {
        self.get(Reg::PC)
    }

    pub fn set_pc(&mut self, address: C::Address) {
        self.set(Reg::PC, address);
    }

    /// Stack pointer
    #[must_use]
    pub fn sp(&self) -> C::Address {
        self.get(Reg::SP)
    }

    pub fn set_sp(&mut self, address: C::Address) {
        self.set(Reg::SP, address);
    }

    /// View of the status register
    #[must_use]
    pub fn sr(&self) -> StatusRegister {
        StatusRegister::from_bits_retain(self.get(Reg::SR))
    }

    pub fn set_sr(&mut self, sr: StatusRegister) {
        self.set(Reg::SR, sr.bits());
    }

    /// Replace the four condition flags, keeping the reserved bits of %sr
    pub fn set_conditions(&mut self, flags: StatusRegister) {
        let mut sr = self.sr();
        sr.remove(StatusRegister::CONDITIONS);
        sr.insert(flags & StatusRegister::CONDITIONS);
        self.set_sr(sr);
    }

    pub fn set_flag(&mut self, flag: StatusRegister, value: bool) {
        let mut sr = self.sr();
        sr.set(flag, value);
        self.set_sr(sr);
    }
}

impl std::fmt::Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pc = {:#06x} | sp = {:#06x} | sr = {}",
            self.pc(),
            self.sp(),
            self.sr()
        )?;
        for reg in &Reg::ALL[4..] {
            write!(f, " | {reg} = {:#06x}", self.get(*reg))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(style = "lowercase")]
pub enum Reg {
    /// Program counter (r0)
    PC,

    /// Stack pointer (r1)
    SP,

    /// Status register and constant generator (r2)
    SR,

    /// Constant generator (r3)
    CG,

    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

impl Reg {
    pub const ALL: [Reg; 16] = [
        Reg::PC,
        Reg::SP,
        Reg::SR,
        Reg::CG,
        Reg::R4,
        Reg::R5,
        Reg::R6,
        Reg::R7,
        Reg::R8,
        Reg::R9,
        Reg::R10,
        Reg::R11,
        Reg::R12,
        Reg::R13,
        Reg::R14,
        Reg::R15,
    ];

    /// Register for a 4-bit field of an instruction word. Higher bits are ignored.
    #[must_use]
    pub fn from_index(index: u8) -> Self {
        Self::ALL[usize::from(index & 0xF)]
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Error, Debug)]
#[error("could not parse register")]
pub struct RegisterParseError;

impl std::str::FromStr for Reg {
    type Err = RegisterParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.to_lowercase();
        match s.as_str() {
            "pc" => Ok(Reg::PC),
            "sp" => Ok(Reg::SP),
            "sr" => Ok(Reg::SR),
            "cg" => Ok(Reg::CG),
            _ => s
                .strip_prefix('r')
                .and_then(|index| index.parse::<u8>().ok())
                .filter(|index| *index < 16)
                .map(Reg::from_index)
                .ok_or(RegisterParseError),
        }
    }
}
