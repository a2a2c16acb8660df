//! An instruction-set simulator for a 16-bit MSP430-style microcontroller.
//!
//! The [`Computer`] owns sixteen word registers and 64 KiB of memory. A raw
//! program image is copied at [`constants::CODE_START`], and the host drives
//! execution one instruction at a time with [`Computer::step`], or for a
//! bounded number of instructions with [`Computer::run`].
//!
//! ```
//! use msp430_emulator::{Computer, Reg};
//!
//! // mov #4, r5 ; add r5, r6
//! let program = [0x35, 0x40, 0x04, 0x00, 0x06, 0x55];
//! let mut computer = Computer::with_program(&program).unwrap();
//! computer.run(2).unwrap();
//! assert_eq!(computer.register(Reg::R6), 4);
//! ```

pub mod constants;
pub mod runtime;

pub use self::runtime::{Computer, Exception, ProcessorError, Reg};
