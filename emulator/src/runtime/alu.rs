//! The arithmetic unit shared by every add-family instruction.
//!
//! Subtraction and comparison go through the same primitive: `dst - src` is
//! computed as `dst + !src + 1`, where the complement is taken at the operand
//! width before entering the adder.

use tracing::debug;

use super::operand::Width;
use super::registers::StatusRegister;
use crate::constants::Word;

/// Result of an addition: the truncated value and the four condition flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluOutput {
    pub result: Word,
    pub flags: StatusRegister,
}

/// Add two operands and a carry-in, at the given width.
///
/// Both operands are expected to already be masked to `width`.
#[must_use]
pub fn add_with_carry(width: Width, src: Word, dst: Word, carry_in: bool) -> AluOutput {
    let sign = u32::from(width.sign_mask());
    let src32 = u32::from(src);
    let dst32 = u32::from(dst);
    let raw = src32 + dst32 + u32::from(carry_in);
    let truncated = raw & u32::from(width.mask());

    let mut flags = StatusRegister::empty();
    flags.set(StatusRegister::NEGATIVE, truncated & sign != 0);
    flags.set(StatusRegister::ZERO, truncated == 0);
    flags.set(StatusRegister::CARRY, raw & width.carry_mask() != 0);
    flags.set(
        StatusRegister::OVERFLOW,
        (src32 & sign) == (dst32 & sign) && (raw ^ dst32) & sign != 0,
    );

    let result = width.truncate(raw);
    debug!(%width, src, dst, carry_in, result, flags = %flags, "add");
    AluOutput { result, flags }
}

/// Compute `dst - src - !carry_in`, i.e. `dst + !src + carry_in`.
///
/// With `carry_in` set this is a plain subtraction.
#[must_use]
pub fn subtract_with_carry(width: Width, src: Word, dst: Word, carry_in: bool) -> AluOutput {
    let complement = !src & width.mask();
    add_with_carry(width, complement, dst, carry_in)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn flags(output: &AluOutput) -> (bool, bool, bool, bool) {
        (
            output.flags.contains(StatusRegister::CARRY),
            output.flags.contains(StatusRegister::ZERO),
            output.flags.contains(StatusRegister::NEGATIVE),
            output.flags.contains(StatusRegister::OVERFLOW),
        )
    }

    #[test]
    fn word_add() {
        let out = add_with_carry(Width::Word, 0xFFFF, 0x0001, false);
        assert_eq!(out.result, 0);
        assert_eq!(flags(&out), (true, true, false, false));

        let out = add_with_carry(Width::Word, 0x7FFF, 0x0001, false);
        assert_eq!(out.result, 0x8000);
        assert_eq!(flags(&out), (false, false, true, true));

        let out = add_with_carry(Width::Word, 0x8000, 0x8000, false);
        assert_eq!(out.result, 0);
        assert_eq!(flags(&out), (true, true, false, true));
    }

    #[test]
    fn byte_carry_uses_byte_boundary() {
        let out = add_with_carry(Width::Byte, 0xFF, 0x01, false);
        assert_eq!(out.result, 0);
        assert_eq!(flags(&out), (true, true, false, false));

        // A sum above 0xFF but far from 0xFFFF still carries out of a byte
        let out = add_with_carry(Width::Byte, 0x80, 0x90, false);
        assert_eq!(out.result, 0x10);
        assert_eq!(flags(&out), (true, false, false, true));
    }

    #[test]
    fn carry_in_is_added() {
        let out = add_with_carry(Width::Word, 0x0001, 0x0001, true);
        assert_eq!(out.result, 3);
        let out = add_with_carry(Width::Byte, 0xFE, 0x01, true);
        assert_eq!(out.result, 0);
        assert_eq!(flags(&out), (true, true, false, false));
    }

    #[test]
    fn subtract() {
        // 5 - 3
        let out = subtract_with_carry(Width::Word, 3, 5, true);
        assert_eq!(out.result, 2);
        assert_eq!(flags(&out), (true, false, false, false));

        // 3 - 5 borrows
        let out = subtract_with_carry(Width::Word, 5, 3, true);
        assert_eq!(out.result, 0xFFFE);
        assert_eq!(flags(&out), (false, false, true, false));

        // byte complement must not leak into the high byte
        let out = subtract_with_carry(Width::Byte, 0x01, 0x00, true);
        assert_eq!(out.result, 0xFF);
        assert_eq!(flags(&out), (false, false, true, false));
    }

    #[test]
    fn subtract_with_borrow() {
        // 5 - 3 - 1 (carry clear means borrow)
        let out = subtract_with_carry(Width::Word, 3, 5, false);
        assert_eq!(out.result, 1);
    }

    proptest! {
        #[test]
        fn word_add_flags(x in any::<u16>(), y in any::<u16>()) {
            let out = add_with_carry(Width::Word, x, y, false);
            let sum = u32::from(x) + u32::from(y);
            let truncated = x.wrapping_add(y);
            prop_assert_eq!(out.result, truncated);
            prop_assert_eq!(out.flags.contains(StatusRegister::CARRY), sum > 0xFFFF);
            prop_assert_eq!(out.flags.contains(StatusRegister::ZERO), truncated == 0);
            prop_assert_eq!(out.flags.contains(StatusRegister::NEGATIVE), truncated & 0x8000 != 0);
            let same_sign = (x & 0x8000) == (y & 0x8000);
            let flipped = (truncated & 0x8000) != (y & 0x8000);
            prop_assert_eq!(out.flags.contains(StatusRegister::OVERFLOW), same_sign && flipped);
        }

        #[test]
        fn byte_add_flags(x in any::<u8>(), y in any::<u8>()) {
            let out = add_with_carry(Width::Byte, x.into(), y.into(), false);
            let sum = u16::from(x) + u16::from(y);
            let truncated = x.wrapping_add(y);
            prop_assert_eq!(out.result, u16::from(truncated));
            prop_assert_eq!(out.flags.contains(StatusRegister::CARRY), sum > 0xFF);
            prop_assert_eq!(out.flags.contains(StatusRegister::ZERO), truncated == 0);
            prop_assert_eq!(out.flags.contains(StatusRegister::NEGATIVE), truncated & 0x80 != 0);
            let same_sign = (x & 0x80) == (y & 0x80);
            let flipped = (truncated & 0x80) != (y & 0x80);
            prop_assert_eq!(out.flags.contains(StatusRegister::OVERFLOW), same_sign && flipped);
        }

        #[test]
        fn subtract_self(x in any::<u16>(), byte in any::<bool>()) {
            let width = if byte { Width::Byte } else { Width::Word };
            let x = x & width.mask();
            let out = subtract_with_carry(width, x, x, true);
            prop_assert_eq!(out.result, 0);
            prop_assert_eq!(
                out.flags,
                StatusRegister::ZERO | StatusRegister::CARRY
            );
        }
    }
}
