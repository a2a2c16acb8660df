use std::str::FromStr;

use msp430_emulator::constants as C;
use msp430_emulator::{Computer, Reg};
use nom::branch::alt;
use nom::bytes::complete::tag_no_case;
use nom::character::complete::{alphanumeric1, char, digit1, hex_digit1, space0};
use nom::combinator::{all_consuming, map, map_res, opt, value};
use nom::error::{convert_error, VerboseError};
use nom::sequence::{delimited, preceded, tuple};
use nom::{Finish, IResult};
use thiserror::Error;

/// A value typed in the interactive prompt.
///
/// Used both as an address (`memory`, `break`) and as the value to store
/// with `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    Literal(C::Word),
    Register(Reg),
    Offset(Reg, i32),
}

impl Argument {
    /// Resolve the argument against the current machine state
    pub fn evaluate(self, computer: &Computer) -> C::Word {
        match self {
            Argument::Literal(value) => value,
            Argument::Register(reg) => computer.register(reg),
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Argument::Offset(reg, offset) => computer.register(reg).wrapping_add(offset as u16),
        }
    }
}

/// Where the `set` command writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentTarget {
    Register(Reg),
    Address(Argument),
}

#[derive(Debug, Error)]
#[error("could not parse expression: {0}")]
pub struct ParseArgumentError(String);

impl FromStr for Argument {
    type Err = ParseArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        run_parser(parse_argument, s)
    }
}

impl FromStr for AssignmentTarget {
    type Err = ParseArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        run_parser(parse_assignment_target, s)
    }
}

fn run_parser<'a, T>(
    parser: impl FnMut(&'a str) -> IResult<&'a str, T, VerboseError<&'a str>>,
    input: &'a str,
) -> Result<T, ParseArgumentError> {
    all_consuming(delimited(space0, parser, space0))(input)
        .finish()
        .map(|(_, ret)| ret)
        .map_err(|e| ParseArgumentError(convert_error(input, e)))
}

fn parse_number(input: &str) -> IResult<&str, u32, VerboseError<&str>> {
    alt((
        map_res(preceded(tag_no_case("0x"), hex_digit1), |digits| {
            u32::from_str_radix(digits, 16)
        }),
        map_res(digit1, |digits: &str| digits.parse::<u32>()),
    ))(input)
}

fn parse_literal(input: &str) -> IResult<&str, C::Word, VerboseError<&str>> {
    map_res(
        tuple((opt(char('-')), parse_number)),
        |(minus, number)| -> Result<C::Word, std::num::TryFromIntError> {
            let word = C::Word::try_from(number)?;
            Ok(if minus.is_some() {
                word.wrapping_neg()
            } else {
                word
            })
        },
    )(input)
}

fn parse_register(input: &str) -> IResult<&str, Reg, VerboseError<&str>> {
    map_res(alphanumeric1, Reg::from_str)(input)
}

fn parse_offset(input: &str) -> IResult<&str, Argument, VerboseError<&str>> {
    let (rest, reg) = parse_register(input)?;
    let (rest, sign) = delimited(
        space0,
        alt((value(1_i64, char('+')), value(-1_i64, char('-')))),
        space0,
    )(rest)?;
    let (rest, offset) = map_res(parse_number, |n| i32::try_from(sign * i64::from(n)))(rest)?;
    Ok((rest, Argument::Offset(reg, offset)))
}

fn parse_argument(input: &str) -> IResult<&str, Argument, VerboseError<&str>> {
    alt((
        map(parse_literal, Argument::Literal),
        parse_offset,
        map(parse_register, Argument::Register),
    ))(input)
}

fn parse_assignment_target(input: &str) -> IResult<&str, AssignmentTarget, VerboseError<&str>> {
    alt((
        map(all_consuming(parse_register), AssignmentTarget::Register),
        map(parse_argument, AssignmentTarget::Address),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_literals() {
        assert_eq!("42".parse::<Argument>().unwrap(), Argument::Literal(42));
        assert_eq!(
            "0x8000".parse::<Argument>().unwrap(),
            Argument::Literal(0x8000)
        );
        assert_eq!("0XfF".parse::<Argument>().unwrap(), Argument::Literal(0xFF));
        assert_eq!("-1".parse::<Argument>().unwrap(), Argument::Literal(0xFFFF));
        assert!("0x10000".parse::<Argument>().is_err());
        assert!("65536".parse::<Argument>().is_err());
    }

    #[test]
    fn parse_registers() {
        assert_eq!("pc".parse::<Argument>().unwrap(), Argument::Register(Reg::PC));
        assert_eq!("SP".parse::<Argument>().unwrap(), Argument::Register(Reg::SP));
        assert_eq!("r3".parse::<Argument>().unwrap(), Argument::Register(Reg::CG));
        assert_eq!(
            "r15".parse::<Argument>().unwrap(),
            Argument::Register(Reg::R15)
        );
        assert!("r16".parse::<Argument>().is_err());
        assert!("foo".parse::<Argument>().is_err());
    }

    #[test]
    fn parse_offsets() {
        assert_eq!(
            "r4+2".parse::<Argument>().unwrap(),
            Argument::Offset(Reg::R4, 2)
        );
        assert_eq!(
            "sp - 0x10".parse::<Argument>().unwrap(),
            Argument::Offset(Reg::SP, -16)
        );
        assert!("r4+".parse::<Argument>().is_err());
    }

    #[test]
    fn parse_targets() {
        assert_eq!(
            "r5".parse::<AssignmentTarget>().unwrap(),
            AssignmentTarget::Register(Reg::R5)
        );
        assert_eq!(
            "0x200".parse::<AssignmentTarget>().unwrap(),
            AssignmentTarget::Address(Argument::Literal(0x200))
        );
        assert_eq!(
            "r5+4".parse::<AssignmentTarget>().unwrap(),
            AssignmentTarget::Address(Argument::Offset(Reg::R5, 4))
        );
    }

    #[test]
    fn evaluate_arguments() {
        let mut computer = Computer::default();
        computer.set_register(Reg::R4, 0x2000);

        assert_eq!(Argument::Literal(7).evaluate(&computer), 7);
        assert_eq!(Argument::Register(Reg::R4).evaluate(&computer), 0x2000);
        assert_eq!(Argument::Offset(Reg::R4, -2).evaluate(&computer), 0x1FFE);
        assert_eq!(Argument::Offset(Reg::PC, 4).evaluate(&computer), 0x8004);
        // Address arithmetic wraps around
        assert_eq!(Argument::Offset(Reg::R5, -1).evaluate(&computer), 0xFFFF);
    }
}
