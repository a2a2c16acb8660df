//! This module implements the TTY interactive interface.
//!
//! It is mainly based on two crates:
//!   - rustyline, to handle the line-editting logic
//!   - clap, to handle the parsing of those interactive commands
//!
//! Using Parser to do this is a bit of a hack, and requires some weird options
//! to have it working but works nonetheless.

use std::collections::BTreeSet;

use clap::Parser;
use msp430_emulator::constants as C;
use msp430_emulator::runtime::Instruction;
use msp430_emulator::{Computer, Reg};
use rustyline::history::DefaultHistory;
use rustyline::{Behavior, CompletionType, Config, EditMode, Editor};
use tracing::{debug, info, warn};

mod helper;
mod parse;
use self::helper::RunHelper;

static HELP: &str = r#"
Run "help [command]" for command-specific help.
An empty line re-runs the last valid command."#;

#[derive(Parser, Clone, Debug)]
#[command(
    help_template = "{about}\n\nCOMMANDS:\n{subcommands}\n{after-help}",
    after_help = HELP,
    disable_version_flag = true,
    infer_subcommands = true,
    no_binary_name = true,
)]
/// Interactive mode commands
enum Command {
    /// Execute the next instructions
    #[command(alias = "s")]
    Step {
        /// Number of steps to execute
        #[arg(default_value_t = 1)]
        number: u64,
    },

    /// Exit the emulator
    Exit,

    /// Show the state of registers
    Registers { register: Option<Reg> },

    /// Show memory words starting at an address
    Memory {
        /// The address to show. Can be a direct address (number literal) or an
        /// indirect one (register with an optional offset).
        #[arg(allow_negative_numbers = true)]
        address: parse::Argument,

        /// Number of words to show
        #[arg(default_value_t = 1)]
        number: u16,
    },

    /// Set a register or a word in memory
    Set {
        /// The address or register to set
        #[arg(allow_negative_numbers = true)]
        target: parse::AssignmentTarget,

        /// The value to set
        #[arg(allow_negative_numbers = true)]
        value: parse::Argument,
    },

    /// Set a breakpoint
    Break {
        /// The address where to set the breakpoint
        #[arg(allow_negative_numbers = true)]
        address: parse::Argument,
    },

    /// Remove a breakpoint
    Unbreak {
        /// The address of the breakpoint to remove
        #[arg(allow_negative_numbers = true)]
        address: parse::Argument,
    },

    /// Continue the program until the next breakpoint or fault
    Continue,

    /// Show informations about the current debugging session
    Info {
        #[command(subcommand)]
        sub: Option<InfoCommand>,
    },
}

#[derive(Parser, Clone, Debug)]
enum InfoCommand {
    /// List active breakpoints
    Breakpoints,

    /// Show the number of instructions executed since the beginning of the program
    Steps,
}

/// Holds informations about a interactive session
#[derive(Debug, Default)]
struct Session {
    /// Active breakpoints, sorted by address
    breakpoints: BTreeSet<C::Address>,

    /// Set once the machine faulted
    halted: bool,
}

impl Session {
    fn add_breakpoint(&mut self, address: C::Address) {
        if self.breakpoints.insert(address) {
            info!(address, "Setting a breakpoint");
        } else {
            warn!(address, "A breakpoint was already set");
        }
    }

    fn remove_breakpoint(&mut self, address: C::Address) {
        if self.breakpoints.remove(&address) {
            info!(address, "Removing breakpoint");
        } else {
            warn!(address, "No breakpoint was set here");
        }
    }

    fn has_breakpoint(&self, address: C::Address) -> bool {
        self.breakpoints.contains(&address)
    }

    /// Execute one instruction, halting the session on a fault
    fn step(&mut self, computer: &mut Computer) -> bool {
        match computer.step() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = &e as &dyn std::error::Error, "Halted");
                self.halted = true;
                false
            }
        }
    }

    /// Run until a breakpoint is reached or the machine faults.
    ///
    /// The instruction under %pc is always executed, so that continuing from
    /// a breakpoint makes progress.
    fn resume(&mut self, computer: &mut Computer) {
        while self.step(computer) {
            let pc = computer.registers.pc();
            if self.has_breakpoint(pc) {
                info!(address = pc, "Stopped at a breakpoint");
                return;
            }
        }
    }

    fn display_breakpoints(&self, computer: &Computer) {
        match self.breakpoints.len() {
            0 => info!("No breakpoints"),
            1 => info!("1 breakpoint:"),
            x => info!("{} breakpoints:", x),
        }

        for &address in &self.breakpoints {
            display_instruction(computer, address);
        }
    }

    fn display_steps(computer: &Computer) {
        info!("Steps: {}", computer.steps);
    }

    /// Run a single command. Returns `false` when the session should end.
    fn execute(&mut self, computer: &mut Computer, command: Command) -> bool {
        match (command, self.halted) {
            (Command::Exit, _) => return false,

            (Command::Step { number }, false) => {
                for _ in 0..number {
                    if !self.step(computer) {
                        break;
                    }
                }
                display_instruction(computer, computer.registers.pc());
            }

            (Command::Registers { register }, _) => match register {
                Some(Reg::SR) => info!("Register sr = {}", computer.registers.sr()),
                Some(reg) => info!("Register {} = {:#06x}", reg, computer.register(reg)),
                None => info!("Registers: {}", computer.registers),
            },

            (Command::Memory { address, number }, _) => {
                let address = address.evaluate(computer);
                for i in 0..number {
                    let address = address.wrapping_add(i.wrapping_mul(2));
                    let word = computer.read_word(address);
                    info!("{:#06x}: {:#06x}", address, word);
                }
            }

            (Command::Set { target, value }, false) => {
                let value = value.evaluate(computer);
                match target {
                    parse::AssignmentTarget::Register(reg) => {
                        info!("Setting register {reg} to {value:#06x}");
                        computer.set_register(reg, value);
                    }
                    parse::AssignmentTarget::Address(address) => {
                        let address = address.evaluate(computer);
                        info!("Setting memory at address {address:#06x} to {value:#06x}");
                        computer.write_word(address, value);
                    }
                }
            }

            (Command::Break { address }, _) => {
                self.add_breakpoint(address.evaluate(computer));
            }

            (Command::Unbreak { address }, _) => {
                self.remove_breakpoint(address.evaluate(computer));
            }

            (Command::Continue, false) => self.resume(computer),

            (Command::Info { sub }, _) => match sub {
                Some(InfoCommand::Breakpoints) => self.display_breakpoints(computer),
                Some(InfoCommand::Steps) => Self::display_steps(computer),
                None => {
                    self.display_breakpoints(computer);
                    info!("-");
                    Self::display_steps(computer);
                }
            },

            (_, true) => {
                // Computer is halted but the user asked to continue, we just warn
                warn!("Computer is halted. Use \"exit\" to quit");
            }
        }

        true
    }
}

/// Display the instruction at the given address, with a marker for %pc
fn display_instruction(computer: &Computer, address: C::Address) {
    let gutter = if computer.registers.pc() == address {
        ">"
    } else {
        " "
    };

    match Instruction::decode(computer.read_word(address)) {
        Ok(instruction) => info!("{} {:#06x}    {}", gutter, address, instruction),
        Err(_) => info!("{} {:#06x}    -", gutter, address),
    }
}

pub(crate) fn run_interactive(computer: &mut Computer) -> anyhow::Result<()> {
    info!("Running in interactive mode. Type \"help\" to list available commands.");
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .behavior(Behavior::PreferTerm)
        .auto_add_history(true)
        .build();

    let mut session = Session::default();

    let mut rl: Editor<RunHelper<Command>, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(RunHelper::new()));

    let mut last_command: Option<Command> = None;

    loop {
        let Ok(readline) = rl.readline(">> ") else {
            info!("EOF, exitting");
            return Ok(());
        };

        let command = if readline.trim().is_empty() {
            if let Some(command) = &last_command {
                command.clone()
            } else {
                info!("Type \"help\" to get the list of available commands");
                continue;
            }
        } else {
            let Ok(words) = shell_words::split(readline.as_str()) else {
                warn!("Invalid input");
                continue;
            };

            match Command::try_parse_from(words) {
                Ok(command) => {
                    last_command = Some(command.clone());
                    command
                }
                Err(e) => {
                    warn!(error = %e);
                    continue;
                }
            }
        };

        debug!("Executing command: {:?}", command);

        if !session.execute(computer, command) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_command(line: &str) -> Command {
        Command::try_parse_from(shell_words::split(line).unwrap()).unwrap()
    }

    fn computer() -> Computer {
        // mov #1, r5 ; add r5, r5 ; add r5, r5 ; then a conditional jump
        let words: [C::Word; 4] = [0x4315, 0x5505, 0x5505, 0x2000];
        let program: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        Computer::with_program(&program).unwrap()
    }

    #[test]
    fn step_and_set() {
        let mut computer = computer();
        let mut session = Session::default();

        assert!(session.execute(&mut computer, parse_command("step 2")));
        assert_eq!(computer.register(Reg::R5), 2);
        assert_eq!(computer.steps, 2);

        assert!(session.execute(&mut computer, parse_command("set r5 0x10")));
        assert_eq!(computer.register(Reg::R5), 0x10);

        assert!(session.execute(&mut computer, parse_command("set r5+2 -1")));
        assert_eq!(computer.read_word(0x12), 0xFFFF);

        assert!(!session.execute(&mut computer, parse_command("exit")));
    }

    #[test]
    fn continue_to_breakpoint() {
        let mut computer = computer();
        let mut session = Session::default();

        session.execute(&mut computer, parse_command("break 0x8004"));
        session.execute(&mut computer, parse_command("continue"));
        assert_eq!(computer.registers.pc(), 0x8004);
        assert_eq!(computer.register(Reg::R5), 2);
        assert!(!session.halted);

        // Continuing from a breakpoint runs until the fault
        session.execute(&mut computer, parse_command("unbreak pc"));
        session.execute(&mut computer, parse_command("continue"));
        assert!(session.halted);
        assert_eq!(computer.registers.pc(), 0x8006);
        assert_eq!(computer.register(Reg::R5), 4);
        assert_eq!(computer.steps, 3);

        // A halted machine doesn't run anymore
        session.execute(&mut computer, parse_command("step"));
        assert_eq!(computer.steps, 3);
    }

    #[test]
    fn parse_commands() {
        assert!(matches!(parse_command("s"), Command::Step { number: 1 }));
        assert!(matches!(parse_command("step 5"), Command::Step { number: 5 }));
        assert!(matches!(
            parse_command("registers pc"),
            Command::Registers {
                register: Some(Reg::PC)
            }
        ));
        assert!(matches!(
            parse_command("memory sp-2 4"),
            Command::Memory {
                address: parse::Argument::Offset(Reg::SP, -2),
                number: 4
            }
        ));
        assert!(matches!(
            parse_command("info steps"),
            Command::Info {
                sub: Some(InfoCommand::Steps)
            }
        ));
        assert!(matches!(
            parse_command("set r5 -1"),
            Command::Set {
                target: parse::AssignmentTarget::Register(Reg::R5),
                value: parse::Argument::Literal(0xFFFF)
            }
        ));
        assert!(matches!(
            parse_command("break -2"),
            Command::Break {
                address: parse::Argument::Literal(0xFFFE)
            }
        ));
        assert!(Command::try_parse_from(["frobnicate"]).is_err());
    }
}
