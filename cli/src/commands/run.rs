use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueHint};
use msp430_emulator::Computer;
use tracing::{debug, info};

use crate::interactive::run_interactive;

#[derive(Parser, Debug)]
pub struct RunOpt {
    /// Raw program image, loaded at the start of the code area
    #[arg(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// Maximum number of instructions to execute
    #[arg(long, default_value_t = 10_000)]
    max_steps: u64,

    /// Run the program in interactive mode
    #[arg(short, long, action = ArgAction::SetTrue)]
    interactive: bool,
}

impl RunOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        info!(path = %self.input, "Reading program");
        let program = std::fs::read(&self.input)
            .with_context(|| format!("could not read program image {}", self.input))?;

        debug!(size = program.len(), "Building computer");
        let mut computer = Computer::with_program(&program)?;

        info!("Running program");
        if self.interactive {
            run_interactive(&mut computer)?;
        } else {
            match computer.run(self.max_steps) {
                Ok(executed) => info!(executed, "Reached the step limit"),
                Err(e) => {
                    info!(registers = %computer.registers, steps = computer.steps, "Machine state");
                    return Err(e.into());
                }
            }
        }

        info!(registers = %computer.registers, "End of program");

        Ok(())
    }
}
