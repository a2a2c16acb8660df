use std::borrow::Cow;
use std::collections::BTreeSet;
use std::marker::PhantomData;

use anstyle::Style;
use clap::{Command, CommandFactory};
use msp430_emulator::Reg;
use rustyline::{
    completion::Completer,
    highlight::Highlighter,
    hint::Hinter,
    validate::{ValidationContext, ValidationResult, Validator},
    Context,
};
use rustyline_derive::Helper;

/// Line editor helper, completing and hinting the interactive commands and
/// register names.
#[derive(Helper, Debug)]
pub(crate) struct RunHelper<T: CommandFactory> {
    app: PhantomData<T>,
}

impl<T: CommandFactory> RunHelper<T> {
    pub fn new() -> Self {
        RunHelper { app: PhantomData }
    }

    /// Suggestions for the word under the cursor, with the length of the
    /// part already typed
    fn candidates(line: &str, pos: usize) -> Option<(usize, BTreeSet<String>)> {
        let line = line.get(..pos)?;
        let mut words = shell_words::split(line).ok()?;

        // After a blank, the next word is the one to complete
        if line.ends_with([' ', '\t']) {
            words.push(String::new());
        }

        Some(suggest(&T::command(), &words))
    }
}

fn paint(style: Style, text: &str) -> String {
    format!("{}{text}{}", style.render(), style.render_reset())
}

/// Positional arguments which take a register or an address
fn takes_register(id: &str) -> bool {
    matches!(id, "register" | "address" | "target" | "value")
}

fn suggest(command: &Command, input: &[String]) -> (usize, BTreeSet<String>) {
    match input {
        [head, tail @ ..] if !tail.is_empty() => command
            .find_subcommand(head)
            .map(|sub| suggest(sub, tail))
            .unwrap_or_default(),

        _ => {
            let mut suggestions: BTreeSet<String> = command
                .get_subcommands()
                .flat_map(|cmd| {
                    std::iter::once(cmd.get_name().to_string())
                        .chain(cmd.get_visible_aliases().map(ToString::to_string))
                })
                .collect();

            if command.has_subcommands() {
                suggestions.insert("help".to_string());
            }

            let index = input.len().saturating_sub(1);
            if let Some(arg) = command.get_positionals().nth(index) {
                if takes_register(arg.get_id().as_str()) {
                    suggestions.extend(Reg::ALL.iter().map(ToString::to_string));
                }
            }

            let typed = input.last().map_or("", String::as_str);
            let matching = suggestions
                .into_iter()
                .filter(|s| s.starts_with(typed))
                .collect();
            (typed.len(), matching)
        }
    }
}

impl<T: CommandFactory> Completer for RunHelper<T> {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        Ok(Self::candidates(line, pos).map_or_else(
            || (0, Vec::new()),
            |(typed, candidates)| (pos - typed, candidates.into_iter().collect()),
        ))
    }
}

impl<T: CommandFactory> Highlighter for RunHelper<T> {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(paint(Style::new().dimmed(), hint))
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        Cow::Owned(paint(Style::new().bold(), prompt))
    }
}

impl<T: CommandFactory> Hinter for RunHelper<T> {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let (typed, candidates) = Self::candidates(line, pos)?;

        // Only hint when there is no ambiguity
        let mut candidates = candidates.into_iter();
        match (candidates.next(), candidates.next()) {
            (Some(candidate), None) => candidate.get(typed..).map(ToString::to_string),
            _ => None,
        }
    }
}

impl<T: CommandFactory> Validator for RunHelper<T> {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        // Unbalanced quotes continue on the next line
        if shell_words::split(ctx.input()).is_err() {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactive::Command as SessionCommand;
    use pretty_assertions::assert_eq;

    fn complete(line: &str) -> (usize, Vec<String>) {
        RunHelper::<SessionCommand>::candidates(line, line.len())
            .map(|(typed, c)| (typed, c.into_iter().collect()))
            .unwrap_or_default()
    }

    #[test]
    fn complete_commands() {
        assert_eq!(complete("re"), (2, vec!["registers".to_string()]));
        assert_eq!(
            complete("s"),
            (1, vec!["set".to_string(), "step".to_string()])
        );
        assert_eq!(complete("info st"), (2, vec!["steps".to_string()]));
    }

    #[test]
    fn complete_registers() {
        assert_eq!(
            complete("registers r1"),
            (
                2,
                vec![
                    "r10".to_string(),
                    "r11".to_string(),
                    "r12".to_string(),
                    "r13".to_string(),
                    "r14".to_string(),
                    "r15".to_string(),
                ]
            )
        );
        assert_eq!(complete("memory s"), (1, vec!["sp".to_string(), "sr".to_string()]));
    }
}
