use console::style;
use dialoguer::{Confirm, Input, Select};
use std::io::{stdin, IsTerminal};
use wpdev_core::{CoreError, Prompter};

fn prompt_failed(e: dialoguer::Error) -> CoreError {
    CoreError::Prompt(e.to_string())
}

/// Asks on the terminal.
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn prompt_text(&mut self, message: &str, initial: &str) -> Result<String, CoreError> {
        Input::new()
            .with_prompt(message)
            .with_initial_text(initial)
            .validate_with(|input: &String| -> Result<(), &str> {
                if input.trim().is_empty() {
                    Err("value needs to be provided")
                } else {
                    Ok(())
                }
            })
            .interact_text()
            .map_err(prompt_failed)
    }

    fn prompt_boolean(&mut self, message: &str, initial: bool) -> Result<bool, CoreError> {
        Confirm::new()
            .with_prompt(message)
            .default(initial)
            .interact()
            .map_err(prompt_failed)
    }

    fn prompt_select(
        &mut self,
        message: &str,
        choices: &[String],
        initial: usize,
    ) -> Result<usize, CoreError> {
        Select::new()
            .with_prompt(message)
            .items(choices)
            .default(initial)
            .interact()
            .map_err(prompt_failed)
    }

    fn warn(&mut self, message: &str) {
        eprintln!("{} {message}", style("Warning:").yellow().bold());
    }
}

/// Takes every default without asking; used when stdin is not a terminal.
///
/// A question with no usable default fails, naming the flag to pass instead.
pub struct DefaultsPrompter;

impl Prompter for DefaultsPrompter {
    fn prompt_text(&mut self, message: &str, initial: &str) -> Result<String, CoreError> {
        if initial.trim().is_empty() {
            return Err(CoreError::Prompt(format!(
                "'{}' needs a value and stdin is not a TTY (pass it as a flag)",
                message.trim()
            )));
        }
        Ok(initial.to_owned())
    }

    fn prompt_boolean(&mut self, _message: &str, initial: bool) -> Result<bool, CoreError> {
        Ok(initial)
    }

    fn prompt_select(
        &mut self,
        message: &str,
        choices: &[String],
        initial: usize,
    ) -> Result<usize, CoreError> {
        if initial < choices.len() {
            Ok(initial)
        } else {
            Err(CoreError::Prompt(format!("no default choice for '{message}'")))
        }
    }

    fn warn(&mut self, message: &str) {
        eprintln!("{} {message}", style("Warning:").yellow().bold());
    }
}

pub fn is_interactive() -> bool {
    stdin().is_terminal()
}

/// The terminal prompter when attached to a TTY, defaults otherwise.
pub fn prompter() -> Box<dyn Prompter> {
    if is_interactive() {
        Box::new(DialoguerPrompter)
    } else {
        Box::new(DefaultsPrompter)
    }
}
