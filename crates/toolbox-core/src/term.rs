//! Terminal utilities for operator prompts.

use dialoguer::Password;
use std::io::{self, BufRead, IsTerminal, Write};
use toolbox_types::{Prompt, Result, ToolboxError};

/// Prompts on the operator's terminal.
///
/// Input is masked when stdin is a terminal; piped input is read one line
/// at a time so unattended runs can feed values through stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn read_piped_line(message: &str) -> Result<String> {
        eprint!("{}: ", message);
        io::stderr().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl Prompt for TerminalPrompt {
    fn secret(&self, message: &str) -> Result<String> {
        if !io::stdin().is_terminal() {
            return Self::read_piped_line(message);
        }

        Password::new()
            .with_prompt(message)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| ToolboxError::Generation(format!("prompt: {}", e)))
    }
}
