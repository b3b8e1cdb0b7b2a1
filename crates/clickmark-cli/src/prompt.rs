//! Terminal prompts

use anyhow::Result;
use std::io::{self, Write};

/// Whether stdin is an interactive terminal
pub fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin)
}

/// Prompt for confirmation
///
/// Returns true if user confirms, false otherwise.
/// In non-interactive mode (no TTY), returns false.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !is_interactive() {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(is_yes(&input))
}

/// Show the shell prompt when a person is typing
pub fn shell_prompt(edit_mode: bool) -> Result<()> {
    if !is_interactive() {
        return Ok(());
    }
    print!("{} ", if edit_mode { "edit>" } else { "clickmark>" });
    io::stdout().flush()?;
    Ok(())
}

fn is_yes(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    input == "y" || input == "yes"
}
