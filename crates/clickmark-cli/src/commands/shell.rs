//! Interactive shell
//!
//! Reads one command per line and re-renders the collection after every
//! action. Entries are addressed by their position in the last listing or
//! by URL.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use clickmark_core::format::normalize_for_display;
use clickmark_core::{EntryStore, SortKey};

use super::{require_target, Connection};
use crate::output::Output;
use crate::prompt;

const HELP: &str = "\
Commands:
  add <url>          Save a URL
  rm <n|url>         Delete an entry
  open <n|url>       Open an entry and count the click
  sort <key>         Sort by alpha, clicks or last-visit (again to reverse)
  shuffle            Random order
  edit               Enter or leave edit mode (leaving saves changes)
  set <n> <value>    Edit an entry's URL (edit mode)
  blur <n>           Save one edited entry now (edit mode)
  reload             Fetch the collection again
  login | logout     Sign in with the configured token, or sign out
  list               Show the collection
  help               Show this help
  quit               Leave the shell";

/// One parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Add(String),
    Remove(String),
    Open(String),
    Sort(SortKey),
    Shuffle,
    Edit,
    Set { target: String, value: String },
    Blur(String),
    Reload,
    Login,
    Logout,
    List,
    Help,
    Quit,
}

/// Parse a line; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let need = |what: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("usage: {} {}", word, what))
        } else {
            Ok(rest.to_string())
        }
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "add" => ShellCommand::Add(need("<url>")?),
        "rm" | "delete" => ShellCommand::Remove(need("<n|url>")?),
        "open" | "click" => ShellCommand::Open(need("<n|url>")?),
        "sort" => ShellCommand::Sort(need("<alpha|clicks|last-visit>")?.parse()?),
        "shuffle" => ShellCommand::Shuffle,
        "edit" => ShellCommand::Edit,
        "set" => {
            let args = need("<n|url> <value>")?;
            let (target, value) = args
                .split_once(char::is_whitespace)
                .ok_or_else(|| format!("usage: {} <n|url> <value>", word))?;
            ShellCommand::Set {
                target: target.to_string(),
                value: value.trim().to_string(),
            }
        }
        "blur" => ShellCommand::Blur(need("<n|url>")?),
        "reload" => ShellCommand::Reload,
        "login" => ShellCommand::Login,
        "logout" => ShellCommand::Logout,
        "list" | "ls" => ShellCommand::List,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };
    Ok(Some(command))
}

/// Run the shell until `quit` or end of input
pub async fn run(conn: &Connection, no_browser: bool, output: &Output) -> Result<()> {
    let store = &conn.store;

    match conn.identity.clone() {
        Some(identity) => {
            if let Err(e) = store.sign_in(identity).await {
                output.failure(&e);
            }
        }
        None => output.message("Not signed in. Configure a token, then use 'login'."),
    }
    render(store, output).await;
    output.message("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt::shell_prompt(store.snapshot().await.edit_mode)?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(msg) => {
                eprintln!("{}", msg);
                continue;
            }
        };
        debug!(?command, "shell command");

        match command {
            ShellCommand::Quit => break,
            ShellCommand::Help => {
                println!("{}", HELP);
                continue;
            }
            command => {
                if let Err(e) = execute(conn, command, no_browser, output).await {
                    eprintln!("✗ {:#}", e);
                }
            }
        }

        render(store, output).await;
    }

    Ok(())
}

async fn render(store: &EntryStore, output: &Output) {
    output.print_snapshot(&store.snapshot().await, store.now());
}

/// Run one command
///
/// Store failures are reported here and do not end the shell; the error
/// return is for input the shell could not act on.
pub async fn execute(conn: &Connection, command: ShellCommand, no_browser: bool, output: &Output) -> Result<()> {
    let store = &conn.store;

    match command {
        ShellCommand::Add(raw) => match store.insert(&raw).await {
            Ok(entry) => output.success(&format!("Added {}", normalize_for_display(&entry.url))),
            Err(e) => output.failure(&e),
        },
        ShellCommand::Remove(target) => {
            let url = require_target(&store.entries().await, &target)?;
            if let Err(e) = store.delete(&url).await {
                output.failure(&e);
            }
        }
        ShellCommand::Open(target) => {
            let url = require_target(&store.entries().await, &target)?;
            if !no_browser {
                open::that(&url).with_context(|| format!("Failed to open {} in the browser", url))?;
            }
            if let Err(e) = store.increment_click(&url).await {
                warn!(%url, "click not recorded: {}", e);
                output.failure(&e);
            }
        }
        ShellCommand::Sort(key) => store.sort(key).await,
        ShellCommand::Shuffle => store.shuffle().await,
        ShellCommand::Edit => {
            let flush = store.toggle_edit_mode().await;
            for (from, to) in &flush.renamed {
                output.success(&format!(
                    "Renamed {} to {}",
                    normalize_for_display(from),
                    normalize_for_display(to)
                ));
            }
            for (_, e) in &flush.failed {
                output.failure(e);
            }
        }
        ShellCommand::Set { target, value } => {
            let url = require_target(&store.entries().await, &target)?;
            if let Err(e) = store.set_edit(&url, &value).await {
                output.failure(&e);
            }
        }
        ShellCommand::Blur(target) => {
            let url = require_target(&store.entries().await, &target)?;
            match store.commit_edit(&url).await {
                Ok(Some(entry)) => output.success(&format!(
                    "Renamed {} to {}",
                    normalize_for_display(&url),
                    normalize_for_display(&entry.url)
                )),
                Ok(None) => {}
                Err(e) => output.failure(&e),
            }
        }
        ShellCommand::Reload => {
            if let Err(e) = store.load().await {
                output.failure(&e);
            }
        }
        ShellCommand::Login => {
            let identity = conn.require_identity()?;
            if let Err(e) = store.sign_in(identity).await {
                output.failure(&e);
            }
        }
        ShellCommand::Logout => store.sign_out().await,
        ShellCommand::List | ShellCommand::Help | ShellCommand::Quit => {}
    }

    Ok(())
}
