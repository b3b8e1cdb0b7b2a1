//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::{DateTime, Utc};
use serde::Serialize;

use clickmark_core::format::{click_summary, normalize_for_display};
use clickmark_core::{Entry, Phase, Snapshot, SortKey, StoreError};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print the whole collection as the store currently sees it
    pub fn print_snapshot(&self, snapshot: &Snapshot, now: DateTime<Utc>) {
        match self.format {
            OutputFormat::Human => {
                println!("{}", render_header(snapshot));
                if snapshot.entries.is_empty() {
                    match snapshot.phase {
                        Phase::Loading => println!("Loading..."),
                        _ => println!("No entries."),
                    }
                } else {
                    for (i, view) in snapshot.entries.iter().enumerate() {
                        println!("{}", render_row(i + 1, view, snapshot.edit_mode, now));
                    }
                }
                if !snapshot.deleting.is_empty() {
                    println!("(deleting {})", snapshot.deleting.len());
                }
                if snapshot.submitting {
                    println!("(saving...)");
                }
            }
            OutputFormat::Json => print_json(snapshot),
            OutputFormat::Quiet => {
                for view in &snapshot.entries {
                    println!("{}", view.entry.url);
                }
            }
        }
    }

    /// Print a single entry
    pub fn print_entry(&self, entry: &Entry, now: DateTime<Utc>) {
        match self.format {
            OutputFormat::Human => {
                println!(
                    "{} {}",
                    normalize_for_display(&entry.url),
                    click_summary(entry, now)
                );
            }
            OutputFormat::Json => print_json(entry),
            OutputFormat::Quiet => println!("{}", entry.url),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Report a store error without aborting
    pub fn failure(&self, error: &StoreError) {
        match self.format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "error",
                        "message": error.to_string(),
                        "recoverable": error.is_recoverable(),
                    })
                );
            }
            OutputFormat::Human | OutputFormat::Quiet => {
                eprintln!("✗ {}", error);
                if let Some(hint) = error.recovery_suggestion() {
                    if !self.is_quiet() {
                        eprintln!("  {}", hint);
                    }
                }
            }
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("✗ Failed to encode JSON: {}", e),
    }
}

/// Signed-in principal, entry count and the three sort controls
fn render_header(snapshot: &Snapshot) -> String {
    let who = snapshot.principal.as_deref().unwrap_or("(signed out)");
    let mode = if snapshot.edit_mode { "  [editing]" } else { "" };
    format!(
        "{} · {} entries   [{}] [{}] [{}]{}",
        who,
        snapshot.entries.len(),
        snapshot.sort.label(SortKey::Alphabetical),
        snapshot.sort.label(SortKey::ClickCount),
        snapshot.sort.label(SortKey::LastVisit),
        mode
    )
}

/// One numbered row; edit mode shows the raw URL and any draft
fn render_row(n: usize, view: &clickmark_core::EntryView, edit_mode: bool, now: DateTime<Utc>) -> String {
    let mut row = if edit_mode {
        match &view.draft {
            Some(draft) => format!("{:>3}. {}  -> {}", n, view.entry.url, draft),
            None => format!("{:>3}. {}", n, view.entry.url),
        }
    } else {
        format!(
            "{:>3}. {} {}",
            n,
            truncate(normalize_for_display(&view.entry.url), 60),
            click_summary(&view.entry, now)
        )
    };

    if view.renaming {
        row.push_str("  (renaming)");
    }
    if view.clicking {
        row.push_str("  (opening)");
    }
    row
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
