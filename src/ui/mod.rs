//! Terminal output: status lines, spinners and result tables.

use comfy_table::{Attribute, Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::generation::{CallState, Generation, ProviderAttempt};
use crate::models::{ProviderKind, QuestionKind};

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Pending,
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Pending => "○",
    }
}

/// Icon shown next to a provider name
pub fn provider_icon(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Gemini => "✦",
        ProviderKind::Claude => "◆",
        ProviderKind::OpenAi => "●",
        ProviderKind::LocalTemplate => "▣",
    }
}

/// Print a styled status message.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => println!("{} {}", icon.yellow().bold(), msg),
        Status::Info => println!("{} {}", icon.cyan().bold(), msg),
        Status::Pending => println!("{} {}", icon.white().dimmed(), msg),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Get a human-readable file size.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Table of what was generated, one row per content kind
pub fn materials_table(generation: &Generation) -> Table {
    let materials = &generation.materials;

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Content", "Count"]);

    for kind in QuestionKind::ALL {
        let count = materials.count_of(kind);
        if count > 0 {
            table.add_row(vec![Cell::new(kind.label()), Cell::new(count)]);
        }
    }
    table.add_row(vec![
        Cell::new("Flash cards"),
        Cell::new(materials.flashcards.len()),
    ]);
    if !materials.summary.is_empty() {
        table.add_row(vec![
            Cell::new("Summary words"),
            Cell::new(materials.summary.split_whitespace().count()),
        ]);
    }
    table.add_row(vec![
        Cell::new("Provider").add_attribute(Attribute::Bold),
        Cell::new(format!(
            "{} {}",
            provider_icon(materials.provider),
            materials.provider.name()
        ))
        .add_attribute(Attribute::Bold),
    ]);

    table
}

/// Table of every provider tried, in order
pub fn attempts_table(attempts: &[ProviderAttempt]) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Provider", "Result", "Time", "Detail"]);

    for attempt in attempts {
        let (label, color) = match attempt.state {
            CallState::Succeeded => ("succeeded", Color::Green),
            CallState::Failed => ("failed", Color::Red),
            CallState::NotStarted => ("skipped", Color::Yellow),
            CallState::InFlight => ("in flight", Color::Cyan),
        };
        table.add_row(vec![
            Cell::new(attempt.provider.name()),
            Cell::new(label).fg(color),
            Cell::new(format!("{:.1}s", attempt.elapsed.as_secs_f64())),
            Cell::new(attempt.failure.as_deref().unwrap_or("")),
        ]);
    }

    table
}

/// Loading spinner with message.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    /// Create a new spinner with the given message.
    pub fn new(msg: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(style("{spinner:.cyan} {msg}").tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// A spinner that draws nothing, for `--quiet` or non-terminal output
    pub fn hidden() -> Self {
        Self {
            pb: ProgressBar::hidden(),
        }
    }

    /// Set the message.
    pub fn set_message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }

    /// Finish with success message.
    pub fn finish_with_success(&self, msg: &str) {
        self.pb
            .set_style(style("{spinner:.green} {msg}").tick_chars("✓✓"));
        self.pb.finish_with_message(msg.to_string());
    }

    /// Finish with error message.
    pub fn finish_with_error(&self, msg: &str) {
        self.pb.set_style(style("{spinner:.red} {msg}").tick_chars("✗✗"));
        self.pb.finish_with_message(msg.to_string());
    }

    /// Remove the spinner from the terminal.
    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
}
