//! Output formatting utilities

use analyzer_lib::Timestamp;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table of rows, or `empty_message` when there are none
pub fn print_table<T: Tabled>(rows: &[T], empty_message: &str) {
    if rows.is_empty() {
        println!("{}", empty_message.yellow());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Human-readable span between two instants, e.g. `2h05m` or `41s`
pub fn format_gap(from: &Timestamp, to: &Timestamp) -> String {
    let secs = (*to - *from).num_seconds().max(0);
    if secs >= 3600 {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

/// Color chain length by severity
pub fn color_length(length: usize) -> String {
    let formatted = length.to_string();
    if length >= 5 {
        formatted.red().bold().to_string()
    } else if length >= 3 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

/// Color stale/fresh flags
pub fn color_stale(stale: bool) -> String {
    if stale {
        "stale".yellow().to_string()
    } else {
        "fresh".green().to_string()
    }
}
