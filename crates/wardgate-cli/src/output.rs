//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Print rows as a table, or the underlying records as JSON.
pub fn print_list<R: Tabled, T: Serialize>(rows: &[R], records: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("No results found.");
            } else {
                println!("{}", Table::new(rows));
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string());
            println!("{}", json);
        }
    }
}

/// Print a single record as JSON, or a success line for tables.
pub fn print_item<T: Serialize>(item: &T, message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Table => print_success(message),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
            println!("{}", json);
        }
    }
}

pub fn print_success(msg: &str) {
    println!("✓ {}", msg);
}

pub fn print_warning(msg: &str) {
    println!("⚠ {}", msg);
}

pub fn print_error(msg: &str) {
    eprintln!("✗ {}", msg);
}

/// Shorten `text` to `max` characters for a table cell.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long alert message", 7), "a long…");
    }
}
