//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}

/// Print a table from a list of rows
pub fn print_table<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Usage against its limit, e.g. `12.5% / 100%`
pub fn format_cpu(cpu: f64, limit: f64) -> String {
    format!("{:.1}% / {:.0}%", cpu, limit)
}

/// Memory in MB, switching to GB above 1024
pub fn format_memory(mb: f64) -> String {
    if mb >= 1024.0 {
        format!("{:.2}GB", mb / 1024.0)
    } else {
        format!("{:.0}MB", mb)
    }
}

/// Color a container status, health state or notification severity
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "running" | "healthy" | "success" | "live" | "low" => status.green().to_string(),
        "starting" | "stopped" | "info" | "simulated" | "medium" => status.yellow().to_string(),
        "exited" | "none" => status.dimmed().to_string(),
        "error" | "unhealthy" | "high" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Shorten a date-time to its calendar date, leaving relative dates alone
pub fn format_date(value: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_memory() {
        assert_eq!(format_memory(512.0), "512MB");
        assert_eq!(format_memory(2048.0), "2.00GB");
    }

    #[test]
    fn test_format_cpu() {
        assert_eq!(format_cpu(12.34, 100.0), "12.3% / 100%");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2023-01-15T08:00:00Z"), "2023-01-15");
        assert_eq!(format_date("2 days ago"), "2 days ago");
    }

    #[test]
    fn test_output_format_parses_case_insensitive() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
