//! CLI output formatting utilities.

use crate::report::{FileRecord, RecordStatus};
use console::style;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print the outcome of one input file.
    pub fn file_record(record: &FileRecord) {
        let status = match record.status {
            RecordStatus::Processed => style("processed").green(),
            RecordStatus::Failed => style("failed").red(),
            RecordStatus::Skipped => style("skipped").dim(),
        };

        let detail = match (record.status, record.duration_seconds) {
            (RecordStatus::Processed, Some(seconds)) => format!(" ({})", format_duration(seconds)),
            _ => String::new(),
        };

        println!(
            "  {} {} {}{}",
            style("*").cyan(),
            style(&record.display_name).bold(),
            status,
            style(detail).dim()
        );
        if let Some(error) = &record.error {
            println!("    {} {}", style("→").dim(), style(error).dim());
        }
    }
}

/// Format duration in seconds to a human-readable string.
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
