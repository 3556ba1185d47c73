//! Output Formatting - Table, JSON, and plain text output
//!
//! This module provides consistent output formatting across all CLI commands
//! with support for tables, JSON and plain text.

use std::io;

use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use serde::Serialize;

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table format (default for interactive use)
    #[default]
    Table,
    /// JSON output for machine processing
    Json,
    /// Plain text output (minimal formatting)
    Plain,
}

/// Output writer that handles formatting based on configuration
pub struct OutputWriter {
    format: OutputFormat,
    quiet: bool,
    verbose: bool,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(format: OutputFormat, quiet: bool, verbose: bool) -> Self {
        Self {
            format,
            quiet,
            verbose,
        }
    }

    /// Get the output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!("{} {}", style("✓").green().bold(), message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        if self.quiet {
            return;
        }
        eprintln!("{} {}", style("⚠").yellow().bold(), message);
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red().bold(), message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!("{} {}", style("ℹ").cyan().bold(), message);
    }

    /// Print a debug message (only in verbose mode)
    pub fn debug(&self, message: &str) {
        if !self.verbose {
            return;
        }
        println!("{} {}", style("⋯").dim(), style(message).dim());
    }

    /// Print a section divider
    pub fn divider(&self) {
        if self.quiet || self.format == OutputFormat::Json {
            return;
        }
        println!("{}", style("─".repeat(50)).dim());
    }

    /// Print a header/title with styled formatting
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Table | OutputFormat::Plain => {
                self.divider();
                println!("  {}", style(title).bold().cyan());
                self.divider();
            }
            OutputFormat::Json => {}
        }
    }

    /// Print raw output (respects quiet mode)
    pub fn print(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!("{}", message);
    }

    /// Print JSON output (always prints, ignores quiet)
    pub fn json<T: Serialize + ?Sized>(&self, data: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        println!("{}", json);
        Ok(())
    }

    /// Print a table
    pub fn table(&self, table: &Table) {
        if self.quiet {
            return;
        }
        println!("{}", table);
    }

    /// Create a new styled table
    pub fn create_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }

    /// Create a table with headers
    pub fn create_table_with_headers(&self, headers: &[&str]) -> Table {
        let mut table = self.create_table();
        table.set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
        table
    }

    /// Render a list of records either as JSON, a table, or plain rows.
    ///
    /// `rows` supplies one cell vector per record in the same order as
    /// `headers`; the serialized records are used verbatim for JSON output.
    pub fn records<T, F>(&self, records: &[T], headers: &[&str], rows: F) -> io::Result<()>
    where
        T: Serialize,
        F: Fn(&T) -> Vec<String>,
    {
        match self.format {
            OutputFormat::Json => self.json(records),
            OutputFormat::Table => {
                let mut table = self.create_table_with_headers(headers);
                for record in records {
                    table.add_row(rows(record));
                }
                self.table(&table);
                Ok(())
            }
            OutputFormat::Plain => {
                for record in records {
                    self.print(&rows(record).join("  "));
                }
                Ok(())
            }
        }
    }

    /// Render a single record with the same header/row contract as [`records`].
    ///
    /// [`records`]: OutputWriter::records
    pub fn record<T, F>(&self, record: &T, headers: &[&str], row: F) -> io::Result<()>
    where
        T: Serialize,
        F: Fn(&T) -> Vec<String>,
    {
        match self.format {
            OutputFormat::Json => self.json(record),
            OutputFormat::Table => {
                let mut table = self.create_table_with_headers(headers);
                table.add_row(row(record));
                self.table(&table);
                Ok(())
            }
            OutputFormat::Plain => {
                self.print(&row(record).join("  "));
                Ok(())
            }
        }
    }
}

/// Progress indicator for long-running operations
pub struct ProgressIndicator {
    bar: indicatif::ProgressBar,
}

impl ProgressIndicator {
    /// Create a new spinner progress indicator
    pub fn spinner(message: &str) -> Self {
        let bar = indicatif::ProgressBar::new_spinner();
        bar.set_style(
            indicatif::ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .expect("Valid template"),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { bar }
    }

    /// Update the message
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Finish with a success message
    pub fn finish_with_message(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Ask for confirmation (respects CI mode)
pub fn confirm(message: &str, default: bool, ci_mode: bool) -> io::Result<bool> {
    if ci_mode {
        return Ok(default);
    }

    let result = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(default)
        .interact()?;

    Ok(result)
}

/// Ask for password input (hidden)
pub fn password(prompt: &str, ci_mode: bool, env_var: &str) -> io::Result<String> {
    if ci_mode {
        // In CI mode, require the env var
        return std::env::var(env_var)
            .map_err(|_| io::Error::new(io::ErrorKind::NotFound, format!("{} not set", env_var)));
    }

    let result = dialoguer::Password::new().with_prompt(prompt).interact()?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_writer_creation() {
        let writer = OutputWriter::new(OutputFormat::Json, false, true);
        assert_eq!(writer.format(), OutputFormat::Json);
        assert!(!writer.is_quiet());
        assert!(writer.is_verbose());
    }

    #[test]
    fn test_confirm_ci_mode_uses_default() {
        assert!(confirm("proceed?", true, true).unwrap());
        assert!(!confirm("proceed?", false, true).unwrap());
    }
}
