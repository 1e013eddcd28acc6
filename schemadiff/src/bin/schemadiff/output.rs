use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use schemadiff::{RecordStatus, RunSummary};
use serde::Serialize;
use std::io::Write;

use crate::theme::{ICONS, THEME};

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
    /// Compact single-line output
    Compact,
}

/// Global CLI options that affect output and behavior
#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
    pub no_color: bool,
}

/// Trait for data that can be displayed as a table
pub trait TableDisplay {
    fn to_table(&self, options: &GlobalOptions) -> Table;
    fn to_compact(&self) -> String;
}

/// Output manager handles formatting and display
pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        if options.no_color {
            colored::control::set_override(false);
        }
        Self { options }
    }

    /// Display data according to the configured output format
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                println!("{json}");
            }
            OutputFormat::Table => {
                let table = data.to_table(&self.options);
                println!("{table}");
            }
            OutputFormat::Compact => {
                println!("{}", data.to_compact());
            }
        }
        Ok(())
    }

    /// Human-oriented messages are suppressed for JSON so stdout stays parseable.
    fn chatty(&self) -> bool {
        !self.options.quiet && self.options.output_format != OutputFormat::Json
    }

    /// Display a success message with color and icon
    pub fn success(&self, message: &str) {
        if self.chatty() {
            let output = if self.options.no_color {
                format!("{} {message}", ICONS.success)
            } else {
                format!("{} {}", ICONS.success.color(THEME.success), message.color(THEME.success))
            };
            println!("{output}");
        }
    }

    /// Display an error message with color and icon
    pub fn error(&self, message: &str) {
        let output = if self.options.no_color {
            format!("{} {message}", ICONS.error)
        } else {
            format!("{} {}", ICONS.error.color(THEME.error), message.color(THEME.error))
        };
        eprintln!("{output}");
    }

    /// Display a warning message
    pub fn warning(&self, message: &str) {
        if self.chatty() {
            let output = if self.options.no_color {
                format!("{} {message}", ICONS.warning)
            } else {
                format!("{} {}", ICONS.warning.color(THEME.warning), message.color(THEME.warning))
            };
            println!("{output}");
        }
    }

    /// Display verbose information (only if verbose mode is enabled)
    pub fn verbose(&self, message: &str) {
        if self.options.verbose && !self.options.quiet {
            let output = if self.options.no_color {
                format!("{} {message}", ICONS.arrow)
            } else {
                format!("{} {}", ICONS.arrow.color(THEME.muted), message.color(THEME.muted))
            };
            eprintln!("{output}");
        }
    }

    /// Display info message with color and icon
    pub fn info(&self, message: &str) {
        if self.chatty() {
            let output = if self.options.no_color {
                format!("{} {message}", ICONS.info)
            } else {
                format!("{} {}", ICONS.info.color(THEME.info), message.color(THEME.info))
            };
            println!("{output}");
        }
    }

    /// Display a heading
    pub fn heading(&self, text: &str) {
        if self.chatty() {
            let output = if self.options.no_color {
                format!("\n{text}\n{}", "=".repeat(text.len()))
            } else {
                format!("\n{}", text.color(THEME.primary).bold())
            };
            println!("{output}");
        }
    }

    /// Display indented text with a prefix icon
    pub fn indented(&self, icon: &str, text: &str) {
        if self.chatty() {
            let output = if self.options.no_color {
                format!("  {icon} {text}")
            } else {
                format!("  {} {text}", icon.color(THEME.muted))
            };
            println!("{output}");
        }
    }

    /// Display progress indicator
    pub fn progress(&self, message: &str) {
        if !self.chatty() {
            return;
        }

        let output = if self.options.no_color {
            format!("{} {message}...", ICONS.loading)
        } else {
            format!(
                "{} {}...",
                ICONS.loading.color(THEME.highlight).bold(),
                message.color(THEME.highlight)
            )
        };

        print!("\r{output}");
        std::io::stdout().flush().ok();
    }

    /// Clear the current line (useful after progress indicators)
    pub fn clear_line(&self) {
        if !self.chatty() {
            return;
        }

        print!("\r{}", " ".repeat(80));
        print!("\r");
        std::io::stdout().flush().ok();
    }
}

/// Create a themed table with a bold header row
pub fn themed_table(options: &GlobalOptions, headers: &[&str]) -> Table {
    let mut table = Table::new();

    if !options.no_color {
        table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
    } else {
        table.load_preset(comfy_table::presets::ASCII_FULL);
    }

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| {
            let cell = Cell::new(h).add_attribute(Attribute::Bold);
            if options.no_color { cell } else { cell.fg(TableColor::Cyan) }
        })
        .collect();
    table.set_header(header_cells);
    table
}

impl TableDisplay for RunSummary {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options, &["Content type", "Status", "Operations", "Error"]);
        for record in &self.records {
            let (label, color) = match record.status {
                RecordStatus::Written => ("written", TableColor::Green),
                RecordStatus::Unchanged => ("unchanged", TableColor::DarkGrey),
                RecordStatus::Failed => ("failed", TableColor::Red),
            };
            let status = if options.no_color {
                Cell::new(label)
            } else {
                Cell::new(label).fg(color)
            };
            table.add_row(vec![
                Cell::new(&record.record),
                status,
                Cell::new(record.operations),
                Cell::new(record.error.as_deref().unwrap_or("")),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        format!(
            "written={} unchanged={} failed={}",
            self.count(RecordStatus::Written),
            self.count(RecordStatus::Unchanged),
            self.count(RecordStatus::Failed)
        )
    }
}
