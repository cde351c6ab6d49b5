//! Output formatting for CLI commands.
//!
//! Listings and single records carry whatever attributes the provider
//! returned, so tables are built row by row rather than from a fixed
//! struct.

use colored::Colorize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::api::Record;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a listing, one row per record, one column per attribute
    /// named in `columns`.
    #[must_use]
    pub fn format_listing(&self, columns: &[&str], records: &[Record]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(records).unwrap_or_default(),
            OutputFormat::Text => {
                if records.is_empty() {
                    return String::from("No results.\n");
                }

                let mut builder = Builder::default();
                builder.push_record(columns.iter().map(|c| (*c).to_string()));
                for record in records {
                    builder.push_record(
                        columns
                            .iter()
                            .map(|column| display_value(record.get(column))),
                    );
                }

                let mut table = builder.build();
                table.with(Style::sharp());
                format!("{table}\n")
            }
        }
    }

    /// Formats one record as an attribute/value table.
    #[must_use]
    pub fn format_record(&self, record: &Record) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(record).unwrap_or_default(),
            OutputFormat::Text => {
                let mut builder = Builder::default();
                for (attribute, value) in record.iter() {
                    builder.push_record([attribute.clone(), display_value(Some(value))]);
                }

                let mut table = builder.build();
                table.with(Style::sharp());
                format!("{table}\n")
            }
        }
    }

    /// Formats a list of bare values, one per line.
    #[must_use]
    pub fn format_names(&self, names: &[String]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(names).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();
                for name in names {
                    output.push_str(name);
                    output.push('\n');
                }
                output
            }
        }
    }

    /// Formats a success message.
    #[must_use]
    pub fn success(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "status": "success", "message": message });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{} {message}", "✓".green()),
        }
    }

    /// Formats a warning message.
    #[must_use]
    pub fn warning(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "status": "warning", "message": message });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{} {message}", "⚠".yellow()),
        }
    }
}

/// Renders a JSON value for table display. Strings print bare; everything
/// else falls back to JSON syntax.
fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
