pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use clap::ValueEnum;
use serde_json::Value;

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Full response envelope, pretty-printed
    Json,
    /// Field/value table plus one table per list
    Table,
    /// Schedule or quote rows, otherwise field/value pairs
    Csv,
    /// Headline figure only
    Minimal,
}

/// Render a command response in the requested format.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}
