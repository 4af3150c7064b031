pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Render a command's result in the requested format.
///
/// Every `run_*` hands back `serde_json::Value` so the formatters can stay
/// agnostic about which operation produced it: scalar answers (npv, irr),
/// envelope objects (analyze, grade, report), and row arrays (cash-flows,
/// dscr) all route through here.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}
