//! Output formatting module.
//!
//! Provides formatters for plain text and JSON output of audit results.

mod json_format;
mod plain;

pub use json_format::print_json;
pub use plain::{
    print_error, print_info, print_scan_header, print_success, print_summary, print_warning,
    write_plain,
};

use crate::cli::OutputFormat;
use crate::types::ResultSet;
use std::io;

/// Format and print results according to the specified format.
///
/// `limit` caps the rows of the plain table; JSON always carries every record.
pub fn format_results(results: &ResultSet, format: OutputFormat, limit: Option<usize>) -> io::Result<()> {
    match format {
        OutputFormat::Plain => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_plain(&mut out, results, limit)
        }
        OutputFormat::Json => print_json(results),
    }
}
