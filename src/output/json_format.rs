//! JSON output formatting.

use crate::types::ResultSet;
use std::io;

/// Print results as a JSON array.
pub fn print_json(results: &ResultSet) -> io::Result<()> {
    let json = results.to_json().map_err(io::Error::other)?;
    println!("{}", json);
    Ok(())
}
