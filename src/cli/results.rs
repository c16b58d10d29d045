//! Results subcommand implementation.
//!
//! Handles `orgscan results [CATEGORY]` for viewing stored results.

use super::{AppContext, OutputFormat};
use crate::error::{CliError, CliResult};
use crate::output;
use crate::types::Category;
use clap::Parser;
use std::fs;
use std::path::PathBuf;

/// Show stored results.
#[derive(Parser, Debug)]
pub struct ResultsCommand {
    /// Category to show (every stored category when omitted)
    #[arg(value_enum, value_name = "CATEGORY")]
    pub category: Option<Category>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,

    /// Show at most this many rows
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Write the JSON array of one category to this file
    #[arg(short = 'f', long = "file", value_name = "PATH", requires = "category")]
    pub file: Option<PathBuf>,
}

impl ResultsCommand {
    /// Execute the results command.
    pub fn execute(&self, ctx: &AppContext, quiet: bool) -> CliResult<()> {
        let store = ctx.result_store()?;
        let categories = match self.category {
            Some(category) => vec![category],
            None => Category::ALL.to_vec(),
        };

        let mut shown = 0;
        for category in categories {
            let Some(results) = store.load(category)? else {
                if self.category.is_some() && !quiet {
                    output::print_info(&format!(
                        "No stored {category} results; run `orgscan scan {category}`"
                    ));
                }
                continue;
            };
            shown += 1;

            if let Some(path) = &self.file {
                let json = results
                    .to_json()
                    .map_err(|e| CliError::Other(e.to_string()))?;
                fs::write(path, json)?;
                if !quiet {
                    output::print_success(&format!(
                        "Wrote {} {category} records to {}",
                        results.len(),
                        path.display()
                    ));
                }
                continue;
            }
            output::format_results(&results, self.output, self.limit)?;
        }

        if shown == 0 && self.category.is_none() && !quiet {
            output::print_info("No stored results; run `orgscan scan` first");
        }
        Ok(())
    }
}
