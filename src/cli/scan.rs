//! Scan subcommand implementation.
//!
//! Handles `orgscan scan [CATEGORY...]`: starts one session per category,
//! renders a progress bar for each, and prints the accumulated results.

use super::{AppContext, CredentialArgs, OutputFormat};
use crate::consumer::{AuditClient, EventChannel, LocalChannel, ProgressSnapshot, SseChannel};
use crate::error::{CliError, CliResult};
use crate::output;
use crate::types::Category;
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Audit categories of an organization.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// Categories to audit (all when omitted)
    #[arg(value_enum, value_name = "CATEGORY")]
    pub categories: Vec<Category>,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    /// Stream from a running `orgscan serve` instead of scanning in-process
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,

    /// Units audited concurrently per category
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Local request pacing in requests per second (0 = unlimited)
    #[arg(short = 'r', long = "rate")]
    pub rate_limit: Option<u32>,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,

    /// Show at most this many rows per category
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Don't save results
    #[arg(long)]
    pub no_save: bool,
}

impl ScanCommand {
    /// Execute the scan command.
    pub async fn execute(&self, ctx: &AppContext, quiet: bool) -> CliResult<()> {
        let credentials = self.credentials.resolve(&ctx.session_store())?;
        let categories = self.selected_categories();

        let mut settings = ctx.settings.clone();
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency;
        }
        if let Some(rate) = self.rate_limit {
            settings.max_requests_per_second = rate;
        }
        settings.validate()?;

        let channel: Arc<dyn EventChannel> = match &self.server {
            Some(url) => Arc::new(SseChannel::new(url.as_str())?),
            None => Arc::new(LocalChannel::new(settings)),
        };

        let organization = credentials.organization.clone();
        let mut client = AuditClient::new(channel, credentials)?;
        if !self.no_save {
            client = client.with_store(ctx.result_store()?)?;
        }

        let plain = self.output == OutputFormat::Plain;
        if !quiet && plain {
            output::print_scan_header(&organization, &categories);
        }

        for &category in &categories {
            client.start_scan(category)?;
        }

        let bars = ProgressBars::new(&categories, quiet || !plain);
        let interrupted = watch(&mut client, &categories, &bars).await;
        for &category in &categories {
            client.wait(category).await;
        }
        bars.finish(&client);

        if interrupted {
            output::print_warning("Scan interrupted; partial results kept");
        }

        let mut failed = 0;
        for &category in &categories {
            let progress = client.progress(category);
            if let Some(error) = &progress.error {
                failed += 1;
                output::print_error(&format!("{category}: {error}"));
            }
            output::format_results(&client.results(category), self.output, self.limit)?;
        }

        if failed > 0 {
            return Err(CliError::Other(format!(
                "{failed} of {} scans failed",
                categories.len()
            )));
        }
        Ok(())
    }

    fn selected_categories(&self) -> Vec<Category> {
        if self.categories.is_empty() {
            return Category::ALL.to_vec();
        }
        let mut selected = Vec::new();
        for &category in &self.categories {
            if !selected.contains(&category) {
                selected.push(category);
            }
        }
        selected
    }
}

/// Poll sessions until every scan ends or Ctrl-C. Returns whether the user
/// interrupted.
async fn watch(client: &mut AuditClient, categories: &[Category], bars: &ProgressBars) -> bool {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        bars.update(client);
        if categories.iter().all(|&c| !client.is_scanning(c)) {
            return false;
        }
        tokio::select! {
            _ = &mut ctrl_c => {
                client.stop_all();
                return true;
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
    }
}

/// One progress bar per category.
struct ProgressBars {
    _multi: MultiProgress,
    bars: HashMap<Category, ProgressBar>,
}

impl ProgressBars {
    fn new(categories: &[Category], hidden: bool) -> Self {
        let multi = MultiProgress::new();
        let style = ProgressStyle::with_template(
            "{spinner:.green} {prefix:>12.bold} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");

        let bars = categories
            .iter()
            .map(|&category| {
                let bar = if hidden {
                    ProgressBar::hidden()
                } else {
                    multi.add(ProgressBar::new(0))
                };
                bar.set_style(style.clone());
                bar.set_prefix(category.to_string());
                bar.enable_steady_tick(POLL_INTERVAL);
                (category, bar)
            })
            .collect();

        Self {
            _multi: multi,
            bars,
        }
    }

    fn update(&self, client: &AuditClient) {
        for (&category, bar) in &self.bars {
            let progress = client.progress(category);
            if let Some(total) = progress.total {
                bar.set_length(total);
            }
            bar.set_position(progress.processed);
            bar.set_message(progress.current.unwrap_or_default());
        }
    }

    fn finish(&self, client: &AuditClient) {
        for (&category, bar) in &self.bars {
            bar.finish_with_message(outcome_message(&client.progress(category)));
        }
    }
}

fn outcome_message(progress: &ProgressSnapshot) -> String {
    match &progress.error {
        Some(error) => format!("failed: {error}"),
        None if progress.total.is_some_and(|t| progress.processed < t) => {
            format!("stopped, {} records", progress.records)
        }
        None => format!("{} records", progress.records),
    }
}
