//! Credential and summary subcommands.
//!
//! `connect` verifies a credential against the organization and remembers
//! it; `stats` prints repository counts and caches them with the session.

use super::{AppContext, CredentialArgs, OutputFormat};
use crate::budget::BudgetRegistry;
use crate::config::Credentials;
use crate::error::{CliError, CliResult};
use crate::output;
use crate::scanner::{basic_stats, ScanContext};
use crate::storage::{OrgSummary, SessionState};
use clap::Parser;
use tracing::debug;

/// Repository counts for the organization.
#[derive(Parser, Debug)]
pub struct StatsCommand {
    #[command(flatten)]
    pub credentials: CredentialArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub output: OutputFormat,
}

impl StatsCommand {
    /// Execute the stats command.
    pub async fn execute(&self, ctx: &AppContext) -> CliResult<()> {
        let sessions = ctx.session_store();
        let credentials = self.credentials.resolve(&sessions)?;
        let summary = fetch_summary(ctx, &credentials).await?;

        let cached = match sessions.load()? {
            Some(state) if state.credentials.organization == credentials.organization => {
                sessions.update_summary(summary)?
            }
            _ => false,
        };
        debug!(cached, "organization summary fetched");

        match self.output {
            OutputFormat::Plain => output::print_summary(&credentials.organization, &summary),
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&summary)
                    .map_err(|e| CliError::Other(e.to_string()))?;
                println!("{json}");
            }
        }
        Ok(())
    }
}

/// Verify and remember credentials.
#[derive(Parser, Debug)]
pub struct ConnectCommand {
    #[command(flatten)]
    pub credentials: CredentialArgs,

    /// Store the credentials without contacting GitHub
    #[arg(long)]
    pub no_verify: bool,
}

impl ConnectCommand {
    /// Execute the connect command.
    pub async fn execute(&self, ctx: &AppContext, quiet: bool) -> CliResult<()> {
        let sessions = ctx.session_store();
        let credentials = self.credentials.resolve(&sessions)?;

        let mut state = SessionState::new(credentials.clone());
        if !self.no_verify {
            state.summary = Some(fetch_summary(ctx, &credentials).await?);
        }
        sessions.save(&state)?;

        if !quiet {
            output::print_success(&format!("Connected to {}", credentials.organization));
            if let Some(summary) = &state.summary {
                output::print_summary(&credentials.organization, summary);
            }
        }
        Ok(())
    }
}

/// Forget stored credentials.
pub fn disconnect(ctx: &AppContext, quiet: bool) -> CliResult<()> {
    let removed = ctx.session_store().clear()?;
    if !quiet {
        if removed {
            output::print_success("Disconnected");
        } else {
            output::print_info("No stored session");
        }
    }
    Ok(())
}

/// Delete stored results and the session.
pub fn clear_cache(ctx: &AppContext, quiet: bool) -> CliResult<()> {
    let cleared = ctx.result_store()?.clear()?;
    let session = ctx.session_store().clear()?;
    if !quiet {
        output::print_success(&format!(
            "Cleared {cleared} stored result lists{}",
            if session { " and the session" } else { "" }
        ));
    }
    Ok(())
}

async fn fetch_summary(ctx: &AppContext, credentials: &Credentials) -> CliResult<OrgSummary> {
    let budgets = BudgetRegistry::new(&ctx.settings);
    let scan = ScanContext::connect(credentials, &ctx.settings, budgets.for_token(&credentials.token))
        .map_err(crate::error::ScanError::from)?;
    Ok(basic_stats(&scan.client, &scan.organization).await?)
}
