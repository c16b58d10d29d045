//! Serve subcommand implementation.

use super::AppContext;
use crate::error::{CliError, CliResult};
use crate::output;
use crate::server::{self, AppState};
use clap::Parser;
use tokio::net::TcpListener;

/// Serve scan streams over HTTP.
#[derive(Parser, Debug)]
pub struct ServeCommand {
    /// Address to listen on (defaults to the configured bind address)
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<String>,
}

impl ServeCommand {
    /// Execute the serve command. Runs until Ctrl-C.
    pub async fn execute(&self, ctx: &AppContext, quiet: bool) -> CliResult<()> {
        let address = self
            .bind
            .clone()
            .unwrap_or_else(|| ctx.settings.bind_address.clone());
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| CliError::Other(format!("failed to bind {address}: {e}")))?;

        if !quiet {
            output::print_info(&format!(
                "Serving on http://{}",
                listener.local_addr()?
            ));
        }
        server::serve(listener, AppState::new(ctx.settings.clone())).await?;
        Ok(())
    }
}
