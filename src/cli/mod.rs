//! CLI subcommand definitions and handlers.
//!
//! Implements a git-like subcommand architecture:
//! - `orgscan scan [CATEGORY...]` - Audit categories of an organization
//! - `orgscan serve` - Expose scans as Server-Sent Event streams
//! - `orgscan results [CATEGORY]` - Show stored results
//! - `orgscan stats` - Repository counts for the organization
//! - `orgscan connect|disconnect` - Remember or forget credentials
//! - `orgscan clear-cache` - Drop stored results and the session

mod results;
mod scan;
mod serve;
mod session;

pub use results::ResultsCommand;
pub use scan::ScanCommand;
pub use serve::ServeCommand;
pub use session::{clear_cache, disconnect, ConnectCommand, StatsCommand};

use crate::config::{AppSettings, Credentials, Paths};
use crate::error::{CliResult, ConfigResult, StoreResult};
use crate::storage::{ResultStore, SessionStore};
use clap::{Args, Parser, Subcommand};
use std::fmt;
use std::path::{Path, PathBuf};

/// orgscan - Streamed security audits of GitHub organizations.
///
/// Audits repositories, branches, collaborator access, members and teams,
/// streaming results as they are found while staying inside the API rate
/// limit.
#[derive(Parser, Debug)]
#[command(name = "orgscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Incremental security audits of GitHub organizations", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Keep settings, results and the session under this directory
    #[arg(long, global = true, value_name = "DIR", env = "ORGSCAN_HOME")]
    pub home: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Audit one or more categories
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// Serve scan streams over HTTP
    Serve(ServeCommand),

    /// Show stored results
    #[command(alias = "r")]
    Results(ResultsCommand),

    /// Show repository counts for the organization
    Stats(StatsCommand),

    /// Verify and remember credentials
    Connect(ConnectCommand),

    /// Forget stored credentials
    Disconnect,

    /// Delete stored results and the session
    ClearCache,
}

/// Organization and token, from flags, the environment, or `connect`.
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// GitHub organization to audit
    #[arg(long, env = "GH_ORG", value_name = "ORG")]
    pub org: Option<String>,

    /// GitHub access token
    #[arg(long, env = "GH_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub token: Option<String>,
}

impl CredentialArgs {
    /// Fill missing values from the stored session and validate.
    pub fn resolve(&self, sessions: &SessionStore) -> CliResult<Credentials> {
        let stored = if self.org.is_none() || self.token.is_none() {
            sessions.load()?.map(|state| state.credentials)
        } else {
            None
        };

        let organization = self
            .org
            .clone()
            .or_else(|| stored.as_ref().map(|c| c.organization.clone()))
            .unwrap_or_default();
        let token = self
            .token
            .clone()
            .or_else(|| stored.map(|c| c.token))
            .unwrap_or_default();

        let credentials = Credentials::new(organization, token);
        credentials.validate()?;
        Ok(credentials)
    }
}

/// Resolved directories and settings for one invocation.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub paths: Paths,
    pub settings: AppSettings,
}

impl AppContext {
    pub fn load(home: Option<&Path>, config: Option<&Path>) -> ConfigResult<Self> {
        let paths = match home {
            Some(root) => Paths::under(root)?,
            None => Paths::resolve()?,
        };
        let settings = match config {
            Some(file) => AppSettings::load_from(file)?,
            None => AppSettings::load(&paths)?,
        };
        Ok(Self { paths, settings })
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.paths.session_file())
    }

    pub fn result_store(&self) -> StoreResult<ResultStore> {
        ResultStore::open(self.paths.results_dir())
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Plain,
    /// JSON arrays
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
        }
    }
}
