use clap::Parser;
use orgscan::cli::{self, AppContext, Cli, Commands};
use orgscan::output;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        output::print_error(&format!("{error:#}"));
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let ctx = AppContext::load(cli.home.as_deref(), cli.config.as_deref())?;
    let quiet = cli.quiet;

    match &cli.command {
        Commands::Scan(cmd) => cmd.execute(&ctx, quiet).await?,
        Commands::Serve(cmd) => cmd.execute(&ctx, quiet).await?,
        Commands::Results(cmd) => cmd.execute(&ctx, quiet)?,
        Commands::Stats(cmd) => cmd.execute(&ctx).await?,
        Commands::Connect(cmd) => cmd.execute(&ctx, quiet).await?,
        Commands::Disconnect => cli::disconnect(&ctx, quiet)?,
        Commands::ClearCache => cli::clear_cache(&ctx, quiet)?,
    }
    Ok(())
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "orgscan=debug,tower_http=debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
