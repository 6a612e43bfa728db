//! rootmd - simulate verified root metadata operations

use clap::Parser;
use rootmd_cli::{run_simulation, CliConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rootmd")]
#[command(about = "Submit and verify root metadata revisions against an in-memory server")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "ROOTMD_CONFIG")]
    config: Option<PathBuf>,

    /// User submitting the revisions
    #[arg(short, long)]
    user: Option<String>,

    /// Folder handle, e.g. "alice,bob#carol"
    #[arg(long)]
    handle: Option<String>,

    /// Simulate a public folder
    #[arg(long)]
    public: bool,

    /// Number of revisions to submit
    #[arg(short = 'n', long)]
    revisions: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, env = "ROOTMD_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = CliConfig::load(args.config.as_deref())?;
    if let Some(user) = args.user {
        config.user = user;
    }
    if let Some(handle) = args.handle {
        config.handle = handle;
    }
    if let Some(revisions) = args.revisions {
        config.revisions = revisions;
    }
    config.public |= args.public;
    config.json_logs |= args.json;
    config.validate()?;

    let log_level = if args.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!(
            "rootmd={log_level},rootmd_cli={log_level},rootmd_core={log_level},rootmd_mdserver={log_level}"
        ).into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::info!(user = %config.user, handle = %config.handle, "starting simulation");

    let report = run_simulation(&config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
