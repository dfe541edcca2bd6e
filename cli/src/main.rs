//! tenantsync
//!
//! Reconciles a tenant with a declarative JSON configuration.
//!
//! Usage:
//!   tenantsync --input tenant.json --base-url https://tenant.example.com
//!
//! The access token is read from `--token` or `TENANTSYNC_TOKEN`.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tenantsync_cli::{deploy, load_assets, load_config, Overrides};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "tenantsync")]
#[command(about = "Reconcile a tenant with a JSON configuration")]
struct Args {
    /// Desired configuration (resource type → records)
    #[arg(short, long)]
    input: PathBuf,

    /// Deploy settings file (api, pool, retry, policy)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tenant base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Management API access token
    #[arg(long, env = "TENANTSYNC_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Delete remote records missing from the configuration
    #[arg(long)]
    allow_delete: bool,

    /// Maximum concurrent API calls
    #[arg(long)]
    concurrency: Option<usize>,

    /// Maximum API calls started per second
    #[arg(long)]
    rate: Option<usize>,

    /// Extra policy entry, e.g. `excluded.rules=["legacy"]` (repeatable)
    #[arg(long = "policy", value_name = "KEY=VALUE")]
    policy: Vec<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            token: self.token.clone(),
            allow_delete: self.allow_delete,
            concurrency: self.concurrency,
            rate: self.rate,
            policy: self.policy.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let mut config = load_config(args.config.as_deref())?;
    args.overrides().apply(&mut config)?;
    let assets = load_assets(&args.input)?;
    info!(input = %args.input.display(), types = assets.resource_types().count(), "Loaded configuration");

    let summary = match deploy(&config, assets).await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Deploy failed: {e:#}");
            return Err(e);
        }
    };

    let rendered = serde_json::to_string_pretty(&summary).context("rendering summary")?;
    println!("{rendered}");
    Ok(())
}
