use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod batch;
mod db;
mod envelope;
mod tools;

use db::DbCommands;
use tools::{Params, Tool, ToolContext};

#[derive(Debug, Parser)]
#[command(name = "dealscope")]
#[command(about = "Retail deal extraction and discount tracking")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch a page or feed and extract canonical products
    Fetch {
        /// Page or feed URL
        url: String,
        /// Retailer id (e.g., nike, rei, patagonia)
        #[arg(long)]
        retailer: String,
        /// Category assigned to products that carry none
        #[arg(long, default_value = "")]
        category: String,
    },
    /// Compute deals from a products array produced by `fetch`
    Parse {
        #[arg(long)]
        retailer: String,
        #[arg(long, default_value = "")]
        category: String,
        /// Minimum discount percentage (defaults to `DEALSCOPE_DEFAULT_THRESHOLD_PCT`)
        #[arg(long)]
        min_discount_pct: Option<f64>,
        /// JSON file to read; stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Persist a deals array produced by `parse`
    Save {
        /// JSON file to read; stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Run every job in a YAML batch plan
    Run {
        /// Path to the batch plan
        plan: PathBuf,
        /// Persist the deals found
        #[arg(long)]
        save: bool,
    },
    /// Handle one agent action-group event and print the response envelope
    Invoke {
        /// Event JSON file; stdin when omitted
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = dealscope_core::load_app_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(env = %config.env, "configuration loaded");

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("dealscope: pass --help to list commands");
        return Ok(());
    };

    let ctx = ToolContext::from_config(config)?;
    match command {
        Commands::Fetch {
            url,
            retailer,
            category,
        } => {
            let params = params([("url", url), ("retailer", retailer), ("category", category)]);
            println!("{}", ctx.call(Tool::FetchPage, &params).await?);
        }
        Commands::Parse {
            retailer,
            category,
            min_discount_pct,
            input,
        } => {
            let mut params = params([
                ("content", read_input(input.as_deref())?),
                ("retailer", retailer),
                ("category", category),
            ]);
            if let Some(pct) = min_discount_pct {
                params.insert("min_discount_pct".to_string(), pct.to_string());
            }
            println!("{}", ctx.call(Tool::ParseDeals, &params).await?);
        }
        Commands::Save { input } => {
            let params = params([("deals", read_input(input.as_deref())?)]);
            println!("{}", ctx.call(Tool::SaveDeals, &params).await?);
        }
        Commands::Run { plan, save } => batch::run_batch(&ctx, &plan, save).await?,
        Commands::Invoke { event } => {
            let raw = read_input(event.as_deref())?;
            let event: envelope::AgentEvent = serde_json::from_str(&raw)?;
            let response = envelope::handle_event(&ctx, &event).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Db { command } => db::run_db(&ctx.config, command).await?,
    }

    Ok(())
}

fn params<const N: usize>(pairs: [(&str, String); N]) -> Params {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Reads `path`, or all of stdin when `None`.
fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    if let Some(path) = path {
        std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))
    } else {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    }
}
