//! CLI binary for forecourt-report.
//!
//! A thin shim over the library crate: `serve` runs the HTTP adapter,
//! `analyze` runs the pipeline once on a local file and prints the report
//! JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forecourt_report::server::{serve, AppState};
use forecourt_report::{analyze_bytes, AnalysisConfig, FuelPriceMap, ReportStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "reportd",
    version,
    about = "Fuel-station report extraction service"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve {
        /// Listen address.
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: SocketAddr,

        /// S3 bucket holding report PDFs.
        #[arg(long, env = "REPORT_BUCKET", conflicts_with = "local_dir")]
        bucket: Option<String>,

        /// Local directory standing in for the bucket (development).
        #[arg(long, env = "REPORT_DIR")]
        local_dir: Option<PathBuf>,

        /// Key prefix for automatic latest-report selection.
        #[arg(long, default_value = "reports")]
        prefix: String,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Analyze a single local PDF and print the report JSON.
    Analyze {
        /// Path to the PDF report.
        file: PathBuf,

        /// Fuel price inputs as inline JSON, e.g.
        /// '{"diesel_ex":{"cost_price_per_liter":18,"selling_price_per_liter":20}}'
        #[arg(long)]
        fuel_prices: Option<String>,

        #[command(flatten)]
        llm: LlmArgs,
    },
}

#[derive(clap::Args)]
struct LlmArgs {
    /// LLM provider name ("openai", "anthropic"). Auto-detected if omitted.
    #[arg(long, env = "REPORT_LLM_PROVIDER")]
    provider: Option<String>,

    /// Model identifier.
    #[arg(long, env = "REPORT_LLM_MODEL")]
    model: Option<String>,

    /// Send the PDF bytes to the model instead of extracted text.
    #[arg(long)]
    binary: bool,
}

fn build_config(llm: &LlmArgs, prefix: Option<&str>) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder().binary_mode(llm.binary);
    if let Some(ref p) = llm.provider {
        builder = builder.provider_name(p.clone());
    }
    if let Some(ref m) = llm.model {
        builder = builder.model(m.clone());
    }
    if let Some(prefix) = prefix {
        builder = builder.bucket_prefix(prefix);
    }
    builder.build().context("invalid configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("forecourt_report={default_level}"))),
        )
        .init();

    match cli.command {
        Command::Serve {
            addr,
            bucket,
            local_dir,
            prefix,
            llm,
        } => {
            let config = build_config(&llm, Some(&prefix))?;

            let store = match (bucket, local_dir) {
                (Some(bucket), _) => Some(ReportStore::s3(&bucket)?),
                (None, Some(dir)) => Some(ReportStore::local(&dir)?),
                (None, None) => None,
            };
            if store.is_none() {
                tracing::warn!(
                    "No report bucket configured; /analyze-stored will be unavailable"
                );
            }

            let state = Arc::new(AppState { config, store });
            serve(state, addr).await.context("server failed")?;
        }

        Command::Analyze {
            file,
            fuel_prices,
            llm,
        } => {
            let config = build_config(&llm, None)?;

            let prices: FuelPriceMap = match fuel_prices {
                Some(json) => serde_json::from_str(&json).context("invalid --fuel-prices JSON")?,
                None => FuelPriceMap::new(),
            };

            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            let bytes = std::fs::read(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;

            let report = analyze_bytes(&name, bytes, &prices, &config).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
