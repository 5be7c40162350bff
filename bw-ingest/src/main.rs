//! bw-ingest - SEC 8-K Item 1.05 breach filing ingestion
//!
//! Subcommands:
//! - `serve`: HTTP API for the dashboard (`GET /filings`, `POST /refresh`, `GET /health`)
//! - `fetch`: one ingestion run from the command line, then exit

use anyhow::Result;
use bw_common::config::{load_toml_config, validate_run_bounds, ConfigOverrides, ServiceConfig};
use bw_common::db::{init_database, FilingRepository, FilingStore};
use bw_ingest::services::{GroqClient, SecApiClient};
use bw_ingest::workflow::IngestPipeline;
use bw_ingest::{build_router, AppState, RunSettings};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bw-ingest", version, about = "SEC Item 1.05 breach filing ingestion")]
struct Cli {
    /// TOML config file (default: ~/.config/breach-watch/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// sec-api.io API key [env: SEC_API_KEY]
    #[arg(long, global = true)]
    sec_api_key: Option<String>,

    /// Groq API key [env: GROQ_API_KEY]
    #[arg(long, global = true)]
    groq_api_key: Option<String>,

    /// Directory holding the SQLite database [env: DATABASE_URL]
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Database name [env: DB_NAME]
    #[arg(long, global = true)]
    db_name: Option<String>,

    /// Collection (table) name [env: COLLECTION_NAME]
    #[arg(long, global = true)]
    collection_name: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the filings API
    Serve {
        /// Listen port [env: BW_PORT, default 3000]
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the ingestion pipeline once
    Fetch {
        /// Records per page (1-50)
        #[arg(long)]
        batch_size: Option<u32>,
        /// Stop after this many records
        #[arg(long)]
        max_results: Option<u32>,
        /// Store filings without generating summaries
        #[arg(long)]
        skip_summaries: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let toml_config = load_toml_config(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level)),
        )
        .init();

    info!(
        "Starting bw-ingest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let overrides = ConfigOverrides {
        sec_api_key: cli.sec_api_key.clone(),
        groq_api_key: cli.groq_api_key.clone(),
        database_url: cli.database_url.clone(),
        db_name: cli.db_name.clone(),
        collection_name: cli.collection_name.clone(),
        port: match &cli.command {
            Command::Serve { port } => *port,
            Command::Fetch { .. } => None,
        },
    };

    let config = match ServiceConfig::resolve(&overrides, toml_config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    if let Command::Fetch {
        batch_size,
        max_results,
        ..
    } = &cli.command
    {
        let batch_size = batch_size.unwrap_or(config.pipeline.batch_size);
        let max_results = max_results.unwrap_or(config.pipeline.max_results);
        if let Err(e) = validate_run_bounds(batch_size, max_results) {
            error!("{}", e);
            return Err(e.into());
        }
    }

    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let pool = init_database(&db_path).await?;
    let store: Arc<dyn FilingStore> = Arc::new(
        FilingRepository::open(pool, config.collection_name.clone())
            .await?
            .with_max_lock_wait_ms(config.pipeline.lock_wait_ms),
    );

    let source = Arc::new(SecApiClient::new(config.sec_api_key.clone())?);
    let summarizer = Arc::new(GroqClient::new(
        config.groq_api_key.clone(),
        config.enrichment.clone(),
    )?);

    let pipeline = IngestPipeline::new(source, store.clone())
        .with_page_delay(Duration::from_millis(config.pipeline.page_delay_ms));

    match cli.command {
        Command::Serve { .. } => {
            let settings = RunSettings {
                batch_size: config.pipeline.batch_size,
                max_results: config.pipeline.max_results,
            };
            let state = AppState::new(store, pipeline.with_summarizer(summarizer), settings);
            let app = build_router(state);

            let addr = format!("127.0.0.1:{}", config.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("Listening on http://{}", addr);
            info!("Filings: http://{}/filings", addr);

            axum::serve(listener, app).await?;
        }
        Command::Fetch {
            batch_size,
            max_results,
            skip_summaries,
        } => {
            let pipeline = if skip_summaries {
                info!("Summaries disabled for this run");
                pipeline
            } else {
                pipeline.with_summarizer(summarizer)
            };

            let summary = pipeline
                .run(
                    batch_size.unwrap_or(config.pipeline.batch_size),
                    max_results.unwrap_or(config.pipeline.max_results),
                )
                .await?;

            println!("{}", serde_json::to_string_pretty(&summary)?);

            if let Some(err) = summary.abort_error() {
                anyhow::bail!("Ingestion run aborted: {}", err);
            }
        }
    }

    Ok(())
}
