//! encore-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, runs the startup ingestion pass, and serves the
//! catalog API over HTTP.
//!
//! Required configuration: `upstream_api_key` (the provider's service key)
//! and `token_secret` (HS256 signing secret). Both may also be supplied as
//! `ENCORE_UPSTREAM_API_KEY` / `ENCORE_TOKEN_SECRET`.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::{Days, Utc};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use encore_api::{AppState, ServerConfig, auth::TokenService};
use encore_core::DateWindow;
use encore_ingest::Reconciler;
use encore_store_sqlite::SqliteStore;
use encore_upstream::{UpstreamClient, UpstreamConfig};

#[derive(Parser)]
#[command(author, version, about = "encore performance catalog server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Skip the ingestion pass normally run at startup.
  #[arg(long)]
  no_startup_refresh: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("ENCORE"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open SQLite store.
  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| {
      format!("failed to open store at {:?}", server_cfg.store_path)
    })?;
  let store = Arc::new(store);

  // Upstream client and reconciler.
  let client = UpstreamClient::new(UpstreamConfig::new(
    server_cfg.upstream_base_url.clone(),
    server_cfg.upstream_api_key.clone(),
  ))
  .context("failed to build upstream client")?;
  let reconciler = Arc::new(Reconciler::new(client, store.clone()));

  // Startup ingestion: today's listing window plus the upcoming snapshot.
  // Failures are logged, not fatal — the read API still serves what the
  // store already holds.
  if !cli.no_startup_refresh {
    let today = Utc::now().date_naive();
    if let Err(e) = reconciler.refresh_performances(DateWindow::day(today)).await
    {
      tracing::error!(error = %e, "startup performance refresh failed");
    }
    let horizon = today + Days::new(server_cfg.upcoming_days.into());
    if let Err(e) = reconciler
      .rebuild_upcoming(DateWindow::new(today, horizon))
      .await
    {
      tracing::error!(error = %e, "startup upcoming rebuild failed");
    }
  }

  // Build application state and serve.
  let state = AppState {
    store,
    tokens: Arc::new(TokenService::new(&server_cfg.token_secret)),
    reconciler,
    config: Arc::new(server_cfg.clone()),
  };

  let app = encore_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
