//! pagesync server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use pagesync_client::{FetchClient, FetchConfig, PageCache};
use pagesync_core::{AppConfig, PageDb, QueryCache};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

use tools::{AppState, Source};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;

    tracing::info!(
        db_path = %config.db_path.display(),
        source_url = %config.source_url,
        page_ttl_secs = config.page_ttl_secs,
        query_ttl_secs = config.query_ttl_secs,
        "Starting pagesync server on stdio transport"
    );

    let db = PageDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening store at {}", config.db_path.display()))?;
    let source: Source = Arc::new(FetchClient::new(FetchConfig::from(&config)).context("building fetch client")?);

    let state = AppState {
        pages: PageCache::new(db.clone(), source, config.sync_policy()),
        queries: QueryCache::new(db, config.query_ttl()),
    };

    let handler = handler::PageSyncServer::new(Arc::new(state));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
