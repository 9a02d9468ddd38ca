//! `herodex-api` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use anyhow::{Context, Result};

use herodex_api::config::Config;
use herodex_api::server::Server;
use herodex_catalog::JsonFileSource;
use herodex_core::observability::{LogFormat, init_logging};
use herodex_core::storage::{MemoryBackend, StorageBackend};
use herodex_core::FileBackend;

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("load configuration")?;

    init_logging(choose_log_format(&config));

    let lists: Arc<dyn StorageBackend> = if let Some(dir) = config.lists_dir.as_deref() {
        tracing::info!(dir = %dir.display(), "Using file-backed list storage");
        Arc::new(
            FileBackend::open(dir)
                .await
                .with_context(|| format!("open list directory {}", dir.display()))?,
        )
    } else {
        if !config.debug {
            anyhow::bail!("HERODEX_LISTS_DIR is required when HERODEX_DEBUG=false");
        }
        tracing::warn!("HERODEX_LISTS_DIR not set; using in-memory list storage (debug only)");
        Arc::new(MemoryBackend::new())
    };

    let source = JsonFileSource::new(config.data.info_path(), config.data.powers_path());
    tracing::info!(
        info = %config.data.info_path().display(),
        powers = %config.data.powers_path().display(),
        "Catalog datasets configured"
    );

    let server = Server::builder()
        .config(config)
        .catalog_source(Arc::new(source))
        .list_backend(lists)
        .build();
    server.serve().await.context("run server")?;
    Ok(())
}
