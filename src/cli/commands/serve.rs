//! cli::commands::serve
//!
//! Long-running service: HTTP endpoint plus the single event worker.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::config::Config;
use crate::forge::bitbucket::BitbucketForge;
use crate::forge::Forge;
use crate::server::{self, AppState};
use crate::worker::{EventQueue, EventWorker, WorkerSettings};

/// Start the service and block until Ctrl-C.
///
/// After the server stops accepting requests the worker finishes the
/// events already queued, then the process exits.
pub fn serve(config_path: Option<&Path>, listen: Option<&str>) -> Result<()> {
    let loaded = Config::load(config_path).context("loading configuration")?;
    let mut config = loaded.config;
    if let Some(listen) = listen {
        config.listen = listen.to_string();
    }
    let addr = config.listen_addr()?;

    match &loaded.source {
        Some(path) => info!(config = %path.display(), "configuration loaded"),
        None => info!("no config file, using defaults and environment"),
    }
    if config.token.is_empty() {
        warn!("no webhook token configured, accepting unauthenticated requests");
    }

    std::fs::create_dir_all(&config.workdir)
        .with_context(|| format!("creating workdir {}", config.workdir.display()))?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let forge: Arc<dyn Forge> = Arc::new(BitbucketForge::with_api_base(
            config.credentials.clone(),
            config.bitbucket.api_base.clone(),
        ));

        let (sender, receiver) = EventQueue::bounded(config.queue_capacity);
        let worker = EventWorker::new(forge, WorkerSettings::from(&config));
        let worker_task = tokio::spawn(worker.run(receiver));

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {addr}"))?;
        server::serve(listener, AppState::new(config.token.clone(), sender), shutdown_signal())
            .await
            .context("HTTP server failed")?;

        info!("server stopped, draining queued events");
        worker_task.await.context("worker task failed")?;
        Ok::<(), anyhow::Error>(())
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
