//! HTTP transport for the elysees lease store.

pub mod config;
mod routes;
mod validate;

pub use config::{Cli, ServerConfig, ServerConfigBuilder};
pub use routes::router;

use anyhow::{Context, Result};
use elysees::LeaseStore;
use log::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Binds `config.bind` and serves until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("cannot bind {}", config.bind))?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("ctrl-c handler failed: {e}");
        }
        info!("shutting down");
    };

    serve_on(listener, config, Arc::new(LeaseStore::new()), shutdown).await
}

/// Serves `store` on an already bound listener until `shutdown` resolves.
pub async fn serve_on<F>(
    listener: TcpListener,
    config: ServerConfig,
    store: Arc<LeaseStore>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("listener has no address")?;
    info!(
        "listening on {addr}, max_lease={} ms, max_extension={} ms, compact={:?}",
        config.max_lease_duration_ms, config.max_lease_extension_duration_ms, config.compact_interval
    );

    if let Some(every) = config.compact_interval {
        tokio::spawn(compact_gates(Arc::clone(&store), every));
    }

    axum::serve(listener, router(&config, store))
        .with_graceful_shutdown(shutdown)
        .await
        .context("server terminated")
}

async fn compact_gates(store: Arc<LeaseStore>, every: Duration) {
    let mut tick = tokio::time::interval(every);
    tick.tick().await; // first tick is immediate
    loop {
        tick.tick().await;
        let removed = store.gates().compact();
        if removed > 0 {
            info!("compacted {removed} idle gates, {} left", store.gates().len());
        }
    }
}
