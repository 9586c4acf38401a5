//! vox-server – entry point.
//!
//! `serve` runs the voice-facing HTTP front-end; `worker` consumes the
//! request queue. Both share one queue database. With `VOX_QUEUE_URL=memory`
//! `serve` runs the worker in-process instead.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Build provider clients and the model registry.
//! 4. Open the queues.
//! 5. Run the selected sub-command until SIGINT / SIGTERM.

mod bootstrap;
mod config;
mod error;
mod middleware;
mod routes;
mod schemas;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::config::Config;
use crate::state::AppState;

#[derive(Parser)]
#[command(
    name = "vox-server",
    about = "Asynchronous job bridge between a voice front-end and generative AI providers",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Default)]
enum Command {
    /// Serve the voice endpoints (default).
    #[default]
    Serve,
    /// Consume the request queue and publish results.
    Worker,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    init_tracing(&cfg);
    info!(version = env!("CARGO_PKG_VERSION"), config = ?cfg, "vox-server starting");

    // ── 3. Providers and registry ──────────────────────────────────────────────
    let resources = bootstrap::build_resources(&cfg)?;
    let registry = bootstrap::build_registry(&resources);

    // ── 4. Queues ──────────────────────────────────────────────────────────────
    let queues = bootstrap::open_queues(&cfg).await?;

    // ── 5. Sub-command ─────────────────────────────────────────────────────────
    match cli.command.unwrap_or_default() {
        Command::Serve => {
            let worker = if cfg.in_memory_queue() {
                let worker = bootstrap::build_worker(
                    &cfg,
                    registry.clone(),
                    resources,
                    queues.responses.clone(),
                );
                let requests = queues.requests.clone();
                let wait = cfg.worker_wait();
                let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
                let handle = tokio::spawn(async move {
                    worker
                        .run(requests.as_ref(), wait, async {
                            let _ = stop_rx.await;
                        })
                        .await;
                });
                Some((stop_tx, handle))
            } else {
                None
            };

            let state = AppState::new(
                Arc::new(cfg.clone()),
                registry,
                queues.requests,
                queues.responses,
            );
            let app = routes::build(Arc::new(state));
            let addr: SocketAddr = cfg.bind_address.parse()?;
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(%addr, "HTTP server listening");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            if let Some((stop_tx, handle)) = worker {
                let _ = stop_tx.send(());
                if let Err(e) = handle.await {
                    warn!(error = %e, "in-process worker ended abnormally");
                }
            }
        }
        Command::Worker => {
            if cfg.in_memory_queue() {
                bail!("VOX_QUEUE_URL=memory has no separate worker; run `serve` instead");
            }
            let worker = bootstrap::build_worker(&cfg, registry, resources, queues.responses);
            worker
                .run(queues.requests.as_ref(), cfg.worker_wait(), shutdown_signal())
                .await;
        }
    }

    info!("vox-server stopped");
    Ok(())
}

fn init_tracing(cfg: &Config) {
    // VOX_LOG wins over RUST_LOG; warn loudly if it does not parse.
    let env_filter = match cfg.log_level.as_deref() {
        Some(level) => match level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: VOX_LOG='{level}' is not a valid tracing filter ({e}); \
                     falling back to 'info'"
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
