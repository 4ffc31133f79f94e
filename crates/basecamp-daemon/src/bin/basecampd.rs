//! `basecampd` — standalone daemon binary for the research-workstation
//! orchestrator.
//!
//! Thin entry point: load configuration, wire every component crate into
//! an [`AppState`], spawn the background scan loops, and serve the REST
//! API until a termination signal or `/shutdown` call fires.

#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

use std::process::ExitCode;
use std::sync::Arc;

use basecamp_daemon::prelude::*;
use basecamp_pricing::{PricingEngine, RateTable};
use basecamp_provider::{CloudProvider, HttpCloudProvider, HttpProviderConfig};
use basecamp_storage::{Database, StateStore, SurrealStateStore};
use basecamp_telemetry::{LogConfig, LogFormat};
use basecamp_template::{TemplateDirectories, TemplateResolver};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::from(0),
        Err(StartupError::Config(err)) => {
            eprintln!("configuration error: {err}");
            ExitCode::from(2)
        },
        Err(StartupError::Other(err)) => {
            eprintln!("failed to start daemon: {err}");
            ExitCode::from(3)
        },
    }
}

enum StartupError {
    Config(basecamp_config::ConfigError),
    Other(anyhow::Error),
}

impl From<anyhow::Error> for StartupError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err)
    }
}

async fn run() -> Result<(), StartupError> {
    let resolved = basecamp_config::Config::load().map_err(StartupError::Config)?;
    let config = resolved.config;

    let log_config = LogConfig::new(config.log_level.clone()).with_format(parse_log_format(&config.log_format));
    if let Err(err) = basecamp_telemetry::setup_logging(&log_config) {
        eprintln!("failed to initialize logging: {err}");
    }

    tracing::info!(region = %config.region, listen = %format!("{}:{}", config.listen_addr, config.listen_port), "starting basecampd");

    let state_dir = config.state_dir.to_string_lossy().into_owned();
    let db = Database::connect_embedded(&state_dir)
        .await
        .map_err(|e| anyhow::anyhow!("failed to open state store at {state_dir}: {e}"))?;
    let store: Arc<dyn StateStore> = Arc::new(SurrealStateStore::new(db));

    let provider: Arc<dyn CloudProvider> = Arc::new(HttpCloudProvider::new(HttpProviderConfig {
        name: config.cloud_profile.clone(),
        base_url: std::env::var("BASECAMP_PROVIDER_BASE_URL")
            .unwrap_or_else(|_| "https://api.cloud.invalid".to_owned()),
        api_key: std::env::var("BASECAMP_PROVIDER_API_KEY").unwrap_or_default(),
    }));

    let template_dirs = config
        .template_dirs
        .iter()
        .fold(TemplateDirectories::new(), |dirs, dir| dirs.with_dir(dir.clone()));
    let templates = Arc::new(
        TemplateResolver::new(template_dirs).map_err(|e| anyhow::anyhow!("failed to load templates: {e}"))?,
    );
    let pricing = Arc::new(PricingEngine::new(RateTable::bundled_defaults()));

    let state = AppState::new(config.clone(), store, provider, templates, pricing);

    let idle_handle = tokio::spawn(idle_scan_loop(state.clone()));
    let budget_handle = tokio::spawn(budget_scan_loop(state.clone()));
    let cost_handle = tokio::spawn(cost_reconciliation_loop(state.clone()));

    let router = build_router(state.clone());
    let addr = format!("{}:{}", config.listen_addr, config.listen_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;
    tracing::info!(%addr, "listening");

    let shutdown = state.shutdown.clone();
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        wait_for_shutdown_signal(shutdown).await;
    });

    if let Err(err) = server.await {
        tracing::error!(error = %err, "server exited with error");
    }

    state.shutdown.cancel();
    let _ = tokio::join!(idle_handle, budget_handle, cost_handle);
    tracing::info!("basecampd stopped");
    Ok(())
}

async fn wait_for_shutdown_signal(shutdown: tokio_util::sync::CancellationToken) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
        () = shutdown.cancelled() => tracing::info!("shutdown requested via API"),
    }
    shutdown.cancel();
}

fn parse_log_format(value: &str) -> LogFormat {
    match value {
        "json" => LogFormat::Json,
        "compact" => LogFormat::Compact,
        "full" => LogFormat::Full,
        _ => LogFormat::Pretty,
    }
}
