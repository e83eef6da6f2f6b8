//! Startup helpers for the chatbot server.

use std::process::ExitCode;

use anyhow::Context;

use crate::config::AppConfig;
use crate::remote::AwsBackends;
use crate::server::{self, AppState};

/// Load configuration, connect the AWS clients and serve until Ctrl+C.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting RAG chatbot v{}", env!("CARGO_PKG_VERSION"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(serve(config)) {
        tracing::error!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!(
        bucket = %config.target.bucket,
        knowledge_base_id = %config.target.knowledge_base_id,
        data_source_id = %config.target.data_source_id,
        "configuration loaded"
    );

    let backends = AwsBackends::connect(&config).await;
    let state = AppState::new(config, backends.into());

    server::run_server_with_shutdown(state, shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Ctrl+C handler failed: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}
