//! # GridMatch Server
//!
//! Main entry point for the GridMatch matcher service: loads configuration,
//! wires the matcher service to its job store, and runs the gRPC and REST
//! listeners concurrently until shutdown.

use gridmatch_config::{AppConfig, ConfigLoader};
use gridmatch_core::result::MatcherResult;
use gridmatch_core::telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig};
use gridmatch_grpc::{MatcherGrpcServer, RemoteJobStore};
use gridmatch_matcher::di::MatcherComponent;
use gridmatch_matcher::resilient_store::ResilientJobStore;
use gridmatch_matcher::store::JobStore;
use gridmatch_rest::create_router;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

mod startup;

use startup::{print_banner, print_startup_info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> MatcherResult<()> {
    let config_loader = ConfigLoader::from_default_location()?;
    let config = config_loader.get().await;

    init_telemetry(&telemetry_config(&config))?;
    print_banner();

    info!("Starting GridMatch Server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.environment);
    print_startup_info(config.server.rest_port, config.server.grpc_port);

    let result = run_monolithic(config).await;
    shutdown_telemetry();
    result
}

fn telemetry_config(config: &AppConfig) -> TelemetryConfig {
    TelemetryConfig {
        enabled: config.observability.tracing_enabled,
        service_name: config.observability.service_name.clone(),
        otlp_endpoint: config.observability.otlp_endpoint.clone(),
        sampling_ratio: config.observability.sampling_ratio,
        console_output: true,
    }
}

/// Single deployment shape: construct the job store, wrap it in the
/// resilience layer, build the matcher service, and run gRPC and REST
/// concurrently until `SIGINT`/`SIGTERM`.
async fn run_monolithic(config: AppConfig) -> MatcherResult<()> {
    let remote_store = RemoteJobStore::connect(
        &config.job_store.endpoint,
        config.job_store.connect_timeout(),
    )
    .await?;

    let resilient_store: Arc<dyn JobStore> = Arc::new(ResilientJobStore::from_config(
        Arc::new(remote_store),
        &config.job_store,
        &config.resilience,
    ));

    let matcher = Arc::new(MatcherComponent::new(resilient_store, config.matcher.max_queues_scanned));

    let router = create_router(matcher.clone(), &config.server);

    let rest_addr = config.server.rest_addr();
    info!("Starting REST server on http://{}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr)
        .await
        .map_err(|e| gridmatch_core::error::MatcherError::internal(format!("failed to bind REST: {e}")))?;

    let grpc_server = MatcherGrpcServer::new(&config.server, matcher)?;

    tokio::select! {
        result = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()) => {
            result.map_err(|e| gridmatch_core::error::MatcherError::internal(format!("REST server error: {e}")))?;
        }
        result = grpc_server.serve() => {
            result?;
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
