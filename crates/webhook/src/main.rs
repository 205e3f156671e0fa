//! Resource Sizer - mutating admission webhook
//!
//! Rewrites container CPU and memory requests/limits of opted-in pods from
//! the owning workload's observed usage in a Prometheus-compatible store.

use anyhow::{Context, Result};
use resource_sizer::{api, config::WebhookConfig, tls};
use sizer_lib::{
    health::{components, HealthRegistry},
    PodMutator, PrometheusClient, ResourceAggregator, SizerMetrics, StructuredLogger,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SIZER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting resource-sizer");

    let config = WebhookConfig::load().context("Failed to load configuration")?;
    info!(
        metrics_endpoint = %config.metrics_endpoint,
        annotation_gate = config.annotation_gate,
        "Webhook configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::WEBHOOK).await;
    health_registry.register(components::OPS_API).await;
    health_registry.register(components::METRICS_STORE).await;

    // Register metrics before the first scrape
    let _metrics = SizerMetrics::new();

    let logger = StructuredLogger::webhook();
    logger.log_startup(SIZER_VERSION, &config.metrics_endpoint);

    let store = PrometheusClient::new(&config.prometheus())
        .context("Failed to create metrics store client")?;
    let aggregator = ResourceAggregator::new(Arc::new(store));
    let mutator = PodMutator::new(aggregator, config.gate(), health_registry.clone())
        .with_store_failure_threshold(config.store_failure_threshold)
        .with_logger(logger.clone());

    let app_state = Arc::new(api::AppState::new(mutator, health_registry.clone()));

    // Health and metrics stay on plain HTTP for kubelet probes and scrapers
    let ops_handle = tokio::spawn(api::serve(config.api_port, api::ops_router(app_state.clone())));

    let webhook_router = api::webhook_router(app_state);
    let webhook_handle = match config.tls_paths() {
        Some((cert, key)) => {
            let tls_config = tls::load_server_config(&cert, &key)?;
            let addr = SocketAddr::from(([0, 0, 0, 0], config.webhook_port));
            tokio::spawn(tls::serve_tls(addr, webhook_router, tls_config))
        }
        None => {
            warn!("No TLS certificate configured, serving webhook over plain HTTP");
            tokio::spawn(api::serve(config.webhook_port, webhook_router))
        }
    };

    health_registry.set_ready(true).await;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            logger.log_shutdown("SIGINT received");
        }
        reason = api::supervise(components::WEBHOOK, webhook_handle, health_registry.clone()) => {
            logger.log_shutdown(&reason);
            anyhow::bail!("webhook server exited: {}", reason);
        }
        reason = api::supervise(components::OPS_API, ops_handle, health_registry.clone()) => {
            logger.log_shutdown(&reason);
            anyhow::bail!("api server exited: {}", reason);
        }
    }

    health_registry.set_ready(false).await;
    info!("Shutting down");

    Ok(())
}
