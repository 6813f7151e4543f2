// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use clap::Parser;
use kube::Client;
use std::sync::Arc;
use svcdns::{
    cluster::KubeClusterState,
    config::Config,
    constants::TOKIO_WORKER_THREADS,
    context::Context,
    controller::{publish_version_marker, run_service_controller},
    metrics::serve_metrics,
    zone::{azure::AzureZoneClient, memory::InMemoryZone, ZoneClient},
};
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    // Parse before building the runtime so --help and bad flags exit immediately
    let config = Config::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("svcdns-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<()> {
    // Respects RUST_LOG (default: info) and RUST_LOG_FORMAT=json|text
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting Service DNS controller");

    config.validate().context("Invalid configuration")?;
    info!(
        subscription = %config.subscription,
        resource_group = %config.resource_group,
        zone = %config.zone_name,
        namespace = ?config.namespace,
        publish_headless = config.publish_headless,
        record_ttl = config.record_ttl,
        "Loaded configuration"
    );

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let zone: Arc<dyn ZoneClient> = if config.dry_run {
        warn!("Dry run: records are written to an in-memory zone only");
        Arc::new(InMemoryZone::new())
    } else {
        let tokens = config.token_source()?;
        Arc::new(AzureZoneClient::new(&config.zone_config(), tokens)?)
    };

    let settings = config.reconcile_settings();
    publish_version_marker(zone.as_ref(), settings.record_ttl).await?;

    let cluster = Arc::new(KubeClusterState::new(client.clone()));
    let ctx = Arc::new(Context::new(cluster, zone, settings));
    let metrics_addr = config.metrics_addr()?;

    // The controller returns on SIGTERM/SIGINT; the metrics server should never return
    tokio::select! {
        result = run_service_controller(client, ctx, config.namespace.clone()) => {
            result?;
            info!("Service controller shut down, exiting");
            Ok(())
        }
        result = serve_metrics(metrics_addr) => {
            error!("CRITICAL: Metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
    }
}
