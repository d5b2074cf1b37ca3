// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use kube::{
    api::{ApiResource, DynamicObject},
    runtime::watcher,
    Api, Client,
};
use oidc_gateway_operator::{
    cluster::KubeClusterApi,
    config::OperatorConfig,
    constants::{TOKIO_THREAD_NAME, TOKIO_WORKER_THREADS},
    crd::OIDCMiddlewareClient,
    filter::{AcceptAll, EventFilter, NamespaceFilter},
    metrics,
    reconcilers::{ClaimCoordinator, MiddlewareProvisioner},
    store::{ClientStore, MemoryClientStore, RedisClientStore},
    watch::{decode_client, watch_resources},
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    let config = OperatorConfig::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name(TOKIO_THREAD_NAME)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

fn init_logging() {
    // Respects RUST_LOG, defaults to INFO.
    // RUST_LOG_FORMAT=json switches to JSON output.
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
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    init_logging();

    let gateway = config.gateway_identity();
    info!(
        gateway = %gateway,
        namespace = %config.namespace,
        "Starting OIDC gateway operator"
    );

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let store = build_store(&config).await?;

    let middleware_resource = config.middleware_api_resource();
    let cluster = Arc::new(KubeClusterApi::new(
        client.clone(),
        middleware_resource.clone(),
    ));
    let provisioner = MiddlewareProvisioner::new(
        cluster.clone(),
        config.routing(),
        middleware_resource,
        gateway.clone(),
    );
    let coordinator = ClaimCoordinator::new(
        gateway,
        cluster,
        store,
        provisioner,
        config.settle_delay(),
    );

    let watch_namespace = config.watch_namespace();
    let client_resource = ApiResource::erase::<OIDCMiddlewareClient>(&());
    let api: Api<DynamicObject> = match &watch_namespace {
        Some(ns) => Api::namespaced_with(client, ns, &client_resource),
        None => Api::all_with(client, &client_resource),
    };
    info!(
        scope = watch_namespace.as_deref().unwrap_or("<all namespaces>"),
        "Watching OIDCMiddlewareClient resources"
    );

    let events = watch_resources(
        api,
        watcher::Config::default(),
        decode_client,
        event_filter(watch_namespace.as_deref()),
    );

    // The coordinator and metrics server should never exit on their own
    tokio::select! {
        () = coordinator.run(events) => {
            error!("CRITICAL: claim coordinator exited unexpectedly");
            anyhow::bail!("claim coordinator exited unexpectedly")
        }
        result = metrics::serve_metrics(config.metrics_bind_address) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
        result = shutdown_signal() => {
            result?;
            info!("Graceful shutdown completed");
            Ok(())
        }
    }
}

/// Redis when a URI is configured, otherwise an in-process store.
async fn build_store(config: &OperatorConfig) -> Result<Arc<dyn ClientStore>> {
    match config.redis_uri.as_deref().filter(|uri| !uri.is_empty()) {
        Some(uri) => {
            info!("Connecting to Redis de-dup store");
            Ok(Arc::new(RedisClientStore::connect(uri).await?))
        }
        None => {
            warn!("No Redis URI configured, using in-memory de-dup store");
            Ok(Arc::new(MemoryClientStore::new()))
        }
    }
}

fn event_filter(watch_namespace: Option<&str>) -> Box<dyn EventFilter<OIDCMiddlewareClient>> {
    match watch_namespace {
        Some(ns) => Box::new(NamespaceFilter::new(ns)),
        None => Box::new(AcceptAll),
    }
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received SIGINT, initiating graceful shutdown...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM (pod termination), initiating graceful shutdown...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received SIGINT, initiating graceful shutdown...");
    }
    Ok(())
}
