// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use dnssd_operator::{
    config::Settings,
    constants::{
        ERROR_REQUEUE_DURATION_SECS, KIND_DNSSD_SERVICE_INSTANCE, METRICS_SERVER_PATH,
        PENDING_REQUEUE_DURATION_SECS, RESYNC_REQUEUE_DURATION_SECS, TOKIO_WORKER_THREADS,
    },
    crd::DNSSDServiceInstance,
    metrics,
    reconcilers::{DnssdReconciler, KubeInstanceStore, ReconcileOutcome},
};
use futures::{Stream, StreamExt};
use kube::{
    runtime::{
        controller::Action,
        predicates, reflector,
        watcher::{self, watcher, Config},
        Controller, PredicateConfig, WatchStreamExt,
    },
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

fn main() -> Result<()> {
    let settings = Settings::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("dnssd-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(settings))
}

async fn async_main(settings: Settings) -> Result<()> {
    // Format: timestamp file:line LEVEL message
    // RUST_LOG selects the level (default info), RUST_LOG_FORMAT=json switches to JSON
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

    info!("Starting DNS-SD operator");

    let registry = settings
        .build_registry()
        .context("Failed to configure DNS providers")?;
    if registry.is_empty() {
        warn!("No DNS providers configured; every instance will stay Pending");
    }
    for provider in registry.iter() {
        info!(
            provider = %provider.id(),
            description = %provider.describe(),
            "DNS provider enabled"
        );
    }

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let store = Arc::new(KubeInstanceStore::new(client.clone()));
    let reconciler = Arc::new(DnssdReconciler::new(registry, store, settings.timeouts()));

    // Controllers should never exit; if one does, log it and exit the process
    tokio::select! {
        result = run_dnssdserviceinstance_controller(client, reconciler) => {
            error!("CRITICAL: DNSSDServiceInstance controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("DNSSDServiceInstance controller exited unexpectedly without error")
        }
        result = run_metrics_server(settings.metrics_address()) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
        result = shutdown_signal() => {
            result?;
            info!("Stopping DNS-SD operator");
            Ok(())
        }
    }
}

/// Resolve on SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received SIGINT, initiating graceful shutdown");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM (pod termination), initiating graceful shutdown");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received SIGINT, initiating graceful shutdown");
    }
    Ok(())
}

/// Run the `DNSSDServiceInstance` controller
async fn run_dnssdserviceinstance_controller(
    client: Client,
    reconciler: Arc<DnssdReconciler>,
) -> Result<()> {
    info!("Starting DNSSDServiceInstance controller");

    let api = Api::<DNSSDServiceInstance>::all(client);
    let (reader, writer) = reflector::store();
    let events = watcher(api, Config::default())
        .default_backoff()
        .reflect(writer)
        .applied_objects();

    Controller::for_stream(generation_changes(events), reader)
        .run(reconcile_dnssdserviceinstance_wrapper, error_policy, reconciler)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Pass only objects whose `metadata.generation` moved.
///
/// Status patches leave the generation alone, so they do not trigger another
/// reconcile. Setting `deletionTimestamp` bumps it, so deletions still do.
fn generation_changes<S>(
    events: S,
) -> impl Stream<Item = Result<DNSSDServiceInstance, watcher::Error>> + Send
where
    S: Stream<Item = Result<DNSSDServiceInstance, watcher::Error>> + Send,
{
    events.predicate_filter(predicates::generation, PredicateConfig::default())
}

/// Reconcile wrapper for `DNSSDServiceInstance`
async fn reconcile_dnssdserviceinstance_wrapper(
    instance: Arc<DNSSDServiceInstance>,
    ctx: Arc<DnssdReconciler>,
) -> Result<Action, ReconcileError> {
    debug!(
        name = %instance.name_any(),
        namespace = ?instance.namespace(),
        "Reconcile wrapper called for DNSSDServiceInstance"
    );

    let started = Instant::now();
    match ctx.reconcile(&instance).await {
        Ok(outcome) => {
            info!(
                "Successfully reconciled DNSSDServiceInstance: {}/{} ({:?})",
                instance.namespace().unwrap_or_default(),
                instance.name_any(),
                outcome
            );
            metrics::record_reconciliation_success(KIND_DNSSD_SERVICE_INSTANCE, started.elapsed());
            if let Some(reason) = requeue_reason(&outcome) {
                metrics::record_reconciliation_requeue(KIND_DNSSD_SERVICE_INSTANCE, reason);
            }
            Ok(action_for(&outcome))
        }
        Err(e) => {
            error!(
                "Failed to reconcile DNSSDServiceInstance {}/{}: {:#}",
                instance.namespace().unwrap_or_default(),
                instance.name_any(),
                e
            );
            metrics::record_reconciliation_error(KIND_DNSSD_SERVICE_INSTANCE, started.elapsed());
            Err(e.into())
        }
    }
}

/// When to look at a resource again after a successful reconciliation.
///
/// Advertised instances are resynced every 5 minutes, so records edited
/// out-of-band are restored. Pending instances are retried every 30 seconds
/// in case a provider starts hosting the domain. Rejected specs and deleted
/// resources wait for the next change.
fn action_for(outcome: &ReconcileOutcome) -> Action {
    match outcome {
        ReconcileOutcome::Advertised(_) => {
            Action::requeue(Duration::from_secs(RESYNC_REQUEUE_DURATION_SECS))
        }
        ReconcileOutcome::Pending => {
            Action::requeue(Duration::from_secs(PENDING_REQUEUE_DURATION_SECS))
        }
        ReconcileOutcome::Rejected
        | ReconcileOutcome::Unadvertised
        | ReconcileOutcome::RemovalPermitted => Action::await_change(),
    }
}

fn requeue_reason(outcome: &ReconcileOutcome) -> Option<&'static str> {
    match outcome {
        ReconcileOutcome::Advertised(_) => Some("resync"),
        ReconcileOutcome::Pending => Some("pending"),
        _ => None,
    }
}

/// Error policy for the `DNSSDServiceInstance` controller
fn error_policy(
    _resource: Arc<DNSSDServiceInstance>,
    _err: &ReconcileError,
    _ctx: Arc<DnssdReconciler>,
) -> Action {
    metrics::record_reconciliation_requeue(KIND_DNSSD_SERVICE_INSTANCE, "error");
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// Serve Prometheus metrics until the listener fails.
async fn run_metrics_server(address: String) -> Result<()> {
    let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind metrics server to {address}"))?;
    info!("Metrics listening on http://{}{}", address, METRICS_SERVER_PATH);

    axum::serve(listener, app)
        .await
        .context("Metrics server failed")
}

async fn metrics_handler() -> Result<String, StatusCode> {
    metrics::gather_metrics().map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
