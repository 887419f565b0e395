//! # Initialization
//!
//! Controller startup: rustls provider, tracing, metrics, probe server,
//! Kubernetes client and one reconciler per managed kind.

use crate::config::{load_config, ControllerConfig, ServerConfig};
use crate::controller::reconciler::{
    ConflictDebouncer, Reconciler, ReconcilerSettings, SystemClock,
};
use crate::controller::server::{start_server, ServerState};
use crate::crd::{Bucket, ManagedResource, Organization, Token};
use crate::influxdb::InfluxRestConnector;
use crate::observability;
use crate::store::KubeStore;
use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info, warn};

/// One reconciler per managed kind, sharing the debouncer and connector
pub struct Reconcilers {
    pub bucket: Arc<Reconciler<Bucket>>,
    pub organization: Arc<Reconciler<Organization>>,
    pub token: Arc<Reconciler<Token>>,
}

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    pub controller_config: ControllerConfig,
    pub reconcilers: Reconcilers,
    pub server_state: Arc<ServerState>,
}

fn build_reconciler<K: ManagedResource>(
    client: &Client,
    connector: &Arc<InfluxRestConnector>,
    debouncer: &Arc<ConflictDebouncer>,
    settings: &ReconcilerSettings,
) -> Arc<Reconciler<K>> {
    Arc::new(Reconciler::new(
        Arc::new(KubeStore::<K>::new(client.clone())),
        Arc::clone(connector) as _,
        Arc::clone(debouncer),
        Arc::new(SystemClock),
        settings.clone(),
    ))
}

/// Initialize the controller runtime
pub async fn initialize() -> Result<InitializationResult> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "influxdb_operator=info".into()),
        )
        .init();

    // Must happen before anything opens a TLS connection
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting InfluxDB operator");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    let (controller_config, server_config) = load_config();
    info!("Controller config: {:?}", controller_config);

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {:#}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let settings = ReconcilerSettings::from(&controller_config);
    let connector = Arc::new(InfluxRestConnector::new(controller_config.influxdb_http_timeout));
    let debouncer = Arc::new(ConflictDebouncer::new(Arc::new(SystemClock)));
    let reconcilers = Reconcilers {
        bucket: build_reconciler(&client, &connector, &debouncer, &settings),
        organization: build_reconciler(&client, &connector, &debouncer, &settings),
        token: build_reconciler(&client, &connector, &debouncer, &settings),
    };

    let namespace = controller_config.watch_namespace.as_deref();
    summarize_existing::<Bucket>(&client, namespace).await;
    summarize_existing::<Organization>(&client, namespace).await;
    summarize_existing::<Token>(&client, namespace).await;

    info!("Controller initialized, starting watch loop...");
    Ok(InitializationResult {
        client,
        controller_config,
        reconcilers,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > server_config.startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                server_config.startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(server_config.poll_interval).await;
    }
}

/// Log how many records of kind `K` exist per namespace
///
/// Also checks that the CRD is installed. The controllers reconcile these
/// records on their first watch event.
async fn summarize_existing<K: ManagedResource>(client: &Client, namespace: Option<&str>) {
    let kind = K::kind(&());
    let api: Api<K> = match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };

    match api.list(&ListParams::default()).await {
        Ok(list) => {
            let mut by_namespace: BTreeMap<String, usize> = BTreeMap::new();
            for item in &list.items {
                *by_namespace.entry(item.namespace().unwrap_or_default()).or_default() += 1;
            }
            info!(
                "Found {} existing {} resources in {} namespaces",
                list.items.len(),
                kind,
                by_namespace.len()
            );
            for (ns, count) in &by_namespace {
                info!("  {}: {}", ns, count);
            }
        }
        Err(e) => {
            error!("{} CRD is not queryable: {}. Is the CRD installed?", kind, e);
            error!("Installation: crdgen | kubectl apply -f -");
            warn!("Continuing despite CRD check failure - the controller will retry");
        }
    }
}
