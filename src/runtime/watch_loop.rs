//! # Watch Loop
//!
//! Runs one controller per managed kind until a shutdown signal arrives.
//! Token controllers also watch the Secrets they own so that a deleted or
//! edited token Secret is restored.

use crate::controller::reconciler::{reconcile, ExternalKind, Reconciler};
use crate::crd::{Bucket, Organization, Token};
use crate::runtime::error_policy::{error_policy, report_controller_result};
use crate::runtime::initialization::InitializationResult;
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use kube_runtime::controller::Config as ControllerRunConfig;
use kube_runtime::{watcher, Controller};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

async fn run_controller<K: ExternalKind>(
    controller: Controller<K>,
    reconciler: Arc<Reconciler<K>>,
) {
    controller
        .shutdown_on_signal()
        .run(reconcile::<K>, error_policy::<K>, reconciler)
        .for_each(|result| async move { report_controller_result::<K>(result) })
        .await;
    info!("{} controller stopped", K::kind(&()));
}

/// Run the Bucket, Organization and Token controllers concurrently
pub async fn run_watch_loop(init: InitializationResult) -> Result<()> {
    let InitializationResult {
        client,
        controller_config,
        reconcilers,
        server_state,
    } = init;

    let namespace = controller_config.watch_namespace.as_deref();
    let run_config = ControllerRunConfig::default().concurrency(controller_config.concurrency);
    match namespace {
        Some(ns) => info!("Watching namespace {}", ns),
        None => info!("Watching all namespaces"),
    }

    let buckets = Controller::new(scoped_api::<Bucket>(&client, namespace), watcher::Config::default())
        .with_config(run_config.clone());
    let organizations = Controller::new(
        scoped_api::<Organization>(&client, namespace),
        watcher::Config::default(),
    )
    .with_config(run_config.clone());
    let tokens = Controller::new(scoped_api::<Token>(&client, namespace), watcher::Config::default())
        .owns(scoped_api::<Secret>(&client, namespace), watcher::Config::default())
        .with_config(run_config);

    tokio::join!(
        run_controller(buckets, reconcilers.bucket),
        run_controller(organizations, reconcilers.organization),
        run_controller(tokens, reconcilers.token),
    );

    server_state.is_ready.store(false, Ordering::Relaxed);
    info!("Controller terminated");
    Ok(())
}
