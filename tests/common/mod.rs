//! In-memory record store and InfluxDB fakes shared by the integration tests

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use influxdb_operator::controller::reconciler::{
    ConflictDebouncer, ManualClock, Reconciler, ReconcilerSettings,
};
use influxdb_operator::crd::{Config, ConfigSpec, ManagedResource};
use influxdb_operator::influxdb::types::{
    Authorization, Bucket, NewAuthorization, NewBucket, Organization,
};
use influxdb_operator::influxdb::{InfluxConnector, InfluxError, InfluxSession};
use influxdb_operator::store::{RecordStore, SecretWrite, StoreError};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use zeroize::Zeroizing;

pub const NAMESPACE: &str = "default";
pub const ORG_NAME: &str = "influxdata";
pub const ADMIN_TOKEN: &str = "admin-token";

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

pub fn meta(name: &str, uid: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(NAMESPACE.to_string()),
        uid: Some(uid.to_string()),
        generation: Some(1),
        ..Default::default()
    }
}

struct StoreState<K> {
    records: BTreeMap<Key, K>,
    configs: BTreeMap<Key, Config>,
    secrets: BTreeMap<Key, Secret>,
    next_version: u64,
    record_writes: usize,
}

/// Record store that checks resourceVersion on every write
///
/// A record marked for deletion disappears once its last finalizer is gone.
pub struct MemoryStore<K> {
    state: Mutex<StoreState<K>>,
}

impl<K: ManagedResource> MemoryStore<K> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                records: BTreeMap::new(),
                configs: BTreeMap::new(),
                secrets: BTreeMap::new(),
                next_version: 1,
                record_writes: 0,
            }),
        }
    }

    pub fn insert(&self, mut obj: K) {
        let mut state = lock(&self.state);
        obj.meta_mut().resource_version = Some(state.next_version.to_string());
        state.next_version += 1;
        let k = key(&obj.namespace().unwrap_or_default(), &obj.name_any());
        state.records.insert(k, obj);
    }

    pub fn record(&self, name: &str) -> Option<K> {
        lock(&self.state).records.get(&key(NAMESPACE, name)).cloned()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.record(name).is_some()
    }

    /// Set the deletion timestamp the way a delete request does
    pub fn mark_for_deletion(&self, name: &str) {
        let deleted_at: Time = serde_json::from_value(serde_json::json!("2026-01-02T00:00:00Z"))
            .expect("valid timestamp");
        let mut state = lock(&self.state);
        let version = state.next_version;
        state.next_version += 1;
        let record = state
            .records
            .get_mut(&key(NAMESPACE, name))
            .expect("record exists");
        record.meta_mut().deletion_timestamp = Some(deleted_at);
        record.meta_mut().resource_version = Some(version.to_string());
    }

    pub fn add_config(&self, name: &str, spec: ConfigSpec) {
        let mut config = Config::new(name, spec);
        config.metadata.namespace = Some(NAMESPACE.to_string());
        lock(&self.state).configs.insert(key(NAMESPACE, name), config);
    }

    pub fn remove_config(&self, name: &str) {
        lock(&self.state).configs.remove(&key(NAMESPACE, name));
    }

    pub fn add_secret(&self, namespace: &str, name: &str, data: &[(&str, &[u8])]) {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            data: Some(
                data.iter()
                    .map(|(k, v)| ((*k).to_string(), ByteString(v.to_vec())))
                    .collect(),
            ),
            ..Default::default()
        };
        lock(&self.state).secrets.insert(key(namespace, name), secret);
    }

    pub fn secret(&self, name: &str) -> Option<Secret> {
        lock(&self.state).secrets.get(&key(NAMESPACE, name)).cloned()
    }

    pub fn secret_value(&self, name: &str, data_key: &str) -> Option<String> {
        self.secret(name)
            .and_then(|s| s.data)
            .and_then(|data| data.get(data_key).cloned())
            .map(|value| String::from_utf8_lossy(&value.0).into_owned())
    }

    pub fn remove_secret(&self, name: &str) {
        lock(&self.state).secrets.remove(&key(NAMESPACE, name));
    }

    /// Number of successful record and status writes
    pub fn record_writes(&self) -> usize {
        lock(&self.state).record_writes
    }

    fn write(&self, obj: &K, merge: impl FnOnce(&K, &K) -> K) -> Result<K, StoreError> {
        let mut state = lock(&self.state);
        let k = key(&obj.namespace().unwrap_or_default(), &obj.name_any());
        let Some(stored) = state.records.get(&k) else {
            return Err(StoreError::NotFound {
                kind: K::kind(&()).to_string(),
                namespace: k.0,
                name: k.1,
            });
        };
        if stored.resource_version() != obj.resource_version() {
            return Err(StoreError::Conflict {
                kind: K::kind(&()).to_string(),
                namespace: k.0,
                name: k.1,
            });
        }

        let mut updated = merge(stored, obj);
        updated.meta_mut().resource_version = Some(state.next_version.to_string());
        state.next_version += 1;
        state.record_writes += 1;

        if updated.meta().deletion_timestamp.is_some() && updated.finalizers().is_empty() {
            state.records.remove(&k);
        } else {
            state.records.insert(k, updated.clone());
        }
        Ok(updated)
    }
}

#[async_trait]
impl<K: ManagedResource> RecordStore<K> for MemoryStore<K> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError> {
        Ok(lock(&self.state).records.get(&key(namespace, name)).cloned())
    }

    async fn update(&self, obj: &K) -> Result<K, StoreError> {
        self.write(obj, |stored, obj| {
            let mut updated = obj.clone();
            if let Some(status) = stored.status() {
                *updated.status_mut() = status.clone();
            }
            updated
        })
    }

    async fn update_status(&self, obj: &K) -> Result<K, StoreError> {
        self.write(obj, |stored, obj| {
            let mut updated = stored.clone();
            *updated.status_mut() = obj.status().cloned().unwrap_or_default();
            updated
        })
    }

    async fn get_config(&self, namespace: &str, name: &str) -> Result<Option<Config>, StoreError> {
        Ok(lock(&self.state).configs.get(&key(namespace, name)).cloned())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        Ok(lock(&self.state).secrets.get(&key(namespace, name)).cloned())
    }

    async fn create_secret(&self, secret: &Secret) -> Result<SecretWrite, StoreError> {
        let mut state = lock(&self.state);
        let k = key(&secret.namespace().unwrap_or_default(), &secret.name_any());
        if state.secrets.contains_key(&k) {
            return Ok(SecretWrite::AlreadyExists);
        }
        state.secrets.insert(k, secret.clone());
        Ok(SecretWrite::Created)
    }

    async fn replace_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        let k = key(&secret.namespace().unwrap_or_default(), &secret.name_any());
        lock(&self.state).secrets.insert(k, secret.clone());
        Ok(())
    }
}

#[derive(Default)]
struct InfluxState {
    organizations: Vec<Organization>,
    buckets: Vec<Bucket>,
    authorizations: Vec<Authorization>,
    next_id: u64,
    calls: Vec<String>,
    connects: Vec<(String, String)>,
    closes: usize,
    /// Status code returned by the next call of an operation
    failures: HashMap<&'static str, u16>,
    /// Operations whose next call never answers
    stalls: HashSet<&'static str>,
}

impl InfluxState {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:016x}", self.next_id)
    }
}

/// In-memory InfluxDB that records every call
#[derive(Clone, Default)]
pub struct FakeInflux {
    state: Arc<Mutex<InfluxState>>,
}

impl FakeInflux {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.add_organization(ORG_NAME);
        fake
    }

    pub fn add_organization(&self, name: &str) -> String {
        let mut state = lock(&self.state);
        let id = state.next_id();
        state.organizations.push(Organization {
            id: Some(id.clone()),
            name: name.to_string(),
            description: None,
        });
        id
    }

    pub fn remove_organization(&self, name: &str) {
        lock(&self.state).organizations.retain(|o| o.name != name);
    }

    pub fn organization_id(&self, name: &str) -> Option<String> {
        lock(&self.state)
            .organizations
            .iter()
            .find(|o| o.name == name)
            .and_then(|o| o.id.clone())
    }

    pub fn has_organization(&self, name: &str) -> bool {
        self.organization_id(name).is_some()
    }

    pub fn buckets(&self) -> Vec<Bucket> {
        lock(&self.state).buckets.clone()
    }

    pub fn authorizations(&self) -> Vec<Authorization> {
        lock(&self.state).authorizations.clone()
    }

    /// Add an authorization as another writer would
    pub fn add_authorization(&self, org_id: &str, description: &str, token: &str) -> String {
        let mut state = lock(&self.state);
        let id = state.next_id();
        state.authorizations.push(Authorization {
            id: Some(id.clone()),
            token: Some(Zeroizing::new(token.to_string())),
            description: Some(description.to_string()),
            org_id: Some(org_id.to_string()),
            status: Some("active".to_string()),
            permissions: Vec::new(),
        });
        id
    }

    pub fn remove_authorization(&self, id: &str) {
        lock(&self.state)
            .authorizations
            .retain(|a| a.id.as_deref() != Some(id));
    }

    /// Fail the next call of `operation` with `status`
    pub fn fail_next(&self, operation: &'static str, status: u16) {
        lock(&self.state).failures.insert(operation, status);
    }

    /// Make the next call of `operation` hang until it is cancelled
    pub fn stall_next(&self, operation: &'static str) {
        lock(&self.state).stalls.insert(operation);
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|c| c.as_str() == operation)
            .count()
    }

    pub fn connects(&self) -> Vec<(String, String)> {
        lock(&self.state).connects.clone()
    }

    pub fn closes(&self) -> usize {
        lock(&self.state).closes
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }
}

impl InfluxConnector for FakeInflux {
    fn connect(&self, addr: &str, token: &str) -> Result<Box<dyn InfluxSession>, InfluxError> {
        lock(&self.state)
            .connects
            .push((addr.to_string(), token.to_string()));
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    state: Arc<Mutex<InfluxState>>,
}

impl FakeSession {
    async fn stall(&self, operation: &'static str) {
        let stalled = lock(&self.state).stalls.remove(operation);
        if stalled {
            std::future::pending::<()>().await;
        }
    }

    fn enter(&self, operation: &'static str) -> Result<MutexGuard<'_, InfluxState>, InfluxError> {
        let mut state = lock(&self.state);
        state.calls.push(operation.to_string());
        match state.failures.remove(operation) {
            Some(status) => Err(InfluxError::http(status, format!("injected {operation} failure"))),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl InfluxSession for FakeSession {
    async fn find_organization_by_name(&self, name: &str) -> Result<Organization, InfluxError> {
        self.stall("find_organization_by_name").await;
        let state = self.enter("find_organization_by_name")?;
        state
            .organizations
            .iter()
            .find(|o| o.name == name)
            .cloned()
            .ok_or_else(|| InfluxError::not_found(format!("organization name \"{name}\" not found")))
    }

    async fn create_organization(&self, name: &str) -> Result<Organization, InfluxError> {
        let mut state = self.enter("create_organization")?;
        if state.organizations.iter().any(|o| o.name == name) {
            return Err(InfluxError::http(422, "organization with name already exists"));
        }
        let organization = Organization {
            id: Some(state.next_id()),
            name: name.to_string(),
            description: None,
        };
        state.organizations.push(organization.clone());
        Ok(organization)
    }

    async fn delete_organization(&self, id: &str) -> Result<(), InfluxError> {
        let mut state = self.enter("delete_organization")?;
        let before = state.organizations.len();
        state.organizations.retain(|o| o.id.as_deref() != Some(id));
        if state.organizations.len() == before {
            return Err(InfluxError::not_found("organization not found"));
        }
        Ok(())
    }

    async fn find_buckets_by_org(&self, org_id: &str) -> Result<Vec<Bucket>, InfluxError> {
        let state = self.enter("find_buckets_by_org")?;
        Ok(state
            .buckets
            .iter()
            .filter(|b| b.org_id.as_deref() == Some(org_id))
            .cloned()
            .collect())
    }

    async fn create_bucket(&self, bucket: &NewBucket) -> Result<Bucket, InfluxError> {
        let mut state = self.enter("create_bucket")?;
        if state
            .buckets
            .iter()
            .any(|b| b.org_id.as_deref() == Some(bucket.org_id.as_str()) && b.name == bucket.name)
        {
            return Err(InfluxError::http(
                422,
                format!("bucket with name {} already exists", bucket.name),
            ));
        }
        let created = Bucket {
            id: Some(state.next_id()),
            name: bucket.name.clone(),
            org_id: Some(bucket.org_id.clone()),
            description: Some(bucket.description.clone()),
            retention_rules: bucket.retention_rules.clone(),
        };
        state.buckets.push(created.clone());
        Ok(created)
    }

    async fn delete_bucket(&self, id: &str) -> Result<(), InfluxError> {
        let mut state = self.enter("delete_bucket")?;
        let before = state.buckets.len();
        state.buckets.retain(|b| b.id.as_deref() != Some(id));
        if state.buckets.len() == before {
            return Err(InfluxError::not_found("bucket not found"));
        }
        Ok(())
    }

    async fn find_authorizations_by_org(
        &self,
        org_id: &str,
    ) -> Result<Vec<Authorization>, InfluxError> {
        let state = self.enter("find_authorizations_by_org")?;
        Ok(state
            .authorizations
            .iter()
            .filter(|a| a.org_id.as_deref() == Some(org_id))
            .cloned()
            .collect())
    }

    async fn create_authorization(
        &self,
        authorization: &NewAuthorization,
    ) -> Result<Authorization, InfluxError> {
        let mut state = self.enter("create_authorization")?;
        let id = state.next_id();
        let created = Authorization {
            token: Some(Zeroizing::new(format!("token-{id}"))),
            id: Some(id),
            description: Some(authorization.description.clone()),
            org_id: Some(authorization.org_id.clone()),
            status: Some("active".to_string()),
            permissions: authorization.permissions.clone(),
        };
        state.authorizations.push(created.clone());
        Ok(created)
    }

    async fn delete_authorization(&self, id: &str) -> Result<(), InfluxError> {
        let mut state = self.enter("delete_authorization")?;
        let before = state.authorizations.len();
        state.authorizations.retain(|a| a.id.as_deref() != Some(id));
        if state.authorizations.len() == before {
            return Err(InfluxError::not_found("authorization not found"));
        }
        Ok(())
    }

    fn close(&self) {
        lock(&self.state).closes += 1;
    }
}

/// Reconciler over an in-memory store and fake InfluxDB with a manual clock
pub struct Harness<K: ManagedResource> {
    pub store: Arc<MemoryStore<K>>,
    pub influx: FakeInflux,
    pub clock: Arc<ManualClock>,
    pub debouncer: Arc<ConflictDebouncer>,
    pub reconciler: Arc<Reconciler<K>>,
}

impl<K: ManagedResource> Harness<K> {
    /// Harness with a `default` Config and its credential Secret in place
    pub fn new() -> Self {
        Self::with_settings(ReconcilerSettings::default())
    }

    pub fn with_settings(settings: ReconcilerSettings) -> Self {
        let store = Arc::new(MemoryStore::<K>::new());
        store.add_config("default", ConfigSpec::default());
        store.add_secret(NAMESPACE, "influxdb-token", &[("token", ADMIN_TOKEN.as_bytes())]);

        let influx = FakeInflux::new();
        let clock = Arc::new(ManualClock::new(start_time()));
        let debouncer = Arc::new(ConflictDebouncer::new(clock.clone()));
        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            Arc::new(influx.clone()),
            debouncer.clone(),
            clock.clone(),
            settings,
        ));
        Self {
            store,
            influx,
            clock,
            debouncer,
            reconciler,
        }
    }

    pub fn debounce_key(&self, name: &str, tag: &str) -> String {
        let uid = self
            .store
            .record(name)
            .and_then(|r| r.uid())
            .expect("record has a uid");
        ConflictDebouncer::key(&uid, tag)
    }
}
