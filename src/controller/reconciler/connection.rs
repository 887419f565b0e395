//! # InfluxDB Connection Resolution
//!
//! Resolves a record's Config and credential Secret into a [`Connection`]
//! and opens sessions that close themselves when dropped.

use super::{Reconciler, ReconcilerError};
use crate::constants::KEY_TOKEN;
use crate::influxdb::{InfluxConnector, InfluxSession};
use std::ops::Deref;
use tracing::debug;
use zeroize::Zeroizing;

/// Address, organization and bearer token of one InfluxDB instance
pub struct Connection {
    pub addr: String,
    pub org_name: String,
    token: Zeroizing<String>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.addr)
            .field("org_name", &self.org_name)
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub fn open(&self, connector: &dyn InfluxConnector) -> Result<OpenSession, ReconcilerError> {
        let session = connector.connect(&self.addr, &self.token)?;
        debug!("opened InfluxDB session for {}", self.addr);
        Ok(OpenSession { session })
    }
}

/// Session that is closed on every exit path of the step that opened it
pub struct OpenSession {
    session: Box<dyn InfluxSession>,
}

impl Deref for OpenSession {
    type Target = dyn InfluxSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl Drop for OpenSession {
    fn drop(&mut self) {
        self.session.close();
    }
}

/// Resolve Config `config_name` in `namespace` plus its token Secret
///
/// Returns `Ok(None)` when the Config does not exist. A missing Secret or a
/// Secret without a usable `token` key is an error.
pub async fn resolve_connection<K>(
    reconciler: &Reconciler<K>,
    namespace: &str,
    config_name: &str,
) -> Result<Option<Connection>, ReconcilerError> {
    let Some(config) = reconciler.store.get_config(namespace, config_name).await? else {
        return Ok(None);
    };

    let secret_namespace = config.spec.secret_namespace(namespace).to_string();
    let secret_name = config.spec.token_secret_name.clone();

    let secret = reconciler
        .store
        .get_secret(&secret_namespace, &secret_name)
        .await?
        .ok_or_else(|| ReconcilerError::CredentialNotFound {
            namespace: secret_namespace.clone(),
            name: secret_name.clone(),
        })?;

    let invalid = |reason: &str| ReconcilerError::InvalidCredential {
        namespace: secret_namespace.clone(),
        name: secret_name.clone(),
        reason: reason.to_string(),
    };

    let bytes = secret
        .data
        .as_ref()
        .and_then(|data| data.get(KEY_TOKEN))
        .ok_or_else(|| invalid("missing key \"token\""))?;
    let token = Zeroizing::new(
        String::from_utf8(bytes.0.clone()).map_err(|_| invalid("token is not valid UTF-8"))?,
    );
    if token.trim().is_empty() {
        return Err(invalid("token is empty"));
    }

    Ok(Some(Connection {
        addr: config.spec.addr,
        org_name: config.spec.org_name,
        token,
    }))
}
