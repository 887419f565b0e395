//! # InfluxDB REST Client
//!
//! Native REST implementation of [`InfluxSession`] using reqwest with rustls.
//!
//! Every request carries `Authorization: Token <token>`. Non-success
//! responses are decoded from the `{code, message}` error body InfluxDB
//! returns and surfaced as [`InfluxError::Http`].

use super::client::{InfluxConnector, InfluxSession};
use super::error::{ErrorBody, InfluxError};
use super::types::{
    Authorization, Authorizations, Bucket, Buckets, NewAuthorization, NewBucket,
    NewOrganization, Organization, Organizations,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client as ReqwestClient, Response};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Page size used when listing buckets
pub const BUCKET_PAGE_SIZE: usize = 100;

/// Opens [`InfluxRestSession`]s with a fixed per-request timeout
#[derive(Debug, Clone)]
pub struct InfluxRestConnector {
    timeout: Duration,
}

impl InfluxRestConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl InfluxConnector for InfluxRestConnector {
    fn connect(&self, addr: &str, token: &str) -> Result<Box<dyn InfluxSession>, InfluxError> {
        Ok(Box::new(InfluxRestSession::new(addr, token, self.timeout)?))
    }
}

pub struct InfluxRestSession {
    http_client: ReqwestClient,
    base_url: String,
    closed: AtomicBool,
}

impl std::fmt::Debug for InfluxRestSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxRestSession")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl InfluxRestSession {
    pub fn new(addr: &str, token: &str, timeout: Duration) -> Result<Self, InfluxError> {
        if !(addr.starts_with("http://") || addr.starts_with("https://")) {
            return Err(InfluxError::InvalidRequest(format!(
                "address must start with http:// or https://, got {addr:?}"
            )));
        }

        let mut auth = HeaderValue::from_str(&format!("Token {token}")).map_err(|_| {
            InfluxError::InvalidRequest("token contains characters not valid in a header".into())
        })?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http_client = ReqwestClient::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: addr.trim_end_matches('/').to_string(),
            closed: AtomicBool::new(false),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v2/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, InfluxError> {
        let response = self
            .http_client
            .get(self.url(path))
            .query(query)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn post_json<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, InfluxError> {
        let response = self
            .http_client
            .post(self.url(path))
            .json(body)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn delete(&self, path: &str) -> Result<(), InfluxError> {
        let response = self.http_client.delete(self.url(path)).send().await?;
        check(response).await?;
        Ok(())
    }
}

/// Map a non-success response to [`InfluxError::Http`]
async fn check(response: Response) -> Result<Response, InfluxError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ErrorBody>(&text).ok();
    let (code, message) = match body {
        Some(body) => (body.code, body.message.unwrap_or_else(|| text.clone())),
        None => (None, text),
    };

    Err(InfluxError::Http {
        status: status.as_u16(),
        code,
        message,
    })
}

#[async_trait]
impl InfluxSession for InfluxRestSession {
    async fn find_organization_by_name(&self, name: &str) -> Result<Organization, InfluxError> {
        let orgs: Organizations = self.get_json("orgs", &[("org", name.to_string())]).await?;
        orgs.orgs
            .into_iter()
            .find(|org| org.name == name)
            .ok_or_else(|| InfluxError::not_found(format!("organization name \"{name}\" not found")))
    }

    async fn create_organization(&self, name: &str) -> Result<Organization, InfluxError> {
        let body = NewOrganization {
            name: name.to_string(),
        };
        self.post_json("orgs", &body).await
    }

    async fn delete_organization(&self, id: &str) -> Result<(), InfluxError> {
        self.delete(&format!("orgs/{id}")).await
    }

    async fn find_buckets_by_org(&self, org_id: &str) -> Result<Vec<Bucket>, InfluxError> {
        let mut all = Vec::new();
        let mut offset = 0;
        loop {
            let page: Buckets = self
                .get_json(
                    "buckets",
                    &[
                        ("orgID", org_id.to_string()),
                        ("limit", BUCKET_PAGE_SIZE.to_string()),
                        ("offset", offset.to_string()),
                    ],
                )
                .await?;
            let count = page.buckets.len();
            all.extend(page.buckets);
            if count < BUCKET_PAGE_SIZE {
                break;
            }
            offset += count;
        }
        debug!("listed {} buckets in org {}", all.len(), org_id);
        Ok(all)
    }

    async fn create_bucket(&self, bucket: &NewBucket) -> Result<Bucket, InfluxError> {
        self.post_json("buckets", bucket).await
    }

    async fn delete_bucket(&self, id: &str) -> Result<(), InfluxError> {
        self.delete(&format!("buckets/{id}")).await
    }

    async fn find_authorizations_by_org(
        &self,
        org_id: &str,
    ) -> Result<Vec<Authorization>, InfluxError> {
        let list: Authorizations = self
            .get_json("authorizations", &[("orgID", org_id.to_string())])
            .await?;
        Ok(list.authorizations)
    }

    async fn create_authorization(
        &self,
        authorization: &NewAuthorization,
    ) -> Result<Authorization, InfluxError> {
        self.post_json("authorizations", authorization).await
    }

    async fn delete_authorization(&self, id: &str) -> Result<(), InfluxError> {
        self.delete(&format!("authorizations/{id}")).await
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            warn!("InfluxDB session for {} closed twice", self.base_url);
            return;
        }
        debug!("closed InfluxDB session for {}", self.base_url);
    }
}
