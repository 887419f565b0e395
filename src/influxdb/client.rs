//! # InfluxDB Session Traits
//!
//! The reconcilers talk to InfluxDB through these traits so that tests can
//! substitute an in-memory fake for the REST client.

use super::error::InfluxError;
use super::types::{Authorization, Bucket, NewAuthorization, NewBucket, Organization};
use async_trait::async_trait;

/// Credentialed session against one InfluxDB instance
///
/// Lookups that find nothing return an error for which
/// [`InfluxError::is_not_found`] holds. Creates of an entity that already
/// exists return an error for which [`InfluxError::is_conflict`] holds.
#[async_trait]
pub trait InfluxSession: Send + Sync {
    async fn find_organization_by_name(&self, name: &str) -> Result<Organization, InfluxError>;

    async fn create_organization(&self, name: &str) -> Result<Organization, InfluxError>;

    async fn delete_organization(&self, id: &str) -> Result<(), InfluxError>;

    /// All buckets of an organization, across every page
    async fn find_buckets_by_org(&self, org_id: &str) -> Result<Vec<Bucket>, InfluxError>;

    async fn create_bucket(&self, bucket: &NewBucket) -> Result<Bucket, InfluxError>;

    async fn delete_bucket(&self, id: &str) -> Result<(), InfluxError>;

    async fn find_authorizations_by_org(
        &self,
        org_id: &str,
    ) -> Result<Vec<Authorization>, InfluxError>;

    async fn create_authorization(
        &self,
        authorization: &NewAuthorization,
    ) -> Result<Authorization, InfluxError>;

    async fn delete_authorization(&self, id: &str) -> Result<(), InfluxError>;

    /// Release the session. Called exactly once when the owning step ends.
    fn close(&self);
}

/// Opens sessions from an address and bearer token
pub trait InfluxConnector: Send + Sync {
    fn connect(&self, addr: &str, token: &str) -> Result<Box<dyn InfluxSession>, InfluxError>;
}
