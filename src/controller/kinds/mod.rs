//! # Managed Kinds
//!
//! [`ExternalKind`](crate::controller::reconciler::ExternalKind) implementations
//! for Bucket, Organization and Token.
//!
//! Buckets and organizations are matched by name. Authorizations have no
//! caller-chosen name and are matched by their `name.namespace.uid`
//! description tag instead.

mod bucket;
mod organization;
mod token;

pub use token::api_permissions;
