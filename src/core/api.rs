//! Interfaces to the management-API collaborators.
//!
//! Resource CRUD, authentication and configuration comparison live outside
//! this crate's core; these are the seams the campaign and scenario code
//! depend on.

use crate::core::model::TargetResource;

/// Opaque bearer token produced by the excluded auth layer.
///
/// Debug output never reveals the secret.
#[derive(Clone)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(raw: String) -> Self {
        Self(raw)
    }

    pub fn reveal(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BearerToken([REDACTED {} chars])", self.0.len())
    }
}

/// Management-API failures surfaced to the core
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("resource [{0}] not found")]
    NotFound(String),
    /// The comparison layer's "pushed configuration has not propagated yet"
    /// condition; recognized as transient by the retry wrapper
    #[error("configuration not yet equal to existing: {0}")]
    NotYetEqual(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("management api request failed: {0}")]
    Request(String),
}

/// Resource CRUD surface used by scenario setup
#[async_trait::async_trait]
pub trait ResourceApi: Send + Sync {
    /// Current configuration snapshot, for filtering and for knowing the
    /// declared TTL/ACL/query-string policy
    async fn get_resource_snapshot(&self, id: &str) -> Result<TargetResource, ApiError>;

    /// Push a non-default configuration before probing
    async fn update_resource(&self, resource: &TargetResource) -> Result<(), ApiError>;
}
