use async_trait::async_trait;

use crate::core::auth::{AuthDecision, AuthMode};

/// IdentityVerifier defines the port (interface) for delegated authorization.
///
/// The gateway holds no credential material; every protected request is
/// decided by an external identity service. Implementations collapse all
/// failure modes (invalid credential, non-success status, transport error)
/// into a denied decision, so the method itself is infallible.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + 'static {
    /// Decide whether the raw `Authorization` header value grants access at
    /// the requested level
    ///
    /// # Arguments
    /// * `credential` - The raw header value; empty means absent
    /// * `mode` - The check to run (validity or admin membership)
    ///
    /// # Returns
    /// The decision; never an error
    async fn authorize(&self, credential: &str, mode: AuthMode) -> AuthDecision;
}
