//! Authorization requirement levels and per-request auth decisions.
//!
//! The gateway never inspects credentials itself. A route declares the level
//! of authorization it needs and the dispatch pipeline asks the configured
//! [`IdentityVerifier`](crate::ports::identity::IdentityVerifier) for a
//! decision, one downstream call per protected request. Decisions are never
//! cached.
use serde::{Deserialize, Serialize};

/// Authorization level a route requires before it may be forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthRequirement {
    /// Public route, forwarded without consulting the identity service.
    #[default]
    None,
    /// Any valid credential is sufficient.
    Valid,
    /// The credential must belong to an administrator.
    Admin,
}

impl AuthRequirement {
    /// The identity-service check to run for this requirement, if any.
    pub fn mode(&self) -> Option<AuthMode> {
        match self {
            AuthRequirement::None => None,
            AuthRequirement::Valid => Some(AuthMode::Validate),
            AuthRequirement::Admin => Some(AuthMode::RequireAdmin),
        }
    }
}

/// Which identity-service endpoint a delegated check targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Verify that the credential is valid.
    Validate,
    /// Verify that the credential belongs to an administrator.
    RequireAdmin,
}

/// Outcome of a delegated authorization check.
///
/// An invalid credential and an unreachable identity service both yield
/// `valid: false`; the caller cannot tell them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDecision {
    pub valid: bool,
    /// Identity reported by the identity service, when it chose to expose one.
    pub identity: Option<String>,
}

impl AuthDecision {
    /// A passing decision, optionally carrying the caller's identity.
    pub fn allowed(identity: Option<String>) -> Self {
        Self {
            valid: true,
            identity,
        }
    }

    /// A failing decision.
    pub fn denied() -> Self {
        Self {
            valid: false,
            identity: None,
        }
    }
}
