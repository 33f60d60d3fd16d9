//! Identity-service client implementing the delegated-authorization port.
//!
//! One outbound `GET` per protected request, against `/validate` or
//! `/is-admin` under the configured identity base URL. The inbound request's
//! raw `Authorization` header value is forwarded verbatim; HTTP 200 means
//! authorized and everything else (including transport failures and
//! timeouts) means denied. No response body is read beyond draining it.
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use hyper::{Request, StatusCode, header};

use crate::{
    core::{
        auth::{AuthDecision, AuthMode},
        backend::BackendUrl,
    },
    ports::{http_client::HttpClient, identity::IdentityVerifier},
};

/// Response header from which the caller's identity is taken when present.
const USER_ID_HEADER: &str = "x-user-id";

/// Stateless client for the remote identity service.
pub struct IdentityClient {
    http: Arc<dyn HttpClient>,
    base_url: BackendUrl,
}

impl IdentityClient {
    pub fn new(http: Arc<dyn HttpClient>, base_url: BackendUrl) -> Self {
        Self { http, base_url }
    }

    fn endpoint(&self, mode: AuthMode) -> String {
        match mode {
            AuthMode::Validate => format!("{}/validate", self.base_url),
            AuthMode::RequireAdmin => format!("{}/is-admin", self.base_url),
        }
    }
}

#[async_trait]
impl IdentityVerifier for IdentityClient {
    async fn authorize(&self, credential: &str, mode: AuthMode) -> AuthDecision {
        // An absent credential can never be authorized; don't bother the
        // identity service with it.
        if credential.is_empty() {
            return AuthDecision::denied();
        }

        let url = self.endpoint(mode);

        let credential_value = match header::HeaderValue::from_str(credential) {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Credential contains characters invalid in a header value");
                return AuthDecision::denied();
            }
        };

        let request = match Request::builder()
            .method("GET")
            .uri(url.as_str())
            .header(header::AUTHORIZATION, credential_value)
            .body(AxumBody::empty())
        {
            Ok(request) => request,
            Err(e) => {
                tracing::error!("Failed to build identity request for {}: {}", url, e);
                return AuthDecision::denied();
            }
        };

        match self.http.send_request(request).await {
            Ok(response) if response.status() == StatusCode::OK => {
                let identity = response
                    .headers()
                    .get(USER_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .map(|value| value.to_string());
                AuthDecision::allowed(identity)
            }
            Ok(response) => {
                tracing::debug!(
                    "Identity service rejected credential: {} from {}",
                    response.status(),
                    url
                );
                AuthDecision::denied()
            }
            Err(e) => {
                // Unreachable identity service collapses to a denial; the
                // caller sees the same 401 as for a bad credential.
                tracing::warn!("Identity service call to {} failed: {}", url, e);
                AuthDecision::denied()
            }
        }
    }
}
