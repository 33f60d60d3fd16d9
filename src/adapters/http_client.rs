use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use eyre::Result;
use hyper::{Request, Response, Version, header, header::HeaderValue};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use rustls_native_certs::load_native_certs;
use tokio::time::timeout;

use crate::ports::http_client::{HttpClient, HttpClientError, HttpClientResult};

/// HTTP client adapter using Hyper with Rustls (HTTP/1.1 + HTTP/2).
///
/// Responsibilities:
/// * Sets the Host header from the outgoing URI
/// * Forces request version to HTTP/1.1 while allowing ALPN to negotiate h2
/// * Enforces a per-request deadline so a hung remote cannot pin the serving
///   task indefinitely
/// * Converts between Hyper body and Axum body types
///
/// This adapter is intentionally minimal; retries and circuit breaking are
/// out of scope for the gateway.
pub struct HttpClientAdapter {
    client: Client<HttpsConnector<HttpConnector>, AxumBody>,
    request_timeout: Duration,
}

impl HttpClientAdapter {
    /// Create a new HTTP client adapter with the given per-request deadline.
    pub fn new(request_timeout: Duration) -> Result<Self> {
        // Install default crypto provider for rustls if not already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false); // Allow HTTPS URLs

        let mut root_cert_store = rustls::RootCertStore::empty();
        let native_certs = load_native_certs();

        if !native_certs.certs.is_empty() {
            for cert in native_certs.certs {
                if root_cert_store.add(cert).is_err() {
                    tracing::warn!("Failed to add native certificate to rustls RootCertStore");
                }
            }
            tracing::info!("Loaded {} native root certificates.", root_cert_store.len());
        }

        if !native_certs.errors.is_empty() {
            tracing::warn!(
                "Some native certificates failed to load: {:?}",
                native_certs.errors
            );
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, AxumBody>(https_connector);

        tracing::info!(
            "Created HTTP client (HTTP/1.1 + ALPN h2, request timeout {:?})",
            request_timeout
        );
        Ok(Self {
            client,
            request_timeout,
        })
    }

    /// Inject a User-Agent if the caller did not supply one.
    fn add_common_headers(req: &mut Request<AxumBody>) {
        let headers = req.headers_mut();
        if !headers.contains_key(header::USER_AGENT) {
            headers.insert(
                header::USER_AGENT,
                HeaderValue::from_static("Portico-Gateway/0.1"),
            );
        }
    }
}

#[async_trait]
impl HttpClient for HttpClientAdapter {
    async fn send_request(
        &self,
        mut req: Request<AxumBody>,
    ) -> HttpClientResult<Response<AxumBody>> {
        Self::add_common_headers(&mut req);

        let client = self.client.clone();

        // Set Host header from the rewritten URI so the remote sees the
        // authority it is actually serving.
        if let Some(host_str) = req.uri().host() {
            let host_header_val = if let Some(port) = req.uri().port() {
                HeaderValue::from_str(&format!("{host_str}:{}", port.as_u16()))
                    .unwrap_or_else(|_| HeaderValue::from_static(""))
            } else {
                HeaderValue::from_str(host_str).unwrap_or_else(|_| HeaderValue::from_static(""))
            };
            if !host_header_val.is_empty() {
                req.headers_mut().insert(header::HOST, host_header_val);
            }
        } else {
            tracing::error!("Outgoing URI has no host: {}", req.uri());
            return Err(HttpClientError::InvalidRequest(
                "Outgoing URI has no host".to_string(),
            ));
        }

        let (mut parts, body) = req.into_parts();
        parts.version = Version::HTTP_11;

        let method_for_error_log = parts.method.clone();
        let uri_for_error_log = parts.uri.clone();
        tracing::debug!(
            "Sending request: {} {} (Version set to HTTP/1.1, ALPN negotiates actual version)",
            method_for_error_log,
            uri_for_error_log
        );

        let outgoing_request = Request::from_parts(parts, body);

        match timeout(self.request_timeout, client.request(outgoing_request)).await {
            Ok(Ok(response)) => {
                let (mut parts, hyper_body) = response.into_parts();

                // The body is decoded/streamed here; the server side handles
                // framing again, so drop any stale Transfer-Encoding.
                parts.headers.remove(header::TRANSFER_ENCODING);

                Ok(Response::from_parts(parts, AxumBody::new(hyper_body)))
            }
            Ok(Err(e)) => {
                tracing::error!(
                    "Error making request to {} {}: {}",
                    method_for_error_log,
                    uri_for_error_log,
                    e
                );
                Err(HttpClientError::ConnectionError(format!(
                    "Request to {method_for_error_log} {uri_for_error_log} failed: {e}"
                )))
            }
            Err(_) => {
                tracing::error!(
                    "Request to {} {} timed out after {:?}",
                    method_for_error_log,
                    uri_for_error_log,
                    self.request_timeout
                );
                Err(HttpClientError::Timeout(self.request_timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_client_creation() {
        let client = HttpClientAdapter::new(Duration::from_secs(5));
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_add_common_headers() {
        let mut req = Request::builder()
            .uri("http://bookservice-app:8081/admin/books")
            .body(AxumBody::empty())
            .unwrap();

        HttpClientAdapter::add_common_headers(&mut req);

        assert_eq!(
            req.headers().get(header::USER_AGENT).unwrap(),
            HeaderValue::from_static("Portico-Gateway/0.1")
        );
    }

    #[tokio::test]
    async fn test_existing_user_agent_is_preserved() {
        let mut req = Request::builder()
            .uri("http://bookservice-app:8081/admin/books")
            .header(header::USER_AGENT, "caller/1.0")
            .body(AxumBody::empty())
            .unwrap();

        HttpClientAdapter::add_common_headers(&mut req);

        assert_eq!(
            req.headers().get(header::USER_AGENT).unwrap(),
            HeaderValue::from_static("caller/1.0")
        );
    }

    #[tokio::test]
    async fn test_request_without_host_is_rejected() {
        let client = HttpClientAdapter::new(Duration::from_secs(1)).unwrap();
        let req = Request::builder()
            .uri("/no-authority")
            .body(AxumBody::empty())
            .unwrap();

        match client.send_request(req).await {
            Err(HttpClientError::InvalidRequest(_)) => {}
            other => panic!("Expected InvalidRequest, got {other:?}"),
        }
    }
}
