//! Reverse-proxy relay to a single backend.
//!
//! The forwarder receives a request that has already been routed, authorized
//! and trace-annotated. It rewrites the request target to the backend's base
//! URL, preserving method, path, query, headers and the streaming body, and
//! relays the backend's response to the caller without buffering. It does
//! not retry and does not balance across replicas.
use std::sync::Arc;

use axum::body::Body as AxumBody;
use hyper::{Request, Response};

use crate::{core::backend::BackendUrl, ports::http_client::HttpClient, response};

pub struct Forwarder {
    http: Arc<dyn HttpClient>,
}

impl Forwarder {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Relay `req` to `target`, returning the backend response verbatim or a
    /// gateway-originated `502` when the backend cannot be reached.
    pub async fn forward(
        &self,
        mut req: Request<AxumBody>,
        target: &BackendUrl,
    ) -> Response<AxumBody> {
        let path_and_query = req
            .uri()
            .path_and_query()
            .map_or("/", |pq| pq.as_str())
            .to_string();

        let rewritten = format!("{}{}", target.as_str(), path_and_query);
        let uri = match rewritten.parse::<hyper::Uri>() {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!("Failed to build backend URI '{}': {}", rewritten, e);
                return response::bad_gateway();
            }
        };
        *req.uri_mut() = uri;

        match self.http.send_request(req).await {
            Ok(backend_response) => backend_response,
            Err(e) => {
                tracing::error!("Backend request to {} failed: {}", target, e);
                response::bad_gateway()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use http::StatusCode;
    use http_body_util::BodyExt;

    use super::*;
    use crate::ports::http_client::HttpClientResult;

    /// Records the rewritten request and echoes a marker body.
    struct RecordingClient {
        seen_uri: Mutex<Option<String>>,
    }

    #[async_trait]
    impl HttpClient for RecordingClient {
        async fn send_request(
            &self,
            req: Request<AxumBody>,
        ) -> HttpClientResult<Response<AxumBody>> {
            *self.seen_uri.lock().unwrap() = Some(req.uri().to_string());
            Ok(Response::builder()
                .status(StatusCode::CREATED)
                .header("x-backend", "book")
                .body(AxumBody::from("backend says hi"))
                .unwrap())
        }
    }

    #[tokio::test]
    async fn test_forward_rewrites_target_and_preserves_path_and_query() {
        let client = Arc::new(RecordingClient {
            seen_uri: Mutex::new(None),
        });
        let forwarder = Forwarder::new(client.clone());
        let target = BackendUrl::new("http://bookservice-app:8081").unwrap();

        let req = Request::builder()
            .method("GET")
            .uri("/admin/books?limit=10")
            .body(AxumBody::empty())
            .unwrap();

        let response = forwarder.forward(req, &target).await;

        assert_eq!(
            client.seen_uri.lock().unwrap().as_deref(),
            Some("http://bookservice-app:8081/admin/books?limit=10")
        );
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("x-backend").unwrap(), "book");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"backend says hi");
    }

    #[tokio::test]
    async fn test_unreachable_backend_maps_to_bad_gateway() {
        struct RefusingClient;

        #[async_trait]
        impl HttpClient for RefusingClient {
            async fn send_request(
                &self,
                _req: Request<AxumBody>,
            ) -> HttpClientResult<Response<AxumBody>> {
                Err(crate::ports::http_client::HttpClientError::ConnectionError(
                    "connection refused".to_string(),
                ))
            }
        }

        let forwarder = Forwarder::new(Arc::new(RefusingClient));
        let target = BackendUrl::new("http://loanservice-app:8082").unwrap();
        let req = Request::builder()
            .method("POST")
            .uri("/loan/borrow")
            .body(AxumBody::empty())
            .unwrap();

        let response = forwarder.forward(req, &target).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
