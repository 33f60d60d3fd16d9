//! The dispatch pipeline: the single synchronous request/response path every
//! inbound request takes through the gateway.
//!
//! Per request, in order: open (or continue) a trace span, match the route
//! table, delegate authorization when the route demands it, inject the trace
//! context into the outbound headers and relay through the forwarder. The
//! pipeline has a single completion point where the span is finished and the
//! metrics sample is recorded, so both happen exactly once on every exit
//! path (no route, unauthorized, upstream failure, success).
//!
//! The gateway's own endpoints (`/liveness`, `/metrics`) are answered here
//! as well and flow through the same span/metrics accounting.
use std::sync::Arc;

use axum::body::Body as AxumBody;
use http::{Method, StatusCode, header};
use hyper::{Request, Response};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::{
    adapters::proxy::Forwarder,
    core::{route::RouteTable, trace::RequestSpan},
    metrics,
    ports::identity::IdentityVerifier,
    response,
};

/// Paths the gateway answers itself, never routed to a backend.
const LIVENESS_PATH: &str = "/liveness";
const METRICS_PATH: &str = "/metrics";

/// HTTP handler composing route matching, delegated auth, trace propagation
/// and forwarding. One instance serves all requests; per-request state lives
/// on the task's stack.
pub struct DispatchPipeline {
    routes: Arc<RouteTable>,
    identity: Arc<dyn IdentityVerifier>,
    forwarder: Forwarder,
    metrics_handle: PrometheusHandle,
    service_name: String,
}

impl DispatchPipeline {
    pub fn new(
        routes: Arc<RouteTable>,
        identity: Arc<dyn IdentityVerifier>,
        forwarder: Forwarder,
        metrics_handle: PrometheusHandle,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            routes,
            identity,
            forwarder,
            metrics_handle,
            service_name: service_name.into(),
        }
    }

    /// Run one request through the pipeline.
    ///
    /// Every exit path flows through the tail of this function: exactly one
    /// span is finished and exactly one metrics sample recorded per request.
    pub async fn handle_request(&self, req: Request<AxumBody>) -> Response<AxumBody> {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let request_size = content_length(req.headers());

        let _inflight = metrics::InflightGuard::enter();

        let mut span =
            RequestSpan::extract_or_create(req.headers(), format!("{} {}", method, uri.path()));
        span.set_tag("http.method", method.as_str());
        span.set_tag("http.url", uri.to_string());
        span.set_tag("component", self.service_name.clone());

        let (response, route_label) = self.dispatch(req, &mut span).await;

        let status = response.status();
        metrics::increment_request_total(method.as_str(), &route_label, status.as_u16());
        metrics::record_request_duration(method.as_str(), &route_label, span.elapsed());
        if let Some(bytes) = request_size {
            metrics::observe_request_size(method.as_str(), &route_label, bytes);
        }
        if let Some(bytes) = content_length(response.headers()) {
            metrics::observe_response_size(method.as_str(), &route_label, bytes);
        }
        if status.is_server_error() {
            metrics::increment_app_error(&route_label);
        }
        span.finish(status);

        response
    }

    /// Route and serve the request, returning the response together with the
    /// bounded path label used for metrics.
    async fn dispatch(
        &self,
        req: Request<AxumBody>,
        span: &mut RequestSpan,
    ) -> (Response<AxumBody>, String) {
        let path = req.uri().path().to_string();

        if req.method() == Method::GET && path == LIVENESS_PATH {
            span.set_tag("route", LIVENESS_PATH);
            return (response::liveness(), LIVENESS_PATH.to_string());
        }
        if req.method() == Method::GET && path == METRICS_PATH {
            span.set_tag("route", METRICS_PATH);
            return (self.render_metrics(), METRICS_PATH.to_string());
        }

        let Some(route) = self.routes.match_route(req.method(), &path) else {
            tracing::debug!("No route matches {} {}", req.method(), path);
            span.set_tag("route", metrics::UNROUTED_LABEL);
            return (response::no_route(), metrics::UNROUTED_LABEL.to_string());
        };

        let label = route.pattern().as_str().to_string();
        span.set_operation(format!("{} {}", req.method(), label));
        span.set_tag("route", label.clone());

        if let Some(mode) = route.auth().mode() {
            let credential = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string();

            // Absent credential fails here; the identity service is only
            // consulted for a credential that could plausibly pass.
            if credential.is_empty() {
                tracing::debug!("Rejected {} {}: no credential supplied", req.method(), path);
                return (response::unauthorized(), label);
            }

            let decision = self.identity.authorize(&credential, mode).await;
            if !decision.valid {
                tracing::debug!("Rejected {} {}: identity service denied", req.method(), path);
                return (response::unauthorized(), label);
            }
            if let Some(identity) = decision.identity {
                span.set_tag("auth.identity", identity);
            }
        }

        let mut req = req;
        span.inject(req.headers_mut());

        let response = self.forwarder.forward(req, route.target()).await;
        (response, label)
    }

    fn render_metrics(&self) -> Response<AxumBody> {
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(AxumBody::from(self.metrics_handle.render()))
            .unwrap_or_else(|_| Response::new(AxumBody::empty()))
    }
}

fn content_length(headers: &http::HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;

    use super::*;
    use crate::{
        core::auth::{AuthDecision, AuthMode, AuthRequirement},
        core::backend::BackendUrl,
        core::route::{RouteEntry, RoutePattern},
        ports::http_client::{HttpClient, HttpClientResult},
    };

    struct AllowAll;

    #[async_trait]
    impl IdentityVerifier for AllowAll {
        async fn authorize(&self, _credential: &str, _mode: AuthMode) -> AuthDecision {
            AuthDecision::allowed(None)
        }
    }

    struct EchoBackend;

    #[async_trait]
    impl HttpClient for EchoBackend {
        async fn send_request(
            &self,
            req: Request<AxumBody>,
        ) -> HttpClientResult<Response<AxumBody>> {
            Ok(Response::builder()
                .status(StatusCode::OK)
                .body(AxumBody::from(req.uri().to_string()))
                .unwrap())
        }
    }

    fn test_pipeline(routes: Vec<RouteEntry>) -> DispatchPipeline {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        DispatchPipeline::new(
            Arc::new(RouteTable::new(routes)),
            Arc::new(AllowAll),
            Forwarder::new(Arc::new(EchoBackend)),
            handle,
            "apigateway-service",
        )
    }

    fn route(pattern: &str, target: &str, auth: AuthRequirement) -> RouteEntry {
        RouteEntry::new(
            RoutePattern::parse(pattern).unwrap(),
            None,
            BackendUrl::new(target).unwrap(),
            auth,
        )
    }

    #[tokio::test]
    async fn test_liveness_endpoint() {
        let pipeline = test_pipeline(vec![]);
        let req = Request::builder()
            .method("GET")
            .uri("/liveness")
            .body(AxumBody::empty())
            .unwrap();

        let response = pipeline.handle_request(req).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"status":"OK","message":"Server is live"}"#);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_renders_text_exposition() {
        let pipeline = test_pipeline(vec![]);
        let req = Request::builder()
            .method("GET")
            .uri("/metrics")
            .body(AxumBody::empty())
            .unwrap();

        let response = pipeline.handle_request(req).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn test_unmatched_request_is_not_found() {
        let pipeline = test_pipeline(vec![route(
            "/admin/*",
            "http://bookservice-app:8081",
            AuthRequirement::None,
        )]);
        let req = Request::builder()
            .method("GET")
            .uri("/nowhere")
            .body(AxumBody::empty())
            .unwrap();

        let response = pipeline.handle_request(req).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_public_route_forwards_without_credential() {
        let pipeline = test_pipeline(vec![route(
            "/auth/*",
            "http://userservice-app:8080",
            AuthRequirement::None,
        )]);
        let req = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .body(AxumBody::empty())
            .unwrap();

        let response = pipeline.handle_request(req).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"http://userservice-app:8080/auth/login");
    }

    #[tokio::test]
    async fn test_protected_route_without_credential_is_unauthorized() {
        let pipeline = test_pipeline(vec![route(
            "/loan/borrow",
            "http://loanservice-app:8082",
            AuthRequirement::Valid,
        )]);
        let req = Request::builder()
            .method("POST")
            .uri("/loan/borrow")
            .body(AxumBody::empty())
            .unwrap();

        let response = pipeline.handle_request(req).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
