//! Typed wire-format DTOs for responses the gateway produces itself.
//!
//! Forwarded responses are relayed from the backend untouched; everything the
//! gateway originates (liveness, routing and auth failures, upstream errors)
//! goes through these types so the JSON shape is checked at compile time.
use axum::body::Body;
use http::{Response, StatusCode, header};
use serde::{Deserialize, Serialize};

/// Liveness probe body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Health {
    pub status: String,
    pub message: String,
}

impl Health {
    pub fn live() -> Self {
        Self {
            status: "OK".to_string(),
            message: "Server is live".to_string(),
        }
    }
}

/// Generic gateway response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl ApiMessage {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: "Failed".to_string(),
            message: message.into(),
            data: None,
            errors: None,
        }
    }
}

/// Build a JSON response from a serializable body.
pub fn json_response(status: StatusCode, body: &impl Serialize) -> Response<Body> {
    let bytes = serde_json::to_vec(body).unwrap_or_default();
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

/// `200` liveness response.
pub fn liveness() -> Response<Body> {
    json_response(StatusCode::OK, &Health::live())
}

/// `401` for a missing, invalid or undecidable credential.
pub fn unauthorized() -> Response<Body> {
    json_response(
        StatusCode::UNAUTHORIZED,
        &ApiMessage::failed("Unauthorized access"),
    )
}

/// `404` when no route accepts the request.
pub fn no_route() -> Response<Body> {
    json_response(
        StatusCode::NOT_FOUND,
        &ApiMessage::failed("No route matches the requested path"),
    )
}

/// `502` when the backend could not be reached.
pub fn bad_gateway() -> Response<Body> {
    json_response(
        StatusCode::BAD_GATEWAY,
        &ApiMessage::failed("Upstream service unavailable"),
    )
}
