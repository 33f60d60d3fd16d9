pub mod auth;
pub mod backend;
pub mod route;
pub mod trace;

pub use auth::{AuthDecision, AuthMode, AuthRequirement};
pub use backend::BackendUrl;
pub use route::{RouteEntry, RoutePattern, RouteTable};
pub use trace::{RequestSpan, SpanContext, TRACEPARENT_HEADER};
