pub mod http_client;
pub mod http_handler;
pub mod identity;
pub mod middleware;
pub mod proxy;

/// Re-export commonly used types from adapters
pub use http_client::HttpClientAdapter;
pub use http_handler::DispatchPipeline;
pub use identity::IdentityClient;
pub use middleware::*;
pub use proxy::Forwarder;
