pub mod http_client;
pub mod identity;

pub use http_client::{HttpClient, HttpClientError, HttpClientResult};
pub use identity::IdentityVerifier;
