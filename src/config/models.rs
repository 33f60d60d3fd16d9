//! Configuration data structures for Portico.
//!
//! These types map directly to YAML (also JSON / TOML) configuration files.
//! They are intentionally serde-friendly and include defaults so that minimal
//! configs remain concise. The route list is ordered: declaration order is
//! registration order, and the dispatch pipeline matches first-wins, so more
//! specific routes belong before catch-alls.
use serde::{Deserialize, Serialize};

use crate::core::auth::AuthRequirement;

fn default_service_name() -> String {
    "apigateway-service".to_string()
}

fn default_identity_timeout_secs() -> u64 {
    5
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

/// Top-level gateway configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Address the gateway listens on, e.g. "0.0.0.0:8000"
    pub listen_addr: String,
    /// Service identifier stamped on every trace span
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Identity service the gateway delegates authorization to
    pub identity: IdentityConfig,
    /// Settings for calls to routed backends
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Ordered routing rules, most specific first
    pub routes: Vec<RouteConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".to_string(),
            service_name: default_service_name(),
            identity: IdentityConfig::default(),
            upstream: UpstreamConfig::default(),
            routes: Vec::new(),
        }
    }
}

/// Where and how to reach the identity service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IdentityConfig {
    /// Base URL; `/validate` and `/is-admin` are appended to it
    pub base_url: String,
    /// Deadline for one authorization call
    #[serde(default = "default_identity_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: "http://identity:8080".to_string(),
            timeout_secs: default_identity_timeout_secs(),
        }
    }
}

/// Settings shared by all backend forwards.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Deadline for one forwarded request
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_upstream_timeout_secs(),
        }
    }
}

/// One routing rule as declared in configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RouteConfig {
    /// Path pattern; a trailing `/*` matches the prefix and anything below
    pub prefix: String,
    /// Accepted methods; absent means any method
    #[serde(default)]
    pub methods: Option<Vec<String>>,
    /// Backend base URL requests are relayed to
    pub target: String,
    /// Authorization the route requires before forwarding
    #[serde(default)]
    pub auth: AuthRequirement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.service_name, "apigateway-service");
        assert_eq!(config.identity.timeout_secs, 5);
        assert_eq!(config.upstream.timeout_secs, 30);
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_route_auth_defaults_to_public() {
        let yaml = r#"
prefix: "/auth/*"
target: "http://userservice-app:8080"
"#;
        let route: RouteConfig = serde_yaml_parse(yaml);
        assert_eq!(route.auth, AuthRequirement::None);
        assert!(route.methods.is_none());
    }

    #[test]
    fn test_route_auth_levels_parse() {
        let yaml = r#"
prefix: "/admin/*"
target: "http://bookservice-app:8081"
auth: admin
"#;
        let route: RouteConfig = serde_yaml_parse(yaml);
        assert_eq!(route.auth, AuthRequirement::Admin);
    }

    // Deserialize through the config crate, same path the loader takes.
    fn serde_yaml_parse(yaml: &str) -> RouteConfig {
        let value = config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap();
        value.try_deserialize().unwrap()
    }
}
