use std::net::SocketAddr;

use url::Url;

use crate::{
    config::models::{GatewayConfig, RouteConfig},
    core::route::RoutePattern,
};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Route conflict detected: {message}")]
    RouteConflict { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Paths the gateway serves itself; routes must not claim them.
const RESERVED_PATHS: &[&str] = &["/liveness", "/metrics"];

/// Gateway configuration validator
pub struct GatewayConfigValidator;

impl GatewayConfigValidator {
    /// Validate the entire gateway configuration, collecting every problem
    /// before failing so a broken config reports all its errors at once.
    pub fn validate(config: &GatewayConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_url(&config.identity.base_url, "identity.base_url") {
            errors.push(e);
        }
        if config.identity.timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "identity.timeout_secs".to_string(),
                message: "timeout must be greater than zero".to_string(),
            });
        }
        if config.upstream.timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "upstream.timeout_secs".to_string(),
                message: "timeout must be greater than zero".to_string(),
            });
        }

        if config.routes.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "routes".to_string(),
            });
        } else {
            for route in &config.routes {
                if let Err(mut route_errors) = Self::validate_single_route(route) {
                    errors.append(&mut route_errors);
                }
            }
            errors.extend(Self::check_unreachable_routes(&config.routes));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:8000' or '0.0.0.0:8000')"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Validate a single route configuration
    fn validate_single_route(route: &RouteConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = RoutePattern::parse(&route.prefix) {
            errors.push(ValidationError::InvalidField {
                field: format!("route '{}'", route.prefix),
                message: e.to_string(),
            });
        }

        if RESERVED_PATHS.contains(&route.prefix.as_str()) {
            errors.push(ValidationError::RouteConflict {
                message: format!(
                    "route '{}' shadows a gateway-owned endpoint",
                    route.prefix
                ),
            });
        }

        if let Err(e) = Self::validate_url(&route.target, &format!("route '{}' target", route.prefix))
        {
            errors.push(e);
        }

        if let Some(methods) = &route.methods {
            if methods.is_empty() {
                errors.push(ValidationError::InvalidField {
                    field: format!("route '{}' methods", route.prefix),
                    message: "method list must not be empty when present".to_string(),
                });
            }
            for method in methods {
                if method
                    .to_ascii_uppercase()
                    .parse::<http::Method>()
                    .is_err()
                {
                    errors.push(ValidationError::InvalidField {
                        field: format!("route '{}' methods", route.prefix),
                        message: format!("'{method}' is not an HTTP method"),
                    });
                }
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// A wildcard route registered before a route it fully covers (with an
    /// overlapping method set) makes the later route unreachable.
    fn check_unreachable_routes(routes: &[RouteConfig]) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let parsed: Vec<Option<RoutePattern>> = routes
            .iter()
            .map(|route| RoutePattern::parse(&route.prefix).ok())
            .collect();

        for (i, earlier) in routes.iter().enumerate() {
            let Some(earlier_pattern) = &parsed[i] else {
                continue;
            };
            for (j, later) in routes.iter().enumerate().skip(i + 1) {
                let Some(later_pattern) = &parsed[j] else {
                    continue;
                };
                if earlier_pattern.covers(later_pattern)
                    && Self::methods_overlap_fully(&earlier.methods, &later.methods)
                {
                    errors.push(ValidationError::RouteConflict {
                        message: format!(
                            "route '{}' is unreachable: '{}' is registered before it and matches every request it could serve",
                            later.prefix, earlier.prefix
                        ),
                    });
                }
            }
        }

        errors
    }

    fn methods_overlap_fully(earlier: &Option<Vec<String>>, later: &Option<Vec<String>>) -> bool {
        match (earlier, later) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(earlier), Some(later)) => later.iter().all(|method| {
                earlier
                    .iter()
                    .any(|m| m.eq_ignore_ascii_case(method))
            }),
        }
    }

    /// Validate a URL string
    fn validate_url(url: &str, field: &str) -> ValidationResult<()> {
        match Url::parse(url) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => Ok(()),
            Ok(parsed) => Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            }),
            Err(e) => Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Format multiple validation errors into a readable message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        let messages: Vec<String> = errors
            .iter()
            .enumerate()
            .map(|(i, e)| format!("  {}. {}", i + 1, e))
            .collect();
        format!(
            "Found {} configuration error(s):\n{}",
            errors.len(),
            messages.join("\n")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::models::IdentityConfig, core::auth::AuthRequirement};

    fn valid_config() -> GatewayConfig {
        GatewayConfig {
            listen_addr: "0.0.0.0:8000".to_string(),
            identity: IdentityConfig {
                base_url: "http://userservice-app:8080/user".to_string(),
                timeout_secs: 5,
            },
            routes: vec![
                RouteConfig {
                    prefix: "/loan/borrow".to_string(),
                    methods: None,
                    target: "http://loanservice-app:8082".to_string(),
                    auth: AuthRequirement::Valid,
                },
                RouteConfig {
                    prefix: "/admin/*".to_string(),
                    methods: None,
                    target: "http://bookservice-app:8081".to_string(),
                    auth: AuthRequirement::Admin,
                },
            ],
            ..GatewayConfig::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(GatewayConfigValidator::validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_bad_listen_address_fails() {
        let mut config = valid_config();
        config.listen_addr = "not-an-address".to_string();
        assert!(GatewayConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_empty_routes_fail() {
        let mut config = valid_config();
        config.routes.clear();
        assert!(GatewayConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_bad_target_scheme_fails() {
        let mut config = valid_config();
        config.routes[0].target = "ftp://loanservice-app:8082".to_string();
        assert!(GatewayConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_reserved_path_fails() {
        let mut config = valid_config();
        config.routes.push(RouteConfig {
            prefix: "/metrics".to_string(),
            methods: None,
            target: "http://somewhere:1234".to_string(),
            auth: AuthRequirement::None,
        });
        assert!(GatewayConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_catch_all_before_specific_route_fails() {
        let mut config = valid_config();
        config.routes.swap(0, 1);
        config.routes.insert(
            1,
            RouteConfig {
                prefix: "/admin/books".to_string(),
                methods: None,
                target: "http://bookservice-app:8081".to_string(),
                auth: AuthRequirement::Admin,
            },
        );
        let result = GatewayConfigValidator::validate(&config);
        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("unreachable"));
    }

    #[test]
    fn test_later_route_with_disjoint_methods_is_reachable() {
        let mut config = valid_config();
        config.routes = vec![
            RouteConfig {
                prefix: "/user/*".to_string(),
                methods: Some(vec!["GET".to_string()]),
                target: "http://userservice-app:8080".to_string(),
                auth: AuthRequirement::None,
            },
            RouteConfig {
                prefix: "/user/profile".to_string(),
                methods: Some(vec!["POST".to_string()]),
                target: "http://userservice-app:8080".to_string(),
                auth: AuthRequirement::Valid,
            },
        ];
        assert!(GatewayConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_zero_timeout_fails() {
        let mut config = valid_config();
        config.upstream.timeout_secs = 0;
        assert!(GatewayConfigValidator::validate(&config).is_err());
    }
}
