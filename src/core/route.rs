//! Static route table matched against every inbound request.
//!
//! Routes are declared in configuration as an ordered list and frozen into a
//! [`RouteTable`] at startup. Matching walks the list in registration order
//! and returns the first entry whose pattern (and method set, when present)
//! accepts the request, so more specific routes must be registered before
//! catch-alls. The table is read-only after startup and needs no
//! synchronization beyond an `Arc`.
use http::Method;
use thiserror::Error;

use crate::{
    config::models::RouteConfig,
    core::{auth::AuthRequirement, backend::BackendUrl},
};

/// Errors raised while freezing the configured routes into a table.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RouteError {
    #[error("Invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid HTTP method '{method}' on route '{pattern}'")]
    InvalidMethod { pattern: String, method: String },

    #[error("Invalid target for route '{pattern}': {source}")]
    InvalidTarget {
        pattern: String,
        source: crate::core::backend::BackendError,
    },
}

/// A path pattern: either a literal path or a wildcard-suffix prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    kind: PatternKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternKind {
    /// Matches the path exactly.
    Literal,
    /// `/admin/*` matches `/admin`, `/admin/` and anything below.
    Wildcard { prefix: String },
}

impl RoutePattern {
    /// Parse a pattern string. A trailing `/*` segment makes the pattern a
    /// wildcard; `*` anywhere else is rejected.
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        if !raw.starts_with('/') {
            return Err(RouteError::InvalidPattern {
                pattern: raw.to_string(),
                reason: "patterns must start with '/'".to_string(),
            });
        }

        if let Some(prefix) = raw.strip_suffix("/*") {
            if prefix.contains('*') {
                return Err(RouteError::InvalidPattern {
                    pattern: raw.to_string(),
                    reason: "'*' is only allowed as the final segment".to_string(),
                });
            }
            return Ok(Self {
                raw: raw.to_string(),
                kind: PatternKind::Wildcard {
                    prefix: prefix.to_string(),
                },
            });
        }

        if raw.contains('*') {
            return Err(RouteError::InvalidPattern {
                pattern: raw.to_string(),
                reason: "'*' is only allowed as the final segment".to_string(),
            });
        }

        Ok(Self {
            raw: raw.to_string(),
            kind: PatternKind::Literal,
        })
    }

    /// Whether this pattern accepts the given request path.
    pub fn matches(&self, path: &str) -> bool {
        match &self.kind {
            PatternKind::Literal => path == self.raw,
            PatternKind::Wildcard { prefix } => {
                path == prefix || path.strip_prefix(prefix.as_str()).is_some_and(|rest| {
                    rest.starts_with('/') || (rest.is_empty() && prefix.ends_with('/'))
                })
            }
        }
    }

    /// Whether this pattern accepts every path the other pattern accepts.
    pub fn covers(&self, other: &RoutePattern) -> bool {
        match &self.kind {
            PatternKind::Literal => self == other,
            PatternKind::Wildcard { .. } => match &other.kind {
                PatternKind::Literal => self.matches(&other.raw),
                PatternKind::Wildcard { prefix } => self.matches(prefix),
            },
        }
    }

    /// The pattern as registered, used as the bounded metrics label.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True for wildcard-suffix patterns.
    pub fn is_wildcard(&self) -> bool {
        matches!(self.kind, PatternKind::Wildcard { .. })
    }
}

/// One immutable routing rule.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pattern: RoutePattern,
    /// Accepted methods; `None` accepts any method.
    methods: Option<Vec<Method>>,
    target: BackendUrl,
    auth: AuthRequirement,
}

impl RouteEntry {
    pub fn new(
        pattern: RoutePattern,
        methods: Option<Vec<Method>>,
        target: BackendUrl,
        auth: AuthRequirement,
    ) -> Self {
        Self {
            pattern,
            methods,
            target,
            auth,
        }
    }

    fn accepts(&self, method: &Method, path: &str) -> bool {
        let method_ok = self
            .methods
            .as_ref()
            .is_none_or(|allowed| allowed.contains(method));
        method_ok && self.pattern.matches(path)
    }

    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn methods(&self) -> Option<&[Method]> {
        self.methods.as_deref()
    }

    pub fn target(&self) -> &BackendUrl {
        &self.target
    }

    pub fn auth(&self) -> AuthRequirement {
        self.auth
    }
}

/// Ordered, immutable collection of [`RouteEntry`] values.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    /// Freeze the configured routes, in declaration order, into a table.
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, RouteError> {
        let mut entries = Vec::with_capacity(routes.len());
        for route in routes {
            let pattern = RoutePattern::parse(&route.prefix)?;
            let methods = match &route.methods {
                None => None,
                Some(names) => {
                    let mut parsed = Vec::with_capacity(names.len());
                    for name in names {
                        let method = name.to_ascii_uppercase().parse::<Method>().map_err(|_| {
                            RouteError::InvalidMethod {
                                pattern: route.prefix.clone(),
                                method: name.clone(),
                            }
                        })?;
                        parsed.push(method);
                    }
                    Some(parsed)
                }
            };
            let target =
                BackendUrl::new(&route.target).map_err(|source| RouteError::InvalidTarget {
                    pattern: route.prefix.clone(),
                    source,
                })?;
            entries.push(RouteEntry::new(pattern, methods, target, route.auth));
        }
        Ok(Self::new(entries))
    }

    /// First entry, in registration order, accepting the method and path.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<&RouteEntry> {
        self.entries.iter().find(|entry| entry.accepts(method, path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
