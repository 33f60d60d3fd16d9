use std::{fmt, str::FromStr};

use thiserror::Error;

/// Errors related to backend targets
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BackendError {
    /// Error when URL is invalid
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// A type-safe representation of a backend base URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendUrl {
    /// The underlying URL as a string, without a trailing slash
    url: String,
    /// Whether the URL is secure (HTTPS)
    is_secure: bool,
}

impl BackendUrl {
    /// Creates a new BackendUrl if the provided string is a valid base URL
    ///
    /// # Arguments
    /// * `url` - The URL string to validate and wrap
    ///
    /// # Returns
    /// A result containing the BackendUrl or an error
    pub fn new(url: &str) -> BackendResult<Self> {
        let is_secure = url.starts_with("https://");
        let is_http = url.starts_with("http://");

        if !is_secure && !is_http {
            return Err(BackendError::InvalidUrl(format!(
                "Backend URL must start with http:// or https://, got: {url}"
            )));
        }

        // A trailing slash would produce `//` when the request path is appended.
        Ok(BackendUrl {
            url: url.trim_end_matches('/').to_string(),
            is_secure,
        })
    }

    /// Get the underlying URL as a string reference
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Check if the URL is using HTTPS
    pub fn is_secure(&self) -> bool {
        self.is_secure
    }

    /// Get the underlying URL as a string
    pub fn into_string(self) -> String {
        self.url
    }
}

impl FromStr for BackendUrl {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendUrl::new(s)
    }
}

impl fmt::Display for BackendUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_url_valid() {
        let url = "http://bookservice-app:8081";
        let backend_url = BackendUrl::new(url).expect("Valid HTTP URL should parse");
        assert_eq!(backend_url.as_str(), url);
        assert!(!backend_url.is_secure());

        let secure_url = "https://secure.example.com";
        let secure_backend_url = BackendUrl::new(secure_url).expect("Valid HTTPS URL should parse");
        assert_eq!(secure_backend_url.as_str(), secure_url);
        assert!(secure_backend_url.is_secure());
    }

    #[test]
    fn test_backend_url_invalid() {
        let result = BackendUrl::new("bookservice-app:8081");
        assert!(result.is_err());

        let result = BackendUrl::new("ftp://example.com");
        assert!(result.is_err());
    }

    #[test]
    fn test_backend_url_trims_trailing_slash() {
        let backend_url = BackendUrl::new("http://userservice-app:8080/").unwrap();
        assert_eq!(backend_url.as_str(), "http://userservice-app:8080");
    }

    #[test]
    fn test_backend_url_from_str() {
        let url = "http://loanservice-app:8082";
        let backend_url: BackendUrl = url
            .parse()
            .expect("Parsing valid URL string should succeed");
        assert_eq!(backend_url.as_str(), url);
    }
}
