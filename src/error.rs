//! Error types for authgate
//!
//! This module defines the error hierarchy used throughout the crate.
//! We use `thiserror` for library-style errors that are part of the API;
//! the binary wraps them with `anyhow` at the edge.

use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Access denied: {0}")]
    AccessDenied(#[from] AccessDeniedError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

/// Configuration-related errors
///
/// Everything that can be wrong with a policy is reported here, at load
/// time. Evaluating a compiled policy never fails.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid network range '{cidr}': {reason}")]
    InvalidCidr { cidr: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Attach the configuration path a pattern came from to its error
    pub fn in_field(self, field_path: &str) -> Self {
        match self {
            ConfigError::InvalidPattern { pattern, reason } => ConfigError::InvalidPattern {
                pattern,
                reason: format!("in {}: {}", field_path, reason),
            },
            ConfigError::InvalidCidr { cidr, reason } => ConfigError::InvalidCidr {
                cidr,
                reason: format!("in {}: {}", field_path, reason),
            },
            other => other,
        }
    }
}

/// Raised by callers that turn a negative decision into an error value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Access denied to '{domain}{path}' for user '{user}': {reason}")]
pub struct AccessDeniedError {
    pub user: String,
    pub domain: String,
    pub path: String,
    pub reason: String,
}

impl AccessDeniedError {
    pub fn new(
        user: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            domain: domain.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn by_rule(
        user: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
        rule_domain: &str,
    ) -> Self {
        Self::new(
            user,
            domain,
            path,
            format!("denied by rule for domain '{}'", rule_domain),
        )
    }

    pub fn by_default_policy(
        user: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self::new(user, domain, path, "denied by default policy")
    }
}

/// HTTP decision API errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid bind address: {0}")]
    Bind(#[from] std::net::AddrParseError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Reload failed: {0}")]
    Reload(String),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;
