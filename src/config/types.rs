//! Configuration types for authgate
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use crate::access_control::PolicyLabel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP decision API settings
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Rules applied to every request. When absent, access is unrestricted.
    pub access_control: Option<AclConfig>,

    /// Source networks bound to a user, in declaration order
    pub network_binding: Vec<NetworkBindingConfig>,

    /// Rules merged on top of `access_control` when the caller was
    /// recognized by its source address
    pub network_access_control: Option<AclConfig>,
}

/// HTTP decision API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9091,
        }
    }
}

/// Access control list configuration
///
/// Shared by `access_control` and `network_access_control`.
///
/// Rules are organised in three tiers of increasing precedence:
/// 1. `any` - applies to every subject
/// 2. `groups` - applies to members of the named group
/// 3. `users` - applies to the named user
///
/// Within a tier the last declared matching rule wins.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AclConfig {
    /// Policy applied when no rule matches
    pub default_policy: PolicyLabel,

    /// Rules applied to everybody
    pub any: Vec<RuleConfig>,

    /// Rules per group name
    pub groups: HashMap<String, Vec<RuleConfig>>,

    /// Rules per user name
    pub users: HashMap<String, Vec<RuleConfig>>,
}

/// A single access rule
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RuleConfig {
    /// Exact domain or `*.`-prefixed wildcard
    pub domain: String,

    /// Policy applied when the rule matches
    #[serde(default)]
    pub policy: PolicyLabel,

    /// Regex patterns matched against the request path. Absent means all paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,

    /// Policy applied instead of `policy` for network-recognized subjects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist_policy: Option<PolicyLabel>,
}

impl RuleConfig {
    /// Create a rule matching every path of `domain`
    pub fn new(domain: impl Into<String>, policy: PolicyLabel) -> Self {
        Self {
            domain: domain.into(),
            policy,
            resources: None,
            whitelist_policy: None,
        }
    }

    /// Restrict the rule to paths matching any of `resources`
    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources = Some(resources.into_iter().map(Into::into).collect());
        self
    }

    /// Set the policy used for network-recognized subjects
    pub fn with_whitelist_policy(mut self, policy: PolicyLabel) -> Self {
        self.whitelist_policy = Some(policy);
        self
    }
}

/// Binds a source network to a user name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkBindingConfig {
    /// Address or CIDR range (`192.168.0.0/24`, `10.0.0.1`, `fd00::/8`)
    pub cidr: String,

    /// User recognized for requests originating from `cidr`
    pub user: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}
