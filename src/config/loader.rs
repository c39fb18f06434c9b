//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (AUTHGATE__*)
//! 2. Configuration file (TOML)
//! 3. Default values

use crate::config::types::{AclConfig, AppConfig};
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "authgate.toml",
    ".authgate.toml",
    "~/.config/authgate/config.toml",
    "/etc/authgate/config.toml",
];

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Locate the configuration file that `load_config` would read
///
/// Returns the explicit path when given, otherwise the first existing
/// default path.
pub fn resolve_config_path(config_path: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = config_path {
        return Some(PathBuf::from(path));
    }

    DEFAULT_CONFIG_PATHS
        .iter()
        .map(|path| PathBuf::from(shellexpand::tilde(path).as_ref()))
        .find(|path| path.exists())
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. Defaults are handled by serde defaults on AppConfig

    // 2. Configuration file
    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
    }
    if let Some(path) = resolve_config_path(config_path) {
        builder = builder.add_source(File::new(&path.to_string_lossy(), FileFormat::Toml));
    }

    // 3. Environment variables, e.g. AUTHGATE__SERVER__PORT
    // Double underscore (__) maps to nested keys (server.port)
    builder = builder.add_source(
        Environment::with_prefix("AUTHGATE")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values
///
/// Checks the structure only. Resource patterns and network ranges are
/// checked when they are compiled by `GateState::from_config`.
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.host.is_empty() {
        return Err(ConfigError::Missing {
            field: "server.host".to_string(),
        });
    }

    if config.server.port == 0 {
        return Err(ConfigError::Invalid {
            message: "server.port must be greater than 0".to_string(),
        });
    }

    if let Some(acl) = &config.access_control {
        validate_acl(acl, "access_control")?;
    }
    if let Some(acl) = &config.network_access_control {
        validate_acl(acl, "network_access_control")?;
    }

    for (idx, binding) in config.network_binding.iter().enumerate() {
        if binding.user.is_empty() {
            return Err(ConfigError::Missing {
                field: format!("network_binding[{}].user", idx),
            });
        }
    }

    Ok(())
}

/// Validate every rule of an access control list
fn validate_acl(acl: &AclConfig, prefix: &str) -> Result<(), ConfigError> {
    let tiers = std::iter::once((format!("{}.any", prefix), &acl.any))
        .chain(
            acl.groups
                .iter()
                .map(|(group, rules)| (format!("{}.groups.{}", prefix, group), rules)),
        )
        .chain(
            acl.users
                .iter()
                .map(|(user, rules)| (format!("{}.users.{}", prefix, user), rules)),
        );

    for (path, rules) in tiers {
        for (idx, rule) in rules.iter().enumerate() {
            if rule.domain.trim().is_empty() {
                return Err(ConfigError::Missing {
                    field: format!("{}[{}].domain", path, idx),
                });
            }
        }
    }

    Ok(())
}
