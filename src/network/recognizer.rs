//! Network recognition
//!
//! Maps a request's source address to the user bound to its network.

use crate::config::NetworkBindingConfig;
use crate::error::ConfigError;
use crate::network::cidr::Cidr;
use std::net::IpAddr;
use tracing::trace;

/// A network bound to a user
#[derive(Debug, Clone, PartialEq, Eq)]
struct NetworkBinding {
    cidr: Cidr,
    user: String,
}

/// Recognizes users by source address
///
/// Bindings are checked in declaration order; the first range containing the
/// address wins when ranges overlap.
#[derive(Debug, Clone, Default)]
pub struct NetworkRecognizer {
    bindings: Vec<NetworkBinding>,
}

impl NetworkRecognizer {
    /// Build a recognizer from configuration
    pub fn from_config(config: &[NetworkBindingConfig]) -> Result<Self, ConfigError> {
        let bindings = config
            .iter()
            .enumerate()
            .map(|(idx, binding)| {
                let cidr = binding
                    .cidr
                    .parse::<Cidr>()
                    .map_err(|e| e.in_field(&format!("network_binding[{}].cidr", idx)))?;
                Ok(NetworkBinding {
                    cidr,
                    user: binding.user.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self { bindings })
    }

    /// User bound to the first network containing `ip`
    pub fn recognize(&self, ip: IpAddr) -> Option<&str> {
        let user = self
            .bindings
            .iter()
            .find(|binding| binding.cidr.contains(ip))
            .map(|binding| binding.user.as_str());

        trace!(%ip, user = ?user, "Network recognition");
        user
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(cidr: &str, user: &str) -> NetworkBindingConfig {
        NetworkBindingConfig {
            cidr: cidr.to_string(),
            user: user.to_string(),
        }
    }

    #[test]
    fn test_recognize() {
        let recognizer = NetworkRecognizer::from_config(&[
            binding("192.168.0.0/24", "john"),
            binding("10.0.0.0/8", "harry"),
        ])
        .unwrap();

        assert_eq!(recognizer.recognize("192.168.0.12".parse().unwrap()), Some("john"));
        assert_eq!(recognizer.recognize("10.1.2.3".parse().unwrap()), Some("harry"));
        assert_eq!(recognizer.recognize("172.16.0.1".parse().unwrap()), None);
    }

    #[test]
    fn test_first_declared_binding_wins() {
        let recognizer = NetworkRecognizer::from_config(&[
            binding("10.0.0.0/8", "wide"),
            binding("10.0.0.0/24", "narrow"),
        ])
        .unwrap();
        assert_eq!(recognizer.recognize("10.0.0.1".parse().unwrap()), Some("wide"));

        let recognizer = NetworkRecognizer::from_config(&[
            binding("10.0.0.0/24", "narrow"),
            binding("10.0.0.0/8", "wide"),
        ])
        .unwrap();
        assert_eq!(recognizer.recognize("10.0.0.1".parse().unwrap()), Some("narrow"));
    }

    #[test]
    fn test_empty_recognizer() {
        let recognizer = NetworkRecognizer::default();
        assert!(recognizer.is_empty());
        assert_eq!(recognizer.recognize("127.0.0.1".parse().unwrap()), None);
    }

    #[test]
    fn test_invalid_binding() {
        let result = NetworkRecognizer::from_config(&[
            binding("10.0.0.0/8", "ok"),
            binding("not-an-ip", "broken"),
        ]);
        match result.unwrap_err() {
            ConfigError::InvalidCidr { reason, .. } => {
                assert!(reason.contains("network_binding[1]"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
