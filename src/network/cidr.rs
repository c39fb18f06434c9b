//! CIDR ranges
//!
//! Parses `address/prefix` ranges for both IPv4 and IPv6. A bare address is
//! treated as a single-host range (/32 or /128).

use crate::error::ConfigError;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// A parsed network range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    network: IpAddr,
    prefix_len: u8,
}

impl Cidr {
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self, ConfigError> {
        let max = max_prefix(&addr);
        if prefix_len > max {
            return Err(ConfigError::InvalidCidr {
                cidr: format!("{}/{}", addr, prefix_len),
                reason: format!("prefix length must be 0-{}, got {}", max, prefix_len),
            });
        }

        Ok(Self {
            network: mask(addr, prefix_len),
            prefix_len,
        })
    }

    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Check if an address belongs to this range
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are matched against
    /// IPv4 ranges.
    pub fn contains(&self, ip: IpAddr) -> bool {
        let ip = match ip {
            IpAddr::V6(v6) if self.network.is_ipv4() => match v6.to_ipv4_mapped() {
                Some(v4) => IpAddr::V4(v4),
                None => return false,
            },
            other => other,
        };

        match (self.network, ip) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                mask(ip, self.prefix_len) == self.network
            }
            _ => false,
        }
    }
}

impl FromStr for Cidr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ConfigError::InvalidCidr {
            cidr: s.to_string(),
            reason,
        };

        let (addr_str, prefix) = match s.trim().split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s.trim(), None),
        };

        let addr: IpAddr = addr_str
            .parse()
            .map_err(|e| invalid(format!("invalid address '{}': {}", addr_str, e)))?;

        let prefix_len = match prefix {
            Some(prefix) => prefix
                .parse::<u8>()
                .map_err(|_| invalid(format!("invalid prefix length '{}'", prefix)))?,
            None => max_prefix(&addr),
        };

        Cidr::new(addr, prefix_len).map_err(|e| match e {
            ConfigError::InvalidCidr { reason, .. } => invalid(reason),
            other => other,
        })
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn mask(addr: IpAddr, prefix_len: u8) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => {
            let bits = u32::from(v4);
            let mask = if prefix_len == 0 {
                0
            } else {
                !0u32 << (32 - u32::from(prefix_len))
            };
            IpAddr::V4((bits & mask).into())
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let mask = if prefix_len == 0 {
                0
            } else {
                !0u128 << (128 - u32::from(prefix_len))
            };
            IpAddr::V6((bits & mask).into())
        }
    }
}
