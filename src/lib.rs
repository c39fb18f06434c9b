//! Access-control decision engine for authentication gateways
//!
//! A reverse proxy asks, for each incoming request, whether a subject (user,
//! groups and proven authentication level) may reach a resource (domain and
//! path). This crate answers that question.
//!
//! ## Features
//!
//! - **Three rule tiers** (`any`, `groups`, `users`) with last-match-wins
//!   precedence and a configurable default policy
//! - **Wildcard domains** (`*.example.com`) and **regex resources**,
//!   compiled once when configuration is loaded
//! - **Network recognition**: callers from bound networks are evaluated
//!   against the access control merged with `network_access_control`
//! - **HTTP decision API** with atomic configuration reload
//!
//! ## Example
//!
//! ```
//! use authgate::access_control::{Level, Policy, PolicyLabel, Resource, Subject, is_access_allowed};
//! use authgate::config::{AclConfig, RuleConfig};
//!
//! let config = AclConfig {
//!     default_policy: PolicyLabel::Deny,
//!     any: vec![RuleConfig::new("*.example.com", PolicyLabel::FirstFactor)],
//!     ..Default::default()
//! };
//! let policy = Policy::compile(&config).unwrap();
//!
//! let resource = Resource::new("home.example.com", "/");
//! let subject = Subject::new("john", ["dev"], Level::FirstFactor);
//! assert!(is_access_allowed(Some(&policy), &resource, &subject));
//! assert!(!is_access_allowed(Some(&policy), &resource, &Subject::anonymous()));
//! ```

pub mod access_control;
pub mod config;
pub mod error;
pub mod gate;
pub mod network;
pub mod server;

// Re-export main types
pub use config::{AppConfig, load_config};
pub use error::{AppError, Result};
pub use gate::{AccessGate, AccessOutcome, AccessRequest, GateState};
