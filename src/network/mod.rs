//! Network identity
//!
//! Recognizes callers by their source address using the `network_binding`
//! configuration. A recognized caller is evaluated against the access
//! control merged with `network_access_control`.
//!
//! ```toml
//! [[network_binding]]
//! cidr = "192.168.0.0/24"
//! user = "john"
//! ```

pub mod cidr;
pub mod recognizer;

pub use cidr::Cidr;
pub use recognizer::NetworkRecognizer;
