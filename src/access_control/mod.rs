//! Access control module
//!
//! Decides whether a subject (user, groups and proven authentication level)
//! may reach a resource (domain and path).
//!
//! ## Access Control Model
//!
//! Rules live in three tiers with the following precedence (highest to
//! lowest):
//!
//! 1. **User rules** - rules declared for the subject's user name
//! 2. **Group rules** - rules declared for any of the subject's groups
//! 3. **Any rules** - rules applying to everybody
//!
//! Within a tier the last declared matching rule wins. The single winning
//! rule decides; when no rule matches, the default policy decides.
//!
//! Each rule carries one of the policies `bypass`, `first_factor`,
//! `second_factor` or `deny`.
//!
//! ## Example Configuration
//!
//! ```toml
//! [access_control]
//! default_policy = "deny"
//!
//! [[access_control.any]]
//! domain = "public.example.com"
//! policy = "bypass"
//!
//! [[access_control.groups.admins]]
//! domain = "*.example.com"
//! policy = "second_factor"
//!
//! [[access_control.users.john]]
//! domain = "home.example.com"
//! policy = "first_factor"
//! resources = ["^/john/"]
//! ```

pub mod authorizer;
pub mod merger;
pub mod patterns;
pub mod policy;
pub mod selector;
pub mod types;

pub use authorizer::{
    AccessDecision, Authorizer, EvaluationMode, evaluate_default, evaluate_rules,
    is_access_allowed,
};
pub use merger::merge;
pub use patterns::{DomainPattern, ResourceMatcher};
pub use policy::{Policy, Rule};
pub use selector::{RuleSelector, SelectedRules};
pub use types::{Decision, Level, PolicyLabel, Resource, Subject};
