//! Access control types
//!
//! Core value types consumed and produced by the decision engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Proven authentication strength of a subject
///
/// Variants are declared weakest first so that the derived ordering is the
/// ordering of authentication strength.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    #[default]
    NotAuthenticated,
    FirstFactor,
    SecondFactor,
}

impl Level {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Level::NotAuthenticated => "not_authenticated",
            Level::FirstFactor => "first_factor",
            Level::SecondFactor => "second_factor",
        }
    }

    /// Try to parse a level from a string
    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "not_authenticated" => Some(Level::NotAuthenticated),
            "first_factor" => Some(Level::FirstFactor),
            "second_factor" => Some(Level::SecondFactor),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Policy attached to a rule or used as the default policy
///
/// Labels outside the known vocabulary are kept verbatim in `Other` so a
/// configuration typo never fails loading. They never grant access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PolicyLabel {
    /// Grants unconditionally
    Bypass,
    /// Grants from `Level::FirstFactor` upward
    FirstFactor,
    /// Grants from `Level::SecondFactor` upward
    SecondFactor,
    /// Never grants
    #[default]
    Deny,
    /// Unrecognized label, never grants
    Other(String),
}

impl PolicyLabel {
    pub fn as_str(&self) -> &str {
        match self {
            PolicyLabel::Bypass => "bypass",
            PolicyLabel::FirstFactor => "first_factor",
            PolicyLabel::SecondFactor => "second_factor",
            PolicyLabel::Deny => "deny",
            PolicyLabel::Other(label) => label,
        }
    }

    /// Whether a subject authenticated at `level` satisfies this policy
    pub fn grants(&self, level: Level) -> bool {
        match self {
            PolicyLabel::Bypass => true,
            PolicyLabel::FirstFactor => level >= Level::FirstFactor,
            PolicyLabel::SecondFactor => level >= Level::SecondFactor,
            PolicyLabel::Deny | PolicyLabel::Other(_) => false,
        }
    }

}

impl From<String> for PolicyLabel {
    fn from(label: String) -> Self {
        match label.as_str() {
            "bypass" => PolicyLabel::Bypass,
            "first_factor" => PolicyLabel::FirstFactor,
            "second_factor" => PolicyLabel::SecondFactor,
            "deny" => PolicyLabel::Deny,
            _ => PolicyLabel::Other(label),
        }
    }
}

impl From<&str> for PolicyLabel {
    fn from(label: &str) -> Self {
        PolicyLabel::from(label.to_string())
    }
}

impl From<PolicyLabel> for String {
    fn from(label: PolicyLabel) -> Self {
        match label {
            PolicyLabel::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PolicyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub domain: String,
    pub path: String,
}

impl Resource {
    /// Create a resource; the domain is lowercased like rule domains are
    pub fn new(domain: impl Into<String>, path: impl Into<String>) -> Self {
        let mut domain = domain.into();
        domain.make_ascii_lowercase();
        Self {
            domain,
            path: path.into(),
        }
    }

    /// Build a resource from the original URL forwarded by the proxy
    ///
    /// The scheme, userinfo, port and fragment are dropped. The path keeps
    /// its query string and defaults to `/`. Returns `None` when no host is
    /// present.
    pub fn from_url(url: &str) -> Option<Self> {
        let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
        let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
        let (authority, path) = match rest.find(['/', '?']) {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };

        let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
        let host = if let Some(bracketed) = host_port.strip_prefix('[') {
            bracketed.split_once(']').map(|(host, _)| host)?
        } else {
            host_port.split(':').next().unwrap_or_default()
        };
        if host.is_empty() {
            return None;
        }

        let path = if path.is_empty() {
            "/".to_string()
        } else if path.starts_with('?') {
            format!("/{}", path)
        } else {
            path.to_string()
        };

        Some(Self::new(host, path))
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.domain, self.path)
    }
}

/// Identity requesting a resource
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Subject {
    pub user: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub level: Level,
}

impl Subject {
    pub fn new<I, S>(user: impl Into<String>, groups: I, level: Level) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user: user.into(),
            groups: groups.into_iter().map(Into::into).collect(),
            level,
        }
    }

    /// A subject that proved nothing
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.level > Level::NotAuthenticated
    }
}

/// Outcome of evaluating the matching rules of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No rule matched; the default policy decides
    NoMatch,
    Grant,
    Deny,
}

impl Decision {
    pub fn is_grant(&self) -> bool {
        matches!(self, Decision::Grant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::NotAuthenticated < Level::FirstFactor);
        assert!(Level::FirstFactor < Level::SecondFactor);
        assert_eq!(Level::default(), Level::NotAuthenticated);
    }

    #[test]
    fn test_level_roundtrip() {
        for level in [
            Level::NotAuthenticated,
            Level::FirstFactor,
            Level::SecondFactor,
        ] {
            assert_eq!(Level::try_parse(level.as_str()), Some(level));
        }
        assert_eq!(Level::try_parse("third_factor"), None);
    }

    #[test]
    fn test_policy_label_grants() {
        assert!(PolicyLabel::Bypass.grants(Level::NotAuthenticated));

        assert!(!PolicyLabel::FirstFactor.grants(Level::NotAuthenticated));
        assert!(PolicyLabel::FirstFactor.grants(Level::FirstFactor));
        assert!(PolicyLabel::FirstFactor.grants(Level::SecondFactor));

        assert!(!PolicyLabel::SecondFactor.grants(Level::FirstFactor));
        assert!(PolicyLabel::SecondFactor.grants(Level::SecondFactor));

        assert!(!PolicyLabel::Deny.grants(Level::SecondFactor));
        assert!(!PolicyLabel::from("allow").grants(Level::SecondFactor));
    }

    #[test]
    fn test_policy_label_parse() {
        assert_eq!(PolicyLabel::from("bypass"), PolicyLabel::Bypass);
        assert_eq!(PolicyLabel::from("first_factor"), PolicyLabel::FirstFactor);
        assert_eq!(PolicyLabel::from("second_factor"), PolicyLabel::SecondFactor);
        assert_eq!(PolicyLabel::from("deny"), PolicyLabel::Deny);
        assert_eq!(
            PolicyLabel::from("one_factor"),
            PolicyLabel::Other("one_factor".to_string())
        );
        assert_eq!(String::from(PolicyLabel::from("one_factor")), "one_factor");
    }

    #[test]
    fn test_policy_label_serde() {
        let label: PolicyLabel = serde_json::from_str(r#""second_factor""#).unwrap();
        assert_eq!(label, PolicyLabel::SecondFactor);
        assert_eq!(serde_json::to_string(&label).unwrap(), r#""second_factor""#);
    }

    #[test]
    fn test_resource_from_url() {
        assert_eq!(
            Resource::from_url("https://home.example.com:8080/abc?x=1"),
            Some(Resource::new("home.example.com", "/abc?x=1"))
        );
        assert_eq!(
            Resource::from_url("https://Admin.Example.com"),
            Some(Resource::new("admin.example.com", "/"))
        );
        assert_eq!(
            Resource::from_url("http://user:pw@mail.example.com/inbox"),
            Some(Resource::new("mail.example.com", "/inbox"))
        );
        assert_eq!(
            Resource::from_url("https://[::1]:8443/x"),
            Some(Resource::new("::1", "/x"))
        );
        assert_eq!(
            Resource::from_url("https://home.example.com?rd=1"),
            Some(Resource::new("home.example.com", "/?rd=1"))
        );
        assert_eq!(
            Resource::from_url("https://home.example.com#frag"),
            Some(Resource::new("home.example.com", "/"))
        );
        assert_eq!(
            Resource::from_url("https://home.example.com/a?b=1#frag"),
            Some(Resource::new("home.example.com", "/a?b=1"))
        );
        assert_eq!(Resource::from_url("https:///nohost"), None);
        assert_eq!(Resource::from_url("https://#frag"), None);
    }

    #[test]
    fn test_resource_domain_is_lowercased() {
        let resource = Resource::new("SECRET.Example.com", "/Path");
        assert_eq!(resource.domain, "secret.example.com");
        assert_eq!(resource.path, "/Path");
    }

    #[test]
    fn test_subject() {
        let subject = Subject::new("john", ["dev", "admins"], Level::FirstFactor);
        assert_eq!(subject.groups, vec!["dev", "admins"]);
        assert!(subject.is_authenticated());
        assert!(!Subject::anonymous().is_authenticated());
    }
}
