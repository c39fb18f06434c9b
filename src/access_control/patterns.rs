//! Pattern matching for access control
//!
//! Provides domain matching and regex-based resource matching for rules.

use crate::error::ConfigError;
use regex::Regex;
use std::fmt;

/// Domain pattern of a rule
///
/// Either an exact domain or a `*.`-prefixed wildcard, stored lowercased.
/// Request domains are compared without regard to ASCII case. A wildcard matches
/// one or more labels below its suffix but never the suffix itself:
/// `*.mail.example.com` matches `mx1.mail.example.com` and
/// `mx1.server.mail.example.com`, not `mail.example.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainPattern {
    Exact(String),
    /// Stores the suffix with its leading dot (`.mail.example.com`)
    Wildcard(String),
}

impl DomainPattern {
    pub fn new(pattern: &str) -> Self {
        let pattern = pattern.trim().to_ascii_lowercase();
        match pattern.strip_prefix("*.") {
            Some(suffix) => DomainPattern::Wildcard(format!(".{}", suffix)),
            None => DomainPattern::Exact(pattern),
        }
    }

    /// Check if a request domain matches this pattern, ignoring ASCII case
    pub fn matches(&self, domain: &str) -> bool {
        match self {
            DomainPattern::Exact(expected) => expected.eq_ignore_ascii_case(domain),
            DomainPattern::Wildcard(suffix) => {
                let domain = domain.as_bytes();
                domain.len() > suffix.len()
                    && domain[domain.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
            }
        }
    }
}

impl fmt::Display for DomainPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainPattern::Exact(domain) => write!(f, "{}", domain),
            DomainPattern::Wildcard(suffix) => write!(f, "*{}", suffix),
        }
    }
}

/// Compiled resource matcher
///
/// Patterns are unanchored: a pattern matches when it is found anywhere in
/// the path. A matcher built without patterns matches every path.
#[derive(Debug, Clone)]
pub struct ResourceMatcher {
    patterns: Option<Vec<CompiledPattern>>,
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    source: String,
    regex: Regex,
}

impl ResourceMatcher {
    /// Create a new matcher from a list of regex patterns
    ///
    /// `None` and an empty list both produce a matcher that accepts every path.
    pub fn new(patterns: Option<&[String]>) -> Result<Self, ConfigError> {
        let Some(patterns) = patterns.filter(|p| !p.is_empty()) else {
            return Ok(Self::any());
        };

        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;

            compiled.push(CompiledPattern {
                source: pattern.clone(),
                regex,
            });
        }

        Ok(Self {
            patterns: Some(compiled),
        })
    }

    /// Create a matcher accepting every path
    pub fn any() -> Self {
        Self { patterns: None }
    }

    /// Check if a path matches any pattern
    pub fn matches(&self, path: &str) -> bool {
        match &self.patterns {
            None => true,
            Some(patterns) => patterns.iter().any(|p| p.regex.is_match(path)),
        }
    }

    /// Source patterns, `None` when every path matches
    pub fn sources(&self) -> Option<Vec<String>> {
        self.patterns
            .as_ref()
            .map(|patterns| patterns.iter().map(|p| p.source.clone()).collect())
    }
}

impl Default for ResourceMatcher {
    fn default() -> Self {
        Self::any()
    }
}
