//! Compiled access control policy
//!
//! A [`Policy`] is built once from an [`AclConfig`] when configuration is
//! loaded. Resource patterns are compiled at that point so evaluation never
//! touches the regex compiler. A policy is immutable after construction;
//! reloading configuration means building a new one.

use crate::access_control::patterns::{DomainPattern, ResourceMatcher};
use crate::access_control::types::{PolicyLabel, Resource};
use crate::config::{AclConfig, RuleConfig};
use crate::error::ConfigError;
use std::collections::HashMap;

/// A compiled access rule
#[derive(Debug, Clone)]
pub struct Rule {
    domain: DomainPattern,
    policy: PolicyLabel,
    resources: ResourceMatcher,
    whitelist_policy: Option<PolicyLabel>,
}

impl Rule {
    /// Compile a rule from its configuration
    pub fn compile(config: &RuleConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            domain: DomainPattern::new(&config.domain),
            policy: config.policy.clone(),
            resources: ResourceMatcher::new(config.resources.as_deref())?,
            whitelist_policy: config.whitelist_policy.clone(),
        })
    }

    pub fn domain(&self) -> &DomainPattern {
        &self.domain
    }

    pub fn policy(&self) -> &PolicyLabel {
        &self.policy
    }

    pub fn whitelist_policy(&self) -> Option<&PolicyLabel> {
        self.whitelist_policy.as_ref()
    }

    /// Check whether this rule applies to a resource
    pub fn matches(&self, resource: &Resource) -> bool {
        self.domain.matches(&resource.domain) && self.resources.matches(&resource.path)
    }

    /// Convert back into its configuration form
    pub fn to_config(&self) -> RuleConfig {
        RuleConfig {
            domain: self.domain.to_string(),
            policy: self.policy.clone(),
            resources: self.resources.sources(),
            whitelist_policy: self.whitelist_policy.clone(),
        }
    }
}

/// A compiled access control list
#[derive(Debug, Clone, Default)]
pub struct Policy {
    pub(crate) default_policy: PolicyLabel,
    pub(crate) any: Vec<Rule>,
    pub(crate) groups: HashMap<String, Vec<Rule>>,
    pub(crate) users: HashMap<String, Vec<Rule>>,
}

impl Policy {
    /// Compile a policy from configuration
    ///
    /// Fails on the first resource pattern that does not compile; the error
    /// names the tier and rule index it came from.
    pub fn compile(config: &AclConfig) -> Result<Self, ConfigError> {
        Self::compile_section(config, "")
    }

    /// Compile a policy declared under `section`, which prefixes the field
    /// path of any error
    pub(crate) fn compile_section(config: &AclConfig, section: &str) -> Result<Self, ConfigError> {
        let prefix = if section.is_empty() {
            String::new()
        } else {
            format!("{}.", section)
        };

        let any = compile_rules(&config.any, &format!("{}any", prefix))?;

        let mut groups = HashMap::with_capacity(config.groups.len());
        for (group, rules) in &config.groups {
            groups.insert(
                group.clone(),
                compile_rules(rules, &format!("{}groups.{}", prefix, group))?,
            );
        }

        let mut users = HashMap::with_capacity(config.users.len());
        for (user, rules) in &config.users {
            users.insert(
                user.clone(),
                compile_rules(rules, &format!("{}users.{}", prefix, user))?,
            );
        }

        Ok(Self {
            default_policy: config.default_policy.clone(),
            any,
            groups,
            users,
        })
    }

    /// A policy with no rules and the given default
    pub fn with_default(default_policy: PolicyLabel) -> Self {
        Self {
            default_policy,
            ..Default::default()
        }
    }

    pub fn default_policy(&self) -> &PolicyLabel {
        &self.default_policy
    }

    pub fn any(&self) -> &[Rule] {
        &self.any
    }

    pub fn group(&self, group: &str) -> Option<&[Rule]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    pub fn user(&self, user: &str) -> Option<&[Rule]> {
        self.users.get(user).map(Vec::as_slice)
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.users.keys().map(String::as_str)
    }

    /// Total number of rules across all tiers
    pub fn rule_count(&self) -> usize {
        self.any.len()
            + self.groups.values().map(Vec::len).sum::<usize>()
            + self.users.values().map(Vec::len).sum::<usize>()
    }

    /// Convert back into its configuration form
    pub fn to_config(&self) -> AclConfig {
        let to_configs = |rules: &[Rule]| rules.iter().map(Rule::to_config).collect::<Vec<_>>();
        AclConfig {
            default_policy: self.default_policy.clone(),
            any: to_configs(&self.any),
            groups: self
                .groups
                .iter()
                .map(|(group, rules)| (group.clone(), to_configs(rules)))
                .collect(),
            users: self
                .users
                .iter()
                .map(|(user, rules)| (user.clone(), to_configs(rules)))
                .collect(),
        }
    }
}

fn compile_rules(rules: &[RuleConfig], tier: &str) -> Result<Vec<Rule>, ConfigError> {
    rules
        .iter()
        .enumerate()
        .map(|(idx, rule)| {
            Rule::compile(rule).map_err(|e| e.in_field(&format!("{}[{}].resources", tier, idx)))
        })
        .collect()
}
