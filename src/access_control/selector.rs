//! Rule selection
//!
//! Collects the rules of a policy that apply to a request, ordered from
//! highest to lowest precedence.

use crate::access_control::policy::{Policy, Rule};
use crate::access_control::types::{Resource, Subject};
use tracing::trace;

/// Rules matching a request, split by tier
///
/// Each tier keeps declaration order.
#[derive(Debug, Default)]
pub struct SelectedRules<'a> {
    pub any: Vec<&'a Rule>,
    pub groups: Vec<&'a Rule>,
    pub user: Vec<&'a Rule>,
}

impl<'a> SelectedRules<'a> {
    /// Candidates from highest to lowest precedence
    ///
    /// User rules come before group rules, which come before `any` rules.
    /// Within each tier the last declared rule comes first.
    pub fn into_candidates(self) -> Vec<&'a Rule> {
        let mut candidates = self.any;
        candidates.extend(self.groups);
        candidates.extend(self.user);
        candidates.reverse();
        candidates
    }
}

/// Selects the rules of a policy that apply to a subject and resource
pub struct RuleSelector<'a> {
    policy: &'a Policy,
}

impl<'a> RuleSelector<'a> {
    pub fn new(policy: &'a Policy) -> Self {
        Self { policy }
    }

    /// Matching rules of every tier
    ///
    /// Group rules are concatenated in the order of `subject.groups`. There is
    /// no precedence between two groups: when groups disagree on a resource,
    /// the outcome depends on the order the caller listed the groups in.
    pub fn select(&self, resource: &Resource, subject: &Subject) -> SelectedRules<'a> {
        let any = filter(self.policy.any(), resource);

        let groups = subject
            .groups
            .iter()
            .filter_map(|group| self.policy.group(group))
            .flat_map(|rules| filter(rules, resource))
            .collect();

        let user = self
            .policy
            .user(&subject.user)
            .map(|rules| filter(rules, resource))
            .unwrap_or_default();

        let selected = SelectedRules { any, groups, user };
        trace!(
            domain = %resource.domain,
            path = %resource.path,
            any = selected.any.len(),
            groups = selected.groups.len(),
            user = selected.user.len(),
            "Selected matching rules"
        );
        selected
    }

    /// Matching rules from highest to lowest precedence
    pub fn candidates(&self, resource: &Resource, subject: &Subject) -> Vec<&'a Rule> {
        self.select(resource, subject).into_candidates()
    }
}

fn filter<'a>(rules: &'a [Rule], resource: &Resource) -> Vec<&'a Rule> {
    rules.iter().filter(|rule| rule.matches(resource)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_control::types::{Level, PolicyLabel};
    use crate::config::{AclConfig, RuleConfig};

    fn policy() -> Policy {
        let mut config = AclConfig {
            default_policy: PolicyLabel::Deny,
            any: vec![
                RuleConfig::new("*.example.com", PolicyLabel::FirstFactor),
                RuleConfig::new("other.org", PolicyLabel::Bypass),
            ],
            ..Default::default()
        };
        config.groups.insert(
            "dev".to_string(),
            vec![RuleConfig::new("git.example.com", PolicyLabel::SecondFactor)],
        );
        config.groups.insert(
            "ops".to_string(),
            vec![RuleConfig::new("git.example.com", PolicyLabel::Deny)],
        );
        config.users.insert(
            "john".to_string(),
            vec![
                RuleConfig::new("git.example.com", PolicyLabel::Bypass).with_resources(["^/john"]),
                RuleConfig::new("git.example.com", PolicyLabel::Deny),
            ],
        );
        Policy::compile(&config).unwrap()
    }

    #[test]
    fn test_select_filters_each_tier() {
        let policy = policy();
        let selector = RuleSelector::new(&policy);
        let subject = Subject::new("john", ["dev"], Level::FirstFactor);

        let selected = selector.select(&Resource::new("git.example.com", "/team"), &subject);
        assert_eq!(selected.any.len(), 1);
        assert_eq!(selected.groups.len(), 1);
        assert_eq!(selected.user.len(), 1);
    }

    #[test]
    fn test_candidates_order() {
        let policy = policy();
        let selector = RuleSelector::new(&policy);
        let subject = Subject::new("john", ["dev", "ops"], Level::FirstFactor);

        let candidates = selector.candidates(&Resource::new("git.example.com", "/john/x"), &subject);
        let labels: Vec<&PolicyLabel> = candidates.iter().map(|r| r.policy()).collect();
        assert_eq!(
            labels,
            vec![
                // user tier, last declared first
                &PolicyLabel::Deny,
                &PolicyLabel::Bypass,
                // group tier in reverse enumeration order
                &PolicyLabel::Deny,
                &PolicyLabel::SecondFactor,
                // any tier
                &PolicyLabel::FirstFactor,
            ]
        );
    }

    #[test]
    fn test_group_order_follows_subject() {
        let policy = policy();
        let selector = RuleSelector::new(&policy);
        let subject = Subject::new("jane", ["ops", "dev"], Level::FirstFactor);

        let candidates = selector.candidates(&Resource::new("git.example.com", "/"), &subject);
        assert_eq!(candidates[0].policy(), &PolicyLabel::SecondFactor);
    }

    #[test]
    fn test_unknown_groups_and_users_are_ignored() {
        let policy = policy();
        let selector = RuleSelector::new(&policy);
        let subject = Subject::new("nobody", ["unknown"], Level::SecondFactor);

        let selected = selector.select(&Resource::new("other.org", "/"), &subject);
        assert_eq!(selected.any.len(), 1);
        assert!(selected.groups.is_empty());
        assert!(selected.user.is_empty());
    }

    #[test]
    fn test_no_match() {
        let policy = policy();
        let selector = RuleSelector::new(&policy);
        let selected = selector.select(&Resource::new("example.net", "/"), &Subject::anonymous());
        assert!(selected.into_candidates().is_empty());
    }
}
