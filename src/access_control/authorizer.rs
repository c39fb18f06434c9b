//! Access decision
//!
//! Implements the precedence algorithm over the rules selected for a
//! request:
//! 1. No policy configured: access is granted
//! 2. The highest-precedence matching rule decides, lower rules are ignored
//!    (user tier over group tier over `any` tier, last declared rule first
//!    within a tier)
//! 3. No matching rule: the default policy decides
//!
//! Evaluation is a pure function of its inputs. It performs no I/O and holds
//! no state, so one [`Policy`] can be shared by any number of threads.

use crate::access_control::policy::{Policy, Rule};
use crate::access_control::selector::RuleSelector;
use crate::access_control::types::{Decision, Level, PolicyLabel, Resource, Subject};
use crate::error::AccessDeniedError;
use tracing::{debug, trace};

/// How the subject of a request was identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvaluationMode {
    /// Identity comes from credentials; rules use their `policy`
    #[default]
    Authenticated,
    /// Identity was inferred from the source network; rules use their
    /// `whitelist_policy` when they define one
    Recognized,
}

impl EvaluationMode {
    fn label<'r>(&self, rule: &'r Rule) -> &'r PolicyLabel {
        match self {
            EvaluationMode::Authenticated => rule.policy(),
            EvaluationMode::Recognized => rule.whitelist_policy().unwrap_or(rule.policy()),
        }
    }
}

/// Detailed result of an evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// No policy is configured
    Unrestricted,
    /// A rule decided
    Rule {
        domain: String,
        policy: PolicyLabel,
        granted: bool,
    },
    /// No rule matched and the default policy decided
    Default { policy: PolicyLabel, granted: bool },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        match self {
            AccessDecision::Unrestricted => true,
            AccessDecision::Rule { granted, .. } | AccessDecision::Default { granted, .. } => {
                *granted
            }
        }
    }
}

/// Decide a request from rules ordered by precedence
///
/// Only the first candidate is consulted.
pub fn evaluate_rules(candidates: &[&Rule], level: Level, mode: EvaluationMode) -> Decision {
    match candidates.first() {
        None => Decision::NoMatch,
        Some(rule) if mode.label(rule).grants(level) => Decision::Grant,
        Some(_) => Decision::Deny,
    }
}

/// Decide a request from the default policy alone
pub fn evaluate_default(default_policy: &PolicyLabel, level: Level) -> bool {
    default_policy.grants(level)
}

/// Check if a subject may access a resource
pub fn is_access_allowed(policy: Option<&Policy>, resource: &Resource, subject: &Subject) -> bool {
    Authorizer::new(policy).is_allowed(resource, subject)
}

/// Evaluates requests against an optional policy
#[derive(Debug, Clone, Copy)]
pub struct Authorizer<'a> {
    policy: Option<&'a Policy>,
    mode: EvaluationMode,
}

impl<'a> Authorizer<'a> {
    /// Create an authorizer; `None` grants every request
    pub fn new(policy: Option<&'a Policy>) -> Self {
        Self {
            policy,
            mode: EvaluationMode::Authenticated,
        }
    }

    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Check if a subject may access a resource
    pub fn is_allowed(&self, resource: &Resource, subject: &Subject) -> bool {
        self.check(resource, subject).is_allowed()
    }

    /// Evaluate a request, reporting what decided it
    pub fn check(&self, resource: &Resource, subject: &Subject) -> AccessDecision {
        let Some(policy) = self.policy else {
            trace!("No access control configured, granting");
            return AccessDecision::Unrestricted;
        };

        let candidates = RuleSelector::new(policy).candidates(resource, subject);
        let decision = evaluate_rules(&candidates, subject.level, self.mode);

        let result = match (decision, candidates.first()) {
            (Decision::Grant | Decision::Deny, Some(rule)) => AccessDecision::Rule {
                domain: rule.domain().to_string(),
                policy: self.mode.label(rule).clone(),
                granted: decision.is_grant(),
            },
            _ => AccessDecision::Default {
                policy: policy.default_policy().clone(),
                granted: evaluate_default(policy.default_policy(), subject.level),
            },
        };

        debug!(
            domain = %resource.domain,
            path = %resource.path,
            user = %subject.user,
            level = %subject.level,
            mode = ?self.mode,
            matching_rules = candidates.len(),
            allowed = result.is_allowed(),
            "Evaluated access"
        );

        result
    }

    /// Check access, returning an error if denied
    pub fn require(&self, resource: &Resource, subject: &Subject) -> Result<(), AccessDeniedError> {
        match self.check(resource, subject) {
            AccessDecision::Unrestricted => Ok(()),
            AccessDecision::Rule { granted: true, .. }
            | AccessDecision::Default { granted: true, .. } => Ok(()),
            AccessDecision::Rule { domain, .. } => Err(AccessDeniedError::by_rule(
                &subject.user,
                &resource.domain,
                &resource.path,
                &domain,
            )),
            AccessDecision::Default { .. } => Err(AccessDeniedError::by_default_policy(
                &subject.user,
                &resource.domain,
                &resource.path,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AclConfig, RuleConfig};

    fn user_policy(default_policy: PolicyLabel, rules: Vec<RuleConfig>) -> Policy {
        let mut config = AclConfig {
            default_policy,
            ..Default::default()
        };
        config.users.insert("user1".to_string(), rules);
        Policy::compile(&config).unwrap()
    }

    fn user1(level: Level) -> Subject {
        Subject::new("user1", ["group1"], level)
    }

    #[test]
    fn test_no_policy_grants() {
        let resource = Resource::new("home.example.com", "/");
        assert!(is_access_allowed(None, &resource, &Subject::anonymous()));
        assert_eq!(
            Authorizer::new(None).check(&resource, &Subject::anonymous()),
            AccessDecision::Unrestricted
        );
    }

    #[test]
    fn test_evaluate_rules_first_candidate_only() {
        let deny = Rule::compile(&RuleConfig::new("a.example.com", PolicyLabel::Deny)).unwrap();
        let bypass =
            Rule::compile(&RuleConfig::new("a.example.com", PolicyLabel::Bypass)).unwrap();

        assert_eq!(
            evaluate_rules(&[&deny, &bypass], Level::SecondFactor, EvaluationMode::Authenticated),
            Decision::Deny
        );
        assert_eq!(
            evaluate_rules(&[&bypass, &deny], Level::NotAuthenticated, EvaluationMode::Authenticated),
            Decision::Grant
        );
        assert_eq!(
            evaluate_rules(&[], Level::SecondFactor, EvaluationMode::Authenticated),
            Decision::NoMatch
        );
    }

    #[test]
    fn test_levels_gate_rules() {
        let policy = user_policy(
            PolicyLabel::Deny,
            vec![
                RuleConfig::new("one.example.com", PolicyLabel::FirstFactor),
                RuleConfig::new("two.example.com", PolicyLabel::SecondFactor),
            ],
        );
        let authorizer = Authorizer::new(Some(&policy));
        let one = Resource::new("one.example.com", "/");
        let two = Resource::new("two.example.com", "/");

        assert!(!authorizer.is_allowed(&one, &user1(Level::NotAuthenticated)));
        assert!(authorizer.is_allowed(&one, &user1(Level::FirstFactor)));
        assert!(!authorizer.is_allowed(&two, &user1(Level::FirstFactor)));
        assert!(authorizer.is_allowed(&two, &user1(Level::SecondFactor)));
    }

    #[test]
    fn test_unknown_rule_label_denies() {
        let policy = user_policy(
            PolicyLabel::Bypass,
            vec![RuleConfig::new("home.example.com", PolicyLabel::from("allow"))],
        );
        let authorizer = Authorizer::new(Some(&policy));
        assert!(!authorizer.is_allowed(
            &Resource::new("home.example.com", "/"),
            &user1(Level::SecondFactor)
        ));
    }

    #[test]
    fn test_unknown_default_policy_does_not_grant() {
        let policy = Policy::with_default(PolicyLabel::from("allow"));
        assert!(!is_access_allowed(
            Some(&policy),
            &Resource::new("home.example.com", "/"),
            &user1(Level::SecondFactor)
        ));
    }

    #[test]
    fn test_default_policy_levels() {
        let resource = Resource::new("home.example.com", "/");
        let policy = Policy::with_default(PolicyLabel::FirstFactor);
        assert!(!is_access_allowed(Some(&policy), &resource, &Subject::anonymous()));
        assert!(is_access_allowed(Some(&policy), &resource, &user1(Level::FirstFactor)));
    }

    #[test]
    fn test_check_reports_deciding_rule() {
        let policy = user_policy(
            PolicyLabel::Bypass,
            vec![RuleConfig::new("*.example.com", PolicyLabel::SecondFactor)],
        );
        let decision = Authorizer::new(Some(&policy)).check(
            &Resource::new("a.example.com", "/"),
            &user1(Level::FirstFactor),
        );
        assert_eq!(
            decision,
            AccessDecision::Rule {
                domain: "*.example.com".to_string(),
                policy: PolicyLabel::SecondFactor,
                granted: false,
            }
        );
    }

    #[test]
    fn test_recognized_mode_uses_whitelist_policy() {
        let policy = user_policy(
            PolicyLabel::Deny,
            vec![
                RuleConfig::new("nas.example.com", PolicyLabel::SecondFactor)
                    .with_whitelist_policy(PolicyLabel::Bypass),
                RuleConfig::new("mail.example.com", PolicyLabel::FirstFactor),
            ],
        );
        let nas = Resource::new("nas.example.com", "/");
        let mail = Resource::new("mail.example.com", "/");
        let subject = user1(Level::NotAuthenticated);

        let authenticated = Authorizer::new(Some(&policy));
        assert!(!authenticated.is_allowed(&nas, &subject));

        let recognized = authenticated.with_mode(EvaluationMode::Recognized);
        assert!(recognized.is_allowed(&nas, &subject));
        // Without a whitelist policy the regular policy still applies
        assert!(!recognized.is_allowed(&mail, &subject));
    }

    #[test]
    fn test_require() {
        let policy = user_policy(
            PolicyLabel::Deny,
            vec![RuleConfig::new("home.example.com", PolicyLabel::Deny)],
        );
        let authorizer = Authorizer::new(Some(&policy));

        let err = authorizer
            .require(&Resource::new("home.example.com", "/"), &user1(Level::SecondFactor))
            .unwrap_err();
        assert!(err.reason.contains("home.example.com"));

        let err = authorizer
            .require(&Resource::new("other.example.com", "/"), &user1(Level::SecondFactor))
            .unwrap_err();
        assert!(err.reason.contains("default policy"));

        assert!(
            Authorizer::new(None)
                .require(&Resource::new("x", "/"), &Subject::anonymous())
                .is_ok()
        );
    }
}
