//! Policy merging
//!
//! Combines the regular policy with the policy that applies to callers
//! recognized by their source network.

use crate::access_control::policy::{Policy, Rule};
use std::collections::HashMap;
use tracing::debug;

/// Merge a secondary policy into a primary one
///
/// - The default policy is the secondary's.
/// - `any` rules are the primary's followed by the secondary's, so the
///   secondary wins when both match.
/// - Group and user rule sets are taken from the primary. For a key present
///   in both policies the secondary's rules are appended. Keys present only
///   in the secondary are dropped: the secondary can only refine subjects
///   the primary already governs.
///
/// Neither input is modified.
pub fn merge(primary: &Policy, secondary: &Policy) -> Policy {
    let mut any = Vec::with_capacity(primary.any.len() + secondary.any.len());
    any.extend(primary.any.iter().cloned());
    any.extend(secondary.any.iter().cloned());

    let merged = Policy {
        default_policy: secondary.default_policy.clone(),
        any,
        groups: merge_tier(&primary.groups, &secondary.groups),
        users: merge_tier(&primary.users, &secondary.users),
    };

    debug!(
        default_policy = %merged.default_policy,
        rules = merged.rule_count(),
        "Merged network access control into access control"
    );

    merged
}

fn merge_tier(
    primary: &HashMap<String, Vec<Rule>>,
    secondary: &HashMap<String, Vec<Rule>>,
) -> HashMap<String, Vec<Rule>> {
    primary
        .iter()
        .map(|(key, rules)| {
            let mut merged = rules.clone();
            if let Some(extra) = secondary.get(key) {
                merged.extend(extra.iter().cloned());
            }
            (key.clone(), merged)
        })
        .collect()
}
