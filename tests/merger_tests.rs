//! Policy merge tests

use authgate::access_control::{Level, Policy, PolicyLabel, Resource, Subject, is_access_allowed, merge};
use authgate::config::load_config_from_str;

const CONFIG: &str = r#"
[access_control]
default_policy = "deny"

[[access_control.any]]
domain = "public.example.com"
policy = "bypass"

[[access_control.groups.dev]]
domain = "dev.example.com"
policy = "first_factor"

[[access_control.users.john]]
domain = "home.example.com"
policy = "second_factor"

[network_access_control]
default_policy = "bypass"

[[network_access_control.any]]
domain = "lan.example.com"
policy = "bypass"

[[network_access_control.groups.dev]]
domain = "dev.example.com"
policy = "bypass"

[[network_access_control.groups.ops]]
domain = "ops.example.com"
policy = "bypass"

[[network_access_control.users.john]]
domain = "home.example.com"
policy = "bypass"

[[network_access_control.users.harry]]
domain = "harry.example.com"
policy = "bypass"
"#;

fn policies() -> (Policy, Policy) {
    let config = load_config_from_str(CONFIG).unwrap();
    let primary = Policy::compile(config.access_control.as_ref().unwrap()).unwrap();
    let secondary = Policy::compile(config.network_access_control.as_ref().unwrap()).unwrap();
    (primary, secondary)
}

fn domains(rules: &[authgate::access_control::Rule]) -> Vec<String> {
    rules.iter().map(|rule| rule.domain().to_string()).collect()
}

#[test]
fn test_default_policy_comes_from_secondary() {
    let (primary, secondary) = policies();
    let merged = merge(&primary, &secondary);
    assert_eq!(merged.default_policy(), &PolicyLabel::Bypass);
}

#[test]
fn test_any_rules_are_concatenated() {
    let (primary, secondary) = policies();
    let merged = merge(&primary, &secondary);
    assert_eq!(
        domains(merged.any()),
        vec!["public.example.com", "lan.example.com"]
    );
}

#[test]
fn test_shared_keys_append_secondary_rules() {
    let (primary, secondary) = policies();
    let merged = merge(&primary, &secondary);

    assert_eq!(
        domains(merged.group("dev").unwrap()),
        vec!["dev.example.com", "dev.example.com"]
    );
    assert_eq!(
        domains(merged.user("john").unwrap()),
        vec!["home.example.com", "home.example.com"]
    );
}

#[test]
fn test_secondary_only_keys_are_dropped() {
    let (primary, secondary) = policies();
    let merged = merge(&primary, &secondary);

    assert!(merged.group("ops").is_none());
    assert!(merged.user("harry").is_none());
    assert_eq!(merged.groups().count(), 1);
    assert_eq!(merged.users().count(), 1);
}

#[test]
fn test_appended_rules_take_precedence() {
    let (primary, secondary) = policies();
    let merged = merge(&primary, &secondary);
    let resource = Resource::new("home.example.com", "/");
    let subject = Subject::new("john", Vec::<String>::new(), Level::NotAuthenticated);

    assert!(!is_access_allowed(Some(&primary), &resource, &subject));
    assert!(is_access_allowed(Some(&merged), &resource, &subject));
}

#[test]
fn test_merge_leaves_inputs_untouched() {
    let (primary, secondary) = policies();
    let primary_before = primary.to_config();
    let secondary_before = secondary.to_config();

    let _ = merge(&primary, &secondary);

    assert_eq!(primary.to_config(), primary_before);
    assert_eq!(secondary.to_config(), secondary_before);
}

#[test]
fn test_merge_with_empty_secondary() {
    let (primary, _) = policies();
    let merged = merge(&primary, &Policy::with_default(PolicyLabel::Deny));

    assert_eq!(merged.rule_count(), primary.rule_count());
    assert_eq!(merged.default_policy(), &PolicyLabel::Deny);
}
