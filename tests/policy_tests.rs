//! Integration tests for security rules and waiver resolution.

use peerdiff::{
    policy::{load_rule_file, parse_rule_str},
    FindingParams, InspectError, PackageMetadata, ResultAggregator, RuleClause,
    SecurityPolicyResolver, Severity, Verb, WaiverAuthority,
};
use std::path::Path;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn resolver(doc: &str) -> SecurityPolicyResolver {
    SecurityPolicyResolver::new(parse_rule_str(doc).expect("rules"))
}

#[test]
fn test_exact_clause_beats_wildcard() {
    let resolver = resolver(
        r#"
foo:
  - version: "2.0"
    release: "1.el9"
    actions:
      setuid: info
  - version: "*"
    release: "*"
    actions:
      setuid: bad
"#,
    );

    let policy = resolver.resolve("foo", "2.0", "1.el9").expect("match");
    assert_eq!(policy.action("setuid"), Some(Severity::Info));

    let fallback = resolver.resolve("foo", "3.0", "1.el9").expect("match");
    assert_eq!(fallback.action("setuid"), Some(Severity::Bad));
}

#[test]
fn test_regex_ranks_between_exact_and_any() {
    let resolver = resolver(
        r#"
foo:
  - version: "*"
    waivers:
      verify: security
  - version: "2\\..*"
    waivers:
      verify: not-waivable
"#,
    );

    let policy = resolver.resolve("foo", "2.4", "1").expect("match");
    assert_eq!(
        policy.waiver_for(Severity::Verify),
        Some(WaiverAuthority::NotWaivable)
    );
    let other = resolver.resolve("foo", "1.4", "1").expect("match");
    assert_eq!(
        other.waiver_for(Severity::Verify),
        Some(WaiverAuthority::Security)
    );
}

#[test]
fn test_unknown_package_resolves_to_none() {
    let resolver = resolver("foo:\n  - version: \"*\"\n");
    assert!(resolver.resolve("bar", "1.0", "1").is_none());
}

#[test]
fn test_invalid_pattern_fails_whole_load() {
    let err = parse_rule_str(
        r#"
foo:
  - version: "1.0"
bar:
  - version: "(unclosed"
"#,
    )
    .expect_err("bad pattern");
    assert!(matches!(err, InspectError::RulePattern { .. }));
}

#[test]
fn test_waiver_precedence_through_aggregator() {
    let mut resolver = SecurityPolicyResolver::default();
    resolver.register(
        "foo",
        RuleClause::new("*", "*")
            .expect("clause")
            .with_waiver(Severity::Bad, WaiverAuthority::Security),
    );
    let meta = PackageMetadata::new("foo", "1.0", "1");
    let results = ResultAggregator::new();

    // Rule clause overrides the global default
    results.submit_with_rules(
        FindingParams::new("test", Severity::Bad, Verb::Changed, "from rule").with_package(&meta),
        &resolver,
    );
    // An explicit authority overrides the rule clause
    results.submit_with_rules(
        FindingParams::new("test", Severity::Bad, Verb::Changed, "explicit")
            .with_package(&meta)
            .with_waiver(WaiverAuthority::Anyone),
        &resolver,
    );
    // No package: global default
    results.submit_with_rules(
        FindingParams::new("test", Severity::Bad, Verb::Changed, "global"),
        &resolver,
    );

    let authorities: Vec<WaiverAuthority> = results
        .findings()
        .iter()
        .map(|f| f.waiver_authority)
        .collect();
    assert_eq!(
        authorities,
        vec![
            WaiverAuthority::Security,
            WaiverAuthority::Anyone,
            WaiverAuthority::Anyone
        ]
    );
}

#[test]
fn test_load_fixture_rules() {
    let rules = load_rule_file(&Path::new(FIXTURES_DIR).join("rules.yaml")).expect("load");
    assert_eq!(rules.packages(), vec!["foo", "foo-tools"]);
    assert_eq!(rules.clauses("foo").len(), 2);
}

#[test]
fn test_load_rules_from_tempfile() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("rules.yaml");
    std::fs::write(&path, "sudo:\n  - actions:\n      setuid: skip\n").expect("write");

    let resolver = SecurityPolicyResolver::new(load_rule_file(&path).expect("load"));
    let policy = resolver.resolve("sudo", "1.9.5", "3").expect("match");
    assert_eq!(policy.action("setuid"), Some(Severity::Skip));

    assert!(matches!(
        load_rule_file(&dir.path().join("missing.yaml")),
        Err(InspectError::Io { .. })
    ));
}
