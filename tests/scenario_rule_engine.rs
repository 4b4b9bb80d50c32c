//! End-to-end coverage of `spec.md` §8 Scenario 5: a declarative rule set
//! evaluated against a graph, producing a pass/fail verdict per rule and
//! per-row violations for the ones that fail.

use std::fs;

use codegraph::config::Config;
use codegraph::graph::GraphBuilder;
use codegraph::rules::{evaluate, parse_rule_set, RuleFilter, Severity};

fn write_module(dir: &std::path::Path, file: &str, uri: &str, layer: &str) {
    fs::write(
        dir.join(file),
        format!(
            "<!-- LinkedDoc RDF -->\n@prefix code: <http://codegraph.dev/vocab#> .\n<{uri}> a code:Module ;\n  code:layer \"{layer}\" ;\n  code:name \"{file}\" .\n<!-- End LinkedDoc RDF -->\n"
        ),
    )
    .unwrap();
}

const RULESET_JSON: &str = r#"{
  "version": "1.0",
  "name": "no-legacy-layers",
  "rules": [
    {
      "id": "no-legacy",
      "name": "Modules must not sit in the legacy layer",
      "severity": "error",
      "pattern": "PREFIX code: <http://codegraph.dev/vocab#> SELECT ?module WHERE { ?module a code:Module ; code:layer \"legacy\" }",
      "expect": 0,
      "tags": ["layering"]
    },
    {
      "id": "has-modules",
      "name": "Graph must contain at least one module",
      "severity": "warning",
      "pattern": "PREFIX code: <http://codegraph.dev/vocab#> SELECT ?module WHERE { ?module a code:Module }",
      "expect": 2,
      "tags": ["sanity"]
    }
  ]
}"#;

#[test]
fn rule_violating_module_is_reported_and_fails_the_set() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "good.x", "#Good", "service");
    write_module(dir.path(), "legacy.x", "#Legacy", "legacy");

    let report = GraphBuilder::new(Config::default()).build(dir.path()).unwrap();
    let ruleset = parse_rule_set(RULESET_JSON).unwrap();

    let result = evaluate(&ruleset, &report.graph, &RuleFilter::default()).unwrap();

    assert_eq!(result.passed, vec!["has-modules".to_string()]);
    assert_eq!(result.failed, vec!["no-legacy".to_string()]);
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].rule_id, "no-legacy");
    assert_eq!(result.violations[0].severity, Severity::Error);
    assert_eq!(result.violations[0].module.as_deref(), Some("#Legacy"));
    assert!(!result.success());
}

const EXPORTS_DOCUMENTED_RULESET: &str = r#"{
  "version": "1.0",
  "name": "exports-documented",
  "rules": [
    {
      "id": "exports-documented",
      "name": "Exported modules must carry a description",
      "severity": "warning",
      "pattern": "PREFIX code: <http://codegraph.dev/vocab#> SELECT ?module WHERE { ?module code:exports ?e . FILTER NOT EXISTS { ?module code:description ?d } }",
      "expect": 0
    }
  ]
}"#;

#[test]
fn undocumented_export_matches_scenario_five_exactly() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("lib.x"),
        "<!-- LinkedDoc RDF -->\n@prefix code: <http://codegraph.dev/vocab#> .\n<#Lib> a code:Module ;\n  code:exports \"run\" ;\n  code:name \"lib.x\" .\n<!-- End LinkedDoc RDF -->\n",
    )
    .unwrap();

    let report = GraphBuilder::new(Config::default()).build(dir.path()).unwrap();
    let ruleset = parse_rule_set(EXPORTS_DOCUMENTED_RULESET).unwrap();

    let result = evaluate(&ruleset, &report.graph, &RuleFilter::default()).unwrap();

    assert_eq!(result.failed, vec!["exports-documented".to_string()]);
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].severity, Severity::Warning);
    assert_eq!(result.violations[0].module.as_deref(), Some("#Lib"));
    assert_eq!(result.error_count, 0);
    assert_eq!(result.warning_count, 1);
    assert!(result.success());
}

#[test]
fn tag_filter_skips_non_matching_rules() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "good.x", "#Good", "service");

    let report = GraphBuilder::new(Config::default()).build(dir.path()).unwrap();
    let ruleset = parse_rule_set(RULESET_JSON).unwrap();

    let filter = RuleFilter { tags: vec!["sanity".to_string()], min_severity: None };
    let result = evaluate(&ruleset, &report.graph, &filter).unwrap();

    assert_eq!(result.skipped, vec!["no-legacy".to_string()]);
    assert!(result.passed.contains(&"has-modules".to_string()) || result.failed.contains(&"has-modules".to_string()));
}
