//! End-to-end coverage of `spec.md` §8 Scenario 6: dead-code detection
//! distinguishes an unreferenced leaf from an entry point, a test file,
//! and modules that are merely internal (referenced only by the entry).

use std::fs;

use codegraph::config::Config;
use codegraph::graph::GraphBuilder;
use codegraph::impact::{dead_code_candidates, DeadCodeOptions};

fn write(dir: &std::path::Path, file: &str, uri: &str, links: &[&str], exports: &[&str]) {
    let mut body = String::new();
    for l in links {
        body.push_str(&format!(" code:linksTo <{l}> ;"));
    }
    for e in exports {
        body.push_str(&format!(" code:exports \"{e}\" ;"));
    }
    fs::write(
        dir.join(file),
        format!(
            "<!-- LinkedDoc RDF -->\n@prefix code: <http://codegraph.dev/vocab#> .\n<{uri}> a code:Module ;{body} code:name \"{file}\" .\n<!-- End LinkedDoc RDF -->\n"
        ),
    )
    .unwrap();
}

#[test]
fn only_the_unreferenced_non_entry_non_test_module_is_flagged() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.x", "#Main", &["#A", "#B"], &["main"]);
    write(dir.path(), "a.x", "#A", &[], &[]);
    write(dir.path(), "b.x", "#B", &[], &[]);
    write(dir.path(), "leaf_test.x", "#Test", &[], &[]);
    write(dir.path(), "leaf.x", "#Leaf", &[], &[]);

    let report = GraphBuilder::new(Config::default()).build(dir.path()).unwrap();
    let candidates = dead_code_candidates(&report.graph, &DeadCodeOptions::default());

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].path, "leaf.x");
    assert!(candidates[0].confidence >= 0.8);
    assert!(candidates[0].safe_to_remove);
}

#[test]
fn excluded_glob_suppresses_an_otherwise_dead_module() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.x", "#Main", &[], &["main"]);
    write(dir.path(), "generated.x", "#Gen", &[], &[]);

    let report = GraphBuilder::new(Config::default()).build(dir.path()).unwrap();
    let options = DeadCodeOptions { exclude_globs: vec!["generated*".to_string()], ..DeadCodeOptions::default() };
    let candidates = dead_code_candidates(&report.graph, &options);

    assert!(candidates.iter().all(|c| c.path != "generated.x"));
}
