//! Cross-module coverage of `spec.md` §8's quantified invariants and
//! boundary behaviors that no single module's unit tests exercise alone
//! (they depend on the builder wiring header extraction, triple parsing,
//! and graph assembly together).

use std::collections::HashMap;
use std::fs;

use codegraph::analysis::{topological_sort, transitive_dependencies};
use codegraph::config::Config;
use codegraph::graph::GraphBuilder;
use codegraph::security::classify_all;
use codegraph::store::{Pattern, TripleStore};
use codegraph::triple::{ObjectTerm, Triple, RDF_TYPE};

fn write_module(dir: &std::path::Path, file: &str, uri: &str, language: &str, deps: &[&str]) {
    let dep_lines: String = deps.iter().map(|d| format!(" code:linksTo <{d}> ;")).collect();
    fs::write(
        dir.join(file),
        format!(
            "<!-- LinkedDoc RDF -->\n@prefix code: <http://codegraph.dev/vocab#> .\n<{uri}> a code:Module ;{dep_lines} code:language \"{language}\" ; code:name \"{file}\" .\n<!-- End LinkedDoc RDF -->\n"
        ),
    )
    .unwrap();
}

/// Invariant 1: `total_modules` and `by_language` are exact counts.
#[test]
fn statistics_counts_match_the_module_set() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "a.x", "#A", "rust", &[]);
    write_module(dir.path(), "b.x", "#B", "rust", &[]);
    write_module(dir.path(), "c.x", "#C", "python", &[]);

    let report = GraphBuilder::new(Config::default()).build(dir.path()).unwrap();
    let graph = report.graph;

    assert_eq!(graph.statistics.total_modules, graph.modules.len());
    for language in ["rust", "python"] {
        let expected = graph.iter().filter(|m| m.language.as_deref() == Some(language)).count();
        assert_eq!(graph.statistics.by_language.get(language).copied().unwrap_or(0), expected);
    }
}

/// Invariant 2: a declared dependency is mirrored as a reverse dependent
/// edge once the target module is resolved.
#[test]
fn dependencies_are_mirrored_as_dependents() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "a.x", "#A", "rust", &["#B"]);
    write_module(dir.path(), "b.x", "#B", "rust", &[]);

    let report = GraphBuilder::new(Config::default()).build(dir.path()).unwrap();
    let graph = report.graph;

    let a = graph.get("a.x").unwrap();
    let b = graph.get("b.x").unwrap();
    assert!(a.dependencies.iter().any(|d| d == "#B"));
    assert!(b.dependents.contains(&a.uri));
}

/// Invariant 4: topological order respects every edge's direction.
#[test]
fn topological_order_respects_every_edge() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "a.x", "#A", "rust", &["#B", "#C"]);
    write_module(dir.path(), "b.x", "#B", "rust", &["#C"]);
    write_module(dir.path(), "c.x", "#C", "rust", &[]);

    let report = GraphBuilder::new(Config::default()).build(dir.path()).unwrap();
    let graph = report.graph;
    let order = topological_sort(&graph).unwrap();
    let position: HashMap<&str, usize> = order.iter().enumerate().map(|(i, p)| (p.as_str(), i)).collect();

    for module in graph.iter() {
        for dep in &module.dependencies {
            let Some(target) = graph.resolve(dep) else { continue };
            assert!(position[module.path.as_str()] > position[target.path.as_str()]);
        }
    }
}

/// Invariant 7: zone classification is total, every module gets a zone
/// with confidence >= 0.3, even with no classifying signal at all.
#[test]
fn zone_classification_is_total_with_minimum_confidence() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "mystery.x", "#M", "rust", &[]);

    let report = GraphBuilder::new(Config::default()).build(dir.path()).unwrap();
    let classifications = classify_all(&report.graph);

    assert_eq!(classifications.len(), report.graph.modules.len());
    for classification in classifications.values() {
        assert!(classification.confidence >= 0.3);
    }
}

/// Boundary: an empty root directory yields a graph with no modules, no
/// triples, and no errors.
#[test]
fn empty_root_directory_yields_an_empty_graph() {
    let dir = tempfile::tempdir().unwrap();
    let report = GraphBuilder::new(Config::default()).build(dir.path()).unwrap();

    assert_eq!(report.graph.statistics.total_modules, 0);
    assert_eq!(report.graph.store.count(), 0);
    assert!(report.scan_errors.is_empty());
    assert!(report.warnings.is_empty());
}

/// Boundary: a header with non-type triples but zero `a Module` triples
/// contributes triples to the store without becoming a Module.
#[test]
fn header_without_a_module_triple_populates_the_store_only() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("notes.x"),
        "<!-- LinkedDoc RDF -->\n@prefix code: <http://codegraph.dev/vocab#> .\n<#Notes> code:tags \"draft\" .\n<!-- End LinkedDoc RDF -->\n",
    )
    .unwrap();

    let report = GraphBuilder::new(Config::default()).build(dir.path()).unwrap();
    assert_eq!(report.graph.statistics.total_modules, 0);
    assert!(report.graph.store.count() > 0);
}

/// Boundary: `transitive_dependencies` on a nonexistent module is `None`.
#[test]
fn transitive_dependencies_on_missing_module_is_none() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "a.x", "#A", "rust", &[]);
    let report = GraphBuilder::new(Config::default()).build(dir.path()).unwrap();
    assert!(transitive_dependencies(&report.graph, "does/not/exist.x").is_none());
}

/// Running the builder twice over the same tree produces equal module
/// counts, triple counts, and dependency/dependent shapes (idempotence).
#[test]
fn building_the_same_tree_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "a.x", "#A", "rust", &["#B"]);
    write_module(dir.path(), "b.x", "#B", "rust", &[]);

    let first = GraphBuilder::new(Config::default()).build(dir.path()).unwrap().graph;
    let second = GraphBuilder::new(Config::default()).build(dir.path()).unwrap().graph;

    assert_eq!(first.statistics.total_modules, second.statistics.total_modules);
    assert_eq!(first.store.count(), second.store.count());
    for path in first.modules.keys() {
        let a = first.get(path).unwrap();
        let b = second.get(path).unwrap();
        assert_eq!(a.dependencies, b.dependencies);
        assert_eq!(a.dependents, b.dependents);
    }
}

mod store_properties {
    use super::*;
    use proptest::prelude::*;

    fn arb_ident() -> impl Strategy<Value = String> {
        "[a-z]{1,8}".prop_map(|s| s)
    }

    proptest! {
        /// Invariant 3: inserting the same triple twice is a no-op the
        /// second time, and the store retains exactly one copy.
        #[test]
        fn duplicate_insert_is_rejected_and_store_is_idempotent(
            s in arb_ident(), p in arb_ident(), o in arb_ident(),
        ) {
            let store = TripleStore::new();
            let triple = Triple::new(format!("#{s}"), format!("http://codegraph.dev/vocab#{p}"), ObjectTerm::Literal(o.clone()));

            prop_assert!(store.add(triple.clone()));
            prop_assert!(!store.add(triple.clone()));
            prop_assert_eq!(store.count(), 1);

            let matches = store.match_triples(
                &Pattern::Bound(triple.subject.clone()),
                &Pattern::Bound(triple.predicate.clone()),
                &Pattern::Bound(triple.object.clone()),
            );
            prop_assert_eq!(matches, vec![triple]);
        }

        /// Invariant 8: a `SELECT ?x WHERE { ?x a <T> }` query's binding
        /// count equals the number of subjects with that declared type.
        #[test]
        fn select_all_of_type_matches_raw_subject_count(count in 0usize..12) {
            let store = TripleStore::new();
            for i in 0..count {
                store.add(Triple::new(
                    format!("#M{i}"),
                    RDF_TYPE,
                    ObjectTerm::Uri("http://codegraph.dev/vocab#Module".into()),
                ));
            }
            // An unrelated triple of a different type must not be counted.
            store.add(Triple::new("#Other", RDF_TYPE, ObjectTerm::Uri("http://codegraph.dev/vocab#Thing".into())));

            let result = codegraph::query::query(
                &store,
                "PREFIX code: <http://codegraph.dev/vocab#> SELECT ?x WHERE { ?x a code:Module }",
            )
            .unwrap();

            prop_assert_eq!(result.len(), count);
        }
    }
}
