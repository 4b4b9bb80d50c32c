//! End-to-end coverage of `spec.md` §8 Scenario 4: a SPARQL-subset query
//! selecting modules by declared layer, run against a graph built from
//! real header fixtures rather than a hand-populated triple store.

use std::fs;

use codegraph::config::Config;
use codegraph::graph::GraphBuilder;
use codegraph::query::{query, Value};

fn write_module(dir: &std::path::Path, file: &str, uri: &str, layer: &str) {
    fs::write(
        dir.join(file),
        format!(
            "<!-- LinkedDoc RDF -->\n@prefix code: <http://codegraph.dev/vocab#> .\n<{uri}> a code:Module ;\n  code:layer \"{layer}\" ;\n  code:name \"{file}\" .\n<!-- End LinkedDoc RDF -->\n"
        ),
    )
    .unwrap();
}

#[test]
fn select_by_layer_returns_sorted_deterministic_rows() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "service_one.x", "#S1", "service");
    write_module(dir.path(), "service_two.x", "#S2", "service");
    write_module(dir.path(), "repo.x", "#R", "data");

    let report = GraphBuilder::new(Config::default()).build(dir.path()).unwrap();

    let result = query(
        &report.graph.store,
        "PREFIX code: <http://codegraph.dev/vocab#> SELECT ?m WHERE { ?m a code:Module ; code:layer \"service\" }",
    )
    .unwrap();

    assert_eq!(result.columns, vec!["m".to_string()]);
    assert_eq!(result.rows, vec![vec![Value::Uri("#S1".to_string())], vec![Value::Uri("#S2".to_string())]]);

    let all = query(&report.graph.store, "PREFIX code: <http://codegraph.dev/vocab#> SELECT ?m WHERE { ?m a code:Module }")
        .unwrap();
    assert_eq!(all.len(), 3);

    let limited = query(
        &report.graph.store,
        "PREFIX code: <http://codegraph.dev/vocab#> SELECT ?m WHERE { ?m a code:Module } LIMIT 1",
    )
    .unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn malformed_query_text_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "a.x", "#A", "service");
    let report = GraphBuilder::new(Config::default()).build(dir.path()).unwrap();

    let err = query(&report.graph.store, "NOT A QUERY").unwrap_err();
    assert!(matches!(err, codegraph::query::QueryError::ParseError(_)));
}
