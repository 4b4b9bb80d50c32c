//! Triple-store insertion and graph-build benchmarks.
//!
//! Run with: cargo bench --bench insert_benchmarks

use std::fs;

use codegraph::config::Config;
use codegraph::graph::GraphBuilder;
use codegraph::store::TripleStore;
use codegraph::triple::{ObjectTerm, Triple, RDF_TYPE};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_triple_store_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("triple_store_insert");

    for size in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let store = TripleStore::new();
                for i in 0..size {
                    store.add(Triple::new(
                        format!("#m{i}"),
                        RDF_TYPE,
                        ObjectTerm::Uri("http://codegraph.dev/vocab#Module".into()),
                    ));
                }
                store
            });
        });
    }

    group.finish();
}

fn bench_duplicate_insert_rejection(c: &mut Criterion) {
    let store = TripleStore::new();
    let triple = Triple::new("#m", RDF_TYPE, ObjectTerm::Uri("http://codegraph.dev/vocab#Module".into()));
    store.add(triple.clone());

    c.bench_function("triple_store_duplicate_insert", |b| {
        b.iter(|| store.add(triple.clone()));
    });
}

fn write_fixture_tree(dir: &std::path::Path, count: usize) {
    for i in 0..count {
        let dep = if i == 0 { String::new() } else { format!(" code:linksTo <#m{}> ;", i - 1) };
        fs::write(
            dir.join(format!("m{i}.x")),
            format!(
                "<!-- LinkedDoc RDF -->\n@prefix code: <http://codegraph.dev/vocab#> .\n<#m{i}> a code:Module ;{dep} code:name \"m{i}.x\" .\n<!-- End LinkedDoc RDF -->\n"
            ),
        )
        .unwrap();
    }
}

fn bench_graph_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");
    group.sample_size(10);

    for size in [10usize, 100, 500] {
        let dir = tempfile::tempdir().unwrap();
        write_fixture_tree(dir.path(), size);

        group.bench_with_input(BenchmarkId::from_parameter(size), &dir, |b, dir| {
            b.iter(|| GraphBuilder::new(Config::default()).build(dir.path()).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_triple_store_insert, bench_duplicate_insert_rejection, bench_graph_build);
criterion_main!(benches);
