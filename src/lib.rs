//! `codegraph` — a code-knowledge engine.
//!
//! Ingests source files carrying delimited RDF-style header blocks,
//! materializes them as a triple store plus a typed module graph, and
//! runs static analysis over the result: dependency-graph algorithms, a
//! SPARQL-subset query engine, impact/coverage/dead-code heuristics,
//! security-zone classification, and a declarative rule engine.
//!
//! The crate root only re-exports; see each module for its own
//! documentation.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod header;
pub mod impact;
pub mod query;
pub mod rules;
pub mod scan;
pub mod security;
pub mod store;
pub mod triple;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use graph::{Graph, GraphBuilder, GraphStatistics, Module};
pub use query::{query, QueryError, QueryResult, Value};
pub use store::TripleStore;
pub use triple::{ObjectTerm, Triple};
