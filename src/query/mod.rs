//! Query Engine (§4.F).
//!
//! A SPARQL-subset: `PREFIX`/`SELECT`/`WHERE`/`FILTER`/`FILTER NOT EXISTS`/
//! `LIMIT` over the [`TripleStore`](crate::store::TripleStore). Evaluation
//! is a left-to-right join of triple patterns against bindings, followed by
//! filter application and `FILTER NOT EXISTS` pruning, then projection and
//! an optional `LIMIT`. Results are always returned lexicographically
//! ordered by projected tuple (§4.F "Determinism") so that two runs over an
//! unchanged store produce identical output.

pub mod ast;
pub mod parser;

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

pub use ast::{FilterExpr, GraphPattern, Query, Term, TriplePattern};
use parser::parse_query;

use crate::store::{Pattern, TripleStore};
use crate::triple::ObjectTerm;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("query parse error: {0}")]
    ParseError(String),
    #[error("unknown prefix '{0}'")]
    UnknownPrefix(String),
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),
}

/// A bound value, tagged with the term kind it came from so callers can
/// distinguish a bound URI from a bound string literal (§6 result contract).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    Uri(String),
    Literal(String),
}

impl Value {
    /// The underlying text, irrespective of kind — used when a value needs
    /// to flow back into pattern matching (e.g. a variable bound via an
    /// object position, then reused in subject position).
    pub fn as_str(&self) -> &str {
        match self {
            Value::Uri(s) | Value::Literal(s) => s,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ObjectTerm> for Value {
    fn from(term: ObjectTerm) -> Self {
        match term {
            ObjectTerm::Uri(u) => Value::Uri(u),
            ObjectTerm::Literal(l) => Value::Literal(l),
            ObjectTerm::BlankNode(b) => Value::Uri(b),
        }
    }
}

/// One solution: a map from projected variable name to its bound [`Value`].
pub type Binding = HashMap<String, Value>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse and run `text` against `store`, honoring the query's own `LIMIT`.
pub fn query(store: &TripleStore, text: &str) -> Result<QueryResult, QueryError> {
    let parsed = parse_query(text)?;
    execute(store, &parsed)
}

/// Run an already-parsed [`Query`] against `store`.
pub fn execute(store: &TripleStore, query: &Query) -> Result<QueryResult, QueryError> {
    let mut bindings = vec![Binding::new()];

    for pattern in &query.pattern.triples {
        bindings = join_pattern(store, pattern, &bindings);
        if bindings.is_empty() {
            break;
        }
    }

    for filter in &query.pattern.filters {
        bindings.retain(|b| eval_filter(filter, b));
    }

    for sub in &query.pattern.filter_not_exists {
        bindings.retain(|b| !sub_pattern_has_match(store, sub, b));
    }

    let mut rows: Vec<Vec<Value>> = bindings
        .iter()
        .map(|b| {
            query
                .projection
                .iter()
                .map(|v| b.get(v).cloned().unwrap_or_else(|| Value::Literal(String::new())))
                .collect()
        })
        .collect();

    rows.sort();
    rows.dedup();

    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }

    Ok(QueryResult { columns: query.projection.clone(), rows })
}

fn term_to_subject_pattern(term: &Term, binding: &Binding) -> Option<Pattern<String>> {
    match term {
        Term::Uri(u) => Some(Pattern::Bound(u.clone())),
        Term::Var(v) => binding.get(v).map(|val| Pattern::Bound(val.as_str().to_string())),
        Term::Literal(_) => None,
    }
}

fn term_to_object_pattern(term: &Term, binding: &Binding) -> Pattern<ObjectTerm> {
    match term {
        Term::Uri(u) => Pattern::Bound(ObjectTerm::Uri(u.clone())),
        Term::Literal(l) => Pattern::Bound(ObjectTerm::Literal(l.clone())),
        Term::Var(v) => match binding.get(v) {
            Some(Value::Uri(u)) => Pattern::Bound(ObjectTerm::Uri(u.clone())),
            Some(Value::Literal(l)) => Pattern::Bound(ObjectTerm::Literal(l.clone())),
            None => Pattern::Any,
        },
    }
}

fn join_pattern(store: &TripleStore, pattern: &TriplePattern, bindings: &[Binding]) -> Vec<Binding> {
    let mut out = Vec::new();

    for binding in bindings {
        let subject_pattern = match term_to_subject_pattern(&pattern.subject, binding) {
            Some(p) => p,
            None => continue,
        };
        let predicate_pattern = match term_to_subject_pattern(&pattern.predicate, binding) {
            Some(p) => p,
            None => continue,
        };

        // A variable object must match either a URI or literal value once
        // bound; since the store indexes `ObjectTerm` by exact variant, try
        // both when the object side is an unbound variable whose value
        // already appears in `binding` as a bare string (rare: the parser
        // never re-binds an object-position variable to a prior object, but
        // defending here keeps this function correct in isolation).
        let object_pattern = term_to_object_pattern(&pattern.object, binding);

        let matches = store.match_triples(&subject_pattern, &predicate_pattern, &object_pattern);

        for triple in matches {
            let mut candidate = binding.clone();
            let mut ok = true;

            if let Term::Var(v) = &pattern.subject {
                ok &= bind_or_check(&mut candidate, v, Value::Uri(triple.subject.clone()));
            }
            if let Term::Var(v) = &pattern.predicate {
                ok &= bind_or_check(&mut candidate, v, Value::Uri(triple.predicate.clone()));
            }
            if let Term::Var(v) = &pattern.object {
                ok &= bind_or_check(&mut candidate, v, triple.object.clone().into());
            }

            if ok {
                out.push(candidate);
            }
        }
    }

    out
}

fn bind_or_check(binding: &mut Binding, var: &str, value: Value) -> bool {
    match binding.get(var) {
        Some(existing) => existing == &value,
        None => {
            binding.insert(var.to_string(), value);
            true
        }
    }
}

fn resolve_value(term: &Term, binding: &Binding) -> Option<Value> {
    match term {
        Term::Uri(u) => Some(Value::Uri(u.clone())),
        Term::Literal(l) => Some(Value::Literal(l.clone())),
        Term::Var(v) => binding.get(v).cloned(),
    }
}

fn eval_filter(expr: &FilterExpr, binding: &Binding) -> bool {
    match expr {
        FilterExpr::Eq(a, b) => resolve_value(a, binding) == resolve_value(b, binding),
        FilterExpr::Ne(a, b) => resolve_value(a, binding) != resolve_value(b, binding),
        FilterExpr::Contains(a, b) => match (resolve_value(a, binding), resolve_value(b, binding)) {
            (Some(a), Some(b)) => a.as_str().contains(b.as_str()),
            _ => false,
        },
        FilterExpr::StrStarts(a, b) => match (resolve_value(a, binding), resolve_value(b, binding)) {
            (Some(a), Some(b)) => a.as_str().starts_with(b.as_str()),
            _ => false,
        },
        FilterExpr::StrEnds(a, b) => match (resolve_value(a, binding), resolve_value(b, binding)) {
            (Some(a), Some(b)) => a.as_str().ends_with(b.as_str()),
            _ => false,
        },
        FilterExpr::And(a, b) => eval_filter(a, binding) && eval_filter(b, binding),
        FilterExpr::Or(a, b) => eval_filter(a, binding) || eval_filter(b, binding),
        FilterExpr::Not(a) => !eval_filter(a, binding),
    }
}

fn sub_pattern_has_match(store: &TripleStore, pattern: &GraphPattern, outer: &Binding) -> bool {
    let mut bindings = vec![outer.clone()];
    for tp in &pattern.triples {
        bindings = join_pattern(store, tp, &bindings);
        if bindings.is_empty() {
            return false;
        }
    }
    for filter in &pattern.filters {
        bindings.retain(|b| eval_filter(filter, b));
    }
    !bindings.is_empty()
}
