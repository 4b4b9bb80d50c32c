//! Parsed representation of a query (§4.F).

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Var(String),
    Uri(String),
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    Eq(Term, Term),
    Ne(Term, Term),
    Contains(Term, Term),
    StrStarts(Term, Term),
    StrEnds(Term, Term),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    pub fn variables(&self) -> Vec<&str> {
        fn term_var(t: &Term) -> Option<&str> {
            match t {
                Term::Var(v) => Some(v.as_str()),
                _ => None,
            }
        }
        match self {
            FilterExpr::Eq(a, b)
            | FilterExpr::Ne(a, b)
            | FilterExpr::Contains(a, b)
            | FilterExpr::StrStarts(a, b)
            | FilterExpr::StrEnds(a, b) => term_var(a).into_iter().chain(term_var(b)).collect(),
            FilterExpr::And(a, b) | FilterExpr::Or(a, b) => {
                let mut v = a.variables();
                v.extend(b.variables());
                v
            }
            FilterExpr::Not(a) => a.variables(),
        }
    }
}

/// A `WHERE { ... }` body's contents, kept in declaration order for
/// `FILTER NOT EXISTS` but evaluated in two logical phases: the basic
/// graph pattern first, then filters over the resulting bindings (§4.F
/// "Evaluation").
#[derive(Debug, Clone, Default)]
pub struct GraphPattern {
    pub triples: Vec<TriplePattern>,
    pub filters: Vec<FilterExpr>,
    pub filter_not_exists: Vec<GraphPattern>,
}

#[derive(Debug, Clone)]
pub struct Query {
    pub prefixes: HashMap<String, String>,
    pub projection: Vec<String>,
    pub pattern: GraphPattern,
    pub limit: Option<usize>,
}
