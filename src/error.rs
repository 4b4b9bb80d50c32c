//! Crate-wide error aggregation.
//!
//! Each component owns a focused error enum (see the `header`, `triple`,
//! `scan`, `graph`, `query`, and `rules` modules); `CoreError` exists only
//! for call sites — the CLI and the HTTP handlers — that need to return one
//! error type across component boundaries.

use thiserror::Error;

use crate::graph::BuildError;
use crate::header::HeaderError;
use crate::query::QueryError;
use crate::rules::{EvalError, RuleSetError};
use crate::triple::TripleParseError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("header extraction failed: {0}")]
    Header(#[from] HeaderError),

    #[error("triple parse failed: {0}")]
    TripleParse(#[from] TripleParseError),

    #[error("graph build failed: {0}")]
    Build(#[from] BuildError),

    #[error("query failed: {0}")]
    Query(#[from] QueryError),

    #[error("rule set error: {0}")]
    RuleSet(#[from] RuleSetError),

    #[error("rule evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
