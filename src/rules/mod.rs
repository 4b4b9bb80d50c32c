//! Rule Engine (§4.J).
//!
//! Parses a declarative rule set (version + named rules, each a SPARQL-
//! subset pattern plus an expected result count) and evaluates it against
//! a [`Graph`]'s triple store via the [Query Engine](crate::query).

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::Graph;
use crate::query::{self, QueryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    pub pattern: String,
    pub expect: i64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub suggestion: String,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    pub version: String,
    #[serde(default)]
    pub name: String,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleSetError {
    #[error("rule set version must not be empty")]
    EmptyVersion,
    #[error("rule set must contain at least one rule")]
    EmptyRules,
    #[error("duplicate rule id: {0}")]
    DuplicateRuleId(String),
    #[error("rule '{rule_id}' is missing required field '{field}'")]
    MissingField { rule_id: String, field: String },
}

pub fn parse_rule_set(text: &str) -> Result<RuleSet, String> {
    let ruleset: RuleSet = serde_json::from_str(text).map_err(|e| e.to_string())?;
    validate_rule_set(&ruleset).map_err(|e| e.to_string())?;
    Ok(ruleset)
}

pub fn validate_rule_set(ruleset: &RuleSet) -> Result<(), RuleSetError> {
    if ruleset.version.trim().is_empty() {
        return Err(RuleSetError::EmptyVersion);
    }
    if ruleset.rules.is_empty() {
        return Err(RuleSetError::EmptyRules);
    }

    let mut seen_ids = std::collections::HashSet::new();
    for rule in &ruleset.rules {
        if rule.id.trim().is_empty() {
            return Err(RuleSetError::MissingField { rule_id: rule.name.clone(), field: "id".to_string() });
        }
        if rule.name.trim().is_empty() {
            return Err(RuleSetError::MissingField { rule_id: rule.id.clone(), field: "name".to_string() });
        }
        if rule.pattern.trim().is_empty() {
            return Err(RuleSetError::MissingField { rule_id: rule.id.clone(), field: "pattern".to_string() });
        }
        if !seen_ids.insert(rule.id.clone()) {
            return Err(RuleSetError::DuplicateRuleId(rule.id.clone()));
        }
    }

    Ok(())
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("rule '{rule_id}' failed to evaluate: {source}")]
    QueryFailed { rule_id: String, source: QueryError },
}

#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub rule_id: String,
    pub rule_name: String,
    pub severity: Severity,
    pub module: Option<String>,
    pub message: String,
    pub suggestion: String,
    pub details: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct RuleFilter {
    pub tags: Vec<String>,
    pub min_severity: Option<Severity>,
}

impl RuleFilter {
    fn accepts(&self, rule: &Rule) -> bool {
        if !self.tags.is_empty() && !self.tags.iter().any(|t| rule.tags.contains(t)) {
            return false;
        }
        if let Some(min) = self.min_severity {
            if rule.severity < min {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub violations: Vec<Violation>,
    pub passed: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    #[serde(skip)]
    pub duration: std::time::Duration,
}

impl ValidationResult {
    pub fn success(&self) -> bool {
        self.error_count == 0
    }
}

fn module_shaped_binding<'a>(columns: &'a [String]) -> Option<&'a str> {
    columns
        .iter()
        .find(|c| c.to_ascii_lowercase().contains("module") || c.to_ascii_lowercase().contains("source"))
        .map(String::as_str)
}

/// Evaluate every enabled, filter-accepted rule in `ruleset` against
/// `graph`'s triple store (§4.J "Evaluation").
pub fn evaluate(ruleset: &RuleSet, graph: &Graph, filter: &RuleFilter) -> Result<ValidationResult, EvalError> {
    let started = Instant::now();
    let mut result = ValidationResult::default();

    for rule in &ruleset.rules {
        if !rule.enabled || !filter.accepts(rule) {
            result.skipped.push(rule.id.clone());
            continue;
        }

        let query_result = query::query(&graph.store, &rule.pattern)
            .map_err(|source| EvalError::QueryFailed { rule_id: rule.id.clone(), source })?;

        if query_result.len() as i64 == rule.expect {
            result.passed.push(rule.id.clone());
            continue;
        }

        result.failed.push(rule.id.clone());

        if query_result.rows.is_empty() {
            result.violations.push(generic_violation(rule));
        } else {
            for row in &query_result.rows {
                let details: HashMap<String, String> = query_result
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(|v| v.as_str().to_string()))
                    .collect();
                let module = module_shaped_binding(&query_result.columns)
                    .and_then(|col| details.get(col))
                    .cloned();

                result.violations.push(Violation {
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                    severity: rule.severity,
                    module,
                    message: format!("rule '{}' violated: {:?}", rule.name, details),
                    suggestion: rule.suggestion.clone(),
                    details,
                });
            }
        }

        match rule.severity {
            Severity::Error => result.error_count += 1,
            Severity::Warning => result.warning_count += 1,
            Severity::Info => result.info_count += 1,
        }
    }

    result.duration = started.elapsed();
    Ok(result)
}

fn generic_violation(rule: &Rule) -> Violation {
    Violation {
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        severity: rule.severity,
        module: None,
        message: format!("rule '{}' expected {} results but binding shape mismatched", rule.name, rule.expect),
        suggestion: rule.suggestion.clone(),
        details: HashMap::new(),
    }
}
