//! Validator (§1 "Supplemented Features", grounded in `spec.md` §4.E step 7
//! and the Testable Properties in §8).
//!
//! Checks structural invariants of a built [`Graph`] and reports warnings —
//! never errors; per §7 "Validation errors ... are returned with the
//! graph; the caller decides whether to proceed."

use std::collections::HashMap;

use super::Graph;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    DuplicateUri { uri: String, paths: Vec<String> },
    UnresolvedDependency { module_path: String, dependency: String },
    StatisticsMismatch { detail: String },
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub struct Validator;

impl Validator {
    pub fn validate(graph: &Graph) -> ValidationReport {
        let mut warnings = Vec::new();

        let mut by_uri: HashMap<&str, Vec<&str>> = HashMap::new();
        for module in graph.iter() {
            by_uri.entry(module.uri.as_str()).or_default().push(module.path.as_str());
        }
        for (uri, paths) in &by_uri {
            if paths.len() > 1 {
                let mut paths: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
                paths.sort();
                warnings.push(ValidationWarning::DuplicateUri { uri: uri.to_string(), paths });
            }
        }

        for module in graph.iter() {
            for dep in &module.dependencies {
                if graph.resolve(dep).is_none() {
                    warnings.push(ValidationWarning::UnresolvedDependency {
                        module_path: module.path.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        if graph.statistics.total_modules != graph.modules.len() {
            warnings.push(ValidationWarning::StatisticsMismatch {
                detail: format!(
                    "statistics.total_modules ({}) != modules.len() ({})",
                    graph.statistics.total_modules,
                    graph.modules.len()
                ),
            });
        }

        ValidationReport { warnings }
    }
}
