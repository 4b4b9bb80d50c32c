//! Impact, Coverage, and Dead-Code Analysis (§4.H).
//!
//! Three related passes over a built [`Graph`]: blast-radius impact
//! analysis for a changed module (or set of modules), per-module usage
//! coverage, and dead-code candidate detection. None of these mutate the
//! graph; each returns a fully-formed value (§4.G "no streaming").

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::analysis::transitive_dependents;
use crate::graph::Graph;

const RISK_THRESHOLD_MEDIUM: f64 = 3.0;
const RISK_THRESHOLD_HIGH: f64 = 5.0;
const RISK_THRESHOLD_CRITICAL: f64 = 8.0;
const MAX_CRITICAL_PATHS: usize = 5;

const EXPERIMENTAL_KEYWORDS: &[&str] = &["experimental", "wip", "work-in-progress", "prototype", "unstable"];
const REFLECTION_KEYWORDS: &[&str] = &["reflection", "dynamic", "plugin", "di", "injected"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    fn from_score(score: f64) -> Self {
        if score >= RISK_THRESHOLD_CRITICAL {
            RiskLevel::Critical
        } else if score >= RISK_THRESHOLD_HIGH {
            RiskLevel::High
        } else if score >= RISK_THRESHOLD_MEDIUM {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImpactReport {
    pub sources: Vec<String>,
    pub direct_dependents: Vec<String>,
    pub transitive_dependents: HashMap<String, usize>,
    pub dependents_by_layer: HashMap<String, Vec<String>>,
    pub impact_percentage: f64,
    pub max_depth: usize,
    pub critical_paths: Vec<Vec<String>>,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub breaking_change: bool,
}

/// Blast-radius impact of changing `sources` (possibly more than one
/// module at once; impacts union and depths minimize across sources,
/// §4.H "Multi-module input").
pub fn impact_of(graph: &Graph, sources: &[&str]) -> ImpactReport {
    let mut direct: HashSet<String> = HashSet::new();
    let mut transitive: HashMap<String, usize> = HashMap::new();
    let mut resolved_sources = Vec::new();

    for &source in sources {
        let Some(module) = graph.resolve(source) else { continue };
        resolved_sources.push(module.path.clone());
        for dep_uri in &module.dependents {
            if let Some(m) = graph.resolve(dep_uri) {
                direct.insert(m.path.clone());
            }
        }
        if let Some(reach) = transitive_dependents(graph, &module.path) {
            for (path, depth) in reach {
                transitive
                    .entry(path)
                    .and_modify(|d| *d = (*d).min(depth))
                    .or_insert(depth);
            }
        }
    }

    let mut dependents_by_layer: HashMap<String, Vec<String>> = HashMap::new();
    for path in transitive.keys() {
        if let Some(m) = graph.get(path) {
            if let Some(layer) = &m.layer {
                dependents_by_layer.entry(layer.clone()).or_default().push(path.clone());
            }
        }
    }
    for paths in dependents_by_layer.values_mut() {
        paths.sort();
    }

    let total_modules = graph.modules.len().max(1);
    let impact_percentage = (transitive.len() as f64 / total_modules as f64) * 100.0;
    let max_depth = transitive.values().copied().max().unwrap_or(0);
    let distinct_layers = dependents_by_layer.len();

    let mut direct_sorted: Vec<String> = direct.into_iter().collect();
    direct_sorted.sort();

    let mut highly_connected: Vec<&String> = transitive.keys().collect();
    highly_connected.sort_by_key(|path| {
        std::cmp::Reverse(graph.get(path.as_str()).map(|m| m.dependents.len()).unwrap_or(0))
    });
    let critical_paths: Vec<Vec<String>> = highly_connected
        .into_iter()
        .take(MAX_CRITICAL_PATHS)
        .filter_map(|target| {
            resolved_sources
                .first()
                .and_then(|src| crate::analysis::shortest_path(graph, src, target))
        })
        .collect();

    let risk_score = (direct_sorted.len() as f64) * 0.5
        + (transitive.len() as f64) * 0.3
        + (impact_percentage / 10.0)
        + (distinct_layers as f64) * 0.5
        + (max_depth as f64) * 0.2;
    let risk_level = RiskLevel::from_score(risk_score);

    ImpactReport {
        sources: resolved_sources,
        direct_dependents: direct_sorted,
        transitive_dependents: transitive,
        dependents_by_layer,
        impact_percentage,
        max_depth,
        critical_paths,
        risk_score,
        risk_level,
        breaking_change: risk_level >= RiskLevel::High,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageEntry {
    pub path: String,
    pub incoming_refs: usize,
    pub outgoing_refs: usize,
    pub transitive_refs: usize,
    pub usage_score: f64,
    pub is_entry_point: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CoverageReport {
    pub entries: Vec<CoverageEntry>,
    pub high_usage: Vec<String>,
    pub low_usage: Vec<String>,
}

/// Per-module reference counts and a normalized usage score, plus
/// high/low-usage bucketing at the top/bottom decile (§4.H "Coverage").
pub fn coverage(graph: &Graph) -> CoverageReport {
    let max_incoming = graph.iter().map(|m| m.dependents.len()).max().unwrap_or(0).max(1);

    let mut entries: Vec<CoverageEntry> = graph
        .iter()
        .map(|m| {
            let incoming = m.dependents.len();
            let outgoing = m.dependencies.len();
            let transitive = transitive_dependents(graph, &m.path).map(|r| r.len()).unwrap_or(0);
            let export_bonus = if m.exports.is_empty() { 0.0 } else { 0.1 };
            let usage_score = ((incoming as f64 / max_incoming as f64) * 0.7 + export_bonus).min(1.0);
            CoverageEntry {
                path: m.path.clone(),
                incoming_refs: incoming,
                outgoing_refs: outgoing,
                transitive_refs: transitive,
                usage_score,
                is_entry_point: m.is_entry_point(),
            }
        })
        .collect();

    entries.sort_by(|a, b| a.path.cmp(&b.path));

    let mut by_score: Vec<&CoverageEntry> = entries.iter().collect();
    by_score.sort_by(|a, b| b.usage_score.partial_cmp(&a.usage_score).unwrap());

    let decile = (by_score.len() as f64 * 0.1).ceil() as usize;
    let decile = decile.max(1).min(by_score.len());

    let high_usage: Vec<String> = if by_score.is_empty() {
        Vec::new()
    } else {
        by_score[..decile].iter().map(|e| e.path.clone()).collect()
    };
    let low_usage: Vec<String> = if by_score.is_empty() {
        Vec::new()
    } else {
        by_score[by_score.len() - decile..].iter().map(|e| e.path.clone()).collect()
    };

    CoverageReport { entries, high_usage, low_usage }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeadCodeCandidate {
    pub path: String,
    pub confidence: f64,
    pub safe_to_remove: bool,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DeadCodeOptions {
    pub min_confidence: f64,
    pub aggressive: bool,
    pub test_suffixes: Vec<String>,
    pub exclude_globs: Vec<String>,
}

impl Default for DeadCodeOptions {
    fn default() -> Self {
        DeadCodeOptions {
            min_confidence: 0.5,
            aggressive: false,
            test_suffixes: vec!["_test".to_string(), ".test".to_string(), "_spec".to_string()],
            exclude_globs: Vec::new(),
        }
    }
}

impl From<&crate::config::DeadCodeConfig> for DeadCodeOptions {
    fn from(cfg: &crate::config::DeadCodeConfig) -> Self {
        DeadCodeOptions {
            min_confidence: cfg.min_confidence,
            aggressive: cfg.aggressive,
            exclude_globs: cfg.exclude_globs.clone(),
            ..DeadCodeOptions::default()
        }
    }
}

fn is_test_path(path: &str, suffixes: &[String]) -> bool {
    let stem = path.rsplit('/').next().unwrap_or(path);
    let stem = stem.rsplit_once('.').map(|(s, _)| s).unwrap_or(stem);
    suffixes.iter().any(|suffix| stem.ends_with(suffix.trim_start_matches('.')))
}

fn matches_any_glob(path: &str, globs: &[String]) -> bool {
    globs.iter().any(|pattern| {
        if let Some(prefix) = pattern.strip_suffix('*') {
            path.starts_with(prefix)
        } else {
            path == pattern
        }
    })
}

fn has_keyword(haystacks: impl Iterator<Item = String>, keywords: &[&str]) -> bool {
    haystacks.into_iter().any(|h| {
        let lower = h.to_ascii_lowercase();
        keywords.iter().any(|k| lower.contains(k))
    })
}

/// Candidates with zero incoming references that are not entry points,
/// not test files, and not excluded by a user glob (§4.H "Dead Code").
pub fn dead_code_candidates(graph: &Graph, options: &DeadCodeOptions) -> Vec<DeadCodeCandidate> {
    let mut candidates = Vec::new();

    for module in graph.iter() {
        if !module.dependents.is_empty() {
            continue;
        }
        if module.is_entry_point() {
            continue;
        }
        if is_test_path(&module.path, &options.test_suffixes) {
            continue;
        }
        if matches_any_glob(&module.path, &options.exclude_globs) {
            continue;
        }

        let mut confidence: f64 = 0.8;
        let mut reasons = Vec::new();

        if !module.path.contains('/') || module.path.starts_with("internal/") || module.path.starts_with("src/internal") {
            confidence += 0.1;
            reasons.push("internal-path".to_string());
        }
        if module.exports.is_empty() {
            confidence += 0.05;
            reasons.push("no-exports".to_string());
        }

        let signal_text =
            module.tags.iter().cloned().chain(module.exports.iter().cloned()).collect::<Vec<_>>().into_iter();
        if has_keyword(signal_text, REFLECTION_KEYWORDS) {
            confidence -= 0.3;
            reasons.push("reflection-heuristic".to_string());
        }

        let wip_text = module
            .tags
            .iter()
            .cloned()
            .chain(module.description.iter().cloned())
            .collect::<Vec<_>>()
            .into_iter();
        if has_keyword(wip_text, EXPERIMENTAL_KEYWORDS) {
            confidence -= 0.4;
            reasons.push("experimental-or-wip".to_string());
        }

        if options.aggressive {
            confidence += 0.1;
            reasons.push("aggressive-mode".to_string());
        }

        confidence = confidence.clamp(0.0, 1.0);

        if confidence < options.min_confidence {
            continue;
        }

        candidates.push(DeadCodeCandidate {
            path: module.path.clone(),
            confidence,
            safe_to_remove: confidence >= 0.8,
            reasons,
        });
    }

    candidates.sort_by(|a, b| a.path.cmp(&b.path));
    candidates
}
