//! Security Zone Classification (§4.I).
//!
//! Classifies each module into one of a fixed set of zones via cascading
//! rules (tags, then path substrings, then declared layer), detects
//! dependency edges that cross zone boundaries, and scores the overall
//! risk of the graph.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::graph::Graph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Public,
    Trusted,
    Internal,
    Admin,
    Data,
    Unknown,
}

impl Zone {
    pub fn risk_level(&self) -> u8 {
        match self {
            Zone::Public => 2,
            Zone::Trusted => 3,
            Zone::Internal => 3,
            Zone::Admin => 5,
            Zone::Data => 4,
            Zone::Unknown => 1,
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Zone::Public => &["public", "api", "external", "endpoint", "http", "rest", "graphql"],
            Zone::Admin => &["admin", "privileged", "superuser", "root"],
            Zone::Data => &["database", "storage", "persistence", "sql", "db", "store"],
            Zone::Internal => &["internal", "private", "impl"],
            Zone::Trusted => &["service", "business", "logic", "auth"],
            Zone::Unknown => &[],
        }
    }
}

/// Classification order: first zone (by this priority) whose keyword set
/// matches wins. Earlier entries take precedence over later ones when a
/// module's signals are ambiguous.
const CLASSIFICATION_PRIORITY: &[Zone] =
    &[Zone::Admin, Zone::Data, Zone::Public, Zone::Internal, Zone::Trusted];

#[derive(Debug, Clone, Serialize)]
pub struct ZoneClassification {
    pub zone: Zone,
    pub confidence: f64,
    pub reason: String,
}

fn matches_keywords(text: &str, zone: Zone) -> bool {
    let lower = text.to_ascii_lowercase();
    zone.keywords().iter().any(|k| lower.contains(k))
}

/// Cascading classification: tags (confidence 0.9) → path substrings
/// (confidence 0.6) → declared layer (confidence 0.45) → `Unknown` at 0.3
/// (§4.I, §8 property 7: total and confidence ≥ 0.3).
pub fn classify(graph: &Graph, path: &str) -> ZoneClassification {
    let Some(module) = graph.get(path) else {
        return ZoneClassification { zone: Zone::Unknown, confidence: 0.3, reason: "module not found".to_string() };
    };

    for &zone in CLASSIFICATION_PRIORITY {
        if module.tags.iter().any(|tag| matches_keywords(tag, zone)) {
            return ZoneClassification {
                zone,
                confidence: 0.9,
                reason: format!("tag matched {:?} keyword set", zone),
            };
        }
    }

    for &zone in CLASSIFICATION_PRIORITY {
        if matches_keywords(&module.path, zone) {
            return ZoneClassification {
                zone,
                confidence: 0.6,
                reason: format!("path contains a {:?} keyword", zone),
            };
        }
    }

    if let Some(layer) = &module.layer {
        for &zone in CLASSIFICATION_PRIORITY {
            if matches_keywords(layer, zone) {
                return ZoneClassification {
                    zone,
                    confidence: 0.45,
                    reason: format!("declared layer '{layer}' matches {:?}", zone),
                };
            }
        }
    }

    ZoneClassification { zone: Zone::Unknown, confidence: 0.3, reason: "no classification signal matched".to_string() }
}

/// Classify every module in the graph; total by construction (§8 property 7).
pub fn classify_all(graph: &Graph) -> HashMap<String, ZoneClassification> {
    graph.iter().map(|m| (m.path.clone(), classify(graph, &m.path))).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossingRisk {
    Low,
    Medium,
    High,
    Critical,
}

fn risk_for_crossing(from: Zone, to: Zone) -> CrossingRisk {
    match (from, to) {
        (Zone::Public, Zone::Admin) | (Zone::Public, Zone::Data) => CrossingRisk::Critical,
        (Zone::Public, Zone::Internal) | (Zone::Trusted, Zone::Admin) => CrossingRisk::High,
        (Zone::Internal, Zone::Public) | (Zone::Data, Zone::Public) => CrossingRisk::Medium,
        _ => CrossingRisk::Low,
    }
}

fn default_allowed_crossings() -> HashSet<(Zone, Zone)> {
    use Zone::*;
    HashSet::from([
        (Public, Trusted),
        (Trusted, Internal),
        (Trusted, Data),
        (Internal, Data),
        (Internal, Internal),
        (Admin, Internal),
        (Admin, Data),
    ])
}

#[derive(Debug, Clone, Serialize)]
pub struct BoundaryCrossing {
    pub from: String,
    pub to: String,
    pub from_zone: Zone,
    pub to_zone: Zone,
    pub risk: CrossingRisk,
    pub kind: CrossingKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingKind {
    UnauthorizedBoundaryCrossing,
    HighRiskCrossing,
}

#[derive(Debug, Clone, Default)]
pub struct SecurityOptions {
    pub strict: bool,
    /// Per-source-module whitelist of additionally-allowed target zones.
    pub allowed_overrides: HashMap<String, HashSet<Zone>>,
}

impl From<&crate::config::SecurityConfig> for SecurityOptions {
    fn from(cfg: &crate::config::SecurityConfig) -> Self {
        SecurityOptions { strict: cfg.strict, allowed_overrides: HashMap::new() }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SecurityReport {
    pub classifications: HashMap<String, ZoneClassification>,
    pub crossings: Vec<BoundaryCrossing>,
    pub overall_risk_score: f64,
}

/// Detect zone-crossing dependency edges and score overall risk (§4.I).
pub fn analyze(graph: &Graph, options: &SecurityOptions) -> SecurityReport {
    let classifications = classify_all(graph);
    let allowed = default_allowed_crossings();
    let mut crossings = Vec::new();

    let mut modules: Vec<_> = graph.iter().collect();
    modules.sort_by(|a, b| a.path.cmp(&b.path));

    for module in modules {
        let Some(from_class) = classifications.get(&module.path) else { continue };
        for dep in &module.dependencies {
            let Some(target) = graph.resolve(dep) else { continue };
            let Some(to_class) = classifications.get(&target.path) else { continue };
            if from_class.zone == to_class.zone {
                continue;
            }

            let risk = risk_for_crossing(from_class.zone, to_class.zone);
            let is_allowed = allowed.contains(&(from_class.zone, to_class.zone))
                || options
                    .allowed_overrides
                    .get(&module.path)
                    .is_some_and(|zones| zones.contains(&to_class.zone));

            if !is_allowed {
                crossings.push(BoundaryCrossing {
                    from: module.path.clone(),
                    to: target.path.clone(),
                    from_zone: from_class.zone,
                    to_zone: to_class.zone,
                    risk,
                    kind: CrossingKind::UnauthorizedBoundaryCrossing,
                });
            } else if options.strict && risk >= CrossingRisk::High {
                crossings.push(BoundaryCrossing {
                    from: module.path.clone(),
                    to: target.path.clone(),
                    from_zone: from_class.zone,
                    to_zone: to_class.zone,
                    risk,
                    kind: CrossingKind::HighRiskCrossing,
                });
            }
        }
    }

    let overall_risk_score = if crossings.is_empty() {
        0.0
    } else {
        let total: f64 = crossings
            .iter()
            .map(|c| match c.risk {
                CrossingRisk::Critical => 10.0,
                CrossingRisk::High => 7.0,
                CrossingRisk::Medium => 4.0,
                CrossingRisk::Low => 2.0,
            })
            .sum();
        (total / crossings.len() as f64).min(10.0)
    };

    SecurityReport { classifications, crossings, overall_risk_score }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::graph::GraphBuilder;
    use std::fs;

    fn write(dir: &std::path::Path, path: &str, uri: &str, tags: &[&str], links: &[&str]) {
        let sub = path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        if !sub.is_empty() {
            fs::create_dir_all(dir.join(sub)).unwrap();
        }
        let mut body = String::new();
        for t in tags {
            body.push_str(&format!(" code:tags \"{t}\" ;"));
        }
        for l in links {
            body.push_str(&format!(" code:linksTo <{l}> ;"));
        }
        fs::write(
            dir.join(path),
            format!(
                "<!-- LinkedDoc RDF -->\n@prefix code: <http://codegraph.dev/vocab#> .\n<{uri}> a code:Module ;{body} code:name \"{path}\" .\n<!-- End LinkedDoc RDF -->\n"
            ),
        )
        .unwrap();
    }

    #[test]
    fn scenario_three_security_violation() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "api/public.x", "#Pub", &["public", "api"], &["#Admin"]);
        write(dir.path(), "admin/ops.x", "#Admin", &["admin"], &[]);

        let graph = GraphBuilder::new(Config::default()).build(dir.path()).unwrap().graph;
        let report = analyze(&graph, &SecurityOptions::default());

        assert_eq!(report.crossings.len(), 1);
        assert_eq!(report.crossings[0].risk, CrossingRisk::Critical);
        assert_eq!(report.crossings[0].kind, CrossingKind::UnauthorizedBoundaryCrossing);
        assert!(report.overall_risk_score >= 9.0);
    }

    #[test]
    fn classification_is_total_with_minimum_confidence() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "mystery.x", "#M", &[], &[]);
        let graph = GraphBuilder::new(Config::default()).build(dir.path()).unwrap().graph;
        let classification = classify(&graph, "mystery.x");
        assert_eq!(classification.zone, Zone::Unknown);
        assert!(classification.confidence >= 0.3);
    }

    #[test]
    fn allowed_crossing_does_not_report_unless_strict() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "api/pub.x", "#Pub", &["public"], &["#Svc"]);
        write(dir.path(), "svc/logic.x", "#Svc", &["service"], &[]);
        let graph = GraphBuilder::new(Config::default()).build(dir.path()).unwrap().graph;

        let report = analyze(&graph, &SecurityOptions::default());
        assert!(report.crossings.is_empty());

        let strict_report = analyze(&graph, &SecurityOptions { strict: true, ..Default::default() });
        assert!(strict_report.crossings.is_empty());
    }

    #[test]
    fn allowed_but_high_risk_crossing_is_flagged_only_in_strict_mode() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "svc/logic.x", "#Svc", &["service"], &["#Admin"]);
        write(dir.path(), "admin/ops.x", "#Admin", &["admin"], &[]);
        let graph = GraphBuilder::new(Config::default()).build(dir.path()).unwrap().graph;

        // Trusted -> Admin is High risk per `risk_for_crossing` but is not in
        // `default_allowed_crossings`; whitelist it explicitly so the
        // crossing is allowed, isolating the strict/high-risk check.
        let mut allowed_overrides = HashMap::new();
        allowed_overrides.insert("svc/logic.x".to_string(), HashSet::from([Zone::Admin]));
        let options = SecurityOptions { strict: false, allowed_overrides: allowed_overrides.clone() };

        let report = analyze(&graph, &options);
        assert!(report.crossings.is_empty());

        let strict_report = analyze(&graph, &SecurityOptions { strict: true, allowed_overrides });
        assert_eq!(strict_report.crossings.len(), 1);
        assert_eq!(strict_report.crossings[0].kind, CrossingKind::HighRiskCrossing);
        assert_eq!(strict_report.crossings[0].risk, CrossingRisk::High);
    }
}
