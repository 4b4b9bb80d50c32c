//! Graph Builder (§4.E).
//!
//! Orchestrates Scanner → Header Extractor → Triple Parser → Triple Store
//! across a dedicated rayon thread pool, then runs two single-threaded
//! finalization passes (dependency-path resolution, reverse-edge
//! population) once the pool drains.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{info_span, warn};

use crate::config::Config;
use crate::header::extract_header;
use crate::scan::{scan, ScanFileError};
use crate::store::{SharedStore, TripleStore};
use crate::triple::parser::parse_triple_block;
use crate::triple::{ObjectTerm, Triple, RDF_TYPE};

use super::validator::{ValidationReport, Validator};
use super::{Graph, GraphStatistics, Module, VOCAB_MODULE_TYPE_SUFFIX};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("build was cancelled before completion")]
    Cancelled,
    #[error("root path does not exist or is not a directory: {0}")]
    InvalidRoot(PathBuf),
}

/// A warning recorded during a per-file step that does not abort the
/// build (§4.E "Failure semantics").
#[derive(Debug, Clone)]
pub struct BuildWarning {
    pub path: PathBuf,
    pub message: String,
}

/// Everything the builder produces: the graph (possibly partial, on
/// cancellation), scan-level errors, per-file warnings, and optional
/// validation results.
pub struct BuildReport {
    pub graph: Graph,
    pub scan_errors: Vec<ScanFileError>,
    pub warnings: Vec<BuildWarning>,
    pub validation: Option<ValidationReport>,
    pub cancelled: bool,
}

/// Cooperative cancellation handle. Workers check it at least once per
/// file (§5 "Cancellation and timeouts").
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct GraphBuilder {
    config: Config,
    cancel: CancelToken,
    validate: bool,
}

impl GraphBuilder {
    pub fn new(config: Config) -> Self {
        GraphBuilder { config, cancel: CancelToken::new(), validate: false }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn build(&self, root: &Path) -> Result<BuildReport, BuildError> {
        let span = info_span!("graph_build", root = %root.display());
        let _enter = span.enter();
        let started = Instant::now();

        let root = root
            .canonicalize()
            .map_err(|_| BuildError::InvalidRoot(root.to_path_buf()))?;
        if !root.is_dir() {
            return Err(BuildError::InvalidRoot(root));
        }

        let scan_report = scan(&root, &self.config.scan, self.config.header.scan_window_bytes);
        let descriptors: Vec<_> = scan_report.files.into_iter().filter(|f| f.has_header).collect();

        let store = Arc::new(TripleStore::new());
        let partial_modules: DashMap<String, Module> = DashMap::new();
        let warnings: DashMap<usize, BuildWarning> = DashMap::new();
        let cancelled = Arc::new(AtomicBool::new(false));

        let scan_opts = self.config.scan.clone();
        let header_window = self.config.header.scan_window_bytes;
        let cancel = self.cancel.clone();

        let run = || {
            descriptors
                .par_iter()
                .enumerate()
                .for_each(|(idx, descriptor)| {
                    if cancel.is_cancelled() {
                        cancelled.store(true, Ordering::SeqCst);
                        return;
                    }
                    process_file(
                        &root,
                        &descriptor.path,
                        header_window,
                        &store,
                        &partial_modules,
                        &warnings,
                        idx,
                    );
                });
        };

        if scan_opts.concurrent && scan_opts.workers != 1 {
            match build_pool(scan_opts.workers) {
                Ok(pool) => pool.install(run),
                Err(_) => run(),
            }
        } else {
            run();
        }

        let mut modules: HashMap<String, Module> = partial_modules.into_iter().collect();
        let mut build_warnings: Vec<BuildWarning> = warnings.into_iter().map(|(_, w)| w).collect();
        build_warnings.sort_by(|a, b| a.path.cmp(&b.path));

        if cancelled.load(Ordering::SeqCst) {
            let stats = GraphStatistics::compute(&modules, started.elapsed());
            let graph = Graph { root, modules, store, statistics: stats };
            return Ok(BuildReport {
                graph,
                scan_errors: scan_report.errors,
                warnings: build_warnings,
                validation: None,
                cancelled: true,
            });
        }

        resolve_dependency_paths(&root, &mut modules);
        populate_reverse_edges(&mut modules);

        let stats = GraphStatistics::compute(&modules, started.elapsed());
        let graph = Graph { root, modules, store, statistics: stats };

        let validation = if self.validate {
            Some(Validator::validate(&graph))
        } else {
            None
        };

        Ok(BuildReport {
            graph,
            scan_errors: scan_report.errors,
            warnings: build_warnings,
            validation,
            cancelled: false,
        })
    }
}

fn build_pool(workers: usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if workers > 0 {
        builder = builder.num_threads(workers);
    }
    builder.build()
}

fn process_file(
    root: &Path,
    path: &Path,
    header_window: usize,
    store: &SharedStore,
    partial_modules: &DashMap<String, Module>,
    warnings: &DashMap<usize, BuildWarning>,
    warning_key: usize,
) {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            warnings.insert(warning_key, BuildWarning { path: path.to_path_buf(), message: e.to_string() });
            return;
        }
    };

    let header = match extract_header(&bytes, header_window) {
        Ok(Some(h)) => h,
        Ok(None) => return,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "header extraction failed");
            warnings.insert(warning_key, BuildWarning { path: path.to_path_buf(), message: e.to_string() });
            return;
        }
    };

    let outcome = parse_triple_block(&header.triple_block);
    if let Some(err) = &outcome.error {
        warn!(path = %path.display(), error = %err, "triple parse failed");
        warnings.insert(warning_key, BuildWarning { path: path.to_path_buf(), message: err.to_string() });
    }
    if outcome.triples.is_empty() {
        return;
    }

    let rel_path = relative_slash_path(root, path);
    let mut module_uri: Option<String> = None;

    for triple in &outcome.triples {
        if triple.predicate == RDF_TYPE {
            if let ObjectTerm::Uri(type_uri) = &triple.object {
                if local_name(type_uri) == VOCAB_MODULE_TYPE_SUFFIX && module_uri.is_none() {
                    module_uri = Some(triple.subject.clone());
                }
            }
        }
        if !triple.object.is_blank() {
            store.add(triple.clone());
        }
    }

    let Some(uri) = module_uri else {
        return;
    };

    let mut module = partial_modules
        .entry(rel_path.clone())
        .or_insert_with(|| Module::new(rel_path.clone(), uri.clone()));

    apply_triples_to_module(&mut *module, &outcome.triples, &uri);
}

fn apply_triples_to_module(module: &mut Module, triples: &[Triple], subject_uri: &str) {
    for triple in triples {
        if triple.subject != subject_uri {
            continue;
        }
        if triple.object.is_blank() {
            continue;
        }
        if triple.predicate == RDF_TYPE {
            continue;
        }
        let value = triple.object.as_str().to_string();
        match local_name(&triple.predicate) {
            "name" => module.name = Some(value),
            "description" => module.description = Some(value),
            "language" => module.language = Some(value),
            "layer" => module.layer = Some(value),
            "linksTo" => module.add_dependency(value),
            "exports" => module.add_export(value),
            "calls" => module.add_call(value),
            "tags" => {
                module.tags.insert(value);
            }
            other => {
                module.properties.entry(other.to_string()).or_default().push(value);
            }
        }
    }
}

fn local_name(uri: &str) -> &str {
    uri.rsplit(['#', '/']).next().unwrap_or(uri)
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Dependency-path resolution (§4.E step 6, part 1): strip angle brackets,
/// resolve relative markers against the module's own directory.
fn resolve_dependency_paths(_root: &Path, modules: &mut HashMap<String, Module>) {
    let resolved: HashMap<String, Vec<String>> = modules
        .iter()
        .map(|(path, module)| {
            let dir = Path::new(path).parent().unwrap_or_else(|| Path::new(""));
            let deps = module
                .dependencies
                .iter()
                .map(|dep| resolve_one_dependency(dir, dep))
                .collect();
            (path.clone(), deps)
        })
        .collect();

    for (path, deps) in resolved {
        if let Some(m) = modules.get_mut(&path) {
            m.dependencies = deps;
        }
    }
}

fn resolve_one_dependency(dir: &Path, dep: &str) -> String {
    let trimmed = dep.trim_start_matches('<').trim_end_matches('>');
    if trimmed.contains("./") || trimmed.contains("../") || trimmed.starts_with('.') {
        clean_path(&dir.join(trimmed))
    } else {
        trimmed.to_string()
    }
}

fn clean_path(path: &Path) -> String {
    let mut stack: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                stack.pop();
            }
            std::path::Component::CurDir => {}
            std::path::Component::Normal(part) => stack.push(part.to_string_lossy().into_owned()),
            _ => {}
        }
    }
    stack.join("/")
}

/// Reverse-edge population (§4.E step 6, part 2). Runs strictly after the
/// pool drains so no reader observes partial reverse edges (§5).
fn populate_reverse_edges(modules: &mut HashMap<String, Module>) {
    let edges: Vec<(String, String)> = modules
        .iter()
        .flat_map(|(path, module)| {
            module
                .dependencies
                .iter()
                .filter_map(|dep| resolve_target_path(modules, path, dep))
                .map(move |target| (target, module.uri.clone()))
        })
        .collect();

    for (target_path, dependent_uri) in edges {
        if let Some(target) = modules.get_mut(&target_path) {
            target.add_dependent(dependent_uri);
        }
    }
}

fn resolve_target_path(modules: &HashMap<String, Module>, _source_path: &str, dep: &str) -> Option<String> {
    if modules.contains_key(dep) {
        return Some(dep.to_string());
    }
    if let Some(m) = modules.values().find(|m| m.uri == dep) {
        return Some(m.path.clone());
    }
    modules
        .values()
        .find(|m| m.name.as_deref() == Some(dep) || m.path.ends_with(dep))
        .map(|m| m.path.clone())
}
