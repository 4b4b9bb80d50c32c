//! Module and Graph data model (§3 "Module", "Graph").
//!
//! A [`Module`] is a typed projection over triples sharing a subject whose
//! `rdf:type` is `...#Module`. A [`Graph`] is the map from repo-relative
//! path to `Module`, plus the backing triple store, the scan root, and a
//! statistics snapshot.

pub mod builder;
pub mod validator;

pub use builder::{BuildError, BuildReport, GraphBuilder};
pub use validator::{ValidationReport, ValidationWarning, Validator};

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::store::SharedStore;
use crate::triple::Uri;

pub const VOCAB_MODULE_TYPE_SUFFIX: &str = "Module";

/// A typed projection of one source file's header triples.
#[derive(Debug, Clone)]
pub struct Module {
    pub path: String,
    pub uri: Uri,
    pub name: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub layer: Option<String>,
    pub tags: HashSet<String>,
    pub dependencies: Vec<String>,
    pub dependents: Vec<String>,
    pub exports: Vec<String>,
    pub calls: Vec<String>,
    pub properties: HashMap<String, Vec<String>>,
}

impl Module {
    pub fn new(path: String, uri: Uri) -> Self {
        Module {
            path,
            uri,
            name: None,
            description: None,
            language: None,
            layer: None,
            tags: HashSet::new(),
            dependencies: Vec::new(),
            dependents: Vec::new(),
            exports: Vec::new(),
            calls: Vec::new(),
            properties: HashMap::new(),
        }
    }

    fn push_unique(list: &mut Vec<String>, value: String) {
        if !list.contains(&value) {
            list.push(value);
        }
    }

    pub fn add_dependency(&mut self, dep: String) {
        Self::push_unique(&mut self.dependencies, dep);
    }

    pub fn add_export(&mut self, export: String) {
        Self::push_unique(&mut self.exports, export);
    }

    pub fn add_call(&mut self, call: String) {
        Self::push_unique(&mut self.calls, call);
    }

    pub fn add_dependent(&mut self, dependent: String) {
        Self::push_unique(&mut self.dependents, dependent);
    }

    pub fn is_entry_point(&self) -> bool {
        self.exports.iter().any(|e| e == "main" || e == "init")
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphStatistics {
    pub total_modules: usize,
    pub by_language: HashMap<String, usize>,
    pub by_layer: HashMap<String, usize>,
    pub by_tag: HashMap<String, usize>,
    #[serde(skip)]
    pub build_duration: Duration,
}

impl GraphStatistics {
    pub fn compute(modules: &HashMap<String, Module>, build_duration: Duration) -> Self {
        let mut stats = GraphStatistics {
            total_modules: modules.len(),
            build_duration,
            ..Default::default()
        };
        for m in modules.values() {
            if let Some(lang) = &m.language {
                *stats.by_language.entry(lang.clone()).or_insert(0) += 1;
            }
            if let Some(layer) = &m.layer {
                *stats.by_layer.entry(layer.clone()).or_insert(0) += 1;
            }
            for tag in &m.tags {
                *stats.by_tag.entry(tag.clone()).or_insert(0) += 1;
            }
        }
        stats
    }
}

/// The map `path -> Module`, a pointer to the triple store, the scan root,
/// and statistics. Read-only after the builder finalizes it (§3 "Lifetime").
#[derive(Clone)]
pub struct Graph {
    pub root: PathBuf,
    pub modules: HashMap<String, Module>,
    pub store: SharedStore,
    pub statistics: GraphStatistics,
}

impl Graph {
    pub fn get(&self, path: &str) -> Option<&Module> {
        self.modules.get(path)
    }

    pub fn by_uri(&self, uri: &str) -> Option<&Module> {
        self.modules.values().find(|m| m.uri == uri)
    }

    /// Resolve a dependency/dependent string naming a module by, in order:
    /// exact path match, URI match, then name/suffix match (§4.E step 6).
    pub fn resolve(&self, reference: &str) -> Option<&Module> {
        if let Some(m) = self.modules.get(reference) {
            return Some(m);
        }
        if let Some(m) = self.by_uri(reference) {
            return Some(m);
        }
        self.modules.values().find(|m| {
            m.name.as_deref() == Some(reference) || m.path.ends_with(reference)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn by_language<'a>(&'a self, language: &'a str) -> impl Iterator<Item = &'a Module> {
        self.iter().filter(move |m| m.language.as_deref() == Some(language))
    }

    pub fn by_layer<'a>(&'a self, layer: &'a str) -> impl Iterator<Item = &'a Module> {
        self.iter().filter(move |m| m.layer.as_deref() == Some(layer))
    }

    pub fn by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Module> {
        self.iter().filter(move |m| m.tags.contains(tag))
    }
}
