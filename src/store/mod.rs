//! Triple Store (§4.C).
//!
//! An indexed, concurrently-writable set of [`Triple`]s. Three indices —
//! by subject, by `(predicate, object)`, and by object — give O(1) expected
//! lookup for any single-variable pattern, per the invariants in `spec.md`
//! §3. `add` is idempotent and safe for concurrent callers; `match_triples`
//! takes a snapshot of the underlying set at call time (§4.C "Concurrency").

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashSet;
use parking_lot::RwLock;

use crate::triple::{ObjectTerm, Triple, Uri};

/// Either a bound value to match against, or a wildcard.
#[derive(Debug, Clone)]
pub enum Pattern<T> {
    Bound(T),
    Any,
}

impl<T> Pattern<T> {
    pub fn bound(value: T) -> Self {
        Pattern::Bound(value)
    }
}

/// A concurrent, indexed triple set.
///
/// The canonical set of membership is the `DashSet`; the subject/object
/// indices are auxiliary maps from key to the set of triples sharing that
/// key, guarded by a single `RwLock` so that an index update is atomic
/// with respect to set membership (§3 invariant (iii)). Readers that only
/// need `match_triples` never contend with each other; only `add` takes
/// the write lock, and only while the corresponding triple is genuinely
/// new.
pub struct TripleStore {
    triples: DashSet<Triple>,
    by_subject: RwLock<std::collections::HashMap<Uri, HashSet<Triple>>>,
    by_pred_obj: RwLock<std::collections::HashMap<(Uri, ObjectTerm), HashSet<Triple>>>,
    by_object: RwLock<std::collections::HashMap<ObjectTerm, HashSet<Triple>>>,
}

impl Default for TripleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TripleStore {
    pub fn new() -> Self {
        TripleStore {
            triples: DashSet::new(),
            by_subject: RwLock::new(std::collections::HashMap::new()),
            by_pred_obj: RwLock::new(std::collections::HashMap::new()),
            by_object: RwLock::new(std::collections::HashMap::new()),
        }
    }

    /// Insert a triple, skipping blank-node objects at the public boundary
    /// is the caller's responsibility (the parser still emits them so they
    /// can be round-tripped internally; `add` stores whatever it is given).
    /// Returns `true` iff the triple was newly inserted.
    pub fn add(&self, triple: Triple) -> bool {
        if !self.triples.insert(triple.clone()) {
            return false;
        }

        self.by_subject
            .write()
            .entry(triple.subject.clone())
            .or_default()
            .insert(triple.clone());
        self.by_pred_obj
            .write()
            .entry((triple.predicate.clone(), triple.object.clone()))
            .or_default()
            .insert(triple.clone());
        self.by_object
            .write()
            .entry(triple.object.clone())
            .or_default()
            .insert(triple);
        true
    }

    pub fn count(&self) -> usize {
        self.triples.len()
    }

    pub fn by_subject(&self, subject: &str) -> Vec<Triple> {
        self.by_subject
            .read()
            .get(subject)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn by_predicate_object(&self, predicate: &str, object: &ObjectTerm) -> Vec<Triple> {
        self.by_pred_obj
            .read()
            .get(&(predicate.to_string(), object.clone()))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Pattern match on any combination of bound/wildcard subject,
    /// predicate, object. Results are deterministic: sorted by subject,
    /// then predicate, then object (§4.C).
    pub fn match_triples(
        &self,
        subject: &Pattern<Uri>,
        predicate: &Pattern<Uri>,
        object: &Pattern<ObjectTerm>,
    ) -> Vec<Triple> {
        // Snapshot-at-creation: take an owned view of whichever index
        // narrows the search space most before filtering the rest.
        let mut candidates: Vec<Triple> = match (subject, predicate, object) {
            (Pattern::Bound(s), _, _) => self.by_subject(s),
            (_, _, Pattern::Bound(o)) if matches!(predicate, Pattern::Any) => self.by_object_only(o),
            (_, Pattern::Bound(p), Pattern::Bound(o)) => self.by_predicate_object(p, o),
            _ => self.triples.iter().map(|r| r.clone()).collect(),
        };

        candidates.retain(|t| {
            let subj_ok = match subject {
                Pattern::Any => true,
                Pattern::Bound(s) => &t.subject == s,
            };
            let pred_ok = match predicate {
                Pattern::Any => true,
                Pattern::Bound(p) => &t.predicate == p,
            };
            let obj_ok = match object {
                Pattern::Any => true,
                Pattern::Bound(o) => &t.object == o,
            };
            subj_ok && pred_ok && obj_ok
        });

        candidates.sort();
        candidates.dedup();
        candidates
    }

    fn by_object_only(&self, object: &ObjectTerm) -> Vec<Triple> {
        self.by_object
            .read()
            .get(object)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn all(&self) -> Vec<Triple> {
        let mut v: Vec<Triple> = self.triples.iter().map(|r| r.clone()).collect();
        v.sort();
        v
    }
}

pub type SharedStore = Arc<TripleStore>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triple::RDF_TYPE;

    fn triple(s: &str, p: &str, o: ObjectTerm) -> Triple {
        Triple::new(s, p, o)
    }

    #[test]
    fn add_is_idempotent() {
        let store = TripleStore::new();
        let t = triple("s", "p", ObjectTerm::Literal("o".into()));
        assert!(store.add(t.clone()));
        assert!(!store.add(t));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn match_round_trip_single_triple() {
        let store = TripleStore::new();
        let t = triple("s", "p", ObjectTerm::Literal("o".into()));
        store.add(t.clone());
        let found = store.match_triples(
            &Pattern::bound("s".to_string()),
            &Pattern::bound("p".to_string()),
            &Pattern::bound(ObjectTerm::Literal("o".into())),
        );
        assert_eq!(found, vec![t]);
    }

    #[test]
    fn wildcard_match_returns_deterministic_order() {
        let store = TripleStore::new();
        store.add(triple("b", RDF_TYPE, ObjectTerm::Uri("T".into())));
        store.add(triple("a", RDF_TYPE, ObjectTerm::Uri("T".into())));
        let found = store.match_triples(&Pattern::Any, &Pattern::bound(RDF_TYPE.to_string()), &Pattern::Any);
        assert_eq!(found[0].subject, "a");
        assert_eq!(found[1].subject, "b");
    }

    #[test]
    fn by_subject_and_by_predicate_object_lookups() {
        let store = TripleStore::new();
        store.add(triple("s", RDF_TYPE, ObjectTerm::Uri("T".into())));
        assert_eq!(store.by_subject("s").len(), 1);
        assert_eq!(store.by_predicate_object(RDF_TYPE, &ObjectTerm::Uri("T".into())).len(), 1);
        assert_eq!(store.by_subject("missing").len(), 0);
    }
}
