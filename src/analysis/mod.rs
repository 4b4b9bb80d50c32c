//! Analysis Kernel (§4.G).
//!
//! Pure graph algorithms over [`Graph`](crate::graph::Graph): topological
//! ordering (Kahn), strongly connected components (Tarjan), shortest path
//! and transitive closure (BFS), and memoized dependency depth. Every
//! function here is a read-only view over the graph's `dependencies`
//! edges — none of them mutate it.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use thiserror::Error;

use crate::graph::Graph;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("cycle detected among modules: {0:?}")]
    CycleDetected(Vec<String>),
}

fn dependency_edges(graph: &Graph) -> HashMap<&str, Vec<&str>> {
    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
    for module in graph.iter() {
        let mut targets: Vec<&str> = module
            .dependencies
            .iter()
            .filter_map(|d| graph.resolve(d))
            .map(|m| m.path.as_str())
            .collect();
        targets.sort();
        targets.dedup();
        edges.insert(module.path.as_str(), targets);
    }
    edges
}

/// Kahn's algorithm. Ties are broken lexicographically by module path so
/// the result is deterministic across runs (§4.G "Determinism").
pub fn topological_sort(graph: &Graph) -> Result<Vec<String>, AnalysisError> {
    let edges = dependency_edges(graph);
    let mut in_degree: HashMap<&str, usize> = edges.keys().map(|k| (*k, 0)).collect();
    for targets in edges.values() {
        for t in targets {
            *in_degree.entry(t).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<&str> =
        in_degree.iter().filter(|(_, deg)| **deg == 0).map(|(k, _)| *k).collect();
    let mut order = Vec::with_capacity(edges.len());

    while let Some(&node) = ready.iter().next() {
        ready.remove(node);
        order.push(node.to_string());
        if let Some(targets) = edges.get(node) {
            for t in targets {
                let deg = in_degree.get_mut(t).expect("target must be a known module");
                *deg -= 1;
                if *deg == 0 {
                    ready.insert(t);
                }
            }
        }
    }

    if order.len() != edges.len() {
        let remaining: Vec<String> = in_degree
            .into_iter()
            .filter(|(_, deg)| *deg > 0)
            .map(|(k, _)| k.to_string())
            .collect();
        let mut remaining = remaining;
        remaining.sort();
        return Err(AnalysisError::CycleDetected(remaining));
    }

    Ok(order)
}

/// Tarjan's strongly connected components. Each component's members are
/// sorted lexicographically, and components are returned ordered by their
/// lexicographically-smallest member (§4.G "Determinism").
pub fn strongly_connected_components(graph: &Graph) -> Vec<Vec<String>> {
    let edges = dependency_edges(graph);
    let mut index_counter = 0usize;
    let mut stack: Vec<&str> = Vec::new();
    let mut on_stack: HashSet<&str> = HashSet::new();
    let mut indices: HashMap<&str, usize> = HashMap::new();
    let mut lowlink: HashMap<&str, usize> = HashMap::new();
    let mut components: Vec<Vec<String>> = Vec::new();

    let mut nodes: Vec<&str> = edges.keys().copied().collect();
    nodes.sort();

    struct Frame<'a> {
        node: &'a str,
        iter_pos: usize,
    }

    for &start in &nodes {
        if indices.contains_key(start) {
            continue;
        }

        let mut call_stack: Vec<Frame> = vec![Frame { node: start, iter_pos: 0 }];
        indices.insert(start, index_counter);
        lowlink.insert(start, index_counter);
        index_counter += 1;
        stack.push(start);
        on_stack.insert(start);

        while let Some(frame) = call_stack.last_mut() {
            let node = frame.node;
            let targets = edges.get(node).map(Vec::as_slice).unwrap_or(&[]);

            if frame.iter_pos < targets.len() {
                let next = targets[frame.iter_pos];
                frame.iter_pos += 1;

                if !indices.contains_key(next) {
                    indices.insert(next, index_counter);
                    lowlink.insert(next, index_counter);
                    index_counter += 1;
                    stack.push(next);
                    on_stack.insert(next);
                    call_stack.push(Frame { node: next, iter_pos: 0 });
                } else if on_stack.contains(next) {
                    let next_index = indices[next];
                    let entry = lowlink.get_mut(node).unwrap();
                    *entry = (*entry).min(next_index);
                }
            } else {
                let node = frame.node;
                call_stack.pop();

                if let Some(&parent) = call_stack.last().map(|f| f.node).as_ref() {
                    let node_low = lowlink[node];
                    let parent_low = lowlink.get_mut(parent).unwrap();
                    *parent_low = (*parent_low).min(node_low);
                }

                if lowlink[node] == indices[node] {
                    let mut component = Vec::new();
                    loop {
                        let member = stack.pop().expect("SCC stack must contain this component's root");
                        on_stack.remove(member);
                        component.push(member.to_string());
                        if member == node {
                            break;
                        }
                    }
                    component.sort();
                    components.push(component);
                }
            }
        }
    }

    components.sort();
    components
}

/// Any SCC with more than one member, or a single module that depends on
/// itself, names a cyclic dependency (§4.G "cyclic_dependencies").
pub fn cyclic_dependencies(graph: &Graph) -> Vec<Vec<String>> {
    strongly_connected_components(graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component.first().is_some_and(|path| {
                    graph
                        .get(path)
                        .map(|m| m.dependencies.iter().any(|d| graph.resolve(d).map(|r| &r.path) == Some(path)))
                        .unwrap_or(false)
                })
        })
        .collect()
}

/// Breadth-first shortest path from `from` to `to`, following dependency
/// edges. `None` when unreachable or when either endpoint names no module
/// in the graph (§4.G, §8 "Boundary behaviors").
pub fn shortest_path(graph: &Graph, from: &str, to: &str) -> Option<Vec<String>> {
    let from_path = graph.resolve(from)?.path.clone();
    let to_path = graph.resolve(to)?.path.clone();

    if from_path == to_path {
        return Some(vec![from_path]);
    }

    let edges = dependency_edges(graph);
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    let mut parent: HashMap<&str, &str> = HashMap::new();

    visited.insert(from_path.as_str());
    queue.push_back(from_path.as_str());

    while let Some(node) = queue.pop_front() {
        if node == to_path {
            let mut path = vec![node.to_string()];
            let mut cur = node;
            while let Some(&p) = parent.get(cur) {
                path.push(p.to_string());
                cur = p;
            }
            path.reverse();
            return Some(path);
        }
        if let Some(targets) = edges.get(node) {
            for &t in targets {
                if visited.insert(t) {
                    parent.insert(t, node);
                    queue.push_back(t);
                }
            }
        }
    }

    None
}

fn bfs_reachable<'a>(edges: &HashMap<&'a str, Vec<&'a str>>, start: &'a str) -> HashMap<String, usize> {
    let mut depth: HashMap<String, usize> = HashMap::new();
    let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
    queue.push_back((start, 0));
    let mut visited: HashSet<&str> = HashSet::from([start]);

    while let Some((node, d)) = queue.pop_front() {
        if node != start {
            depth.insert(node.to_string(), d);
        }
        if let Some(targets) = edges.get(node) {
            for &t in targets {
                if visited.insert(t) {
                    queue.push_back((t, d + 1));
                }
            }
        }
    }

    depth
}

/// Every module reachable by following `dependencies` edges from `path`,
/// with BFS depth labels (§4.G "transitive_dependencies"). `None` iff
/// `path` names no module in the graph (§8 "Boundary behaviors").
pub fn transitive_dependencies(graph: &Graph, path: &str) -> Option<HashMap<String, usize>> {
    let module = graph.resolve(path)?;
    let edges = dependency_edges(graph);
    Some(bfs_reachable(&edges, module.path.as_str()))
}

fn reverse_edges<'a>(edges: &HashMap<&'a str, Vec<&'a str>>) -> HashMap<&'a str, Vec<&'a str>> {
    let mut reversed: HashMap<&str, Vec<&str>> = edges.keys().map(|k| (*k, Vec::new())).collect();
    for (&from, targets) in edges {
        for &to in targets {
            reversed.entry(to).or_default().push(from);
        }
    }
    for targets in reversed.values_mut() {
        targets.sort();
    }
    reversed
}

/// Every module that transitively depends on `path` (the reverse closure),
/// with BFS depth labels (§4.G "transitive_dependents"). `None` iff `path`
/// names no module in the graph.
pub fn transitive_dependents(graph: &Graph, path: &str) -> Option<HashMap<String, usize>> {
    let module = graph.resolve(path)?;
    let edges = dependency_edges(graph);
    let reversed = reverse_edges(&edges);
    Some(bfs_reachable(&reversed, module.path.as_str()))
}

/// Length of the longest dependency chain starting at `path`, memoized
/// across the whole call so shared subtrees are only walked once (§4.G
/// "dependency_depth"). Returns `-1` for a module absent from the graph
/// (§8 "Boundary behaviors"). Behavior on a cyclic subgraph is undefined
/// by the spec; this implementation treats a node revisited on the current
/// path as contributing depth zero, which breaks the recursion without
/// panicking.
pub fn dependency_depth(graph: &Graph, path: &str) -> i64 {
    let Some(module) = graph.resolve(path) else {
        return -1;
    };
    let edges = dependency_edges(graph);
    let mut memo: HashMap<&str, usize> = HashMap::new();

    fn visit<'a>(
        node: &'a str,
        edges: &HashMap<&'a str, Vec<&'a str>>,
        memo: &mut HashMap<&'a str, usize>,
        on_path: &mut HashSet<&'a str>,
    ) -> usize {
        if let Some(&d) = memo.get(node) {
            return d;
        }
        if !on_path.insert(node) {
            return 0;
        }

        let mut max_child = 0usize;
        if let Some(targets) = edges.get(node) {
            for &t in targets {
                max_child = max_child.max(1 + visit(t, edges, memo, on_path));
            }
        }

        on_path.remove(node);
        memo.insert(node, max_child);
        max_child
    }

    let mut on_path = HashSet::new();
    visit(module.path.as_str(), &edges, &mut memo, &mut on_path) as i64
}
