//! Bidirectional call graph: an arena of nodes addressed by integer handle
//! (design note: avoids the ownership knots that `Rc`/`RefCell` cycles would
//! introduce, while keeping O(1) lookup), with `byName` for reverse-edge
//! resolution and a hard node cap as a resource-exhaustion guard. The BFS
//! helpers are grounded on the teacher's `trace::traverse::trace_symbol`
//! backward walk, generalized to forward/backward/auth-presence queries.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

pub type NodeId = u32;

/// A single call made from within a node's function body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEdge {
    pub target_function: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_file: Option<String>,
    /// Present only when an `import { foo as bar }` alias renamed the callee.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    pub line: u32,
}

/// A `(functionName, file)` pointer into a caller, attached to `calledBy`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerRef {
    pub function_name: String,
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallGraphNode {
    pub id: NodeId,
    pub file: String,
    pub function_name: String,
    pub line: u32,
    pub edges: Vec<CallEdge>,
    pub called_by: Vec<CallerRef>,
}

/// Flat, serializable call graph. `byName` is rebuilt from `nodes` on
/// deserialization (it is a derived index, not independent state) by calling
/// [`CallGraph::reindex`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallGraph {
    pub nodes: Vec<CallGraphNode>,
    #[serde(skip)]
    by_name: HashMap<String, Vec<NodeId>>,
    /// Set once the configured node cap is hit; surfaced so a caller can
    /// warn without the partial graph becoming invalid.
    #[serde(skip)]
    pub capped: bool,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node unless the cap has already been reached. Returns the
    /// new node's id, or `None` when the insertion was refused.
    pub fn insert_node(
        &mut self,
        file: String,
        function_name: String,
        line: u32,
        max_nodes: usize,
    ) -> Option<NodeId> {
        if self.nodes.len() >= max_nodes {
            self.capped = true;
            return None;
        }
        let id = self.nodes.len() as NodeId;
        self.by_name
            .entry(function_name.clone())
            .or_default()
            .push(id);
        self.nodes.push(CallGraphNode {
            id,
            file,
            function_name,
            line,
            edges: Vec::new(),
            called_by: Vec::new(),
        });
        Some(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&CallGraphNode> {
        self.nodes.get(id as usize)
    }

    pub fn nodes_by_name(&self, name: &str) -> &[NodeId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Adds an outgoing edge from `from`, deduplicating same-function,
    /// same-target repeat calls (pass 3's dedup rule).
    pub fn add_edge(&mut self, from: NodeId, edge: CallEdge) {
        if let Some(node) = self.nodes.get_mut(from as usize) {
            let dup = node.edges.iter().any(|e| {
                e.target_function == edge.target_function && e.target_file == edge.target_file
            });
            if !dup {
                node.edges.push(edge);
            }
        }
    }

    /// Pass 4: fills `calledBy` on every edge's resolved target, preferring a
    /// `byName` match scoped to `targetFile` and falling back to any
    /// same-name node when the file is unresolved.
    pub fn fill_reverse_edges(&mut self) {
        let mut reverse: HashMap<NodeId, Vec<CallerRef>> = HashMap::new();
        for node in &self.nodes {
            for edge in &node.edges {
                let candidates = self.by_name.get(&edge.target_function);
                let Some(candidates) = candidates else {
                    continue;
                };
                let target_id = match &edge.target_file {
                    Some(target_file) => candidates
                        .iter()
                        .find(|&&id| self.nodes[id as usize].file == *target_file)
                        .or_else(|| candidates.first()),
                    None => candidates.first(),
                };
                if let Some(&target_id) = target_id {
                    reverse.entry(target_id).or_default().push(CallerRef {
                        function_name: node.function_name.clone(),
                        file: node.file.clone(),
                    });
                }
            }
        }
        for (target_id, callers) in reverse {
            let node = &mut self.nodes[target_id as usize];
            for caller in callers {
                if !node.called_by.contains(&caller) {
                    node.called_by.push(caller);
                }
            }
        }
    }

    /// Reverse BFS: who (transitively) calls `name`, up to `max_depth` hops.
    pub fn find_callers_of(&self, name: &str, max_depth: usize) -> Vec<(String, String, usize)> {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();
        let mut out = Vec::new();

        for &id in self.nodes_by_name(name) {
            if seen.insert(id) {
                queue.push_back((id, 0));
            }
        }

        while let Some((id, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let Some(node) = self.node(id) else { continue };
            for caller in &node.called_by {
                let caller_ids: Vec<NodeId> = self
                    .nodes_by_name(&caller.function_name)
                    .iter()
                    .filter(|&&cid| self.nodes[cid as usize].file == caller.file)
                    .copied()
                    .collect();
                for caller_id in caller_ids {
                    out.push((
                        caller.function_name.clone(),
                        caller.file.clone(),
                        depth + 1,
                    ));
                    if seen.insert(caller_id) {
                        queue.push_back((caller_id, depth + 1));
                    }
                }
            }
        }
        out
    }

    /// Forward BFS: what `name` (defined in `file`) transitively calls.
    pub fn find_callees_of(
        &self,
        name: &str,
        file: &str,
        max_depth: usize,
    ) -> Vec<(String, String, usize)> {
        let start = self
            .nodes_by_name(name)
            .iter()
            .find(|&&id| self.nodes[id as usize].file == file)
            .copied();

        let Some(start) = start else { return Vec::new() };
        let mut seen: HashSet<NodeId> = HashSet::new();
        seen.insert(start);
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::from([(start, 0)]);
        let mut out = Vec::new();

        while let Some((id, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let Some(node) = self.node(id) else { continue };
            for edge in &node.edges {
                let callee_ids: Vec<NodeId> = match &edge.target_file {
                    Some(target_file) => self
                        .nodes_by_name(&edge.target_function)
                        .iter()
                        .filter(|&&cid| self.nodes[cid as usize].file == *target_file)
                        .copied()
                        .collect(),
                    None => self.nodes_by_name(&edge.target_function).to_vec(),
                };
                for callee_id in callee_ids {
                    out.push((
                        edge.target_function.clone(),
                        edge.target_file.clone().unwrap_or_default(),
                        depth + 1,
                    ));
                    if seen.insert(callee_id) {
                        queue.push_back((callee_id, depth + 1));
                    }
                }
            }
        }
        out
    }

    /// True if `target` itself, or any (transitive, depth-bounded) caller of
    /// it, calls a function named in `auth_functions`.
    pub fn has_auth_in_call_chain(
        &self,
        target: &str,
        auth_functions: &HashSet<String>,
        max_depth: usize,
    ) -> bool {
        let calls_auth = |id: NodeId| -> bool {
            self.node(id)
                .map(|n| {
                    n.edges
                        .iter()
                        .any(|e| auth_functions.contains(&e.target_function))
                })
                .unwrap_or(false)
        };

        if self.nodes_by_name(target).iter().any(|&id| calls_auth(id)) {
            return true;
        }

        for &id in self.nodes_by_name(target) {
            if self
                .find_callers_of(&self.nodes[id as usize].function_name.clone(), max_depth)
                .iter()
                .any(|(name, file, _)| {
                    self.nodes_by_name(name)
                        .iter()
                        .filter(|&&cid| self.nodes[cid as usize].file == *file)
                        .any(|&cid| calls_auth(cid))
                })
            {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_simple_chain() -> CallGraph {
        let mut g = CallGraph::new();
        let route = g
            .insert_node("routes/x.ts".into(), "routeHandler".into(), 1, 500_000)
            .unwrap();
        let svc = g
            .insert_node("services/user.ts".into(), "fetch".into(), 1, 500_000)
            .unwrap();
        let db = g
            .insert_node("db/index.ts".into(), "find".into(), 1, 500_000)
            .unwrap();
        g.add_edge(
            route,
            CallEdge {
                target_function: "requireAuth".into(),
                target_file: None,
                original_name: None,
                line: 2,
            },
        );
        g.add_edge(
            route,
            CallEdge {
                target_function: "fetch".into(),
                target_file: Some("services/user.ts".into()),
                original_name: None,
                line: 3,
            },
        );
        g.add_edge(
            svc,
            CallEdge {
                target_function: "find".into(),
                target_file: Some("db/index.ts".into()),
                original_name: None,
                line: 1,
            },
        );
        let _ = db;
        g.fill_reverse_edges();
        g
    }

    #[test]
    fn reverse_edges_are_bidirectional() {
        let g = build_simple_chain();
        let fetch_node = &g.nodes[g.nodes_by_name("fetch")[0] as usize];
        assert_eq!(fetch_node.called_by.len(), 1);
        assert_eq!(fetch_node.called_by[0].function_name, "routeHandler");
    }

    #[test]
    fn auth_propagates_through_call_chain() {
        let g = build_simple_chain();
        let auth_fns: HashSet<String> = ["requireAuth".to_string()].into_iter().collect();
        assert!(g.has_auth_in_call_chain("fetch", &auth_fns, 5));
        assert!(!g.has_auth_in_call_chain("find", &auth_fns, 0));
    }

    #[test]
    fn node_cap_halts_insertion() {
        let mut g = CallGraph::new();
        assert!(g.insert_node("a.ts".into(), "a".into(), 1, 1).is_some());
        assert!(g.insert_node("b.ts".into(), "b".into(), 1, 1).is_none());
        assert!(g.capped);
    }
}
