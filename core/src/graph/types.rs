use std::collections::HashMap;

/// Per-node state of the depth-first walk. Absent from the state map means UNVISITED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    InProgress,
    Done,
}

/// **RESOLUTION GRAPH**
///
/// Validated, dependency-first ordering of every node reachable from `root`.
/// **GUARANTEE**: each node appears exactly once and after all of its
/// dependencies; `root` is always last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionGraph {
    root: String,
    order: Vec<String>,
    positions: HashMap<String, usize>,
}

impl ResolutionGraph {
    pub(crate) fn new(root: &str, order: Vec<String>) -> Self {
        let positions = order
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();
        Self {
            root: root.to_string(),
            order,
            positions,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Dependency-first construction order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Reachable node names, in construction order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}
