//! Dependency graph over planned steps.
//!
//! Vertices are planned steps keyed by moniker; an edge `a -> b` means
//! step `b` must be applied before step `a`. The graph exists only
//! while a plan is being built and is discarded once the step chain is
//! threaded.

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::error::PlanError;
use crate::resource::Moniker;

/// Transient ordering graph used during plan construction.
#[derive(Debug)]
pub(crate) struct PlanGraph {
    /// Underlying graph; node weights are the step monikers.
    graph: DiGraph<Moniker, ()>,
    /// Moniker to node index lookup.
    nodes: HashMap<Moniker, NodeIndex>,
}

impl PlanGraph {
    /// Creates an empty graph.
    pub(crate) fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
        }
    }

    /// Adds a vertex for a moniker, if not already present.
    pub(crate) fn add_vertex(&mut self, moniker: Moniker) {
        if !self.nodes.contains_key(&moniker) {
            let idx = self.graph.add_node(moniker.clone());
            self.nodes.insert(moniker, idx);
        }
    }

    /// Returns true if the moniker has a vertex.
    pub(crate) fn contains(&self, moniker: &Moniker) -> bool {
        self.nodes.contains_key(moniker)
    }

    /// Adds the edge `from -> to`, recording that `to` must be applied
    /// before `from`. Self-edges are skipped and duplicate edges are
    /// not added. Both endpoints must already have vertices.
    pub(crate) fn connect(&mut self, from: &Moniker, to: &Moniker) {
        if from == to {
            return;
        }
        let (Some(&a), Some(&b)) = (self.nodes.get(from), self.nodes.get(to)) else {
            return;
        };
        if self.graph.find_edge(a, b).is_none() {
            self.graph.add_edge(a, b, ());
        }
    }

    /// Produces a total order over the vertices such that for every
    /// edge `a -> b`, `b` precedes `a`.
    ///
    /// Among vertices whose prerequisites are all placed, the
    /// lexicographically smallest moniker is chosen, so the order is
    /// reproducible for identical inputs.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::CycleDetected`] naming the unplaceable
    /// monikers when the graph is not a DAG.
    pub(crate) fn sequence(&self) -> std::result::Result<Vec<Moniker>, PlanError> {
        let mut pending: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                (
                    idx,
                    self.graph.neighbors_directed(idx, Direction::Outgoing).count(),
                )
            })
            .collect();

        let mut ready: BTreeSet<Moniker> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(idx, _)| self.graph[*idx].clone())
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut placed: HashSet<NodeIndex> = HashSet::new();

        while let Some(moniker) = ready.pop_first() {
            let idx = self.nodes[&moniker];
            placed.insert(idx);
            order.push(moniker);

            for dependent in self.graph.neighbors_directed(idx, Direction::Incoming) {
                if let Some(count) = pending.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(self.graph[dependent].clone());
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            let mut members: Vec<Moniker> = self
                .graph
                .node_indices()
                .filter(|idx| !placed.contains(idx))
                .map(|idx| self.graph[idx].clone())
                .collect();
            members.sort();
            return Err(PlanError::CycleDetected { members });
        }

        Ok(order)
    }
}
