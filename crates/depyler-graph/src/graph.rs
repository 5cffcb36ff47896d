//! The bidirectional call graph the Librarian clusters over.

use crate::error::GraphError;
use depyler_hir::FunctionUnit;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;

/// An undirected call graph: an edge between two functions means one calls
/// the other (direction is discarded — clustering only cares about
/// reachability, per `librarian.py`'s bidirectional adjacency).
pub struct CallGraph {
    pub graph: UnGraph<String, ()>,
    pub index_of: HashMap<String, NodeIndex>,
}

impl CallGraph {
    /// # Errors
    /// Returns [`GraphError::DuplicateAddress`] if two functions share an
    /// address — a violation of the function-identity invariant (§3).
    pub fn build(functions: &[FunctionUnit]) -> Result<Self, GraphError> {
        let mut graph = UnGraph::new_undirected();
        let mut index_of = HashMap::with_capacity(functions.len());

        for function in functions {
            if index_of.contains_key(&function.address) {
                return Err(GraphError::DuplicateAddress(function.address.clone()));
            }
            let idx = graph.add_node(function.address.clone());
            index_of.insert(function.address.clone(), idx);
        }

        for function in functions {
            let Some(&from) = index_of.get(&function.address) else {
                continue;
            };
            for call in &function.calls {
                if let Some(&to) = index_of.get(&call.callee_address) {
                    if from != to && !graph.contains_edge(from, to) {
                        graph.add_edge(from, to, ());
                    }
                }
            }
        }

        Ok(Self { graph, index_of })
    }

    #[must_use]
    pub fn neighbors_of(&self, address: &str) -> Vec<String> {
        let Some(&idx) = self.index_of.get(address) else {
            return Vec::new();
        };
        self.graph
            .neighbors(idx)
            .map(|n| self.graph[n].clone())
            .collect()
    }

    #[must_use]
    pub fn degree_of(&self, address: &str) -> usize {
        self.index_of
            .get(address)
            .map_or(0, |&idx| self.graph.neighbors(idx).count())
    }
}
