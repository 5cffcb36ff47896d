//! `{nodes, links}` visualization side-output for the dashboard's graph
//! event channel (§6).

use crate::graph::CallGraph;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct VizNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VizLink {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct VizGraph {
    pub nodes: Vec<VizNode>,
    pub links: Vec<VizLink>,
}

#[must_use]
pub fn visualization_data(graph: &CallGraph) -> VizGraph {
    let nodes = graph
        .graph
        .node_indices()
        .map(|idx| VizNode {
            id: graph.graph[idx].clone(),
            label: graph.graph[idx].clone(),
        })
        .collect();

    let links = graph
        .graph
        .edge_indices()
        .filter_map(|edge| {
            let (a, b) = graph.graph.edge_endpoints(edge)?;
            Some(VizLink {
                source: graph.graph[a].clone(),
                target: graph.graph[b].clone(),
            })
        })
        .collect();

    VizGraph { nodes, links }
}
