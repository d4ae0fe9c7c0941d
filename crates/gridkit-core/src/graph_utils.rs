use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};

use crate::error::GridResult;
use crate::{EdgeId, GridStore, VertexId};

/// Summary statistics of the vertex graph (degree distribution, component count).
#[derive(Debug, Clone, PartialEq)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub connected_components: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    pub density: f64,
}

/// Undirected multigraph of wired edges over the current vertex set.
///
/// Node weights are vertex ids (node index `i` holds vertex `i + 1`); ghost
/// edges are left out.
pub fn vertex_graph(store: &GridStore) -> GridResult<UnGraph<VertexId, EdgeId>> {
    let vertices = store.vertices()?;
    let wired = store.edges().iter().filter(|e| !e.is_ghost()).count();
    let mut graph = UnGraph::with_capacity(vertices.len(), wired);
    for vertex in vertices.iter() {
        graph.add_node(vertex.id);
    }
    let node = |id: VertexId| NodeIndex::new(id.value() as usize - 1);
    for edge in store.edges() {
        match edge.endpoints() {
            Some((s, t)) if vertices.get(s).is_some() && vertices.get(t).is_some() => {
                graph.add_edge(node(s), node(t), edge.id);
            }
            _ => {}
        }
    }
    Ok(graph)
}

/// Degree and connectivity statistics for the wired topology.
pub fn graph_stats(store: &GridStore) -> GridResult<GraphStats> {
    let graph = vertex_graph(store)?;
    let node_count = graph.node_count();
    let edge_count = graph.edge_count();

    let mut degrees = vec![0usize; node_count];
    for edge in graph.raw_edges() {
        degrees[edge.source().index()] += 1;
        degrees[edge.target().index()] += 1;
    }
    let min_degree = degrees.iter().copied().min().unwrap_or(0);
    let max_degree = degrees.iter().copied().max().unwrap_or(0);
    let avg_degree = if node_count == 0 {
        0.0
    } else {
        degrees.iter().sum::<usize>() as f64 / node_count as f64
    };
    let density = if node_count < 2 {
        0.0
    } else {
        2.0 * edge_count as f64 / (node_count as f64 * (node_count as f64 - 1.0))
    };

    Ok(GraphStats {
        node_count,
        edge_count,
        connected_components: connected_components(&graph),
        min_degree,
        avg_degree,
        max_degree,
        density,
    })
}
