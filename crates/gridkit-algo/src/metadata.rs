//! Degree & role calculator.
//!
//! Recomputes vertex degrees and the transformer/switch boundary flags from
//! the current edges and towers and swaps them into the store.

use gridkit_core::{BoundarySet, DegreeTable, GridResult, GridStore, TopologyConfig};
use tracing::info;

/// Result of a metadata rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataSummary {
    pub vertices: usize,
    pub dead_ends: usize,
    pub boundary_vertices: usize,
}

/// Rebuild only the degree table (after edges were added or removed).
pub fn rebuild_degrees(store: &mut GridStore) -> GridResult<usize> {
    let degrees = DegreeTable::build(store.vertices()?, store.edges());
    let count = degrees.len();
    store.replace_degrees(degrees);
    Ok(count)
}

/// Rebuild degrees and boundary flags.
pub fn compute_metadata(
    store: &mut GridStore,
    config: &TopologyConfig,
) -> GridResult<MetadataSummary> {
    let vertices = store.vertices()?;
    let degrees = DegreeTable::build(vertices, store.edges());
    let boundary = BoundarySet::build(vertices, &store.towers, config.tolerances.boundary);

    let summary = MetadataSummary {
        vertices: vertices.len(),
        dead_ends: degrees.iter().filter(|(_, d)| *d == 1).count(),
        boundary_vertices: boundary.len(),
    };
    store.replace_degrees(degrees);
    store.replace_boundary(boundary);

    info!(
        vertices = summary.vertices,
        degree_one = summary.dead_ends,
        boundary = summary.boundary_vertices,
        "graph metadata rebuilt"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertices::{build_vertices, wire_edges};
    use geo::{line_string, Point};
    use gridkit_core::{AssetId, Edge, EdgeId, NoopCheckpoint, PointAsset, PointKind};

    #[test]
    fn test_degree_sum_is_twice_edge_count() {
        let mut store = GridStore::new();
        store.push_edge(Edge::natural(
            EdgeId::new(1),
            "line",
            line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
        ));
        store.push_edge(Edge::natural(
            EdgeId::new(2),
            "line",
            line_string![(x: 10.0, y: 0.0), (x: 20.0, y: 0.0)],
        ));
        store.push_edge(Edge::natural(
            EdgeId::new(3),
            "line",
            line_string![(x: 10.0, y: 0.0), (x: 10.0, y: 10.0)],
        ));
        store.towers.push(PointAsset::new(
            AssetId::new(1),
            PointKind::Transformer,
            Point::new(10.0, 1.0),
        ));

        let config = TopologyConfig::default();
        build_vertices(&mut store, &config).unwrap();
        wire_edges(&mut store, &config, &mut NoopCheckpoint).unwrap();
        let summary = compute_metadata(&mut store, &config).unwrap();

        assert_eq!(summary.vertices, 4);
        assert_eq!(summary.dead_ends, 3);
        assert_eq!(summary.boundary_vertices, 1);
        assert_eq!(store.degrees().unwrap().total(), 2 * store.edges().len());
    }
}
