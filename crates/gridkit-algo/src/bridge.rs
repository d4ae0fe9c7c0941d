//! Gap bridger.
//!
//! A *dead end* is a vertex of degree exactly 1 whose incident edge has a
//! known voltage. Pairs of dead ends at the same voltage and within the
//! bridge tolerance are joined by a straight synthetic edge, unless an edge
//! already connects them.
//!
//! The stage starts by deleting all synthetic edges and recomputing degrees,
//! so dead ends always come from the current topology and a re-run yields
//! the same set of bridges.

use geo::Point;
use gridkit_core::{
    Edge, EdgeId, GridResult, GridStore, PointIndex, TopologyConfig, VertexId, Voltage,
};
use hashbrown::HashSet;
use tracing::{debug, info};

use crate::metadata::rebuild_degrees;

/// A degree-1 vertex carrying the voltage of its single edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeadEnd {
    pub vertex: VertexId,
    pub point: Point<f64>,
    pub voltage: Voltage,
}

/// Dead ends of the current topology, ordered by vertex id.
///
/// Requires an up-to-date degree table.
pub fn dead_ends(store: &GridStore) -> GridResult<Vec<DeadEnd>> {
    let vertices = store.vertices()?;
    let degrees = store.degrees()?;

    let mut found: Vec<DeadEnd> = store
        .edges()
        .iter()
        .filter(|e| e.voltage.is_known())
        .flat_map(|e| {
            [e.source, e.target]
                .into_iter()
                .flatten()
                .map(move |v| (v, e.voltage))
        })
        .filter(|(v, _)| degrees.degree(*v) == 1)
        .filter_map(|(v, voltage)| {
            vertices.get(v).map(|vertex| DeadEnd {
                vertex: v,
                point: vertex.geometry,
                voltage,
            })
        })
        .collect();
    found.sort_by_key(|d| d.vertex);
    Ok(found)
}

fn pair_key(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Remove previous bridges and insert fresh ones. Returns the number of
/// synthetic edges inserted.
pub fn bridge_gaps(store: &mut GridStore, config: &TopologyConfig) -> GridResult<usize> {
    let removed = store.retain_edges(|e| !e.is_synthetic());
    if removed > 0 {
        debug!(removed, "previous synthetic edges removed");
    }
    rebuild_degrees(store)?;

    let ends = dead_ends(store)?;
    let index = PointIndex::new(ends.iter().enumerate().map(|(i, d)| (i, d.point)));
    let mut connected: HashSet<(VertexId, VertexId)> = store
        .edges()
        .iter()
        .filter_map(|e| e.endpoints())
        .map(|(s, t)| pair_key(s, t))
        .collect();

    let mut bridges = Vec::new();
    for (i, d1) in ends.iter().enumerate() {
        for j in index.within(d1.point, config.tolerances.bridge) {
            let d2 = &ends[j];
            if j <= i || d1.voltage != d2.voltage {
                continue;
            }
            if connected.insert(pair_key(d1.vertex, d2.vertex)) {
                bridges.push((*d1, *d2));
            }
        }
    }

    let mut next_id = store.next_edge_id().value();
    let inserted = bridges.len();
    for (d1, d2) in bridges {
        store.push_edge(Edge::synthetic(
            EdgeId::new(next_id),
            (d1.vertex, d1.point),
            (d2.vertex, d2.point),
            d1.voltage,
        ));
        next_id += 1;
    }
    rebuild_degrees(store)?;

    info!(dead_ends = ends.len(), bridges = inserted, "dead ends bridged");
    Ok(inserted)
}
