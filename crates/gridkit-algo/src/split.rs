//! Geometry splitter.
//!
//! Cuts every conductor line at the towers standing on (or within the split
//! tolerance of) it, so no segment passes silently through an intermediate
//! asset. The output replaces the edge collection and is re-indexed with
//! fresh sequential ids in input order.
//!
//! A tower within the tower snap tolerance of a line's own end is not a cut:
//! the snapper attaches that end to it instead.

use geo::{LineString, Point};
use gridkit_core::geometry::{end_point, point_distance, split_line, start_point};
use gridkit_core::{Edge, EdgeId, GridResult, GridStore, PointIndex, TopologyConfig};
use rayon::prelude::*;
use tracing::info;

/// Outcome of a split run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitSummary {
    pub lines_in: usize,
    pub lines_split: usize,
    pub segments_out: usize,
}

/// Split all edges of `store` at nearby towers.
///
/// Every piece inherits kind, voltage, provenance and original id of the
/// line it was cut from. All derived topology is dropped.
pub fn split_lines(store: &mut GridStore, config: &TopologyConfig) -> GridResult<SplitSummary> {
    let tolerance = config.tolerances.split;
    let terminal = config.tolerances.tower_snap;
    let towers: Vec<_> = store.towers.iter().map(|t| t.geometry).collect();
    let index = PointIndex::new(towers.iter().copied().enumerate());

    let pieces: Vec<(usize, Vec<LineString<f64>>)> = store
        .edges()
        .par_iter()
        .enumerate()
        .map(|(i, edge)| {
            let ends = [start_point(&edge.geometry), end_point(&edge.geometry)];
            let cuts: Vec<_> = index
                .near_line(&edge.geometry, tolerance)
                .into_iter()
                .map(|pos| towers[pos])
                .filter(|tower| !near_any(*tower, &ends, terminal))
                .collect();
            (i, split_line(&edge.geometry, &cuts))
        })
        .collect();

    let mut summary = SplitSummary {
        lines_in: store.edges().len(),
        ..SplitSummary::default()
    };
    let mut next_id = 1u64;
    let mut out = Vec::with_capacity(pieces.iter().map(|(_, p)| p.len()).sum());
    for (i, parts) in pieces {
        let source = &store.edges()[i];
        if parts.len() > 1 {
            summary.lines_split += 1;
        }
        for geometry in parts {
            out.push(Edge {
                id: EdgeId::new(next_id),
                geometry,
                source: None,
                target: None,
                cost: None,
                reverse_cost: None,
                ..source.clone()
            });
            next_id += 1;
        }
    }
    summary.segments_out = out.len();
    store.replace_edges(out);

    info!(
        lines = summary.lines_in,
        split = summary.lines_split,
        segments = summary.segments_out,
        "lines split at towers"
    );
    Ok(summary)
}

fn near_any(point: Point<f64>, ends: &[Option<Point<f64>>], tolerance: f64) -> bool {
    ends.iter()
        .flatten()
        .any(|end| point_distance(point, *end) <= tolerance)
}
