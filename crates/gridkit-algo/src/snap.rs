//! Endpoint snapper.
//!
//! Each edge endpoint is pulled onto the nearest Node within the node
//! tolerance or, failing that, the nearest Tower within the tower tolerance.
//! The rules are evaluated by the generic first-match procedure of
//! [`crate::rules`]. Work is batched over edge-id ranges. An edge whose two
//! ends land on the same asset would become a self-loop and is removed.

use geo::Point;
use gridkit_core::geometry::with_endpoints;
use gridkit_core::{
    run_batches, Checkpoint, GridResult, GridStore, PointAsset, Stage, TopologyConfig,
};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::rules::{first_match_point, ProximityRule};

fn attraction_rule(
    name: &'static str,
    tolerance: f64,
    assets: &[PointAsset],
) -> ProximityRule<()> {
    ProximityRule::new(name, tolerance, assets.iter().map(|a| (a.geometry, ())))
}

/// Node attraction before tower attraction.
pub fn snap_rules(store: &GridStore, config: &TopologyConfig) -> Vec<ProximityRule<()>> {
    vec![
        attraction_rule("node", config.tolerances.node_snap, &store.nodes),
        attraction_rule("tower", config.tolerances.tower_snap, &store.towers),
    ]
}

fn resolve(rules: &[ProximityRule<()>], point: Point<f64>) -> Point<f64> {
    first_match_point(rules, point)
        .map(|m| m.point)
        .unwrap_or(point)
}

/// Snap both endpoints of every edge. Returns the number of edges whose
/// geometry changed; a second run returns 0.
///
/// Edges whose snapped start equals their end are dropped after the last
/// batch.
pub fn snap_endpoints(
    store: &mut GridStore,
    config: &TopologyConfig,
    checkpoint: &mut dyn Checkpoint,
) -> GridResult<usize> {
    let rules = snap_rules(store, config);
    let plan = store.edge_batches(config.batch_size);
    store.clear_topology();

    let moved = run_batches(Stage::Snap, plan, checkpoint, |range| {
        let changed = store
            .edges_in_range_mut(range)
            .par_iter_mut()
            .filter_map(|edge| {
                let (start, end) = (edge.start_point()?, edge.end_point()?);
                let (new_start, new_end) = (resolve(&rules, start), resolve(&rules, end));
                if new_start == start && new_end == end {
                    return None;
                }
                edge.geometry = with_endpoints(&edge.geometry, new_start, new_end);
                Some(())
            })
            .count();
        Ok(changed)
    })?;

    let collapsed = store.retain_edges(|edge| edge.start_point() != edge.end_point());
    if collapsed > 0 {
        warn!(collapsed, "edges collapsed onto a single asset removed");
    }
    info!(moved, "endpoints snapped to assets");
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;
    use gridkit_core::{AssetId, Edge, EdgeId, NoopCheckpoint, PointKind};

    fn asset(id: i64, kind: PointKind, x: f64, y: f64) -> PointAsset {
        PointAsset::new(AssetId::new(id), kind, Point::new(x, y))
    }

    #[test]
    fn test_node_wins_over_closer_tower() {
        let mut store = GridStore::new();
        store.push_point(asset(1, PointKind::SubstationIcon, 0.0, 40.0));
        store.push_point(asset(2, PointKind::Tower, 1.0, 0.0));
        store.push_edge(Edge::natural(
            EdgeId::new(1),
            "line",
            line_string![(x: 0.0, y: 0.0), (x: 500.0, y: 0.0)],
        ));

        let moved = snap_endpoints(&mut store, &TopologyConfig::default(), &mut NoopCheckpoint)
            .unwrap();
        assert_eq!(moved, 1);
        let edge = &store.edges()[0];
        assert_eq!(edge.start_point(), Some(Point::new(0.0, 40.0)));
        assert_eq!(edge.end_point(), Some(Point::new(500.0, 0.0)));
    }

    #[test]
    fn test_snapping_is_idempotent() {
        let mut store = GridStore::new();
        store.push_point(asset(1, PointKind::Tower, 10.0, 1.0));
        store.push_edge(Edge::natural(
            EdgeId::new(1),
            "line",
            line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 3.0), (x: 9.0, y: 0.0)],
        ));

        let config = TopologyConfig::default();
        assert_eq!(snap_endpoints(&mut store, &config, &mut NoopCheckpoint).unwrap(), 1);
        assert_eq!(snap_endpoints(&mut store, &config, &mut NoopCheckpoint).unwrap(), 0);
        let edge = &store.edges()[0];
        assert_eq!(edge.geometry.0.len(), 3);
        assert_eq!(edge.end_point(), Some(Point::new(10.0, 1.0)));
    }

    #[test]
    fn test_edge_collapsing_onto_one_asset_is_removed() {
        let mut store = GridStore::new();
        store.push_point(asset(1, PointKind::Tower, 99.0, 2.0));
        store.push_edge(Edge::natural(
            EdgeId::new(1),
            "line",
            line_string![(x: 0.0, y: 0.0), (x: 98.0, y: 0.0)],
        ));
        store.push_edge(Edge::natural(
            EdgeId::new(2),
            "line",
            line_string![(x: 98.0, y: 0.0), (x: 100.0, y: 0.0)],
        ));

        snap_endpoints(&mut store, &TopologyConfig::default(), &mut NoopCheckpoint).unwrap();
        let ids: Vec<_> = store.edges().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![EdgeId::new(1)]);
        assert_eq!(store.edges()[0].end_point(), Some(Point::new(99.0, 2.0)));
    }
}
