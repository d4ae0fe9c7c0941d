//! End-to-end topology and inference scenarios on small hand-built grids.

use geo::{line_string, LineString, Point};
use gridkit_algo::{
    bridge_gaps, build_vertices, compute_metadata, propagation_pass, run_pipeline, snap_endpoints,
    split_lines, wire_edges,
};
use gridkit_core::{
    AssetId, Edge, EdgeId, GridStore, NoopCheckpoint, PointAsset, PointKind, TopologyConfig,
    Voltage, VoltageProvenance,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn line(id: u64, geometry: LineString<f64>, voltage: u32) -> Edge {
    let edge = Edge::natural(EdgeId::new(id), "line", geometry);
    if voltage > 0 {
        edge.with_voltage(Voltage::new(voltage), VoltageProvenance::Raw)
    } else {
        edge
    }
}

/// Split, snap, vertices, wiring and metadata.
fn build_topology(store: &mut GridStore, config: &TopologyConfig) {
    split_lines(store, config).unwrap();
    snap_endpoints(store, config, &mut NoopCheckpoint).unwrap();
    build_vertices(store, config).unwrap();
    wire_edges(store, config, &mut NoopCheckpoint).unwrap();
    compute_metadata(store, config).unwrap();
}

#[test]
fn scenario_a_nearby_endpoints_share_tower_vertex() {
    init_tracing();
    let config = TopologyConfig::default();
    let mut store = GridStore::new();
    store.push_point(PointAsset::new(
        AssetId::new(1),
        PointKind::Tower,
        Point::new(100.0, 0.0),
    ));
    store.push_edge(line(1, line_string![(x: 0.0, y: 0.0), (x: 99.0, y: 0.0)], 0));
    store.push_edge(line(2, line_string![(x: 101.0, y: 0.0), (x: 200.0, y: 0.0)], 0));

    build_topology(&mut store, &config);

    let edges = store.edges();
    assert_eq!(edges[0].end_point(), Some(Point::new(100.0, 0.0)));
    assert_eq!(edges[1].start_point(), Some(Point::new(100.0, 0.0)));
    assert!(edges[0].target.is_some());
    assert_eq!(edges[0].target, edges[1].source);

    let vertices = store.vertices().unwrap();
    assert_eq!(vertices.len(), 3);
    let shared = edges[0].target.unwrap();
    assert_eq!(store.degrees().unwrap().degree(shared), 2);
}

#[test]
fn scenario_b_bridges_close_gaps_only() {
    init_tracing();
    let config = TopologyConfig::default();
    let mut store = GridStore::new();
    // 150 units apart
    store.push_edge(line(1, line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)], 400));
    store.push_edge(line(2, line_string![(x: 250.0, y: 0.0), (x: 350.0, y: 0.0)], 400));
    // 250 units apart
    store.push_edge(line(3, line_string![(x: 1000.0, y: 0.0), (x: 1100.0, y: 0.0)], 400));
    store.push_edge(line(4, line_string![(x: 1350.0, y: 0.0), (x: 1450.0, y: 0.0)], 400));

    build_topology(&mut store, &config);
    let inserted = bridge_gaps(&mut store, &config).unwrap();
    assert_eq!(inserted, 1);

    let bridges: Vec<_> = store.edges().iter().filter(|e| e.is_synthetic()).collect();
    assert_eq!(bridges.len(), 1);
    let bridge = bridges[0];
    assert_eq!(bridge.id, EdgeId::new(5));
    assert_eq!(bridge.voltage, Voltage::new(400));
    assert_eq!(bridge.voltage_provenance, VoltageProvenance::Synthetic);
    assert_eq!(bridge.start_point(), Some(Point::new(100.0, 0.0)));
    assert_eq!(bridge.end_point(), Some(Point::new(250.0, 0.0)));

    let degrees = store.degrees().unwrap();
    let (s, t) = bridge.endpoints().unwrap();
    assert_eq!(degrees.degree(s), 2);
    assert_eq!(degrees.degree(t), 2);
}

#[test]
fn scenario_c_majority_vote_wins() {
    init_tracing();
    let config = TopologyConfig::default();
    let mut store = GridStore::new();
    store.push_edge(line(1, line_string![(x: 0.0, y: 0.0), (x: -100.0, y: 0.0)], 0));
    store.push_edge(line(2, line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)], 220));
    store.push_edge(line(3, line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 100.0)], 220));
    store.push_edge(line(4, line_string![(x: 0.0, y: 0.0), (x: 0.0, y: -100.0)], 110));

    build_topology(&mut store, &config);
    let resolved = propagation_pass(&mut store, &config, &mut NoopCheckpoint).unwrap();

    assert_eq!(resolved, 1);
    let edge = &store.edges()[0];
    assert_eq!(edge.voltage, Voltage::new(220));
    assert_eq!(edge.voltage_provenance, VoltageProvenance::GraphInferred);
}

#[test]
fn scenario_d_transformer_blocks_propagation() {
    init_tracing();
    let mut store = GridStore::new();
    store.push_point(PointAsset::new(
        AssetId::new(1),
        PointKind::Transformer,
        Point::new(0.0, 0.0),
    ));
    store.push_edge(line(1, line_string![(x: 0.0, y: 0.0), (x: -100.0, y: 0.0)], 0));
    store.push_edge(line(2, line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)], 220));

    let (store, report) = run_pipeline(store, TopologyConfig::default()).unwrap();

    assert_eq!(store.boundary().unwrap().len(), 1);
    let blocked = &store.edges()[0];
    assert!(!blocked.voltage.is_known());
    assert_eq!(blocked.voltage_provenance, VoltageProvenance::Raw);
    assert_eq!(
        report
            .integrity
            .tally(gridkit_core::AssetClass::Line)
            .map(|t| t.unresolved),
        Some(1)
    );
}

/// Substation feeding a split line, a tower-snapped continuation and a
/// bridged gap.
fn connected_grid() -> GridStore {
    let mut store = GridStore::new();
    store.push_point(
        PointAsset::new(
            AssetId::new(1),
            PointKind::SubstationIcon,
            Point::new(0.0, 0.0),
        )
        .with_voltage(Voltage::new(220)),
    );
    store.push_point(PointAsset::new(
        AssetId::new(2),
        PointKind::Tower,
        Point::new(500.0, 0.0),
    ));
    store.push_point(PointAsset::new(
        AssetId::new(3),
        PointKind::Tower,
        Point::new(1000.0, 800.0),
    ));
    store.push_edge(line(10, line_string![(x: 0.0, y: 0.0), (x: 1000.0, y: 0.0)], 0));
    store.push_edge(line(
        20,
        line_string![(x: 1000.0, y: 0.0), (x: 1000.0, y: 800.0)],
        0,
    ));
    store.push_edge(line(
        30,
        line_string![(x: 1002.0, y: 801.0), (x: 1500.0, y: 800.0)],
        220,
    ));
    store.push_edge(line(
        40,
        line_string![(x: 1600.0, y: 800.0), (x: 2000.0, y: 800.0)],
        220,
    ));
    store
}

#[test]
fn scenario_e_connected_grid_audits_clean() {
    init_tracing();
    let (store, report) = run_pipeline(connected_grid(), TopologyConfig::default()).unwrap();
    let integrity = &report.integrity;

    assert!(integrity.is_sound());
    assert!(integrity.require_sound().is_ok());
    assert_eq!(integrity.ghost_edges, 0);
    assert_eq!(integrity.orphan_vertices, 0);
    assert_eq!(integrity.connected_components, 1);
    assert_eq!(integrity.vertices, 7);
    assert_eq!(integrity.edges, 6);
    assert_eq!(integrity.synthetic_edges, 1);
    assert_eq!(integrity.unresolved_total(), 0);

    // split at the tower, seeded from the substation, then propagated
    let edges = store.edges();
    assert_eq!(edges[0].voltage_provenance, VoltageProvenance::InferredFromNode);
    assert_eq!(edges[1].voltage_provenance, VoltageProvenance::GraphInferred);
    assert_eq!(edges[2].voltage_provenance, VoltageProvenance::GraphInferred);
    assert!(edges.iter().all(|e| e.voltage == Voltage::new(220)));
    assert!(store
        .towers
        .iter()
        .all(|t| t.voltage_provenance == VoltageProvenance::InferredFromLine));

    let text = integrity.to_string();
    assert!(text.contains("GEOMETRIC INTEGRITY"));
    assert!(text.contains("REMAINING GAPS"));
}
