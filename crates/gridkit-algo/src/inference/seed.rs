//! Seeding: unknown edges adopt the voltage of a nearby known asset.

use gridkit_core::{
    run_batches, Checkpoint, GridResult, GridStore, PointAsset, Stage, TopologyConfig, Voltage,
    VoltageProvenance,
};
use rayon::prelude::*;
use tracing::info;

use crate::rules::{first_match_line, ProximityRule};

type SeedRule = ProximityRule<(Voltage, VoltageProvenance)>;

fn known(
    name: &'static str,
    tolerance: f64,
    assets: &[PointAsset],
    provenance: VoltageProvenance,
) -> SeedRule {
    ProximityRule::new(
        name,
        tolerance,
        assets
            .iter()
            .filter(|a| a.voltage.is_known())
            .map(|a| (a.geometry, (a.voltage, provenance))),
    )
}

/// Known-voltage Nodes first, then known-voltage Towers.
pub fn seed_rules(store: &GridStore, config: &TopologyConfig) -> Vec<SeedRule> {
    vec![
        known(
            "node",
            config.tolerances.node_seed,
            &store.nodes,
            VoltageProvenance::InferredFromNode,
        ),
        known(
            "tower",
            config.tolerances.tower_seed,
            &store.towers,
            VoltageProvenance::InferredFromTower,
        ),
    ]
}

/// Seed every unknown-voltage edge. Returns the number of edges resolved.
pub fn seed_voltages(
    store: &mut GridStore,
    config: &TopologyConfig,
    checkpoint: &mut dyn Checkpoint,
) -> GridResult<usize> {
    let rules = seed_rules(store, config);
    let plan = store.edge_batches(config.batch_size);

    let seeded = run_batches(Stage::Seed, plan, checkpoint, |range| {
        let resolved = store
            .edges_in_range_mut(range)
            .par_iter_mut()
            .filter(|edge| !edge.voltage.is_known())
            .map(|edge| match first_match_line(&rules, &edge.geometry) {
                Some(hit) => {
                    let (voltage, provenance) = *hit.payload;
                    edge.voltage = voltage;
                    edge.voltage_provenance = provenance;
                    true
                }
                None => false,
            })
            .filter(|resolved| *resolved)
            .count();
        Ok(resolved)
    })?;

    info!(seeded, "edge voltages seeded from assets");
    Ok(seeded)
}
