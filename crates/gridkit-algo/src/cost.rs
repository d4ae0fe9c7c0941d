//! Routing cost model: `cost = reverse_cost = length × factor`, with the
//! synthetic factor for bridges and 1.0 for natural edges.

use gridkit_core::{run_batches, Checkpoint, Edge, GridResult, GridStore, Stage, TopologyConfig};
use rayon::prelude::*;
use tracing::info;

/// Cost of traversing `edge` in either direction.
pub fn edge_cost(edge: &Edge, config: &TopologyConfig) -> f64 {
    let factor = if edge.is_synthetic() {
        config.synthetic_cost_factor
    } else {
        1.0
    };
    edge.length() * factor
}

/// Fill in cost and reverse cost for every edge that has none yet.
/// Returns the number of edges costed.
pub fn assign_costs(
    store: &mut GridStore,
    config: &TopologyConfig,
    checkpoint: &mut dyn Checkpoint,
) -> GridResult<usize> {
    let plan = store.edge_batches(config.batch_size);
    let costed = run_batches(Stage::Cost, plan, checkpoint, |range| {
        let costed = store
            .edges_in_range_mut(range)
            .par_iter_mut()
            .filter(|edge| edge.cost.is_none())
            .map(|edge| {
                let cost = edge_cost(edge, config);
                edge.cost = Some(cost);
                edge.reverse_cost = Some(cost);
            })
            .count();
        Ok(costed)
    })?;
    info!(costed, "edge costs assigned");
    Ok(costed)
}
