//! Graph propagation by neighbor voting.
//!
//! In each pass every unknown edge looks at the edges it shares a vertex
//! with. A neighbor votes with its voltage if it is natural, already
//! resolved, and the shared vertex is not a transformer/switch boundary.
//! The most frequent voltage wins; ties go to the lowest voltage.
//!
//! Votes are taken from a snapshot made at the start of the pass, so a
//! voltage travels at most one hop per pass regardless of batch order.

use std::cmp::Reverse;

use gridkit_core::{
    run_batches, Checkpoint, Edge, EdgeId, GridResult, GridStore, Stage, TopologyConfig, VertexId,
    Voltage, VoltageProvenance,
};
use hashbrown::{HashMap, HashSet};
use rayon::prelude::*;
use tracing::{debug, info};

/// Resolved natural edges by non-boundary vertex.
#[derive(Debug, Default)]
pub struct VoteTable {
    voters: HashMap<VertexId, Vec<(EdgeId, Voltage)>>,
}

impl VoteTable {
    pub fn snapshot(store: &GridStore) -> GridResult<Self> {
        let boundary = store.boundary()?;
        let mut voters: HashMap<VertexId, Vec<(EdgeId, Voltage)>> = HashMap::new();
        for edge in store.edges() {
            if edge.is_synthetic() || !edge.voltage.is_known() {
                continue;
            }
            let Some((s, t)) = edge.endpoints() else {
                continue;
            };
            for (i, v) in [s, t].into_iter().enumerate() {
                // self-loops register once
                if boundary.contains(v) || (i == 1 && s == t) {
                    continue;
                }
                voters.entry(v).or_default().push((edge.id, edge.voltage));
            }
        }
        Ok(Self { voters })
    }

    /// Winning voltage for `edge`, if any neighbor votes.
    pub fn vote(&self, edge: &Edge) -> Option<Voltage> {
        let (s, t) = edge.endpoints()?;
        let mut seen: HashSet<EdgeId> = HashSet::new();
        let mut tally: HashMap<Voltage, usize> = HashMap::new();
        for v in [s, t] {
            for &(id, voltage) in self.voters.get(&v).into_iter().flatten() {
                if id != edge.id && seen.insert(id) {
                    *tally.entry(voltage).or_insert(0) += 1;
                }
            }
        }
        tally
            .into_iter()
            .max_by_key(|&(voltage, count)| (count, Reverse(voltage)))
            .map(|(voltage, _)| voltage)
    }
}

/// One propagation pass. Returns the number of edges resolved.
pub fn propagation_pass(
    store: &mut GridStore,
    config: &TopologyConfig,
    checkpoint: &mut dyn Checkpoint,
) -> GridResult<usize> {
    let table = VoteTable::snapshot(store)?;
    let plan = store.edge_batches(config.batch_size);

    run_batches(Stage::Propagate, plan, checkpoint, |range| {
        let resolved = store
            .edges_in_range_mut(range)
            .par_iter_mut()
            .filter(|edge| !edge.voltage.is_known())
            .map(|edge| match table.vote(edge) {
                Some(voltage) => {
                    edge.voltage = voltage;
                    edge.voltage_provenance = VoltageProvenance::GraphInferred;
                    true
                }
                None => false,
            })
            .filter(|resolved| *resolved)
            .count();
        Ok(resolved)
    })
}

/// Run the configured number of passes. Returns the total number of edges
/// resolved.
pub fn propagate_voltages(
    store: &mut GridStore,
    config: &TopologyConfig,
    checkpoint: &mut dyn Checkpoint,
) -> GridResult<usize> {
    let mut total = 0;
    for pass in 1..=config.propagation_passes {
        let resolved = propagation_pass(store, config, checkpoint)?;
        debug!(pass, resolved, "propagation pass finished");
        total += resolved;
    }
    info!(
        passes = config.propagation_passes,
        resolved = total,
        "voltages propagated over the graph"
    );
    Ok(total)
}
