//! Vertex builder and edge wiring.

use geo::Point;
use gridkit_core::geometry::GridKey;
use gridkit_core::{
    run_batches, Checkpoint, GridResult, GridStore, PointIndex, Stage, TopologyConfig, VertexId,
    VertexSet,
};
use rayon::prelude::*;
use tracing::{info, warn};

/// Rebuild the vertex set from current edge endpoints. Returns the number of
/// vertices.
pub fn build_vertices(store: &mut GridStore, config: &TopologyConfig) -> GridResult<usize> {
    let vertices = VertexSet::build(store.edges(), config.tolerances.vertex_grid);
    let count = vertices.len();
    store.replace_vertices(vertices);
    info!(vertices = count, "vertex set rebuilt");
    Ok(count)
}

/// Owned lookup structure so wiring can mutate edges while resolving.
struct VertexResolver {
    grid: f64,
    index: PointIndex,
    keys: Vec<GridKey>,
}

impl VertexResolver {
    fn new(vertices: &VertexSet) -> Self {
        Self {
            grid: vertices.grid(),
            index: vertices.index(),
            keys: vertices.iter().map(|v| v.key).collect(),
        }
    }

    /// Bounding-box candidates first, then exact cell equality.
    fn resolve(&self, point: Option<Point<f64>>) -> Option<VertexId> {
        let point = point?;
        let key = GridKey::of(point, self.grid);
        self.index
            .in_box(point, self.grid)
            .filter(|&pos| self.keys[pos] == key)
            .min()
            .map(|pos| VertexId::new(pos as u64 + 1))
    }
}

/// Set `source`/`target` of every edge. Returns the number of edges whose
/// wiring changed. Endpoints that cannot be resolved stay `None` and are
/// reported by the integrity audit as ghost edges.
pub fn wire_edges(
    store: &mut GridStore,
    config: &TopologyConfig,
    checkpoint: &mut dyn Checkpoint,
) -> GridResult<usize> {
    let resolver = VertexResolver::new(store.vertices()?);
    let plan = store.edge_batches(config.batch_size);

    let rewired = run_batches(Stage::Wire, plan, checkpoint, |range| {
        let changed = store
            .edges_in_range_mut(range)
            .par_iter_mut()
            .map(|edge| {
                let source = resolver.resolve(edge.start_point());
                let target = resolver.resolve(edge.end_point());
                let changed = edge.source != source || edge.target != target;
                edge.source = source;
                edge.target = target;
                changed
            })
            .filter(|changed| *changed)
            .count();
        Ok(changed)
    })?;

    let ghosts = store.edges().iter().filter(|e| e.is_ghost()).count();
    if ghosts > 0 {
        warn!(ghosts, "edges with unresolved endpoints after wiring");
    }
    info!(rewired, "edges wired to vertices");
    Ok(rewired)
}
