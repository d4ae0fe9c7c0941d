//! In-memory grid store.
//!
//! [`GridStore`] owns the three top-level collections (point assets, area
//! assets, edges) and the current derived topology. Edges are kept sorted by
//! id so that batch ranges map to contiguous slices.

use tracing::debug;

use crate::batch::{BatchPlan, BatchRange};
use crate::error::{GridError, GridResult};
use crate::topology::{BoundarySet, DegreeTable, VertexSet};
use crate::{AreaAsset, Edge, EdgeId, PointAsset, PointClass};

#[derive(Debug, Clone, Default)]
pub struct GridStore {
    pub nodes: Vec<PointAsset>,
    pub towers: Vec<PointAsset>,
    pub areas: Vec<AreaAsset>,
    edges: Vec<Edge>,
    vertices: Option<VertexSet>,
    degrees: Option<DegreeTable>,
    boundary: Option<BoundarySet>,
}

impl GridStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a point asset to the node or tower collection by its kind.
    pub fn push_point(&mut self, asset: PointAsset) {
        match asset.class() {
            PointClass::Node => self.nodes.push(asset),
            PointClass::Tower => self.towers.push(asset),
        }
    }

    pub fn points(&self) -> impl Iterator<Item = &PointAsset> {
        self.nodes.iter().chain(self.towers.iter())
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Mutable access to edge attributes. Ids must not be changed through
    /// this slice.
    pub fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|idx| &self.edges[idx])
    }

    /// Insert an edge, keeping id order. Degrees become stale.
    pub fn push_edge(&mut self, edge: Edge) {
        match self.edges.last() {
            Some(last) if last.id >= edge.id => {
                let pos = self.edges.partition_point(|e| e.id < edge.id);
                self.edges.insert(pos, edge);
            }
            _ => self.edges.push(edge),
        }
        self.degrees = None;
    }

    /// Replace the whole edge collection. All derived state is dropped.
    pub fn replace_edges(&mut self, mut edges: Vec<Edge>) {
        edges.sort_by_key(|e| e.id);
        self.edges = edges;
        self.clear_topology();
    }

    /// Remove edges not matching `keep`. Returns the number removed.
    pub fn retain_edges<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&Edge) -> bool,
    {
        let before = self.edges.len();
        self.edges.retain(keep);
        let removed = before - self.edges.len();
        if removed > 0 {
            self.degrees = None;
        }
        removed
    }

    pub fn max_edge_id(&self) -> Option<u64> {
        self.edges.last().map(|e| e.id.value())
    }

    pub fn next_edge_id(&self) -> EdgeId {
        EdgeId::new(self.max_edge_id().unwrap_or(0) + 1)
    }

    /// Batch plan over the current edge ids.
    pub fn edge_batches(&self, batch_size: usize) -> BatchPlan {
        BatchPlan::new(self.max_edge_id(), batch_size)
    }

    fn range_bounds(&self, range: BatchRange) -> (usize, usize) {
        let start = self.edges.partition_point(|e| e.id.value() <= range.lo());
        let end = self.edges.partition_point(|e| e.id.value() <= range.hi());
        (start, end)
    }

    /// Edges whose id falls in `range`.
    pub fn edges_in_range(&self, range: BatchRange) -> &[Edge] {
        let (start, end) = self.range_bounds(range);
        &self.edges[start..end]
    }

    pub fn edges_in_range_mut(&mut self, range: BatchRange) -> &mut [Edge] {
        let (start, end) = self.range_bounds(range);
        &mut self.edges[start..end]
    }

    /// Drop every derived collection (edge geometry changed).
    pub fn clear_topology(&mut self) {
        if self.vertices.is_some() {
            debug!("dropping derived topology");
        }
        self.vertices = None;
        self.degrees = None;
        self.boundary = None;
    }

    /// Swap in a freshly built vertex set. Degrees and boundary flags refer
    /// to the old vertex ids and are dropped.
    pub fn replace_vertices(&mut self, vertices: VertexSet) {
        self.vertices = Some(vertices);
        self.degrees = None;
        self.boundary = None;
    }

    pub fn replace_degrees(&mut self, degrees: DegreeTable) {
        self.degrees = Some(degrees);
    }

    pub fn replace_boundary(&mut self, boundary: BoundarySet) {
        self.boundary = Some(boundary);
    }

    pub fn vertices(&self) -> GridResult<&VertexSet> {
        self.vertices
            .as_ref()
            .ok_or_else(|| GridError::Topology("vertex set has not been built".into()))
    }

    pub fn degrees(&self) -> GridResult<&DegreeTable> {
        self.degrees
            .as_ref()
            .ok_or_else(|| GridError::Topology("vertex degrees are stale or missing".into()))
    }

    pub fn boundary(&self) -> GridResult<&BoundarySet> {
        self.boundary
            .as_ref()
            .ok_or_else(|| GridError::Topology("boundary vertices have not been flagged".into()))
    }

    pub fn has_vertices(&self) -> bool {
        self.vertices.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssetId, PointKind};
    use geo::{line_string, Point};

    fn edge(id: u64) -> Edge {
        Edge::natural(
            EdgeId::new(id),
            "line",
            line_string![(x: id as f64, y: 0.0), (x: id as f64 + 1.0, y: 0.0)],
        )
    }

    #[test]
    fn test_push_edge_keeps_id_order() {
        let mut store = GridStore::new();
        store.push_edge(edge(3));
        store.push_edge(edge(1));
        store.push_edge(edge(2));
        let ids: Vec<u64> = store.edges().iter().map(|e| e.id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(store.next_edge_id(), EdgeId::new(4));
        assert!(store.edge(EdgeId::new(2)).is_some());
    }

    #[test]
    fn test_edges_in_range() {
        let mut store = GridStore::new();
        store.replace_edges((1..=10).map(edge).collect());
        let ids: Vec<u64> = store
            .edges_in_range(BatchRange::new(3, 6))
            .iter()
            .map(|e| e.id.value())
            .collect();
        assert_eq!(ids, vec![4, 5, 6]);
        assert!(store.edges_in_range(BatchRange::new(10, 20)).is_empty());
    }

    #[test]
    fn test_empty_store_has_no_batches() {
        let store = GridStore::new();
        assert_eq!(store.max_edge_id(), None);
        assert_eq!(store.edge_batches(75_000).count(), 0);
        assert_eq!(store.next_edge_id(), EdgeId::new(1));
    }

    #[test]
    fn test_missing_topology_is_an_error() {
        let store = GridStore::new();
        assert!(matches!(store.vertices(), Err(GridError::Topology(_))));
        assert!(matches!(store.degrees(), Err(GridError::Topology(_))));
    }

    #[test]
    fn test_push_point_routes_by_class() {
        let mut store = GridStore::new();
        store.push_point(PointAsset::new(
            AssetId::new(1),
            PointKind::Converter,
            Point::new(0.0, 0.0),
        ));
        store.push_point(PointAsset::new(
            AssetId::new(2),
            PointKind::Switch,
            Point::new(1.0, 0.0),
        ));
        assert_eq!(store.nodes.len(), 1);
        assert_eq!(store.towers.len(), 1);
        assert_eq!(store.points().count(), 2);
    }
}
