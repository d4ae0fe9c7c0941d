//! Derived topology collections.
//!
//! [`VertexSet`], [`DegreeTable`] and [`BoundarySet`] are pure functions of
//! the current edges and point assets. Each one is only ever produced by its
//! `build` constructor and handed to the [`GridStore`](crate::GridStore),
//! which swaps it in as a whole. Nothing mutates a derived collection after
//! it has been built.

use geo::Point;
use hashbrown::{HashMap, HashSet};
use serde::Serialize;

use crate::geometry::GridKey;
use crate::spatial::PointIndex;
use crate::{Edge, PointAsset, VertexId};

/// A deduplicated graph vertex.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vertex {
    pub id: VertexId,
    pub key: GridKey,
    /// Representative point of the grid cell.
    pub geometry: Point<f64>,
}

/// All distinct edge endpoints under the quantization grid.
#[derive(Debug, Clone)]
pub struct VertexSet {
    grid: f64,
    vertices: Vec<Vertex>,
    by_key: HashMap<GridKey, VertexId>,
}

impl VertexSet {
    /// Collect the start and end point of every edge, quantize them onto
    /// `grid` and keep one vertex per cell.
    ///
    /// Ids are sequential from 1 in order of first appearance, walking
    /// edges in slice order (start point before end point).
    pub fn build(edges: &[Edge], grid: f64) -> Self {
        let mut vertices = Vec::new();
        let mut by_key = HashMap::new();
        let endpoints = edges
            .iter()
            .flat_map(|e| [e.start_point(), e.end_point()])
            .flatten();
        for point in endpoints {
            let key = GridKey::of(point, grid);
            by_key.entry(key).or_insert_with(|| {
                let id = VertexId::new(vertices.len() as u64 + 1);
                vertices.push(Vertex {
                    id,
                    key,
                    geometry: key.to_point(grid),
                });
                id
            });
        }
        Self {
            grid,
            vertices,
            by_key,
        }
    }

    pub fn grid(&self) -> f64 {
        self.grid
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter()
    }

    pub fn get(&self, id: VertexId) -> Option<&Vertex> {
        let idx = (id.value() as usize).checked_sub(1)?;
        self.vertices.get(idx)
    }

    /// Vertex whose grid cell equals the cell of `point`.
    pub fn lookup(&self, point: Point<f64>) -> Option<VertexId> {
        self.by_key.get(&GridKey::of(point, self.grid)).copied()
    }

    /// R-tree over vertex geometries; payload is `id - 1`.
    pub fn index(&self) -> PointIndex {
        PointIndex::new(
            self.vertices
                .iter()
                .enumerate()
                .map(|(idx, v)| (idx, v.geometry)),
        )
    }

    /// Vertex at an index position returned by [`VertexSet::index`].
    pub fn at(&self, position: usize) -> Option<&Vertex> {
        self.vertices.get(position)
    }
}

/// Incident-edge count per vertex.
///
/// Every vertex of the set has an entry, so vertices that no edge references
/// show up with degree 0. A self-loop counts twice.
#[derive(Debug, Clone, Default)]
pub struct DegreeTable {
    degrees: HashMap<VertexId, usize>,
}

impl DegreeTable {
    pub fn build(vertices: &VertexSet, edges: &[Edge]) -> Self {
        let mut degrees: HashMap<VertexId, usize> =
            vertices.iter().map(|v| (v.id, 0)).collect();
        for edge in edges {
            for end in [edge.source, edge.target].into_iter().flatten() {
                *degrees.entry(end).or_insert(0) += 1;
            }
        }
        Self { degrees }
    }

    pub fn degree(&self, id: VertexId) -> usize {
        self.degrees.get(&id).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.degrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.degrees.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VertexId, usize)> + '_ {
        self.degrees.iter().map(|(id, d)| (*id, *d))
    }

    /// Sum of all degrees. Equals twice the number of wired edges.
    pub fn total(&self) -> usize {
        self.degrees.values().sum()
    }

    /// Vertices no edge references.
    pub fn orphans(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.iter().filter(|(_, d)| *d == 0).map(|(id, _)| id)
    }
}

/// Vertices that coincide with a transformer or switch.
#[derive(Debug, Clone, Default)]
pub struct BoundarySet {
    vertices: HashSet<VertexId>,
}

impl BoundarySet {
    /// Flag every vertex within `tolerance` of a boundary tower.
    pub fn build(vertices: &VertexSet, towers: &[PointAsset], tolerance: f64) -> Self {
        let boundary_towers: Vec<&PointAsset> =
            towers.iter().filter(|t| t.kind.is_boundary()).collect();
        if boundary_towers.is_empty() {
            return Self::default();
        }
        let index = PointIndex::new(
            boundary_towers
                .iter()
                .enumerate()
                .map(|(idx, t)| (idx, t.geometry)),
        );
        let flagged = vertices
            .iter()
            .filter(|v| index.nearest_within(v.geometry, tolerance).is_some())
            .map(|v| v.id)
            .collect();
        Self { vertices: flagged }
    }

    pub fn contains(&self, id: VertexId) -> bool {
        self.vertices.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}
