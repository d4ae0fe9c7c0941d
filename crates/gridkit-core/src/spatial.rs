//! Spatial index provider.
//!
//! Two R-trees cover every proximity query the pipeline makes:
//!
//! - [`PointIndex`] over point geometries (assets, vertices, dead ends):
//!   radius queries, nearest-within, and envelope pre-filtering around a line.
//! - [`EnvelopeIndex`] over line bounding boxes (edges): candidate pruning
//!   before an exact point-to-line or polygon-to-line test.
//!
//! Both indices store the caller's slice position as payload. Queries return
//! positions, so the caller keeps ownership of its collections.

use geo::{BoundingRect, LineString, Point, Polygon, Rect};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use crate::geometry::{pad_rect, padded_bounds, point_distance, within_distance};

type IndexedPoint = GeomWithData<[f64; 2], usize>;
type IndexedRect = GeomWithData<Rectangle<[f64; 2]>, usize>;

fn aabb(rect: Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

/// R-tree over points keyed by their position in the source collection.
pub struct PointIndex {
    tree: RTree<IndexedPoint>,
}

impl PointIndex {
    pub fn new<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (usize, Point<f64>)>,
    {
        let items: Vec<IndexedPoint> = points
            .into_iter()
            .map(|(idx, p)| GeomWithData::new([p.x(), p.y()], idx))
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Positions of all points within `tolerance` of `point`.
    pub fn within(&self, point: Point<f64>, tolerance: f64) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .tree
            .locate_within_distance([point.x(), point.y()], tolerance * tolerance)
            .map(|item| item.data)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Nearest point within `tolerance`; ties go to the lowest position.
    pub fn nearest_within(&self, point: Point<f64>, tolerance: f64) -> Option<(usize, f64)> {
        self.nearest_within_filtered(point, tolerance, |_| true)
    }

    /// Like [`PointIndex::nearest_within`], restricted to positions accepted
    /// by `keep`.
    pub fn nearest_within_filtered<F>(
        &self,
        point: Point<f64>,
        tolerance: f64,
        keep: F,
    ) -> Option<(usize, f64)>
    where
        F: Fn(usize) -> bool,
    {
        self.tree
            .locate_within_distance([point.x(), point.y()], tolerance * tolerance)
            .filter(|item| keep(item.data))
            .map(|item| {
                let [x, y] = *item.geom();
                (item.data, point_distance(point, Point::new(x, y)))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
    }

    /// Positions of all points whose exact distance to `line` is at most
    /// `tolerance`. The line's padded bounding box prunes candidates first.
    pub fn near_line(&self, line: &LineString<f64>, tolerance: f64) -> Vec<usize> {
        let Some(bounds) = padded_bounds(line, tolerance) else {
            return Vec::new();
        };
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&aabb(bounds))
            .filter(|item| {
                let [x, y] = *item.geom();
                within_distance(Point::new(x, y), line, tolerance)
            })
            .map(|item| item.data)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Positions of all points inside the padded bounding box of `point`
    /// (bounding-box pre-filter only, no exact test).
    pub fn in_box(&self, point: Point<f64>, pad: f64) -> impl Iterator<Item = usize> + '_ {
        let rect = pad_rect(point.bounding_rect(), pad);
        self.tree
            .locate_in_envelope_intersecting(&aabb(rect))
            .map(|item| item.data)
    }
}

/// R-tree over line bounding boxes keyed by their position in the source
/// collection.
pub struct EnvelopeIndex {
    tree: RTree<IndexedRect>,
}

impl EnvelopeIndex {
    pub fn new<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (usize, &'a LineString<f64>)>,
    {
        let items: Vec<IndexedRect> = lines
            .into_iter()
            .filter_map(|(idx, line)| {
                line.bounding_rect().map(|rect| {
                    GeomWithData::new(
                        Rectangle::from_corners(
                            [rect.min().x, rect.min().y],
                            [rect.max().x, rect.max().y],
                        ),
                        idx,
                    )
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Positions of lines whose bounding box comes within `pad` of `point`.
    pub fn near_point(&self, point: Point<f64>, pad: f64) -> Vec<usize> {
        let rect = pad_rect(point.bounding_rect(), pad);
        self.collect(aabb(rect))
    }

    /// Positions of lines whose bounding box intersects the polygon's.
    pub fn near_polygon(&self, polygon: &Polygon<f64>) -> Vec<usize> {
        match polygon.bounding_rect() {
            Some(rect) => self.collect(aabb(rect)),
            None => Vec::new(),
        }
    }

    fn collect(&self, envelope: AABB<[f64; 2]>) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|item| item.data)
            .collect();
        hits.sort_unstable();
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, polygon};

    fn grid_points() -> PointIndex {
        PointIndex::new(vec![
            (0, Point::new(0.0, 0.0)),
            (1, Point::new(3.0, 4.0)),
            (2, Point::new(100.0, 100.0)),
            (3, Point::new(-3.0, 4.0)),
        ])
    }

    #[test]
    fn test_within_radius() {
        let index = grid_points();
        assert_eq!(index.within(Point::new(0.0, 0.0), 5.0), vec![0, 1, 3]);
        assert_eq!(index.within(Point::new(0.0, 0.0), 4.9), vec![0]);
    }

    #[test]
    fn test_nearest_within_breaks_ties_by_position() {
        let index = grid_points();
        let (idx, dist) = index.nearest_within(Point::new(0.0, 4.0), 5.0).unwrap();
        assert_eq!(idx, 1);
        assert!((dist - 3.0).abs() < 1e-12);
        assert!(index.nearest_within(Point::new(50.0, 50.0), 10.0).is_none());
    }

    #[test]
    fn test_nearest_within_filtered() {
        let index = grid_points();
        let hit = index.nearest_within_filtered(Point::new(0.0, 4.0), 5.0, |i| i != 1);
        assert_eq!(hit.map(|h| h.0), Some(3));
    }

    #[test]
    fn test_near_line_uses_exact_distance() {
        let index = PointIndex::new(vec![
            (0, Point::new(5.0, 4.0)),
            (1, Point::new(5.0, 6.0)),
            // inside the padded box but outside the exact radius
            (2, Point::new(-4.5, 4.5)),
        ]);
        let line = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        assert_eq!(index.near_line(&line, 5.0), vec![0]);
    }

    #[test]
    fn test_envelope_index() {
        let a = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        let b = line_string![(x: 50.0, y: 50.0), (x: 60.0, y: 60.0)];
        let index = EnvelopeIndex::new(vec![(0, &a), (1, &b)]);
        assert_eq!(index.near_point(Point::new(5.0, 1.0), 1.0), vec![0]);
        assert!(index.near_point(Point::new(30.0, 30.0), 1.0).is_empty());

        let square = polygon![
            (x: 45.0, y: 45.0),
            (x: 55.0, y: 45.0),
            (x: 55.0, y: 55.0),
            (x: 45.0, y: 55.0),
        ];
        assert_eq!(index.near_polygon(&square), vec![1]);
    }
}
