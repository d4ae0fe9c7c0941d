//! Planar geometry primitives used by the topology stages.
//!
//! All coordinates are assumed to be in one projected, planar coordinate
//! system, so plain Euclidean distance is the right measure everywhere.
//!
//! The one place where float equality matters is vertex deduplication.
//! There coordinates are quantized onto a grid and compared as integer
//! [`GridKey`]s, never as floats.

#[allow(deprecated)]
use geo::{
    BoundingRect, Coord, EuclideanDistance, EuclideanLength, Intersects, Line,
    LineInterpolatePoint, LineLocatePoint, LineString, Point, Polygon, Rect,
};
use serde::{Deserialize, Serialize};

/// Cuts closer than this (as a segment fraction) to a segment end are
/// moved onto the vertex itself.
const CUT_EPSILON: f64 = 1e-9;

/// Integer cell of the vertex quantization grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridKey {
    pub x: i64,
    pub y: i64,
}

impl GridKey {
    /// The grid cell a point falls into (round to nearest multiple of `grid`).
    #[inline]
    pub fn of(point: Point<f64>, grid: f64) -> Self {
        Self {
            x: (point.x() / grid).round() as i64,
            y: (point.y() / grid).round() as i64,
        }
    }

    /// Representative point of the cell.
    #[inline]
    pub fn to_point(self, grid: f64) -> Point<f64> {
        Point::new(self.x as f64 * grid, self.y as f64 * grid)
    }
}

/// Snap a point to the quantization grid.
pub fn snap_to_grid(point: Point<f64>, grid: f64) -> Point<f64> {
    GridKey::of(point, grid).to_point(grid)
}

#[allow(deprecated)]
pub fn point_distance(a: Point<f64>, b: Point<f64>) -> f64 {
    a.euclidean_distance(&b)
}

/// Shortest distance from a point to any part of a line.
#[allow(deprecated)]
pub fn point_line_distance(point: Point<f64>, line: &LineString<f64>) -> f64 {
    match line.0.len() {
        0 => f64::INFINITY,
        1 => point_distance(point, Point::from(line.0[0])),
        _ => point.euclidean_distance(line),
    }
}

/// `true` if the point lies within `tolerance` of the line.
pub fn within_distance(point: Point<f64>, line: &LineString<f64>, tolerance: f64) -> bool {
    point_line_distance(point, line) <= tolerance
}

/// Euclidean length of a line.
#[allow(deprecated)]
pub fn line_length(line: &LineString<f64>) -> f64 {
    line.euclidean_length()
}

/// `true` if the polygon and the line share at least one point.
pub fn polygon_intersects_line(polygon: &Polygon<f64>, line: &LineString<f64>) -> bool {
    polygon.intersects(line)
}

pub fn start_point(line: &LineString<f64>) -> Option<Point<f64>> {
    line.0.first().copied().map(Point::from)
}

pub fn end_point(line: &LineString<f64>) -> Option<Point<f64>> {
    line.0.last().copied().map(Point::from)
}

/// Replace the first and last coordinate of a line.
///
/// Lines with fewer than two coordinates are returned as a two-point line
/// between the given endpoints.
pub fn with_endpoints(line: &LineString<f64>, start: Point<f64>, end: Point<f64>) -> LineString<f64> {
    let mut coords = line.0.clone();
    if coords.len() < 2 {
        return LineString::new(vec![start.0, end.0]);
    }
    let last = coords.len() - 1;
    coords[0] = start.0;
    coords[last] = end.0;
    LineString::new(coords)
}

/// Axis-aligned bounding box of a line grown by `pad` on every side.
pub fn padded_bounds(line: &LineString<f64>, pad: f64) -> Option<Rect<f64>> {
    line.bounding_rect().map(|rect| pad_rect(rect, pad))
}

pub fn pad_rect(rect: Rect<f64>, pad: f64) -> Rect<f64> {
    Rect::new(
        Coord {
            x: rect.min().x - pad,
            y: rect.min().y - pad,
        },
        Coord {
            x: rect.max().x + pad,
            y: rect.max().y + pad,
        },
    )
}

/// Position of a point projected onto a line: segment index and fraction
/// along that segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePosition {
    pub segment: usize,
    pub fraction: f64,
    pub distance: f64,
}

/// Project `point` onto the closest segment of `line`.
#[allow(deprecated)]
pub fn locate_on_line(line: &LineString<f64>, point: Point<f64>) -> Option<LinePosition> {
    let mut best: Option<LinePosition> = None;
    for (segment, seg) in line.lines().enumerate() {
        let fraction = segment_fraction(seg, point);
        let Some(projected) = seg.line_interpolate_point(fraction) else {
            continue;
        };
        let distance = point.euclidean_distance(&projected);
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(LinePosition {
                segment,
                fraction,
                distance,
            });
        }
    }
    best
}

fn segment_fraction(seg: Line<f64>, point: Point<f64>) -> f64 {
    // zero-length segments have no defined fraction
    seg.line_locate_point(&point).unwrap_or(0.0)
}

/// Split a line at the projections of `cut_points`.
///
/// Cuts at (or numerically next to) the first or last coordinate are
/// ignored, coincident cuts are merged, and zero-length pieces are never
/// produced. The pieces, taken together, cover exactly the input line.
pub fn split_line(line: &LineString<f64>, cut_points: &[Point<f64>]) -> Vec<LineString<f64>> {
    let coords = &line.0;
    if coords.len() < 2 || cut_points.is_empty() {
        return vec![line.clone()];
    }
    let last_segment = coords.len() - 2;

    let mut cuts: Vec<(usize, f64)> = cut_points
        .iter()
        .filter_map(|p| locate_on_line(line, *p))
        .map(|pos| {
            if pos.fraction >= 1.0 - CUT_EPSILON && pos.segment < last_segment {
                (pos.segment + 1, 0.0)
            } else if pos.fraction <= CUT_EPSILON {
                (pos.segment, 0.0)
            } else {
                (pos.segment, pos.fraction)
            }
        })
        .filter(|&(segment, fraction)| {
            let at_start = segment == 0 && fraction == 0.0;
            let at_end = segment == last_segment && fraction >= 1.0 - CUT_EPSILON;
            !(at_start || at_end)
        })
        .collect();

    if cuts.is_empty() {
        return vec![line.clone()];
    }
    cuts.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
    cuts.dedup_by(|a, b| a.0 == b.0 && (a.1 - b.1).abs() <= CUT_EPSILON);

    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let mut current: Vec<Coord<f64>> = vec![coords[0]];
    let mut pending = cuts.into_iter().peekable();

    for (i, window) in coords.windows(2).enumerate() {
        let (a, b) = (window[0], window[1]);
        while let Some(&(segment, fraction)) = pending.peek() {
            if segment != i {
                break;
            }
            pending.next();
            let cut = if fraction == 0.0 {
                a
            } else {
                Coord {
                    x: a.x + (b.x - a.x) * fraction,
                    y: a.y + (b.y - a.y) * fraction,
                }
            };
            if current.last() != Some(&cut) {
                current.push(cut);
            }
            if current.len() >= 2 {
                pieces.push(LineString::new(std::mem::take(&mut current)));
            }
            current = vec![cut];
        }
        if current.last() != Some(&b) {
            current.push(b);
        }
    }
    if current.len() >= 2 {
        pieces.push(LineString::new(current));
    }
    pieces
}
