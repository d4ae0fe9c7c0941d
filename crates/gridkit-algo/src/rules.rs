//! Table-driven proximity rules.
//!
//! Snapping and seeding both ask the same question: "which asset of this
//! set, if any, lies within this tolerance of my geometry?". They are
//! expressed as an ordered list of [`ProximityRule`]s evaluated
//! first-match-wins. Within a rule the nearest asset wins; equal distances
//! go to the asset that comes first in its collection.

use geo::{LineString, Point};
use gridkit_core::geometry::point_line_distance;
use gridkit_core::PointIndex;

/// A point set, a tolerance and a payload per point.
pub struct ProximityRule<T> {
    pub name: &'static str,
    pub tolerance: f64,
    points: Vec<Point<f64>>,
    payload: Vec<T>,
    index: PointIndex,
}

/// The asset a rule matched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleMatch<'a, T> {
    pub rule: &'static str,
    pub point: Point<f64>,
    pub payload: &'a T,
    pub distance: f64,
}

impl<T> ProximityRule<T> {
    pub fn new<I>(name: &'static str, tolerance: f64, items: I) -> Self
    where
        I: IntoIterator<Item = (Point<f64>, T)>,
    {
        let (points, payload): (Vec<_>, Vec<_>) = items.into_iter().unzip();
        let index = PointIndex::new(points.iter().copied().enumerate());
        Self {
            name,
            tolerance,
            points,
            payload,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn hit(&self, position: usize, distance: f64) -> RuleMatch<'_, T> {
        RuleMatch {
            rule: self.name,
            point: self.points[position],
            payload: &self.payload[position],
            distance,
        }
    }

    /// Nearest point of the set within tolerance of `point`.
    pub fn nearest_to_point(&self, point: Point<f64>) -> Option<RuleMatch<'_, T>> {
        self.index
            .nearest_within(point, self.tolerance)
            .map(|(pos, dist)| self.hit(pos, dist))
    }

    /// Nearest point of the set within tolerance of any part of `line`.
    pub fn nearest_to_line(&self, line: &LineString<f64>) -> Option<RuleMatch<'_, T>> {
        self.index
            .near_line(line, self.tolerance)
            .into_iter()
            .map(|pos| (pos, point_line_distance(self.points[pos], line)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(pos, dist)| self.hit(pos, dist))
    }
}

/// Evaluate `rules` in order against a point; the first rule with a hit wins.
pub fn first_match_point<T>(
    rules: &[ProximityRule<T>],
    point: Point<f64>,
) -> Option<RuleMatch<'_, T>> {
    rules.iter().find_map(|rule| rule.nearest_to_point(point))
}

/// Evaluate `rules` in order against a line; the first rule with a hit wins.
pub fn first_match_line<'a, T>(
    rules: &'a [ProximityRule<T>],
    line: &LineString<f64>,
) -> Option<RuleMatch<'a, T>> {
    rules.iter().find_map(|rule| rule.nearest_to_line(line))
}
