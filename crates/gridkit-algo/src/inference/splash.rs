//! Splash-back: assets still at voltage 0 adopt the voltage of a resolved
//! edge next to them (Towers, Nodes) or crossing them (areas).

use geo::{LineString, Point};
use gridkit_core::geometry::{point_line_distance, polygon_intersects_line};
use gridkit_core::{
    AreaAsset, EnvelopeIndex, GridResult, GridStore, PointAsset, TopologyConfig, Voltage,
    VoltageProvenance,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

/// Assets resolved per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SplashSummary {
    pub towers: usize,
    pub nodes: usize,
    pub areas: usize,
}

impl SplashSummary {
    pub fn total(&self) -> usize {
        self.towers + self.nodes + self.areas
    }
}

/// Resolved edges and an envelope index over them.
struct ResolvedLines {
    lines: Vec<(LineString<f64>, Voltage)>,
    index: EnvelopeIndex,
}

impl ResolvedLines {
    fn collect(store: &GridStore) -> Self {
        let lines: Vec<_> = store
            .edges()
            .iter()
            .filter(|e| e.voltage.is_known())
            .map(|e| (e.geometry.clone(), e.voltage))
            .collect();
        let index = EnvelopeIndex::new(lines.iter().enumerate().map(|(i, (l, _))| (i, l)));
        Self { lines, index }
    }

    /// Voltage of the nearest resolved line within `tolerance`; equal
    /// distances go to the lowest edge id.
    fn nearest(&self, point: Point<f64>, tolerance: f64) -> Option<Voltage> {
        self.index
            .near_point(point, tolerance)
            .into_iter()
            .map(|i| (i, point_line_distance(point, &self.lines[i].0)))
            .filter(|(_, d)| *d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(i, _)| self.lines[i].1)
    }

    /// Highest voltage among resolved lines intersecting the area.
    fn highest_intersecting(&self, area: &AreaAsset) -> Option<Voltage> {
        self.index
            .near_polygon(&area.geometry)
            .into_iter()
            .filter(|&i| polygon_intersects_line(&area.geometry, &self.lines[i].0))
            .map(|i| self.lines[i].1)
            .max()
    }
}

fn splash_points(assets: &mut [PointAsset], lines: &ResolvedLines, tolerance: f64) -> usize {
    assets
        .par_iter_mut()
        .filter(|a| !a.voltage.is_known())
        .map(|asset| match lines.nearest(asset.geometry, tolerance) {
            Some(voltage) => {
                asset.voltage = voltage;
                asset.voltage_provenance = VoltageProvenance::InferredFromLine;
                true
            }
            None => false,
        })
        .filter(|resolved| *resolved)
        .count()
}

/// Push resolved edge voltages back onto unknown towers, nodes and areas.
pub fn splash_back(store: &mut GridStore, config: &TopologyConfig) -> GridResult<SplashSummary> {
    let lines = ResolvedLines::collect(store);
    let tolerances = &config.tolerances;

    let summary = SplashSummary {
        towers: splash_points(&mut store.towers, &lines, tolerances.tower_splash),
        nodes: splash_points(&mut store.nodes, &lines, tolerances.node_splash),
        areas: store
            .areas
            .par_iter_mut()
            .filter(|a| !a.voltage.is_known())
            .map(|area| match lines.highest_intersecting(area) {
                Some(voltage) => {
                    area.voltage = voltage;
                    area.voltage_provenance = VoltageProvenance::InferredFromLine;
                    true
                }
                None => false,
            })
            .filter(|resolved| *resolved)
            .count(),
    };

    info!(
        towers = summary.towers,
        nodes = summary.nodes,
        areas = summary.areas,
        "asset voltages inferred from lines"
    );
    Ok(summary)
}
