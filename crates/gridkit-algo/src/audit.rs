//! Integrity auditor.
//!
//! Read-only pass over the store producing an [`IntegrityReport`]. Ghost
//! edges make a report unsound; consumers that need full connectivity call
//! [`IntegrityReport::require_sound`] before using the graph.

use std::fmt;

use gridkit_core::{
    graph_stats, AssetClass, DegreeTable, GridError, GridResult, GridStore, Voltage,
    VoltageProvenance,
};
use serde::Serialize;
use tracing::{info, warn};

/// Counts for one asset class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssetTally {
    pub class: AssetClass,
    pub total: usize,
    /// Provenance label starts with "Inferred".
    pub inferred: usize,
    /// Voltage still 0.
    pub unresolved: usize,
}

impl AssetTally {
    fn count<I>(class: AssetClass, assets: I) -> Self
    where
        I: Iterator<Item = (Voltage, VoltageProvenance)>,
    {
        let mut tally = Self {
            class,
            total: 0,
            inferred: 0,
            unresolved: 0,
        };
        for (voltage, provenance) in assets {
            tally.total += 1;
            if provenance.is_inferred() {
                tally.inferred += 1;
            }
            if !voltage.is_known() {
                tally.unresolved += 1;
            }
        }
        tally
    }
}

/// Result of an integrity audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrityReport {
    pub vertices: usize,
    pub edges: usize,
    pub orphan_vertices: usize,
    pub ghost_edges: usize,
    pub synthetic_edges: usize,
    pub connected_components: usize,
    pub min_degree: usize,
    pub max_degree: usize,
    pub avg_degree: f64,
    pub assets: Vec<AssetTally>,
    /// Line count per voltage provenance, in provenance order.
    pub line_provenance: Vec<(VoltageProvenance, usize)>,
}

impl IntegrityReport {
    /// No ghost edges.
    pub fn is_sound(&self) -> bool {
        self.ghost_edges == 0
    }

    pub fn require_sound(&self) -> GridResult<()> {
        if self.is_sound() {
            Ok(())
        } else {
            Err(GridError::Topology(format!(
                "{} ghost edges (unresolved source or target); topology is broken",
                self.ghost_edges
            )))
        }
    }

    pub fn tally(&self, class: AssetClass) -> Option<&AssetTally> {
        self.assets.iter().find(|t| t.class == class)
    }

    pub fn inferred_total(&self) -> usize {
        self.assets.iter().map(|t| t.inferred).sum()
    }

    pub fn unresolved_total(&self) -> usize {
        self.assets.iter().map(|t| t.unresolved).sum()
    }
}

/// Audit the current state of `store`.
pub fn audit(store: &GridStore) -> GridResult<IntegrityReport> {
    let edges = store.edges();
    let ghost_edges = edges.iter().filter(|e| e.is_ghost()).count();
    let synthetic_edges = edges.iter().filter(|e| e.is_synthetic()).count();

    let mut report = IntegrityReport {
        vertices: 0,
        edges: edges.len(),
        orphan_vertices: 0,
        ghost_edges,
        synthetic_edges,
        connected_components: 0,
        min_degree: 0,
        max_degree: 0,
        avg_degree: 0.0,
        assets: vec![
            AssetTally::count(
                AssetClass::Line,
                edges.iter().map(|e| (e.voltage, e.voltage_provenance)),
            ),
            AssetTally::count(
                AssetClass::Tower,
                store.towers.iter().map(|a| (a.voltage, a.voltage_provenance)),
            ),
            AssetTally::count(
                AssetClass::Station,
                store.nodes.iter().map(|a| (a.voltage, a.voltage_provenance)),
            ),
            AssetTally::count(
                AssetClass::Area,
                store.areas.iter().map(|a| (a.voltage, a.voltage_provenance)),
            ),
        ],
        line_provenance: VoltageProvenance::ALL
            .iter()
            .map(|p| (*p, edges.iter().filter(|e| e.voltage_provenance == *p).count()))
            .collect(),
    };

    if let Ok(vertices) = store.vertices() {
        let degrees = DegreeTable::build(vertices, edges);
        let stats = graph_stats(store)?;
        report.vertices = vertices.len();
        report.orphan_vertices = degrees.orphans().count();
        report.connected_components = stats.connected_components;
        report.min_degree = stats.min_degree;
        report.max_degree = stats.max_degree;
        report.avg_degree = stats.avg_degree;
    }

    if report.ghost_edges > 0 {
        warn!(ghosts = report.ghost_edges, "topology is broken");
    }
    if report.orphan_vertices > 0 {
        warn!(orphans = report.orphan_vertices, "orphan vertices found");
    }
    info!(
        vertices = report.vertices,
        edges = report.edges,
        synthetic = report.synthetic_edges,
        components = report.connected_components,
        inferred = report.inferred_total(),
        unresolved = report.unresolved_total(),
        "integrity audit finished"
    );
    Ok(report)
}

impl fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SYSTEM HEALTH REPORT")?;
        writeln!(f, "{}", "-".repeat(30))?;

        writeln!(f, "[1] GEOMETRIC INTEGRITY")?;
        writeln!(f, "    Vertices          : {}", self.vertices)?;
        writeln!(f, "    Edges             : {}", self.edges)?;
        writeln!(f, "    Orphan vertices   : {} (should be 0)", self.orphan_vertices)?;
        writeln!(f, "    Ghost edges       : {} (must be 0)", self.ghost_edges)?;
        writeln!(f, "    Synthetic bridges : {}", self.synthetic_edges)?;
        writeln!(f, "    Components        : {}", self.connected_components)?;
        writeln!(
            f,
            "    Degree min/avg/max: {}/{:.2}/{}",
            self.min_degree, self.avg_degree, self.max_degree
        )?;
        if self.is_sound() {
            writeln!(f, "    OK: every edge is wired to two vertices")?;
        } else {
            writeln!(f, "    CRITICAL: ghost edges found, topology is broken")?;
        }

        writeln!(f, "[2] ASSET INVENTORY")?;
        for tally in &self.assets {
            writeln!(f, "    {:<10}: {}", tally.class.as_str().to_uppercase(), tally.total)?;
        }

        writeln!(f, "[3] VOLTAGE RECOVERY")?;
        let inferred = self.inferred_total();
        if inferred == 0 {
            writeln!(f, "    no assets required inference")?;
        } else {
            writeln!(f, "    Total restored: {}", inferred)?;
            for tally in self.assets.iter().filter(|t| t.inferred > 0) {
                writeln!(
                    f,
                    "    {:<10}: {} fixed",
                    tally.class.as_str().to_uppercase(),
                    tally.inferred
                )?;
            }
        }
        for (provenance, count) in self.line_provenance.iter().filter(|(_, c)| *c > 0) {
            writeln!(f, "    lines {:<20}: {}", provenance.label(), count)?;
        }

        writeln!(f, "[4] REMAINING GAPS")?;
        writeln!(
            f,
            "    Unresolved 0V assets: {} (isolated from main grid)",
            self.unresolved_total()
        )
    }
}
