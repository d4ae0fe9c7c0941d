//! # gridkit-core: Grid Topology Core
//!
//! Data model, spatial primitives and derived topology collections for
//! turning raw electrical-grid geometry into a connected, attributed graph.
//!
//! ## Design Philosophy
//!
//! The grid is held as three independently owned top-level collections:
//! - **Point assets**: Nodes (substations, converters) and Towers (towers,
//!   poles, transformers, switches, breakers, ...)
//! - **Area assets**: substation footprints
//! - **Edges**: conductor segments, plus synthetic bridges inserted to close gaps
//!
//! Everything else (the vertex set, vertex degrees, the set of
//! transformer/switch boundary vertices) is *derived* from edges and assets.
//! Derived collections are rebuilt wholesale whenever topology changes and
//! are never patched in place. See [`topology`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geo::{line_string, Point};
//! use gridkit_core::*;
//!
//! let mut store = GridStore::new();
//! store.towers.push(PointAsset::new(AssetId::new(1), PointKind::Tower, Point::new(10.0, 0.0)));
//! store.push_edge(Edge::natural(
//!     EdgeId::new(1),
//!     "line",
//!     line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
//! ).with_voltage(Voltage::new(220), VoltageProvenance::Raw));
//! ```
//!
//! ## ID System
//!
//! - [`AssetId`]: identifier of a point or area asset, as assigned at ingestion
//! - [`EdgeId`]: sequential edge id, reassigned by the splitter (1-based)
//! - [`VertexId`]: sequential vertex id, assigned by the vertex builder (1-based)
//!
//! Edge ids drive batching: every update-style stage walks `(lo, hi]` ranges
//! of edge ids (see [`batch`]).
//!
//! ## Modules
//!
//! - [`batch`] - Batch descriptors and the checkpoint (transaction) boundary
//! - [`config`] - Tolerances and batch size
//! - [`diagnostics`] - Ingestion diagnostics
//! - [`geometry`] - Planar geometry helpers (distance, splitting, quantization)
//! - [`graph_utils`] - Connectivity statistics over the vertex graph
//! - [`spatial`] - R-tree backed proximity queries
//! - [`store`] - The [`GridStore`] holding all collections
//! - [`topology`] - Derived collections: vertices, degrees, boundary vertices

use std::fmt;

use geo::{LineString, Point, Polygon};
use serde::{Deserialize, Serialize};

pub mod batch;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod graph_utils;
pub mod spatial;
pub mod store;
pub mod topology;
pub mod voltage;

pub use batch::{
    run_batches, BatchPlan, BatchRange, Checkpoint, CommitEntry, CommitLog, NoopCheckpoint, Stage,
};
pub use config::{Tolerances, TopologyConfig};
pub use diagnostics::{DiagnosticIssue, Diagnostics, IngestDiagnostics, IngestStats, Severity};
pub use error::{GridError, GridResult};
pub use graph_utils::{graph_stats, vertex_graph, GraphStats};
pub use spatial::{EnvelopeIndex, PointIndex};
pub use store::GridStore;
pub use topology::{BoundarySet, DegreeTable, Vertex, VertexSet};
pub use voltage::{Voltage, VoltageProvenance};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(i64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(u64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(u64);

impl AssetId {
    #[inline]
    pub fn new(value: i64) -> Self {
        AssetId(value)
    }
    #[inline]
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl EdgeId {
    #[inline]
    pub fn new(value: u64) -> Self {
        EdgeId(value)
    }
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl VertexId {
    #[inline]
    pub fn new(value: u64) -> Self {
        VertexId(value)
    }
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse class of a point asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointClass {
    /// Substations and converters.
    Node,
    /// Towers, poles and line equipment.
    Tower,
}

impl PointClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointClass::Node => "Node",
            PointClass::Tower => "Tower",
        }
    }
}

/// Point asset categories as they appear in the source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointKind {
    #[serde(rename = "Substation_Icon")]
    SubstationIcon,
    #[serde(rename = "Converter")]
    Converter,
    #[serde(rename = "Tower")]
    Tower,
    #[serde(rename = "Monopole_HV")]
    MonopoleHv,
    #[serde(rename = "Transformer")]
    Transformer,
    #[serde(rename = "Insulator")]
    Insulator,
    #[serde(rename = "Compensator")]
    Compensator,
    #[serde(rename = "Circuit Breaker")]
    CircuitBreaker,
    #[serde(rename = "Switch")]
    Switch,
    #[serde(rename = "Disconnector")]
    Disconnector,
    #[serde(rename = "Mechanical")]
    Mechanical,
}

impl PointKind {
    pub const ALL: [PointKind; 11] = [
        PointKind::SubstationIcon,
        PointKind::Converter,
        PointKind::Tower,
        PointKind::MonopoleHv,
        PointKind::Transformer,
        PointKind::Insulator,
        PointKind::Compensator,
        PointKind::CircuitBreaker,
        PointKind::Switch,
        PointKind::Disconnector,
        PointKind::Mechanical,
    ];

    /// Parse a raw type string. Unknown kinds yield `None`.
    pub fn from_type_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PointKind::SubstationIcon => "Substation_Icon",
            PointKind::Converter => "Converter",
            PointKind::Tower => "Tower",
            PointKind::MonopoleHv => "Monopole_HV",
            PointKind::Transformer => "Transformer",
            PointKind::Insulator => "Insulator",
            PointKind::Compensator => "Compensator",
            PointKind::CircuitBreaker => "Circuit Breaker",
            PointKind::Switch => "Switch",
            PointKind::Disconnector => "Disconnector",
            PointKind::Mechanical => "Mechanical",
        }
    }

    pub fn class(&self) -> PointClass {
        match self {
            PointKind::SubstationIcon | PointKind::Converter => PointClass::Node,
            _ => PointClass::Tower,
        }
    }

    /// Transformers and switches separate voltage domains.
    pub fn is_boundary(&self) -> bool {
        matches!(self, PointKind::Transformer | PointKind::Switch)
    }
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asset class of the unified output view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Line,
    Tower,
    Station,
    Area,
}

impl AssetClass {
    pub const ALL: [AssetClass; 4] = [
        AssetClass::Line,
        AssetClass::Tower,
        AssetClass::Station,
        AssetClass::Area,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Line => "line",
            AssetClass::Tower => "tower",
            AssetClass::Station => "station",
            AssetClass::Area => "area",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Node or Tower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointAsset {
    pub id: AssetId,
    pub kind: PointKind,
    pub name: Option<String>,
    pub voltage: Voltage,
    pub voltage_provenance: VoltageProvenance,
    pub geometry: Point<f64>,
}

impl PointAsset {
    pub fn new(id: AssetId, kind: PointKind, geometry: Point<f64>) -> Self {
        Self {
            id,
            kind,
            name: None,
            voltage: Voltage::UNKNOWN,
            voltage_provenance: VoltageProvenance::Raw,
            geometry,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_voltage(mut self, voltage: Voltage) -> Self {
        self.voltage = voltage;
        self
    }

    #[inline]
    pub fn class(&self) -> PointClass {
        self.kind.class()
    }
}

/// A polygon asset (substation footprint).
///
/// Multi-part source polygons become one `AreaAsset` per part, sharing `id`
/// and distinguished by `part`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaAsset {
    pub id: AssetId,
    pub part: u32,
    pub kind: String,
    pub name: Option<String>,
    pub voltage: Voltage,
    pub voltage_provenance: VoltageProvenance,
    pub geometry: Polygon<f64>,
}

impl AreaAsset {
    pub fn new(id: AssetId, kind: impl Into<String>, geometry: Polygon<f64>) -> Self {
        Self {
            id,
            part: 0,
            kind: kind.into(),
            name: None,
            voltage: Voltage::UNKNOWN,
            voltage_provenance: VoltageProvenance::Raw,
            geometry,
        }
    }

    pub fn with_voltage(mut self, voltage: Voltage) -> Self {
        self.voltage = voltage;
        self
    }
}

/// Whether an edge comes from source geometry or was inserted as a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeCategory {
    #[default]
    Natural,
    Synthetic,
}

/// Conductor segment (or synthetic bridge) between two vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    /// Source line this segment was cut from. `None` for synthetic bridges.
    pub original_id: Option<AssetId>,
    pub kind: String,
    pub category: EdgeCategory,
    pub voltage: Voltage,
    pub voltage_provenance: VoltageProvenance,
    pub geometry: LineString<f64>,
    pub source: Option<VertexId>,
    pub target: Option<VertexId>,
    pub cost: Option<f64>,
    pub reverse_cost: Option<f64>,
}

impl Edge {
    pub fn natural(id: EdgeId, kind: impl Into<String>, geometry: LineString<f64>) -> Self {
        Self {
            id,
            original_id: None,
            kind: kind.into(),
            category: EdgeCategory::Natural,
            voltage: Voltage::UNKNOWN,
            voltage_provenance: VoltageProvenance::Raw,
            geometry,
            source: None,
            target: None,
            cost: None,
            reverse_cost: None,
        }
    }

    /// A straight bridge between two vertices.
    pub fn synthetic(
        id: EdgeId,
        from: (VertexId, Point<f64>),
        to: (VertexId, Point<f64>),
        voltage: Voltage,
    ) -> Self {
        Self {
            id,
            original_id: None,
            kind: "synthetic".to_string(),
            category: EdgeCategory::Synthetic,
            voltage,
            voltage_provenance: VoltageProvenance::Synthetic,
            geometry: LineString::new(vec![from.1 .0, to.1 .0]),
            source: Some(from.0),
            target: Some(to.0),
            cost: None,
            reverse_cost: None,
        }
    }

    pub fn with_original(mut self, original: AssetId) -> Self {
        self.original_id = Some(original);
        self
    }

    pub fn with_voltage(mut self, voltage: Voltage, provenance: VoltageProvenance) -> Self {
        self.voltage = voltage;
        self.voltage_provenance = provenance;
        self
    }

    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.category == EdgeCategory::Synthetic
    }

    /// An edge with an unresolved endpoint.
    #[inline]
    pub fn is_ghost(&self) -> bool {
        self.source.is_none() || self.target.is_none()
    }

    pub fn start_point(&self) -> Option<Point<f64>> {
        geometry::start_point(&self.geometry)
    }

    pub fn end_point(&self) -> Option<Point<f64>> {
        geometry::end_point(&self.geometry)
    }

    pub fn length(&self) -> f64 {
        geometry::line_length(&self.geometry)
    }

    /// Both resolved endpoints, or `None` for a ghost edge.
    pub fn endpoints(&self) -> Option<(VertexId, VertexId)> {
        Some((self.source?, self.target?))
    }

    /// `true` if the edge joins `a` and `b` in either direction.
    pub fn connects(&self, a: VertexId, b: VertexId) -> bool {
        matches!(self.endpoints(), Some((s, t)) if (s == a && t == b) || (s == b && t == a))
    }
}
