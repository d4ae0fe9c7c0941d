//! # gridkit-algo: Topology Construction and Voltage Inference
//!
//! Stages that turn raw line geometry in a [`GridStore`](gridkit_core::GridStore)
//! into a connected, voltage-attributed routing graph.
//!
//! ## Stages
//!
//! | Stage | Function | Effect |
//! |-------|----------|--------|
//! | Split | [`split_lines`] | Cut lines at towers within the split tolerance |
//! | Snap | [`snap_endpoints`] | Pull segment endpoints onto nearby Nodes, then Towers |
//! | Vertices | [`build_vertices`] | Deduplicate endpoints into grid-quantized vertices |
//! | Wire | [`wire_edges`] | Resolve each edge's source and target vertex |
//! | Metadata | [`compute_metadata`] | Degrees and transformer/switch boundary flags |
//! | Bridge | [`bridge_gaps`] | Join same-voltage dead ends with synthetic edges |
//! | Seed | [`seed_voltages`] | Unknown edges adopt voltages of adjacent Nodes/Towers |
//! | Propagate | [`propagate_voltages`] | One-hop neighbor voting, fixed number of passes |
//! | Splash | [`splash_back`] | Towers, Nodes and areas adopt resolved edge voltages |
//! | Cost | [`assign_costs`] | Length-based routing cost, penalized for bridges |
//! | Audit | [`audit`] | Read-only [`IntegrityReport`] |
//!
//! [`Pipeline`] runs them in this order; each function is also usable on its
//! own as long as its inputs are present.
//!
//! ## Batching
//!
//! Update-style stages (snap, wire, seed, propagate, cost) walk edge-id
//! batches and commit each one through a
//! [`Checkpoint`](gridkit_core::Checkpoint). Within a batch the work is
//! parallelized over edges with rayon; every predicate only reads state that
//! is frozen for the stage, so the result does not depend on scheduling.
//!
//! ## Example
//!
//! ```ignore
//! use gridkit_algo::{Pipeline, PipelineContext};
//! use gridkit_core::TopologyConfig;
//! use std::path::Path;
//!
//! let loaded = gridkit_io::ingest(gridkit_io::load_geojson("grid.geojson")?);
//! let config = TopologyConfig::load_from(Path::new("gridkit.toml"))?;
//! let mut pipeline = Pipeline::new(PipelineContext::new(loaded.store, config));
//! let report = pipeline.run()?;
//! println!("{}", report.integrity);
//! ```

pub mod audit;
pub mod bridge;
pub mod cost;
pub mod inference;
pub mod metadata;
pub mod pipeline;
pub mod rules;
pub mod snap;
pub mod split;
pub mod vertices;

pub use audit::{audit, AssetTally, IntegrityReport};
pub use bridge::{bridge_gaps, dead_ends, DeadEnd};
pub use cost::{assign_costs, edge_cost};
pub use inference::{
    propagate_voltages, propagation_pass, seed_voltages, splash_back, SplashSummary, VoteTable,
};
pub use metadata::{compute_metadata, rebuild_degrees, MetadataSummary};
pub use pipeline::{run_pipeline, Pipeline, PipelineContext, PipelineReport, StageReport};
pub use rules::{first_match_line, first_match_point, ProximityRule, RuleMatch};
pub use snap::snap_endpoints;
pub use split::{split_lines, SplitSummary};
pub use vertices::{build_vertices, wire_edges};
