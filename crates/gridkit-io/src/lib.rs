//! # gridkit-io: Grid Data Ingestion & Publishing
//!
//! The two boundaries of the topology pipeline:
//!
//! - **Ingestion** ([`reader`], [`ingest`]): a GeoJSON source is bucketed into
//!   raw point, area and line tables, then classified into a
//!   [`GridStore`](gridkit_core::GridStore). Malformed geometry is repaired or
//!   dropped, never fatal; see [`IngestDiagnostics`](gridkit_core::IngestDiagnostics).
//! - **Publishing** ([`publish`]): the processed store is flattened into a
//!   unified asset view and written as GeoJSON, but only if its integrity
//!   report is sound.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gridkit_algo::{Pipeline, PipelineContext};
//! use gridkit_core::TopologyConfig;
//! use gridkit_io::{ingest, load_geojson, publish};
//!
//! fn main() -> anyhow::Result<()> {
//!     let raw = load_geojson("grid.geojson")?;
//!     let loaded = ingest(raw);
//!     println!("{}", loaded.diagnostics);
//!
//!     let ctx = PipelineContext::new(loaded.store, TopologyConfig::default());
//!     let mut pipeline = Pipeline::new(ctx);
//!     let report = pipeline.run()?;
//!     println!("{}", report.integrity);
//!
//!     publish(pipeline.store(), &report.integrity)?.write_geojson("grid_unified.geojson")?;
//!     Ok(())
//! }
//! ```

pub mod ingest;
pub mod publish;
pub mod reader;

pub use ingest::{ingest, IngestResult, RawFeature, RawTables, SUBSTATION_AREA};
pub use publish::{publish, to_feature_collection, unified_view, Publication, UnifiedAsset};
pub use reader::{load_geojson, read_geojson};
