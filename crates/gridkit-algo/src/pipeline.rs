//! Stage orchestration.
//!
//! [`Pipeline::run`] applies every stage to a [`GridStore`] in the fixed order
//! below, stopping at the first error:
//!
//! ```text
//! split → snap → build_vertices → wire → metadata → bridge → metadata
//!       → seed → propagate → splash → cost → audit
//! ```
//!
//! Bridging runs on a fully wired graph and is followed by a second metadata
//! pass so degrees and boundary flags account for the synthetic edges.

use std::time::Duration;

use gridkit_core::{Checkpoint, GridResult, GridStore, NoopCheckpoint, Stage, TopologyConfig};
use serde::Serialize;
use tracing::{info, info_span};
use web_time::Instant;

use crate::audit::{audit, IntegrityReport};
use crate::bridge::bridge_gaps;
use crate::cost::assign_costs;
use crate::inference::{propagate_voltages, seed_voltages, splash_back, SplashSummary};
use crate::metadata::{compute_metadata, MetadataSummary};
use crate::snap::snap_endpoints;
use crate::split::{split_lines, SplitSummary};
use crate::vertices::{build_vertices, wire_edges};

/// Outcome of a single stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    /// Rows created or updated by the stage.
    pub rows: usize,
    pub elapsed: Duration,
}

/// Outcome of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    pub integrity: IntegrityReport,
}

impl PipelineReport {
    pub fn total_elapsed(&self) -> Duration {
        self.stages.iter().map(|s| s.elapsed).sum()
    }

    /// Rows reported by every run of `stage` (metadata runs twice).
    pub fn rows(&self, stage: Stage) -> usize {
        self.stages
            .iter()
            .filter(|s| s.stage == stage)
            .map(|s| s.rows)
            .sum()
    }
}

/// Everything a stage needs: the store it mutates, the configuration and
/// the batch commit hook.
pub struct PipelineContext {
    pub store: GridStore,
    pub config: TopologyConfig,
    pub checkpoint: Box<dyn Checkpoint>,
}

impl PipelineContext {
    pub fn new(store: GridStore, config: TopologyConfig) -> Self {
        Self {
            store,
            config,
            checkpoint: Box::new(NoopCheckpoint),
        }
    }

    /// Commit every batch through `checkpoint`.
    pub fn with_checkpoint(mut self, checkpoint: Box<dyn Checkpoint>) -> Self {
        self.checkpoint = checkpoint;
        self
    }
}

/// Runs the topology and inference stages against a context.
pub struct Pipeline {
    ctx: PipelineContext,
    stages: Vec<StageReport>,
}

impl Pipeline {
    pub fn new(ctx: PipelineContext) -> Self {
        Self {
            ctx,
            stages: Vec::new(),
        }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    pub fn store(&self) -> &GridStore {
        &self.ctx.store
    }

    pub fn into_context(self) -> PipelineContext {
        self.ctx
    }

    /// Run every stage in order.
    pub fn run(&mut self) -> GridResult<PipelineReport> {
        self.ctx.config.validate()?;
        self.stages.clear();
        let store = &self.ctx.store;
        info!(
            nodes = store.nodes.len(),
            towers = store.towers.len(),
            areas = store.areas.len(),
            lines = store.edges().len(),
            "starting grid pipeline"
        );

        self.run_topology()?;
        self.run_inference()?;

        let store = &self.ctx.store;
        let integrity = run_stage(
            &mut self.stages,
            Stage::Audit,
            |r: &IntegrityReport| r.edges,
            || audit(store),
        )?;

        let report = PipelineReport {
            stages: std::mem::take(&mut self.stages),
            integrity,
        };
        info!(
            elapsed_ms = report.total_elapsed().as_millis() as u64,
            sound = report.integrity.is_sound(),
            "grid pipeline finished"
        );
        Ok(report)
    }

    /// Split through the second metadata rebuild.
    pub fn run_topology(&mut self) -> GridResult<()> {
        let PipelineContext {
            store,
            config,
            checkpoint,
        } = &mut self.ctx;
        let stages = &mut self.stages;

        run_stage(stages, Stage::Split, |s: &SplitSummary| s.segments_out, || {
            split_lines(store, config)
        })?;
        run_stage(stages, Stage::Snap, rows, || {
            snap_endpoints(store, config, checkpoint.as_mut())
        })?;
        run_stage(stages, Stage::BuildVertices, rows, || build_vertices(store, config))?;
        run_stage(stages, Stage::Wire, rows, || {
            wire_edges(store, config, checkpoint.as_mut())
        })?;
        run_stage(stages, Stage::Metadata, |m: &MetadataSummary| m.vertices, || {
            compute_metadata(store, config)
        })?;
        run_stage(stages, Stage::Bridge, rows, || bridge_gaps(store, config))?;
        run_stage(stages, Stage::Metadata, |m: &MetadataSummary| m.vertices, || {
            compute_metadata(store, config)
        })?;
        Ok(())
    }

    /// Seed through cost. Requires a wired store.
    pub fn run_inference(&mut self) -> GridResult<()> {
        let PipelineContext {
            store,
            config,
            checkpoint,
        } = &mut self.ctx;
        let stages = &mut self.stages;

        run_stage(stages, Stage::Seed, rows, || {
            seed_voltages(store, config, checkpoint.as_mut())
        })?;
        run_stage(stages, Stage::Propagate, rows, || {
            propagate_voltages(store, config, checkpoint.as_mut())
        })?;
        run_stage(stages, Stage::Splash, SplashSummary::total, || splash_back(store, config))?;
        run_stage(stages, Stage::Cost, rows, || {
            assign_costs(store, config, checkpoint.as_mut())
        })?;
        Ok(())
    }
}

fn rows(count: &usize) -> usize {
    *count
}

/// Run `body` inside a `stage` span and record its row count and timing.
fn run_stage<T>(
    stages: &mut Vec<StageReport>,
    stage: Stage,
    rows: impl FnOnce(&T) -> usize,
    body: impl FnOnce() -> GridResult<T>,
) -> GridResult<T> {
    let span = info_span!("stage", stage = stage.as_str());
    let _enter = span.enter();
    let start = Instant::now();
    let output = body()?;
    let elapsed = start.elapsed();
    let rows = rows(&output);
    info!(rows, elapsed_ms = elapsed.as_millis() as u64, "stage complete");
    stages.push(StageReport {
        stage,
        rows,
        elapsed,
    });
    Ok(output)
}

/// Run the full pipeline over `store` without checkpointing and hand the
/// store back with the report.
pub fn run_pipeline(
    store: GridStore,
    config: TopologyConfig,
) -> GridResult<(GridStore, PipelineReport)> {
    let mut pipeline = Pipeline::new(PipelineContext::new(store, config));
    let report = pipeline.run()?;
    Ok((pipeline.into_context().store, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;
    use gridkit_core::{Edge, EdgeId, Voltage, VoltageProvenance};
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;

    #[test]
    fn test_stage_order() {
        let mut store = GridStore::new();
        store.push_edge(
            Edge::natural(
                EdgeId::new(10),
                "line",
                line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)],
            )
            .with_voltage(Voltage::new(110), VoltageProvenance::Raw),
        );
        let (store, report) = run_pipeline(store, TopologyConfig::default()).unwrap();
        let order: Vec<Stage> = report.stages.iter().map(|s| s.stage).collect();
        assert_eq!(
            order,
            vec![
                Stage::Split,
                Stage::Snap,
                Stage::BuildVertices,
                Stage::Wire,
                Stage::Metadata,
                Stage::Bridge,
                Stage::Metadata,
                Stage::Seed,
                Stage::Propagate,
                Stage::Splash,
                Stage::Cost,
                Stage::Audit,
            ]
        );
        assert!(report.integrity.is_sound());
        assert_eq!(report.rows(Stage::Cost), 1);
        assert_eq!(store.edges()[0].id, EdgeId::new(1));
    }

    #[derive(Clone, Default)]
    struct StageMessages(Arc<Mutex<Vec<String>>>);

    struct MessageVisitor(String);

    impl Visit for MessageVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    impl<S> Layer<S> for StageMessages
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
            if ctx.event_span(event).is_some_and(|span| span.name() == "stage") {
                let mut visitor = MessageVisitor(String::new());
                event.record(&mut visitor);
                self.0.lock().unwrap().push(visitor.0);
            }
        }
    }

    #[test]
    fn test_stage_events_are_inside_stage_span() {
        let messages = StageMessages::default();
        let subscriber = tracing_subscriber::registry().with(messages.clone());
        tracing::subscriber::with_default(subscriber, || {
            let mut store = GridStore::new();
            store.push_edge(Edge::natural(
                EdgeId::new(1),
                "line",
                line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)],
            ));
            run_pipeline(store, TopologyConfig::default()).unwrap();
        });

        let messages = messages.0.lock().unwrap();
        assert!(messages.iter().any(|m| m == "lines split at towers"));
        assert!(messages.iter().any(|m| m == "endpoints snapped to assets"));
        assert_eq!(messages.iter().filter(|m| *m == "stage complete").count(), 12);
        assert!(!messages.iter().any(|m| m == "grid pipeline finished"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = TopologyConfig::default();
        config.batch_size = 0;
        let mut pipeline = Pipeline::new(PipelineContext::new(GridStore::new(), config));
        assert!(pipeline.run().is_err());
    }
}
