//! Batch descriptors and the checkpoint boundary.
//!
//! Update-style stages never touch the whole edge set in one unit of work.
//! They walk a [`BatchPlan`] of id ranges, apply the stage to one
//! [`BatchRange`] at a time and hand the result to a [`Checkpoint`], which is
//! where a storage provider commits its transaction. A failure in either the
//! batch body or the commit aborts the stage with [`GridError::Batch`].
//!
//! Every per-batch predicate in the pipeline is idempotent, so a stage that
//! aborted half way is resumed by re-running it from the start.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GridError, GridResult};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Split,
    Snap,
    BuildVertices,
    Wire,
    Metadata,
    Bridge,
    Seed,
    Propagate,
    Splash,
    Cost,
    Audit,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Split => "split",
            Stage::Snap => "snap",
            Stage::BuildVertices => "build_vertices",
            Stage::Wire => "wire",
            Stage::Metadata => "metadata",
            Stage::Bridge => "bridge",
            Stage::Seed => "seed",
            Stage::Propagate => "propagate",
            Stage::Splash => "splash",
            Stage::Cost => "cost",
            Stage::Audit => "audit",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An id range `(lo, hi]`: an id belongs to the batch iff `lo < id <= hi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchRange {
    lo: u64,
    hi: u64,
}

impl BatchRange {
    #[inline]
    pub fn new(lo: u64, hi: u64) -> Self {
        debug_assert!(lo <= hi);
        Self { lo, hi }
    }

    #[inline]
    pub fn lo(&self) -> u64 {
        self.lo
    }

    #[inline]
    pub fn hi(&self) -> u64 {
        self.hi
    }

    #[inline]
    pub fn contains(&self, id: u64) -> bool {
        id > self.lo && id <= self.hi
    }
}

impl fmt::Display for BatchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}]", self.lo, self.hi)
    }
}

/// Iterator over consecutive batch ranges covering `1..=max_id`.
///
/// An empty collection (`max_id == None`) produces no batches, so callers
/// never have to special-case a missing upper bound.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    cursor: u64,
    max_id: Option<u64>,
    size: u64,
}

impl BatchPlan {
    /// `size` of zero is clamped to one; [`crate::TopologyConfig::validate`]
    /// rejects it before a plan is ever built.
    pub fn new(max_id: Option<u64>, size: usize) -> Self {
        Self {
            cursor: 0,
            max_id,
            size: size.max(1) as u64,
        }
    }

    /// Number of batches remaining.
    pub fn remaining(&self) -> usize {
        match self.max_id {
            Some(max) if max > self.cursor => ((max - self.cursor).div_ceil(self.size)) as usize,
            _ => 0,
        }
    }
}

impl Iterator for BatchPlan {
    type Item = BatchRange;

    fn next(&mut self) -> Option<BatchRange> {
        let max = self.max_id?;
        if self.cursor >= max {
            return None;
        }
        let lo = self.cursor;
        let hi = lo.saturating_add(self.size);
        self.cursor = hi;
        Some(BatchRange::new(lo, hi))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

/// Transaction boundary of the storage provider.
///
/// Called once per batch after the batch body succeeded. Returning an error
/// aborts the current stage.
pub trait Checkpoint {
    fn commit(&mut self, stage: Stage, range: BatchRange, rows: usize) -> GridResult<()>;
}

/// Checkpoint for purely in-memory runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCheckpoint;

impl Checkpoint for NoopCheckpoint {
    fn commit(&mut self, _stage: Stage, _range: BatchRange, _rows: usize) -> GridResult<()> {
        Ok(())
    }
}

/// A committed batch, as recorded by [`CommitLog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitEntry {
    pub stage: Stage,
    pub range: BatchRange,
    pub rows: usize,
}

/// Checkpoint that keeps a log of every commit.
#[derive(Debug, Default, Clone)]
pub struct CommitLog {
    pub entries: Vec<CommitEntry>,
}

impl CommitLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_stage(&self, stage: Stage) -> impl Iterator<Item = &CommitEntry> {
        self.entries.iter().filter(move |e| e.stage == stage)
    }
}

impl Checkpoint for CommitLog {
    fn commit(&mut self, stage: Stage, range: BatchRange, rows: usize) -> GridResult<()> {
        self.entries.push(CommitEntry { stage, range, rows });
        Ok(())
    }
}

/// Apply `apply` to every range of `plan`, committing after each one.
///
/// Returns the total number of affected rows. The first failing batch aborts
/// the loop; nothing after it is applied.
pub fn run_batches<F>(
    stage: Stage,
    plan: BatchPlan,
    checkpoint: &mut dyn Checkpoint,
    mut apply: F,
) -> GridResult<usize>
where
    F: FnMut(BatchRange) -> GridResult<usize>,
{
    let total = plan.remaining();
    let mut rows = 0;
    for (done, range) in plan.enumerate() {
        let affected = apply(range).map_err(|err| GridError::in_batch(stage, range, err))?;
        checkpoint
            .commit(stage, range, affected)
            .map_err(|err| GridError::in_batch(stage, range, err))?;
        rows += affected;
        debug!(
            stage = %stage,
            range = %range,
            affected,
            "batch committed ({:.1}%)",
            100.0 * (done + 1) as f64 / total.max(1) as f64
        );
    }
    Ok(rows)
}
