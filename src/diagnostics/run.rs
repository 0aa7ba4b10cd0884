use crate::pipeline::{Scope, StepId};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One stage execution within a pipeline run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRun {
    pub stage: StepId,
    pub scope: Scope,
    /// Systems the stage committed (0 for sheet-wide classification).
    pub systems: usize,
    /// Stage-specific count: glyphs labelled, measures built, chords built.
    pub items: usize,
    pub elapsed_ms: f64,
}

/// What a call to [`crate::Pipeline::run`] executed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub total_ms: f64,
    pub stages: Vec<StageRun>,
    /// Pending stages left alone because a prerequisite is not done.
    pub skipped: Vec<StepId>,
}

impl RunReport {
    pub fn executed(&self) -> Vec<StepId> {
        self.stages.iter().map(|s| s.stage).collect()
    }

    pub fn find(&self, stage: StepId) -> Option<&StageRun> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// Milliseconds elapsed since `start`.
pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
