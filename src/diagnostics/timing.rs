use super::run::RunReport;
use crate::pipeline::StepId;
use serde::{Deserialize, Serialize};

/// Accumulated executions of one stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub stage: StepId,
    pub runs: usize,
    pub elapsed_ms: f64,
    pub max_ms: f64,
}

impl StageTiming {
    fn new(stage: StepId) -> Self {
        Self {
            stage,
            runs: 0,
            elapsed_ms: 0.0,
            max_ms: 0.0,
        }
    }

    pub fn mean_ms(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.elapsed_ms / self.runs as f64
        }
    }
}

/// Per-stage timing summed over a series of runs (an initial run followed
/// by re-runs after corrections, typically).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    /// Stages that ran at least once, in pipeline order.
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a RunReport>) -> Self {
        let mut slots: Vec<StageTiming> = StepId::ALL.iter().map(|s| StageTiming::new(*s)).collect();
        let mut total_ms = 0.0;
        for report in reports {
            total_ms += report.total_ms;
            for run in &report.stages {
                let slot = &mut slots[run.stage.index()];
                slot.runs += 1;
                slot.elapsed_ms += run.elapsed_ms;
                slot.max_ms = slot.max_ms.max(run.elapsed_ms);
            }
        }
        slots.retain(|s| s.runs > 0);
        Self {
            total_ms,
            stages: slots,
        }
    }

    /// Sum of the stage entries; the remainder of `total_ms` is driver
    /// overhead.
    pub fn stages_ms(&self) -> f64 {
        self.stages.iter().map(|s| s.elapsed_ms).sum()
    }

    pub fn find(&self, stage: StepId) -> Option<&StageTiming> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}
