//! Pipeline driver: stage states, scoped invalidation, execution and user
//! commands.

use super::error::{Interrupt, PipelineError, StageFailure};
use super::params::EngineParams;
use super::scope::Scope;
use super::sheet::{GlyphSource, Sheet, SheetInput};
use super::stages::{self, StageContext};
use super::step::{StageState, StepId};
use super::CancelToken;
use crate::diagnostics::run::elapsed_ms;
use crate::diagnostics::{RunReport, StageRun};
use crate::glyph::{GlyphId, Shape};
use crate::script::{self, CommandRejected, Task, TaskLog, TaskRecord};
use log::{debug, info};
use std::time::Instant;

#[derive(Clone, Debug, PartialEq)]
struct StageStatus {
    state: StageState,
    /// Scope still to process while pending; the last executed scope once
    /// done or failed.
    scope: Scope,
}

/// Recognition pipeline of one sheet.
pub struct Pipeline {
    sheet: Sheet,
    source: Box<dyn GlyphSource>,
    params: EngineParams,
    status: [StageStatus; StepId::ALL.len()],
    cancel: CancelToken,
    log: TaskLog,
    last_report: Option<RunReport>,
}

impl Pipeline {
    /// Every stage starts pending over the whole sheet.
    pub fn new(input: SheetInput, source: Box<dyn GlyphSource>, params: EngineParams) -> Self {
        Self {
            sheet: Sheet::new(input),
            source,
            params,
            status: std::array::from_fn(|_| StageStatus {
                state: StageState::Pending,
                scope: Scope::Sheet,
            }),
            cancel: CancelToken::new(),
            log: TaskLog::new(),
            last_report: None,
        }
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// Handle to cancel the running stage from another thread.
    ///
    /// A request is consumed by the stage it interrupts: the token is clear
    /// again once the cancelled run returns, so the next run resumes.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self, step: StepId) -> StageState {
        self.status[step.index()].state
    }

    /// Scope the stage will process on its next execution.
    pub fn pending_scope(&self, step: StepId) -> Option<&Scope> {
        let status = &self.status[step.index()];
        (status.state == StageState::Pending).then_some(&status.scope)
    }

    pub fn log(&self) -> &TaskLog {
        &self.log
    }

    pub fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }

    /// Force `step` and every stage depending on it back to pending.
    ///
    /// The scope is widened to what each stage can honor. A stage that was
    /// done takes the new scope; one already pending (or failed) accumulates
    /// it.
    pub fn invalidate(&mut self, step: StepId, scope: Scope) {
        for s in std::iter::once(step).chain(step.dependents()) {
            let scope = scope.clone().escalate(s.scope_policy());
            let status = &mut self.status[s.index()];
            status.scope = match status.state {
                StageState::Done => scope,
                _ => std::mem::replace(&mut status.scope, Scope::Sheet).merge(scope),
            };
            status.state = StageState::Pending;
            debug!("{s} pending over {}", status.scope);
        }
    }

    /// First prerequisite of `step` that is not done.
    fn blocker(&self, step: StepId) -> Option<StepId> {
        step.prerequisites()
            .iter()
            .copied()
            .find(|p| self.state(*p) != StageState::Done)
    }

    /// Run every pending stage whose prerequisites are done, in order.
    ///
    /// A failing stage does not stop stages that do not depend on it; the
    /// first failure is returned once the run is over. Cancellation returns
    /// at once and clears the token. Failed stages stay failed until invalidated.
    pub fn run(&mut self) -> Result<RunReport, PipelineError> {
        let start = Instant::now();
        let mut report = RunReport::default();
        let mut failure: Option<StageFailure> = None;
        for step in StepId::ALL {
            if self.state(step) != StageState::Pending {
                continue;
            }
            if let Some(pre) = self.blocker(step) {
                debug!("{step} skipped, {pre} is not done");
                report.skipped.push(step);
                continue;
            }
            match self.execute(step) {
                Ok(run) => report.stages.push(run),
                Err(PipelineError::Stage(err)) => {
                    info!("{err}");
                    failure.get_or_insert(err);
                }
                Err(other) => {
                    info!("{other}");
                    report.total_ms = elapsed_ms(start);
                    self.last_report = Some(report);
                    return Err(other);
                }
            }
        }
        report.total_ms = elapsed_ms(start);
        self.last_report = Some(report.clone());
        match failure {
            Some(err) => Err(err.into()),
            None => Ok(report),
        }
    }

    /// Run a single stage over its pending (or last) scope.
    pub fn run_stage(&mut self, step: StepId) -> Result<StageRun, PipelineError> {
        if let Some(prerequisite) = self.blocker(step) {
            return Err(PipelineError::Blocked {
                stage: step,
                prerequisite,
            });
        }
        self.execute(step)
    }

    fn execute(&mut self, step: StepId) -> Result<StageRun, PipelineError> {
        let index = step.index();
        let scope = self.status[index].scope.clone();
        self.status[index].state = StageState::Running;
        debug!("{step} running over {scope}");

        let start = Instant::now();
        let ctx = StageContext {
            params: &self.params,
            scope: &scope,
            cancel: &self.cancel,
            source: self.source.as_ref(),
        };
        let result = stages::run(step, &mut self.sheet, &ctx);
        let elapsed = elapsed_ms(start);

        let status = &mut self.status[index];
        match result {
            Ok(outcome) => {
                status.state = StageState::Done;
                debug!(
                    "{step} done in {elapsed:.3} ms systems={} items={}",
                    outcome.systems, outcome.items
                );
                Ok(StageRun {
                    stage: step,
                    scope,
                    systems: outcome.systems,
                    items: outcome.items,
                    elapsed_ms: elapsed,
                })
            }
            Err(Interrupt::Failed(cause)) => {
                status.state = StageState::Failed;
                Err(StageFailure {
                    stage: step,
                    scope,
                    cause,
                }
                .into())
            }
            Err(Interrupt::Cancelled(remaining)) => {
                status.state = StageState::Pending;
                status.scope = remaining.clone();
                self.cancel.reset();
                Err(PipelineError::Cancelled {
                    stage: step,
                    remaining,
                })
            }
        }
    }

    /// Give `shape` to the glyphs (merged into one compound when asked).
    pub fn assign(&mut self, glyphs: &[GlyphId], shape: Shape, compound: bool) -> Result<TaskRecord, CommandRejected> {
        self.apply(Task::Assign {
            glyphs: glyphs.to_vec(),
            shape,
            compound,
        })
    }

    /// Remove the classification of the glyphs.
    ///
    /// The glyphs stay manual: a later shapes run does not label them again.
    pub fn deassign(&mut self, glyphs: &[GlyphId]) -> Result<TaskRecord, CommandRejected> {
        self.apply(Task::Deassign {
            glyphs: glyphs.to_vec(),
        })
    }

    /// Perform a task, invalidate what it impacts and record it.
    pub fn apply(&mut self, task: Task) -> Result<TaskRecord, CommandRejected> {
        let (impact, compound) = script::impact::perform(&task, &mut self.sheet)?;
        self.invalidate(impact.stage, impact.scope.clone());
        let record = TaskRecord {
            seq: self.log.next_seq(),
            task,
            impact,
            compound,
        };
        Ok(self.log.record(record).clone())
    }
}

/// Run independent sheets, on the rayon pool when enabled.
pub fn process_sheets(pipelines: &mut [Pipeline]) -> Vec<Result<RunReport, PipelineError>> {
    #[cfg(feature = "parallel")]
    let results: Vec<_> = {
        use rayon::prelude::*;
        pipelines.par_iter_mut().map(|p| p.run()).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let results: Vec<_> = pipelines.iter_mut().map(|p| p.run()).collect();
    results
}
