use super::scope::Scope;
use super::step::StepId;
use crate::geometry::GeometryError;
use crate::score::TreeError;
use thiserror::Error;

/// Why a stage could not complete its scope.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum StageError {
    #[error("glyph source failed: {0}")]
    Source(String),
    #[error("no staff found among {candidates} staff line candidate(s)")]
    NoStaff { candidates: usize },
    #[error("score tree: {0}")]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// A stage failure as reported to the caller.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("stage {stage} failed over {scope}: {cause}")]
pub struct StageFailure {
    pub stage: StepId,
    pub scope: Scope,
    #[source]
    pub cause: StageError,
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Stage(#[from] StageFailure),
    /// Cooperative cancellation; completed systems are kept and the stage
    /// is pending again over `remaining`.
    #[error("stage {stage} cancelled, {remaining} left pending")]
    Cancelled { stage: StepId, remaining: Scope },
    #[error("stage {stage} blocked: prerequisite {prerequisite} is not done")]
    Blocked { stage: StepId, prerequisite: StepId },
}

/// Internal outcome of an interrupted stage.
#[derive(Debug)]
pub(crate) enum Interrupt {
    Failed(StageError),
    Cancelled(Scope),
}

impl From<StageError> for Interrupt {
    fn from(err: StageError) -> Self {
        Interrupt::Failed(err)
    }
}

impl From<TreeError> for Interrupt {
    fn from(err: TreeError) -> Self {
        Interrupt::Failed(err.into())
    }
}

impl From<GeometryError> for Interrupt {
    fn from(err: GeometryError) -> Self {
        Interrupt::Failed(err.into())
    }
}
