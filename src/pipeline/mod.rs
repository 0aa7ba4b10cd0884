//! Staged recognition pipeline.
//!
//! A [`Pipeline`] owns one [`Sheet`] and runs the stages named by
//! [`StepId`] in dependency order. Each stage keeps its own [`StageState`]
//! and the [`Scope`] still pending for it, so a correction only re-runs
//! the stages and the systems (or parts) it actually affects.
//!
//! Modules
//! - `step`: stage ids, prerequisites, scope policies, state machine.
//! - `scope`: sheet / systems / parts scopes with merge and escalation.
//! - `params`: engine parameters, serde with per-field defaults.
//! - `sheet`: per-sheet state and the glyph source seam.
//! - `error`: stage failures and pipeline errors.
//! - `stages`: the stage bodies.
//! - `engine`: the driver, user commands and multi-sheet processing.

pub mod engine;
pub mod error;
pub mod params;
pub mod scope;
pub mod sheet;
pub(crate) mod stages;
pub mod step;

pub use engine::{process_sheets, Pipeline};
pub use error::{PipelineError, StageError, StageFailure};
pub use params::{BarParams, EngineParams, GridParams, ShapeParams, SymbolParams};
pub use scope::Scope;
pub use sheet::{GlyphSource, Issue, Sheet, SheetInput, StaffInfo, VecGlyphSource};
pub use step::{ScopePolicy, StageState, StepId};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag, checked by stages between systems.
///
/// Clones share the flag, so a handle can be moved to another thread. The
/// pipeline clears it when a stage stops on it; a request made while no
/// stage runs interrupts the next one.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}
