//! Staged music sheet recognition engine.
//!
//! Glyphs handed over by a [`pipeline::GlyphSource`] are classified by a
//! chain of stages that assemble a [`score::ScoreTree`]. User corrections go
//! through [`script`] tasks, which invalidate only the stages and systems
//! (or parts) they affect; the next [`Pipeline::run`] re-executes exactly
//! that.

// Public modules (stable-ish surface)
pub mod geometry;
pub mod glyph;
pub mod image;
pub mod pipeline;
pub mod score;
pub mod script;

// Tooling: reports, demo configuration, synthetic sheets.
pub mod config;
pub mod diagnostics;
pub mod synthetic;

// --- High-level re-exports -------------------------------------------------

pub use crate::pipeline::{
    process_sheets, CancelToken, EngineParams, Pipeline, PipelineError, Scope, SheetInput,
    StageState, StepId,
};
pub use crate::score::{NodeId, ScoreTree, ScoreVisitor};
pub use crate::script::{CommandRejected, Task, TaskLog};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use omr_engine::prelude::*;
///
/// # fn main() {
/// let sheet = StandardSheet::generate(&SyntheticConfig::default());
/// let (input, source) = sheet.builder.build();
/// let mut pipeline = Pipeline::new(input, Box::new(source), EngineParams::default());
/// let report = pipeline.run().expect("recognition");
/// println!("stages={} total_ms={:.3}", report.stages.len(), report.total_ms);
/// # }
/// ```
pub mod prelude {
    pub use crate::glyph::{GlyphId, Shape};
    pub use crate::synthetic::{SheetBuilder, StandardSheet, SyntheticConfig};
    pub use crate::{EngineParams, Pipeline, Scope, StepId};
}
