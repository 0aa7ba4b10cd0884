//! Reports produced by pipeline runs.
//!
//! `RunReport` lists every stage a run executed with its scope and timing;
//! `TimingBreakdown` sums those timings per stage over several runs.

pub mod run;
pub mod timing;

pub use run::{RunReport, StageRun};
pub use timing::{StageTiming, TimingBreakdown};
