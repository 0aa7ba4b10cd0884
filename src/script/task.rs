use super::impact::Impact;
use crate::glyph::{GlyphId, Shape};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User correction applied to the glyphs of a sheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    /// Give `shape` to the glyphs, or to one compound glyph merged from
    /// them when `compound` is set.
    Assign {
        glyphs: Vec<GlyphId>,
        shape: Shape,
        compound: bool,
    },
    /// Remove the classification of the glyphs, keeping them out of
    /// automatic labelling.
    Deassign { glyphs: Vec<GlyphId> },
}

impl Task {
    pub fn glyphs(&self) -> &[GlyphId] {
        match self {
            Task::Assign { glyphs, .. } | Task::Deassign { glyphs } => glyphs,
        }
    }

    /// Shape the task gives to its glyphs.
    pub fn shape(&self) -> Option<Shape> {
        match self {
            Task::Assign { shape, .. } => Some(*shape),
            Task::Deassign { .. } => None,
        }
    }
}

/// Command refused before touching the sheet.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("command rejected: {reason}")]
pub struct CommandRejected {
    pub reason: String,
}

impl CommandRejected {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Performed task with its sequence number and the invalidation it caused.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub seq: usize,
    pub task: Task,
    pub impact: Impact,
    /// Glyph created by a compound assignment.
    pub compound: Option<GlyphId>,
}
