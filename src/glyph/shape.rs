use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification label assigned to a glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Shape {
    StaffLine,
    Barline,
    ThickBarline,
    Brace,
    Bracket,
    Stem,
    Ledger,
    NoteheadBlack,
    NoteheadVoid,
    WholeNote,
    GClef,
    FClef,
    Sharp,
    Flat,
    Natural,
    Dot,
    QuarterRest,
    Beam,
    Text,
    Noise,
}

impl Shape {
    /// Whether the shape takes part in staff or system grouping.
    ///
    /// Changing the classification of such a glyph may regroup staves into
    /// different systems or parts, so corrections escalate to the structure
    /// stages instead of a local rebuild.
    pub const fn is_structural(self) -> bool {
        matches!(
            self,
            Shape::StaffLine | Shape::Barline | Shape::ThickBarline | Shape::Brace | Shape::Bracket
        )
    }

    pub const fn is_barline(self) -> bool {
        matches!(self, Shape::Barline | Shape::ThickBarline)
    }

    /// Shapes that join staves of one system into a single part.
    pub const fn is_part_link(self) -> bool {
        matches!(self, Shape::Brace | Shape::Bracket)
    }

    pub const fn is_head(self) -> bool {
        matches!(
            self,
            Shape::NoteheadBlack | Shape::NoteheadVoid | Shape::WholeNote
        )
    }

    /// Heads that are expected to hang on a stem.
    pub const fn is_stemmed_head(self) -> bool {
        matches!(self, Shape::NoteheadBlack | Shape::NoteheadVoid)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
