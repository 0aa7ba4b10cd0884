//! Node kinds of the score tree.
//!
//! The set of kinds is closed. Every geometry or containment rule is an
//! exhaustive `match` on [`NodeKind`], so adding a kind without deciding how
//! it computes its box is a compile error rather than a runtime surprise.

use crate::geometry::{PixelPoint, PixelRect, SystemFrame};
use crate::glyph::{GlyphId, Shape};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;

/// Index of a node in the score arena. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Vertical position of a note relative to its staff.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffPosition {
    AboveStaves,
    WithinStaves,
    BelowStaves,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreData {
    /// Sheet width and height in pixels.
    pub dimension: (i32, i32),
    /// Interline (staff line spacing) in pixels.
    pub interline: f64,
    /// Global skew angle in radians, already corrected in the raster.
    pub skew: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemData {
    /// 1-based rank in the score.
    pub id: usize,
    pub frame: SystemFrame,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartData {
    /// 1-based rank within the system.
    pub id: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaffData {
    /// 1-based rank within the system.
    pub id: usize,
    /// Ordinates of the five staff lines, top to bottom.
    pub lines: Vec<i32>,
    pub area: PixelRect,
}

impl StaffData {
    pub fn top(&self) -> i32 {
        self.lines.first().copied().unwrap_or(self.area.y)
    }

    pub fn bottom(&self) -> i32 {
        self.lines.last().copied().unwrap_or(self.area.last_y())
    }

    /// Ordinate of the middle line.
    pub fn middle(&self) -> f64 {
        (self.top() + self.bottom()) as f64 * 0.5
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasureData {
    /// Score-wide number, assigned by layout (0 until then).
    pub number: i32,
    pub area: PixelRect,
    pub left_bar: Option<GlyphId>,
    pub right_bar: Option<GlyphId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotData {
    /// Abscissa of the slot (leftmost chord center).
    pub x: i32,
    pub area: PixelRect,
    /// Chords aligned on this slot, in the same measure.
    pub chords: Vec<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChordData {
    pub stem: Option<GlyphId>,
    pub stem_area: Option<PixelRect>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteData {
    pub glyph: GlyphId,
    pub shape: Shape,
    pub area: PixelRect,
    /// Staff rank within the system.
    pub staff: usize,
    /// Half-interline steps from the staff middle line, positive downward.
    pub pitch_position: i32,
    pub staff_position: StaffPosition,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Score(ScoreData),
    System(SystemData),
    Part(PartData),
    Staff(StaffData),
    Measure(MeasureData),
    Slot(SlotData),
    Chord(ChordData),
    Note(NoteData),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Score(_) => "Score",
            NodeKind::System(_) => "System",
            NodeKind::Part(_) => "Part",
            NodeKind::Staff(_) => "Staff",
            NodeKind::Measure(_) => "Measure",
            NodeKind::Slot(_) => "Slot",
            NodeKind::Chord(_) => "Chord",
            NodeKind::Note(_) => "Note",
        }
    }

    /// Box carried by the node itself, besides its children.
    pub fn intrinsic_box(&self) -> Option<PixelRect> {
        match self {
            NodeKind::Score(_) | NodeKind::System(_) | NodeKind::Part(_) => None,
            NodeKind::Staff(s) => Some(s.area),
            NodeKind::Measure(m) => Some(m.area),
            NodeKind::Slot(s) => Some(s.area),
            NodeKind::Chord(c) => c.stem_area,
            NodeKind::Note(n) => Some(n.area),
        }
    }

    /// Whether a node of kind `child` may hang below this one.
    pub fn accepts(&self, child: &NodeKind) -> bool {
        matches!(
            (self, child),
            (NodeKind::Score(_), NodeKind::System(_))
                | (NodeKind::System(_), NodeKind::Part(_))
                | (NodeKind::Part(_), NodeKind::Staff(_))
                | (NodeKind::Part(_), NodeKind::Measure(_))
                | (NodeKind::Measure(_), NodeKind::Slot(_))
                | (NodeKind::Measure(_), NodeKind::Chord(_))
                | (NodeKind::Chord(_), NodeKind::Note(_))
        )
    }

    /// Short description without arena handles, stable across rebuilds.
    pub fn describe(&self) -> String {
        match self {
            NodeKind::Score(s) => format!("Score {}x{}", s.dimension.0, s.dimension.1),
            NodeKind::System(s) => format!(
                "System {} origin=({},{}) {}x{}",
                s.id, s.frame.origin.x, s.frame.origin.y, s.frame.width, s.frame.height
            ),
            NodeKind::Part(p) => format!("Part {}", p.id),
            NodeKind::Staff(s) => format!("Staff {} lines={:?}", s.id, s.lines),
            NodeKind::Measure(m) => format!(
                "Measure {} x=[{},{}]",
                m.number,
                m.area.x,
                m.area.last_x()
            ),
            NodeKind::Slot(s) => format!("Slot x={} chords={}", s.x, s.chords.len()),
            NodeKind::Chord(c) => match c.stem {
                Some(stem) => format!("Chord stem={stem}"),
                None => "Chord".to_string(),
            },
            NodeKind::Note(n) => format!(
                "Note {} {} staff={} pitch={}",
                n.glyph, n.shape, n.staff, n.pitch_position
            ),
        }
    }
}

/// Arena slot: kind, links, revision and the lazily computed geometry.
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) revision: u64,
    pub(crate) bounds: Cell<Option<PixelRect>>,
    pub(crate) center: Cell<Option<PixelPoint>>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            revision: 0,
            bounds: Cell::new(None),
            center: Cell::new(None),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Bumped every time the node or something below it is mutated.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Cached box, `None` while unknown.
    pub fn cached_bounds(&self) -> Option<PixelRect> {
        self.bounds.get()
    }

    pub(crate) fn reset_geometry(&self) {
        self.bounds.set(None);
        self.center.set(None);
    }
}

