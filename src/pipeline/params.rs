//! Parameter types configuring the recognition stages.
//!
//! Lengths are fractions of the interline, so the same defaults work at
//! any scan resolution. Every struct deserializes with missing fields taken
//! from `Default`, which lets a JSON config override a single knob.

use crate::glyph::AlignmentParams;
use crate::score::LayoutParams;
use serde::{Deserialize, Serialize};

/// Engine-wide parameters, read-only once a pipeline is built.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    pub alignment: AlignmentParams,
    pub grid: GridParams,
    pub bars: BarParams,
    pub shapes: ShapeParams,
    pub symbols: SymbolParams,
    pub layout: LayoutParams,
    /// Compute per-system plans on the rayon pool (needs the `parallel`
    /// feature; ignored otherwise).
    pub parallel: bool,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            alignment: AlignmentParams::default(),
            grid: GridParams::default(),
            bars: BarParams::default(),
            shapes: ShapeParams::default(),
            symbols: SymbolParams::default(),
            layout: LayoutParams::default(),
            parallel: true,
        }
    }
}

/// Staff line detection and staff grouping.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParams {
    /// Minimum length of a staff line candidate.
    pub min_line_length: f64,
    /// Maximum mean thickness of a staff line candidate.
    pub max_line_thickness: f64,
    /// Allowed deviation of the line spacing from one interline.
    pub spacing_tolerance: f64,
    /// Lines per staff.
    pub lines_per_staff: usize,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            min_line_length: 4.0,
            max_line_thickness: 0.3,
            spacing_tolerance: 0.25,
            lines_per_staff: 5,
        }
    }
}

/// Bar line classification.
///
/// - `max_thickness`: thicker vertical sticks are not bar lines.
/// - `thick_threshold`: mean thickness above which a bar line is thick.
/// - `span_tolerance`: slack on each staff edge when testing that a stick
///   spans the staff from top line to bottom line.
/// - `merge_distance`: bar lines closer than this form one measure boundary.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BarParams {
    pub max_thickness: f64,
    pub thick_threshold: f64,
    pub span_tolerance: f64,
    pub merge_distance: f64,
}

impl Default for BarParams {
    fn default() -> Self {
        Self {
            max_thickness: 0.8,
            thick_threshold: 0.25,
            span_tolerance: 0.25,
            merge_distance: 0.6,
        }
    }
}

/// Stems, ledgers and note heads.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeParams {
    pub min_stem_length: f64,
    pub max_stem_length: f64,
    pub max_stem_thickness: f64,
    pub min_ledger_length: f64,
    pub max_ledger_length: f64,
    pub max_ledger_thickness: f64,
    /// Accepted range for both head box dimensions.
    pub min_head_size: f64,
    pub max_head_size: f64,
    /// Ratio weight / box area from which a head is black.
    pub black_fill: f64,
    /// Ratio from which a head is void; below it the blob is left alone.
    pub void_fill: f64,
    /// An end is fused when this share of the stick thickness touches
    /// foreground beyond it. Stems may be fused at one end only.
    pub fused_end_ratio: f64,
    /// Largest RMS pixel distance to the fitted line for stems and ledgers.
    pub max_line_distance: f64,
}

impl Default for ShapeParams {
    fn default() -> Self {
        Self {
            min_stem_length: 2.0,
            max_stem_length: 6.0,
            max_stem_thickness: 0.2,
            min_ledger_length: 0.8,
            max_ledger_length: 3.0,
            max_ledger_thickness: 0.3,
            min_head_size: 0.7,
            max_head_size: 1.6,
            black_fill: 0.6,
            void_fill: 0.2,
            fused_end_ratio: 0.5,
            max_line_distance: 0.15,
        }
    }
}

/// Chord, note and slot assembly.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolParams {
    /// Margin around a stem box within which a head is attached to it.
    pub stem_attach: f64,
    /// Chords whose abscissae differ by less than this share a slot.
    pub slot_margin: f64,
    /// Pitch position (half interlines) from which ledgers are expected.
    pub ledger_pitch: i32,
    /// Vertical slack when looking for the ledgers of a note.
    pub ledger_reach: f64,
}

impl Default for SymbolParams {
    fn default() -> Self {
        Self {
            stem_attach: 0.3,
            slot_margin: 0.75,
            ledger_pitch: 6,
            ledger_reach: 0.6,
        }
    }
}
