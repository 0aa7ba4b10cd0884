//! Per-sheet recognition state and its external inputs.

use super::step::StepId;
use crate::geometry::{PixelPoint, PixelRect};
use crate::glyph::{GlyphId, GlyphNest};
use crate::image::BinaryImage;
use crate::score::{ScoreData, ScoreTree};
use serde::Serialize;

/// Monochrome raster with its global scale and (already corrected) skew.
#[derive(Clone, Debug)]
pub struct SheetInput {
    pub raster: BinaryImage,
    /// Staff line spacing in pixels.
    pub interline: f64,
    /// Skew angle in radians, already removed from the raster.
    pub skew: f64,
}

/// External collaborator yielding the candidate glyphs of a sheet.
///
/// The engine never segments pixels itself; it only consumes the
/// populations handed over here.
pub trait GlyphSource: Send {
    fn glyphs(&self, raster: &BinaryImage) -> Result<Vec<Vec<PixelPoint>>, String>;
}

/// In-memory glyph source.
#[derive(Clone, Debug, Default)]
pub struct VecGlyphSource {
    pub populations: Vec<Vec<PixelPoint>>,
}

impl VecGlyphSource {
    pub fn new(populations: Vec<Vec<PixelPoint>>) -> Self {
        Self { populations }
    }
}

impl GlyphSource for VecGlyphSource {
    fn glyphs(&self, _raster: &BinaryImage) -> Result<Vec<Vec<PixelPoint>>, String> {
        Ok(self.populations.clone())
    }
}

/// Staff found by the grid stage.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StaffInfo {
    /// 0-based rank in the sheet, top to bottom.
    pub index: usize,
    /// Ordinates of the lines, top to bottom.
    pub lines: Vec<i32>,
    /// Union of the line glyph boxes.
    pub area: PixelRect,
    pub glyphs: Vec<GlyphId>,
}

impl StaffInfo {
    pub fn top(&self) -> i32 {
        self.area.y
    }

    pub fn bottom(&self) -> i32 {
        self.area.last_y()
    }

    pub fn left(&self) -> i32 {
        self.area.x
    }

    pub fn right(&self) -> i32 {
        self.area.last_x()
    }
}

/// Recognition problem worth showing to the user.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Issue {
    pub stage: StepId,
    pub system: Option<usize>,
    pub part: Option<usize>,
    /// Locator such as `S1P2M3`.
    pub context: String,
    pub glyph: Option<GlyphId>,
    pub text: String,
}

/// Everything the stages read and write for one sheet.
#[derive(Debug)]
pub struct Sheet {
    pub(crate) raster: BinaryImage,
    pub(crate) interline: f64,
    pub(crate) skew: f64,
    pub(crate) nest: GlyphNest,
    pub(crate) staves: Vec<StaffInfo>,
    pub(crate) tree: ScoreTree,
    pub(crate) issues: Vec<Issue>,
}

impl Sheet {
    pub fn new(input: SheetInput) -> Self {
        let tree = ScoreTree::new(Self::score_data(&input.raster, input.interline, input.skew));
        Self {
            raster: input.raster,
            interline: input.interline,
            skew: input.skew,
            nest: GlyphNest::new(),
            staves: Vec::new(),
            tree,
            issues: Vec::new(),
        }
    }

    pub(crate) fn score_data(raster: &BinaryImage, interline: f64, skew: f64) -> ScoreData {
        ScoreData {
            dimension: (raster.w as i32, raster.h as i32),
            interline,
            skew,
        }
    }

    pub fn raster(&self) -> &BinaryImage {
        &self.raster
    }

    pub fn interline(&self) -> f64 {
        self.interline
    }

    pub fn skew(&self) -> f64 {
        self.skew
    }

    /// `(width, height)` in pixels.
    pub fn dimension(&self) -> (i32, i32) {
        (self.raster.w as i32, self.raster.h as i32)
    }

    pub fn nest(&self) -> &GlyphNest {
        &self.nest
    }

    pub fn staves(&self) -> &[StaffInfo] {
        &self.staves
    }

    pub fn tree(&self) -> &ScoreTree {
        &self.tree
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Interline fraction converted to pixels.
    #[inline]
    pub fn scale(&self, fraction: f64) -> f64 {
        fraction * self.interline
    }
}
