//! Glyphs and their alignment facet.
//!
//! A glyph is a connected set of foreground pixels handed over by the glyph
//! source. Its pixel membership never changes once formed; merging several
//! glyphs produces a new compound glyph and retires the members. What does
//! change is the classification, and every change bumps the glyph revision.
//!
//! Modules
//! - `alignment` – line fit and the descriptors derived from it.
//! - `nest` – per-sheet glyph store with assignment and merging.
//! - `shape` – classification labels.

pub mod alignment;
pub mod nest;
pub mod shape;

pub use alignment::{Alignment, AlignmentParams};
pub use nest::{GlyphNest, NestError};
pub use shape::Shape;

use crate::geometry::{GeometryError, PixelPoint, PixelRect};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Identifier of a glyph within its sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlyphId(pub u32);

impl fmt::Display for GlyphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}", self.0)
    }
}

/// Dominant direction of a glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn opposite(self) -> Orientation {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

/// No meaningful line can be fitted to the glyph population.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("degenerate glyph {id}: {distinct_pixels} distinct pixel(s)")]
pub struct DegenerateGlyph {
    pub id: GlyphId,
    pub distinct_pixels: usize,
}

/// How a glyph got its current classification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Assignment {
    /// Not classified, or labelled by a recognition stage.
    #[default]
    Automatic,
    /// Set by a user command; recognition stages never override it.
    Manual,
}

/// Connected component of foreground pixels.
#[derive(Clone, Debug)]
pub struct Glyph {
    id: GlyphId,
    pixels: Vec<PixelPoint>,
    bounds: PixelRect,
    shape: Option<Shape>,
    assignment: Assignment,
    revision: u64,
    members: Vec<GlyphId>,
    compound: Option<GlyphId>,
    forced_ends: Option<([f64; 2], [f64; 2])>,
    alignment: OnceLock<Result<Alignment, DegenerateGlyph>>,
}

impl Glyph {
    /// Build a glyph from its pixel population. Duplicate pixels are dropped.
    pub fn new(id: GlyphId, mut pixels: Vec<PixelPoint>) -> Result<Self, GeometryError> {
        pixels.sort_by_key(|p| (p.y, p.x));
        pixels.dedup();
        let bounds = PixelRect::bounding(&pixels)?;
        Ok(Self {
            id,
            pixels,
            bounds,
            shape: None,
            assignment: Assignment::Automatic,
            revision: 0,
            members: Vec::new(),
            compound: None,
            forced_ends: None,
            alignment: OnceLock::new(),
        })
    }

    pub(crate) fn with_members(mut self, members: Vec<GlyphId>) -> Self {
        self.members = members;
        self
    }

    pub fn id(&self) -> GlyphId {
        self.id
    }

    pub fn pixels(&self) -> &[PixelPoint] {
        &self.pixels
    }

    /// Number of (distinct) pixels.
    pub fn weight(&self) -> usize {
        self.pixels.len()
    }

    /// Contour bounding box in pixel space.
    pub fn bounds(&self) -> PixelRect {
        self.bounds
    }

    pub fn center(&self) -> PixelPoint {
        self.bounds.center()
    }

    pub fn shape(&self) -> Option<Shape> {
        self.shape
    }

    pub fn assignment(&self) -> Assignment {
        self.assignment
    }

    pub fn is_manual(&self) -> bool {
        self.assignment == Assignment::Manual
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Glyphs merged into this compound glyph.
    pub fn members(&self) -> &[GlyphId] {
        &self.members
    }

    /// Compound glyph this glyph was merged into, if retired.
    pub fn compound(&self) -> Option<GlyphId> {
        self.compound
    }

    pub fn is_active(&self) -> bool {
        self.compound.is_none()
    }

    pub fn has_shape(&self, shape: Shape) -> bool {
        self.shape == Some(shape)
    }

    /// Set the classification; returns whether anything changed.
    pub(crate) fn set_shape(&mut self, shape: Option<Shape>, assignment: Assignment) -> bool {
        if self.shape == shape && self.assignment == assignment {
            return false;
        }
        self.shape = shape;
        self.assignment = assignment;
        self.revision += 1;
        true
    }

    pub(crate) fn retire_into(&mut self, compound: GlyphId) {
        self.compound = Some(compound);
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_changes_bump_revision() {
        let mut g = Glyph::new(GlyphId(0), vec![PixelPoint::new(0, 0), PixelPoint::new(1, 0)])
            .unwrap();
        assert_eq!(g.revision(), 0);
        assert!(g.set_shape(Some(Shape::Stem), Assignment::Automatic));
        assert_eq!(g.revision(), 1);
        assert!(!g.set_shape(Some(Shape::Stem), Assignment::Automatic));
        assert_eq!(g.revision(), 1);
        assert!(g.set_shape(Some(Shape::Stem), Assignment::Manual));
        assert_eq!(g.revision(), 2);
        assert!(g.is_manual());
    }

    #[test]
    fn duplicate_pixels_are_merged() {
        let g = Glyph::new(
            GlyphId(3),
            vec![
                PixelPoint::new(2, 2),
                PixelPoint::new(2, 2),
                PixelPoint::new(3, 2),
            ],
        )
        .unwrap();
        assert_eq!(g.weight(), 2);
        assert_eq!(g.bounds(), PixelRect::new(2, 2, 2, 1));
        assert!(Glyph::new(GlyphId(4), Vec::new()).is_err());
    }
}
