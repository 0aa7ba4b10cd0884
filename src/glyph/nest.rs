//! Per-sheet glyph store.
//!
//! Glyph ids are indices into the nest and are never reused. Merging glyphs
//! appends a compound glyph and retires its members, so ids handed out
//! earlier stay valid (they simply point to inactive glyphs).

use super::{Assignment, Glyph, GlyphId, Shape};
use crate::geometry::{union_all, GeometryError, PixelPoint, PixelRect};
use log::debug;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum NestError {
    #[error("unknown glyph {0}")]
    Unknown(GlyphId),
    #[error("glyph {0} was merged into compound {1}")]
    Retired(GlyphId, GlyphId),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

#[derive(Clone, Debug, Default)]
pub struct GlyphNest {
    glyphs: Vec<Glyph>,
}

impl GlyphNest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Register a pixel population as a new glyph.
    pub fn register(&mut self, pixels: Vec<PixelPoint>) -> Result<GlyphId, GeometryError> {
        let id = GlyphId(self.glyphs.len() as u32);
        let glyph = Glyph::new(id, pixels)?;
        self.glyphs.push(glyph);
        Ok(id)
    }

    pub fn get(&self, id: GlyphId) -> Option<&Glyph> {
        self.glyphs.get(id.0 as usize)
    }

    pub(crate) fn get_mut(&mut self, id: GlyphId) -> Option<&mut Glyph> {
        self.glyphs.get_mut(id.0 as usize)
    }

    /// Lookup that also rejects retired glyphs.
    pub fn active(&self, id: GlyphId) -> Result<&Glyph, NestError> {
        let glyph = self.get(id).ok_or(NestError::Unknown(id))?;
        match glyph.compound() {
            Some(compound) => Err(NestError::Retired(id, compound)),
            None => Ok(glyph),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Glyph> {
        self.glyphs.iter()
    }

    /// Glyphs still taking part in recognition.
    pub fn actives(&self) -> impl Iterator<Item = &Glyph> {
        self.glyphs.iter().filter(|g| g.is_active())
    }

    pub fn with_shape(&self, shape: Shape) -> impl Iterator<Item = &Glyph> {
        self.actives().filter(move |g| g.has_shape(shape))
    }

    /// User classification; always wins over automatic labels.
    ///
    /// Assigning `None` pins the glyph as unclassified: recognition stages
    /// leave it out from then on, until the user assigns it a shape.
    pub fn assign(&mut self, id: GlyphId, shape: Option<Shape>) -> Result<bool, NestError> {
        self.active(id)?;
        let glyph = self.get_mut(id).ok_or(NestError::Unknown(id))?;
        Ok(glyph.set_shape(shape, Assignment::Manual))
    }

    /// Automatic classification from a recognition stage.
    ///
    /// Manually classified glyphs are left alone; returns whether the label
    /// changed.
    pub fn label(&mut self, id: GlyphId, shape: Option<Shape>) -> bool {
        match self.get_mut(id) {
            Some(glyph) if glyph.is_active() && !glyph.is_manual() => {
                glyph.set_shape(shape, Assignment::Automatic)
            }
            _ => false,
        }
    }

    /// Merge glyphs into one compound glyph and retire the members.
    ///
    /// The compound's pixel set is the union of the members', so its box is
    /// the union of their boxes.
    pub fn merge(&mut self, ids: &[GlyphId]) -> Result<GlyphId, NestError> {
        let mut pixels = Vec::new();
        let mut boxes: Vec<PixelRect> = Vec::with_capacity(ids.len());
        for &id in ids {
            let glyph = self.active(id)?;
            pixels.extend_from_slice(glyph.pixels());
            boxes.push(glyph.bounds());
        }
        let expected = union_all(&boxes)?;
        let compound = GlyphId(self.glyphs.len() as u32);
        let glyph = Glyph::new(compound, pixels)?.with_members(ids.to_vec());
        debug_assert_eq!(glyph.bounds(), expected);
        self.glyphs.push(glyph);
        for &id in ids {
            if let Some(member) = self.get_mut(id) {
                member.retire_into(compound);
            }
        }
        debug!(
            "GlyphNest::merge {} glyph(s) into {} bounds={:?}",
            ids.len(),
            compound,
            expected
        );
        Ok(compound)
    }
}
