//! Synthetic sheets for tests and the demo binary.
//!
//! [`SheetBuilder`] draws staff lines, bar lines, stems, note heads and
//! ledgers as separate pixel populations, the way a connected-component
//! extractor would hand them over, and rasterizes their union. Population
//! `i` becomes glyph `G{i}` once loaded, so the handles returned while
//! drawing are the glyph ids seen by the pipeline.
//!
//! Geometry conventions, with `il` the interline:
//! - a staff line is two rows thick; line `k` of a staff at `top` covers
//!   rows `top + k*il` and the row below;
//! - a head at pitch `p` is centered `p * il / 2` below the middle line;
//! - stems go up from the head center, on the right side of the head.

use crate::geometry::PixelPoint;
use crate::glyph::GlyphId;
use crate::image::BinaryImage;
use crate::pipeline::{SheetInput, VecGlyphSource};
use serde::{Deserialize, Serialize};

/// What a population was drawn as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Drawn {
    StaffLine,
    Barline,
    Stem,
    BlackHead,
    VoidHead,
    Ledger,
    Block,
}

/// Staff drawn by the builder.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawnStaff {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub lines: Vec<GlyphId>,
}

/// Note drawn by the builder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawnNote {
    pub head: GlyphId,
    pub stem: Option<GlyphId>,
    pub x: i32,
    pub pitch: i32,
}

#[derive(Clone, Debug)]
pub struct SheetBuilder {
    width: i32,
    height: i32,
    interline: i32,
    populations: Vec<Vec<PixelPoint>>,
    drawn: Vec<Drawn>,
}

impl SheetBuilder {
    pub fn new(width: i32, height: i32, interline: i32) -> Self {
        Self {
            width,
            height,
            interline,
            populations: Vec::new(),
            drawn: Vec::new(),
        }
    }

    pub fn interline(&self) -> i32 {
        self.interline
    }

    fn push(&mut self, kind: Drawn, pixels: Vec<PixelPoint>) -> GlyphId {
        let id = GlyphId(self.populations.len() as u32);
        self.populations.push(pixels);
        self.drawn.push(kind);
        id
    }

    fn rect(x: i32, y: i32, w: i32, h: i32) -> Vec<PixelPoint> {
        (y..y + h)
            .flat_map(|yy| (x..x + w).map(move |xx| PixelPoint::new(xx, yy)))
            .collect()
    }

    /// Filled rectangle of any kind.
    pub fn block(&mut self, x: i32, y: i32, w: i32, h: i32) -> GlyphId {
        self.push(Drawn::Block, Self::rect(x, y, w, h))
    }

    /// Five lines starting at row `top`.
    pub fn staff(&mut self, left: i32, top: i32, width: i32) -> DrawnStaff {
        let lines = (0..5)
            .map(|k| {
                let y = top + k * self.interline;
                self.push(Drawn::StaffLine, Self::rect(left, y, width, 2))
            })
            .collect();
        DrawnStaff {
            left,
            top,
            width,
            lines,
        }
    }

    /// Vertical bar from row `top` to row `bottom` (inclusive).
    pub fn barline(&mut self, x: i32, top: i32, bottom: i32, thickness: i32) -> GlyphId {
        self.push(Drawn::Barline, Self::rect(x, top, thickness, bottom - top + 1))
    }

    /// Two-pixel stem rising `length` rows above `(x, bottom)`.
    pub fn stem(&mut self, x: i32, bottom: i32, length: i32) -> GlyphId {
        self.push(Drawn::Stem, Self::rect(x, bottom - length, 2, length + 1))
    }

    /// Elliptic head, 25 x 19 pixels at interline 20; void heads are rings.
    pub fn head(&mut self, cx: i32, cy: i32, black: bool) -> GlyphId {
        let a = (self.interline * 3 / 5) as f64;
        let b = (self.interline * 9 / 20) as f64;
        let ring = (self.interline as f64 * 0.15).max(1.0);
        let mut pixels = Vec::new();
        for dy in -(b as i32)..=(b as i32) {
            for dx in -(a as i32)..=(a as i32) {
                let outer = (dx as f64 / a).powi(2) + (dy as f64 / b).powi(2);
                if outer > 1.0 {
                    continue;
                }
                let (ia, ib) = (a - ring, b - ring);
                let inner = (dx as f64 / ia).powi(2) + (dy as f64 / ib).powi(2);
                if black || inner > 1.0 {
                    pixels.push(PixelPoint::new(cx + dx, cy + dy));
                }
            }
        }
        let kind = if black { Drawn::BlackHead } else { Drawn::VoidHead };
        self.push(kind, pixels)
    }

    /// Horizontal ledger centered on `cx`, top row `y`.
    pub fn ledger(&mut self, cx: i32, y: i32) -> GlyphId {
        let half = self.interline * 4 / 5;
        self.push(Drawn::Ledger, Self::rect(cx - half, y, 2 * half, 2))
    }

    /// Ordinate of pitch position `pitch` on `staff`.
    pub fn pitch_y(&self, staff: &DrawnStaff, pitch: i32) -> i32 {
        staff.top + 1 + 2 * self.interline + pitch * self.interline / 2
    }

    /// Head at `pitch`, its ledgers, and an upward stem unless `stemless`.
    pub fn note(&mut self, staff: &DrawnStaff, x: i32, pitch: i32, black: bool, stemless: bool) -> DrawnNote {
        let il = self.interline;
        let cy = self.pitch_y(staff, pitch);
        for k in 1..=(pitch.abs() / 2 - 2).max(0) {
            let y = if pitch < 0 { staff.top - k * il } else { staff.top + (4 + k) * il };
            self.ledger(x, y);
        }
        let head = self.head(x, cy, black);
        let stem = (!stemless).then(|| self.stem(x + il / 2, cy, 3 * il));
        DrawnNote { head, stem, x, pitch }
    }

    pub fn drawn(&self) -> &[Drawn] {
        &self.drawn
    }

    pub fn raster(&self) -> BinaryImage {
        BinaryImage::from_points(
            self.width.max(0) as usize,
            self.height.max(0) as usize,
            self.populations.iter().flatten(),
        )
    }

    pub fn input(&self) -> SheetInput {
        SheetInput {
            raster: self.raster(),
            interline: self.interline as f64,
            skew: 0.0,
        }
    }

    pub fn source(&self) -> VecGlyphSource {
        VecGlyphSource::new(self.populations.clone())
    }

    pub fn build(self) -> (SheetInput, VecGlyphSource) {
        (self.input(), VecGlyphSource::new(self.populations))
    }
}

/// Shape of a generated standard sheet.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub width: i32,
    pub interline: i32,
    pub systems: usize,
    pub staves_per_system: usize,
    pub measures_per_system: usize,
    pub notes_per_measure: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            interline: 20,
            systems: 3,
            staves_per_system: 1,
            measures_per_system: 3,
            notes_per_measure: 3,
        }
    }
}

/// Pitches cycled through by the standard sheet, ledgers included.
const PITCHES: [i32; 8] = [-2, 0, 3, -6, 2, 6, -3, 1];

/// Everything drawn for one standard sheet.
#[derive(Clone, Debug)]
pub struct StandardSheet {
    pub builder: SheetBuilder,
    /// Staves per system, top to bottom.
    pub staves: Vec<Vec<DrawnStaff>>,
    /// Bar lines per system, left to right.
    pub bars: Vec<Vec<GlyphId>>,
    /// Notes per system, left to right then staff by staff.
    pub notes: Vec<Vec<DrawnNote>>,
}

impl StandardSheet {
    /// Rows separating the tops of two staves of one system.
    pub const STAFF_PITCH: i32 = 200;
    /// Extra rows between the last staff of a system and the next system.
    pub const SYSTEM_GAP: i32 = 100;
    pub const MARGIN: i32 = 100;

    pub fn system_pitch(config: &SyntheticConfig) -> i32 {
        config.staves_per_system.max(1) as i32 * Self::STAFF_PITCH + Self::SYSTEM_GAP
    }

    /// Sheet of `systems` systems, each with its staves joined by bar lines
    /// at every measure boundary and a thick final bar. Every staff is a
    /// part of its own.
    pub fn generate(config: &SyntheticConfig) -> Self {
        let il = config.interline;
        let pitch = Self::system_pitch(config);
        let height = 2 * Self::MARGIN + config.systems as i32 * pitch;
        let mut builder = SheetBuilder::new(config.width, height, il);
        let left = Self::MARGIN;
        let staff_width = config.width - 2 * Self::MARGIN;
        let measures = config.measures_per_system.max(1) as i32;
        let measure_width = staff_width / measures;

        let mut staves = Vec::with_capacity(config.systems);
        let mut bars = Vec::with_capacity(config.systems);
        let mut notes = Vec::with_capacity(config.systems);
        let mut note_index = 0usize;
        for s in 0..config.systems as i32 {
            let top = Self::MARGIN + s * pitch;
            let system: Vec<DrawnStaff> = (0..config.staves_per_system.max(1) as i32)
                .map(|k| builder.staff(left, top + k * Self::STAFF_PITCH, staff_width))
                .collect();
            let bottom = system.last().map_or(top, |st| st.top + 4 * il + 1);

            let mut system_bars = Vec::new();
            for m in 0..measures {
                system_bars.push(builder.barline(left + m * measure_width, top, bottom, 3));
            }
            system_bars.push(builder.barline(left + staff_width - 6, top, bottom, 6));

            let mut system_notes = Vec::new();
            for m in 0..measures {
                let x0 = left + m * measure_width;
                let step = measure_width / (config.notes_per_measure as i32 + 1);
                for n in 0..config.notes_per_measure as i32 {
                    let x = x0 + (n + 1) * step;
                    for staff in &system {
                        let p = PITCHES[note_index % PITCHES.len()];
                        let black = note_index % 4 != 3;
                        system_notes.push(builder.note(staff, x, p, black, false));
                        note_index += 1;
                    }
                }
            }
            staves.push(system);
            bars.push(system_bars);
            notes.push(system_notes);
        }
        Self {
            builder,
            staves,
            bars,
            notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populations_match_handles() {
        let mut b = SheetBuilder::new(400, 300, 20);
        let staff = b.staff(50, 100, 300);
        let note = b.note(&staff, 200, -6, true, false);
        assert_eq!(staff.lines, (0..5).map(GlyphId).collect::<Vec<_>>());
        // One ledger above the staff, then the head and the stem.
        assert_eq!(note.head, GlyphId(6));
        assert_eq!(note.stem, Some(GlyphId(7)));
        assert_eq!(b.drawn()[5], Drawn::Ledger);
        assert_eq!(b.pitch_y(&staff, 0), 141);
    }

    #[test]
    fn heads_are_sized_by_interline() {
        let mut b = SheetBuilder::new(100, 100, 20);
        b.head(50, 50, true);
        b.head(50, 50, false);
        let (_, source) = b.build();
        let black = &source.populations[0];
        let void = &source.populations[1];
        let xs = black.iter().map(|p| p.x);
        assert_eq!(xs.clone().max().unwrap() - xs.min().unwrap() + 1, 25);
        let ys = black.iter().map(|p| p.y);
        assert_eq!(ys.clone().max().unwrap() - ys.min().unwrap() + 1, 19);
        assert!(void.len() * 2 < black.len() + void.len());
    }
}
