//! Alignment facet: the line fitted to a glyph and everything derived from it.
//!
//! The fit decides the dominant orientation (horizontal when
//! `|slope| < tan 45°`), which in turn decides what "start", "stop", "length"
//! and "thickness" mean for the glyph: start and stop are ordered along the
//! dominant axis, not along a fixed image axis.
//!
//! Descriptors are computed once and cached. Forcing the ending points (after
//! a merge, for instance) drops the cache so that every descriptor depending
//! on endpoint position is recomputed from the forced line.

use super::{DegenerateGlyph, Glyph, Orientation};
use crate::geometry::{is_horizontal_slope, Line, PixelRect, DEFAULT_MAX_HORIZONTAL_SLOPE};
use crate::image::BinaryImage;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Knobs for the localized glyph measurements.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentParams {
    /// Width (pixels along the dominant axis) of the window used by
    /// [`Glyph::thickness_at`].
    pub window_width: i32,
}

impl Default for AlignmentParams {
    fn default() -> Self {
        Self { window_width: 3 }
    }
}

/// Cached line-fit descriptors of a glyph.
#[derive(Clone, Debug, Serialize)]
pub struct Alignment {
    pub line: Line,
    pub orientation: Orientation,
    /// Absolute pixel coordinates of the first end along the dominant axis.
    pub start: [f64; 2],
    /// Absolute pixel coordinates of the last end along the dominant axis.
    pub stop: [f64; 2],
    /// RMS distance of the glyph pixels to the line.
    pub mean_distance: f64,
}

fn order_along(p: [f64; 2], q: [f64; 2], orientation: Orientation) -> ([f64; 2], [f64; 2]) {
    let axis = match orientation {
        Orientation::Horizontal => 0,
        Orientation::Vertical => 1,
    };
    if p[axis] <= q[axis] {
        (p, q)
    } else {
        (q, p)
    }
}

#[inline]
fn along(bounds: &PixelRect, orientation: Orientation) -> (i32, i32) {
    match orientation {
        Orientation::Horizontal => (bounds.x, bounds.last_x()),
        Orientation::Vertical => (bounds.y, bounds.last_y()),
    }
}

impl Glyph {
    fn compute_alignment(&self) -> Result<Alignment, DegenerateGlyph> {
        let degenerate = DegenerateGlyph {
            id: self.id,
            distinct_pixels: self.pixels.len(),
        };
        if self.pixels.len() < 2 {
            return Err(degenerate);
        }
        let line = match self.forced_ends {
            Some((p, q)) => Line::through(p, q),
            None => Line::fit(self.pixels.iter().map(|p| [p.x as f64, p.y as f64])),
        }
        .ok_or(degenerate)?;

        let orientation = if is_horizontal_slope(line.slope(), DEFAULT_MAX_HORIZONTAL_SLOPE) {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        };

        let (start, stop) = match self.forced_ends {
            Some((p, q)) => order_along(p, q, orientation),
            None => {
                let (first, last) = along(&self.bounds, orientation);
                let (first, last) = (first as f64, last as f64);
                match orientation {
                    Orientation::Horizontal => {
                        ([first, line.y_at_x(first)], [last, line.y_at_x(last)])
                    }
                    Orientation::Vertical => {
                        ([line.x_at_y(first), first], [line.x_at_y(last), last])
                    }
                }
            }
        };

        let sum_sq: f64 = self
            .pixels
            .iter()
            .map(|p| {
                let d = line.distance_to([p.x as f64, p.y as f64]);
                d * d
            })
            .sum();
        let mean_distance = (sum_sq / self.pixels.len() as f64).sqrt();

        Ok(Alignment {
            line,
            orientation,
            start,
            stop,
            mean_distance,
        })
    }

    /// Line-fit descriptors, computed on first access.
    pub fn alignment(&self) -> Result<&Alignment, DegenerateGlyph> {
        self.alignment
            .get_or_init(|| self.compute_alignment())
            .as_ref()
            .map_err(|e| *e)
    }

    pub fn orientation(&self) -> Result<Orientation, DegenerateGlyph> {
        self.alignment().map(|a| a.orientation)
    }

    pub fn line(&self) -> Result<Line, DegenerateGlyph> {
        self.alignment().map(|a| a.line)
    }

    /// dy/dx of the fitted line.
    pub fn slope(&self) -> Result<f64, DegenerateGlyph> {
        self.alignment().map(|a| a.line.slope())
    }

    /// dx/dy of the fitted line.
    pub fn inverted_slope(&self) -> Result<f64, DegenerateGlyph> {
        self.alignment().map(|a| a.line.inverted_slope())
    }

    pub fn start_point(&self) -> Result<[f64; 2], DegenerateGlyph> {
        self.alignment().map(|a| a.start)
    }

    pub fn stop_point(&self) -> Result<[f64; 2], DegenerateGlyph> {
        self.alignment().map(|a| a.stop)
    }

    pub fn mean_distance(&self) -> Result<f64, DegenerateGlyph> {
        self.alignment().map(|a| a.mean_distance)
    }

    /// Force the ending points, typically after merging glyphs.
    ///
    /// Every cached descriptor is dropped; the line now runs through the
    /// forced points.
    pub fn set_ending_points(&mut self, start: [f64; 2], stop: [f64; 2]) {
        self.forced_ends = Some((start, stop));
        self.alignment = OnceLock::new();
    }

    pub fn forced_ending_points(&self) -> Option<([f64; 2], [f64; 2])> {
        self.forced_ends
    }

    /// Extent along `orientation`, in pixels.
    pub fn length(&self, orientation: Orientation) -> i32 {
        match orientation {
            Orientation::Horizontal => self.bounds.width,
            Orientation::Vertical => self.bounds.height,
        }
    }

    /// Extent along the dominant orientation.
    pub fn dominant_length(&self) -> Result<i32, DegenerateGlyph> {
        self.orientation().map(|o| self.length(o))
    }

    /// Extent across `orientation`, in pixels.
    pub fn thickness(&self, orientation: Orientation) -> i32 {
        self.length(orientation.opposite())
    }

    /// Weight spread over the length: mean extent across `orientation`.
    pub fn mean_thickness(&self, orientation: Orientation) -> f64 {
        let length = self.length(orientation).max(1);
        self.weight() as f64 / length as f64
    }

    /// Slimness `length / mean thickness`.
    pub fn aspect(&self, orientation: Orientation) -> f64 {
        let thickness = self.mean_thickness(orientation);
        if thickness <= 0.0 {
            0.0
        } else {
            self.length(orientation) as f64 / thickness
        }
    }

    /// Position of the line across `orientation`, at the middle of the glyph.
    pub fn mid_pos(&self, orientation: Orientation) -> Result<i32, DegenerateGlyph> {
        let (first, last) = along(&self.bounds, orientation);
        let mid = (first + last) as f64 * 0.5;
        self.position_at(mid, orientation).map(|v| v.round() as i32)
    }

    /// Position of the line across `orientation` at coordinate `coord`
    /// along it.
    pub fn position_at(&self, coord: f64, orientation: Orientation) -> Result<f64, DegenerateGlyph> {
        let line = self.line()?;
        Ok(match orientation {
            Orientation::Horizontal => line.y_at_x(coord),
            Orientation::Vertical => line.x_at_y(coord),
        })
    }

    /// Mean thickness measured in a `window_width` window centered on `coord`.
    ///
    /// Only the part of the window that overlaps the glyph extent counts; a
    /// window entirely outside yields 0.
    pub fn thickness_at(&self, coord: f64, orientation: Orientation, window_width: i32) -> f64 {
        let window = window_width.max(1);
        let lo = (coord - window as f64 / 2.0).round() as i32;
        let hi = lo + window - 1;
        let (first, last) = along(&self.bounds, orientation);
        let lo = lo.max(first);
        let hi = hi.min(last);
        if lo > hi {
            return 0.0;
        }
        let count = self
            .pixels
            .iter()
            .filter(|p| {
                let c = match orientation {
                    Orientation::Horizontal => p.x,
                    Orientation::Vertical => p.y,
                };
                c >= lo && c <= hi
            })
            .count();
        count as f64 / (hi - lo + 1) as f64
    }

    /// Centroid of the glyph pixels lying inside `roi`.
    pub fn rectangle_centroid(&self, roi: &PixelRect) -> Option<[f64; 2]> {
        let mut n = 0usize;
        let mut sx = 0f64;
        let mut sy = 0f64;
        for p in self.pixels.iter().filter(|p| roi.contains(**p)) {
            n += 1;
            sx += p.x as f64;
            sy += p.y as f64;
        }
        (n > 0).then(|| [sx / n as f64, sy / n as f64])
    }

    /// Extremity pixels fused with foreground just beyond each end.
    ///
    /// Returns `(first, last)` counts along the dominant axis: an extremity
    /// pixel is stuck when its outward neighbour is foreground in `raster`.
    pub fn stuck_counts(&self, raster: &BinaryImage) -> Result<(usize, usize), DegenerateGlyph> {
        let orientation = self.orientation()?;
        let (first, last) = along(&self.bounds, orientation);
        let mut first_stuck = 0;
        let mut last_stuck = 0;
        for p in &self.pixels {
            let (c, step) = match orientation {
                Orientation::Horizontal => (p.x, (1, 0)),
                Orientation::Vertical => (p.y, (0, 1)),
            };
            if c == first && raster.is_foreground(p.x - step.0, p.y - step.1) {
                first_stuck += 1;
            }
            if c == last && raster.is_foreground(p.x + step.0, p.y + step.1) {
                last_stuck += 1;
            }
        }
        Ok((first_stuck, last_stuck))
    }
}
