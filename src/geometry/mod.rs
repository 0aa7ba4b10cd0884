//! Geometry kernel: rectangles, coordinate frames and line fitting.
//!
//! Everything here is free of score or glyph knowledge. Boxes are integer
//! pixel rectangles, unions are linear in the number of inputs, and centers
//! round toward the top-left corner so repeated calls agree exactly.

pub mod line;
pub mod rect;
pub mod space;

pub use line::Line;
pub use rect::{nearest_by_ordinate, union_all, union_center, GeometryError, PixelPoint, PixelRect};
pub use space::{BandPosition, DisplayPoint, SystemFrame, SystemPoint};

/// Slope limit separating horizontal from vertical populations (tan 45°).
pub const DEFAULT_MAX_HORIZONTAL_SLOPE: f64 = 1.0;

/// A slope strictly below the limit in magnitude is horizontal-dominant.
#[inline]
pub fn is_horizontal_slope(slope: f64, max_slope: f64) -> bool {
    slope.abs() < max_slope
}
