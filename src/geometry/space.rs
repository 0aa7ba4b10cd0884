//! Coordinate frames.
//!
//! Three frames coexist across the pipeline:
//! - pixel space: image-absolute coordinates, the frame every box is stored in;
//! - system space: relative to the top-left corner of a system band;
//! - display space: systems laid out side by side, left to right.
//!
//! Pixel and system space differ by the per-system translation only (the sheet
//! is deskewed before recognition). Display space adds a per-system display
//! origin whose abscissa increases with system order.

use super::rect::{PixelPoint, PixelRect};
use serde::{Deserialize, Serialize};

/// Point relative to the top-left corner of its system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SystemPoint {
    pub x: i32,
    pub y: i32,
}

/// Point in the horizontal display layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayPoint {
    pub x: i32,
    pub y: i32,
}

impl SystemPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl DisplayPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Three-way position of a point against a one-dimensional extent.
///
/// In pixel space the extent is the vertical band of a system; in display
/// space it is the horizontal band, so `Above` reads "left of".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandPosition {
    Above,
    Within,
    Below,
}

impl BandPosition {
    /// Both bounds are inclusive.
    #[inline]
    pub fn of(value: i32, first: i32, last: i32) -> Self {
        if value < first {
            BandPosition::Above
        } else if value > last {
            BandPosition::Below
        } else {
            BandPosition::Within
        }
    }
}

/// Registered frame of a system: its pixel band and display origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemFrame {
    /// Top-left corner of the system band in pixel space.
    pub origin: PixelPoint,
    pub width: i32,
    pub height: i32,
    /// Top-left corner of the system in display space.
    pub display_origin: DisplayPoint,
}

impl SystemFrame {
    pub fn new(origin: PixelPoint, width: i32, height: i32) -> Self {
        Self {
            origin,
            width,
            height,
            display_origin: DisplayPoint::default(),
        }
    }

    pub fn band(&self) -> PixelRect {
        PixelRect::new(self.origin.x, self.origin.y, self.width, self.height)
    }

    #[inline]
    pub fn to_system(&self, p: PixelPoint) -> SystemPoint {
        SystemPoint::new(p.x - self.origin.x, p.y - self.origin.y)
    }

    #[inline]
    pub fn to_pixel(&self, p: SystemPoint) -> PixelPoint {
        PixelPoint::new(p.x + self.origin.x, p.y + self.origin.y)
    }

    #[inline]
    pub fn to_display(&self, p: SystemPoint) -> DisplayPoint {
        DisplayPoint::new(p.x + self.display_origin.x, p.y + self.display_origin.y)
    }

    #[inline]
    pub fn display_to_system(&self, p: DisplayPoint) -> SystemPoint {
        SystemPoint::new(p.x - self.display_origin.x, p.y - self.display_origin.y)
    }

    pub fn pixel_to_display(&self, p: PixelPoint) -> DisplayPoint {
        self.to_display(self.to_system(p))
    }

    pub fn display_to_pixel(&self, p: DisplayPoint) -> PixelPoint {
        self.to_pixel(self.display_to_system(p))
    }

    /// Vertical position of a pixel-space point against the system band.
    pub fn locate_pixel(&self, p: PixelPoint) -> BandPosition {
        BandPosition::of(p.y, self.origin.y, self.origin.y + self.height - 1)
    }

    /// Horizontal position of a display-space point against the display band.
    pub fn locate_display(&self, p: DisplayPoint) -> BandPosition {
        BandPosition::of(
            p.x,
            self.display_origin.x,
            self.display_origin.x + self.width - 1,
        )
    }
}
