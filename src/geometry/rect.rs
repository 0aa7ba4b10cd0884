use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Absolute point in image pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in pixel space.
///
/// `(x, y)` is the top-left pixel; the rectangle covers `width` columns and
/// `height` rows, so the last covered pixel is `(x + width - 1, y + height - 1)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Malformed geometric input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("invalid geometry: empty rectangle set")]
    EmptySet,
    #[error("invalid geometry: zero-area rectangle {0:?}")]
    ZeroArea(PixelRect),
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle covering both corner pixels (inclusive).
    pub fn from_corners(a: PixelPoint, b: PixelPoint) -> Self {
        let x0 = a.x.min(b.x);
        let y0 = a.y.min(b.y);
        let x1 = a.x.max(b.x);
        let y1 = a.y.max(b.y);
        Self::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1)
    }

    /// Bounding rectangle of a point population. Empty input is rejected.
    pub fn bounding<'a, I>(points: I) -> Result<Self, GeometryError>
    where
        I: IntoIterator<Item = &'a PixelPoint>,
    {
        let mut iter = points.into_iter();
        let first = iter.next().ok_or(GeometryError::EmptySet)?;
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
        for p in iter {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Ok(Self::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1))
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.width <= 0 || self.height <= 0 {
            Err(GeometryError::ZeroArea(*self))
        } else {
            Ok(())
        }
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    #[inline]
    pub fn last_x(&self) -> i32 {
        self.right() - 1
    }

    #[inline]
    pub fn last_y(&self) -> i32 {
        self.bottom() - 1
    }

    #[inline]
    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Center with integer truncation toward the top-left corner.
    #[inline]
    pub fn center(&self) -> PixelPoint {
        PixelPoint::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn contains(&self, p: PixelPoint) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Union of two well-formed rectangles.
    pub fn union(&self, other: &PixelRect) -> PixelRect {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        PixelRect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Rows between `y` and the rectangle, 0 when `y` falls inside it.
    pub fn vertical_distance(&self, y: i32) -> i32 {
        if y < self.y {
            self.y - y
        } else if y > self.last_y() {
            y - self.last_y()
        } else {
            0
        }
    }

    /// Rectangle grown by `dx` on the left and right and `dy` on top and bottom.
    pub fn inflate(&self, dx: i32, dy: i32) -> PixelRect {
        PixelRect::new(
            self.x - dx,
            self.y - dy,
            self.width + 2 * dx,
            self.height + 2 * dy,
        )
    }
}

/// Union of a rectangle set in O(n).
///
/// Every rectangle is validated; the first malformed one aborts the union.
pub fn union_all<'a, I>(rects: I) -> Result<PixelRect, GeometryError>
where
    I: IntoIterator<Item = &'a PixelRect>,
{
    let mut acc: Option<PixelRect> = None;
    for r in rects {
        r.validate()?;
        acc = Some(match acc {
            Some(a) => a.union(r),
            None => *r,
        });
    }
    acc.ok_or(GeometryError::EmptySet)
}

/// Center of the union of a rectangle set.
pub fn union_center<'a, I>(rects: I) -> Result<PixelPoint, GeometryError>
where
    I: IntoIterator<Item = &'a PixelRect>,
{
    union_all(rects).map(|r| r.center())
}

/// Index of the rectangle vertically closest to `y`; the first one on ties.
pub fn nearest_by_ordinate<'a, I>(rects: I, y: i32) -> Option<usize>
where
    I: IntoIterator<Item = &'a PixelRect>,
{
    rects
        .into_iter()
        .enumerate()
        .min_by_key(|(_, r)| r.vertical_distance(y))
        .map(|(i, _)| i)
}
