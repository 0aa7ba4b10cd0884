//! Owned monochrome raster in row-major layout (stride == width).
//!
//! One byte per pixel, non-zero meaning foreground. Reads outside the image
//! are background, which keeps neighbourhood lookups at the border simple.
use crate::geometry::PixelPoint;

#[derive(Clone, Debug, Default)]
pub struct BinaryImage {
    /// Image width in pixels
    pub w: usize,
    /// Image height in pixels
    pub h: usize,
    /// Backing storage in row-major order
    data: Vec<u8>,
}

impl BinaryImage {
    /// Construct an all-background raster of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![0; w * h],
        }
    }

    /// Raster with every in-bounds point of `points` set to foreground.
    pub fn from_points<'a, I>(w: usize, h: usize, points: I) -> Self
    where
        I: IntoIterator<Item = &'a PixelPoint>,
    {
        let mut img = Self::new(w, h);
        for p in points {
            img.set(p.x, p.y, true);
        }
        img
    }

    #[inline]
    fn idx(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.w || y as usize >= self.h {
            None
        } else {
            Some(y as usize * self.w + x as usize)
        }
    }

    #[inline]
    pub fn is_foreground(&self, x: i32, y: i32) -> bool {
        self.idx(x, y).map(|i| self.data[i] != 0).unwrap_or(false)
    }

    /// Out-of-bounds writes are ignored.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, on: bool) {
        if let Some(i) = self.idx(x, y) {
            self.data[i] = on as u8;
        }
    }

    /// One row as a byte slice.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }

    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}
