//! Least-squares line fitting.
//!
//! The fit is an orthogonal regression: the line passes through the centroid
//! of the population and follows the principal eigenvector of its 2x2
//! covariance. Unlike an ordinary `y = f(x)` regression it behaves the same
//! for horizontal and vertical populations, which matters because glyph
//! orientation is only known after the fit.

use nalgebra::{Matrix2, Point2, SymmetricEigen, Vector2, Vector3};
use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-9;

/// Infinite line `a·x + b·y + c = 0` with `a² + b² = 1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line {
    coeffs: Vector3<f64>,
    centroid: Point2<f64>,
    /// Unit direction, canonicalised to point right (or down when vertical).
    direction: Vector2<f64>,
}

impl Line {
    /// Fit a line to a point population.
    ///
    /// Returns `None` when the population holds fewer than two distinct points.
    pub fn fit<I>(points: I) -> Option<Line>
    where
        I: IntoIterator<Item = [f64; 2]>,
    {
        let mut n = 0usize;
        let mut sum = Vector2::zeros();
        let mut first: Option<[f64; 2]> = None;
        let mut distinct = false;
        let mut pts = Vec::new();
        for p in points {
            match first {
                None => first = Some(p),
                Some(f) => {
                    if (f[0] - p[0]).abs() > EPS || (f[1] - p[1]).abs() > EPS {
                        distinct = true;
                    }
                }
            }
            sum += Vector2::new(p[0], p[1]);
            n += 1;
            pts.push(p);
        }
        if n < 2 || !distinct {
            return None;
        }
        let mu = sum / n as f64;

        let mut cov = Matrix2::<f64>::zeros();
        for p in &pts {
            let d = Vector2::new(p[0] - mu.x, p[1] - mu.y);
            cov += d * d.transpose();
        }
        cov /= n as f64;

        let eigen = SymmetricEigen::new(cov);
        let major = if eigen.eigenvalues[0] >= eigen.eigenvalues[1] {
            0
        } else {
            1
        };
        let dir = eigen.eigenvectors.column(major).into_owned();
        Self::from_point_direction(Point2::new(mu.x, mu.y), dir)
    }

    /// Line through two points; `None` when they coincide.
    pub fn through(p: [f64; 2], q: [f64; 2]) -> Option<Line> {
        let dir = Vector2::new(q[0] - p[0], q[1] - p[1]);
        let mid = Point2::new((p[0] + q[0]) * 0.5, (p[1] + q[1]) * 0.5);
        Self::from_point_direction(mid, dir)
    }

    fn from_point_direction(centroid: Point2<f64>, dir: Vector2<f64>) -> Option<Line> {
        let norm = dir.norm();
        if norm <= EPS {
            return None;
        }
        let mut direction = dir / norm;
        if direction.x < -EPS || (direction.x.abs() <= EPS && direction.y < 0.0) {
            direction = -direction;
        }
        let a = -direction.y;
        let b = direction.x;
        let c = -(a * centroid.x + b * centroid.y);
        Some(Line {
            coeffs: Vector3::new(a, b, c),
            centroid,
            direction,
        })
    }

    /// Homogeneous coefficients `(a, b, c)`.
    pub fn coefficients(&self) -> Vector3<f64> {
        self.coeffs
    }

    pub fn direction(&self) -> Vector2<f64> {
        self.direction
    }

    pub fn centroid(&self) -> [f64; 2] {
        [self.centroid.x, self.centroid.y]
    }

    /// dy/dx, infinite for a vertical line.
    pub fn slope(&self) -> f64 {
        if self.direction.x.abs() <= EPS {
            f64::INFINITY
        } else {
            self.direction.y / self.direction.x
        }
    }

    /// dx/dy, infinite for a horizontal line.
    pub fn inverted_slope(&self) -> f64 {
        if self.direction.y.abs() <= EPS {
            f64::INFINITY
        } else {
            self.direction.x / self.direction.y
        }
    }

    /// Ordinate at abscissa `x`. A vertical line yields its centroid ordinate.
    pub fn y_at_x(&self, x: f64) -> f64 {
        let (a, b, c) = (self.coeffs.x, self.coeffs.y, self.coeffs.z);
        if b.abs() <= EPS {
            self.centroid.y
        } else {
            -(a * x + c) / b
        }
    }

    /// Abscissa at ordinate `y`. A horizontal line yields its centroid abscissa.
    pub fn x_at_y(&self, y: f64) -> f64 {
        let (a, b, c) = (self.coeffs.x, self.coeffs.y, self.coeffs.z);
        if a.abs() <= EPS {
            self.centroid.x
        } else {
            -(b * y + c) / a
        }
    }

    /// Unsigned perpendicular distance of a point to the line.
    #[inline]
    pub fn distance_to(&self, p: [f64; 2]) -> f64 {
        (self.coeffs.x * p[0] + self.coeffs.y * p[1] + self.coeffs.z).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn fits_a_sloped_population() {
        let pts: Vec<[f64; 2]> = (0..50).map(|i| [i as f64, 0.5 * i as f64 + 3.0]).collect();
        let line = Line::fit(pts.iter().copied()).expect("line");
        assert!(approx_eq(line.slope(), 0.5, 1e-9), "slope={}", line.slope());
        assert!(approx_eq(line.inverted_slope(), 2.0, 1e-9));
        assert!(approx_eq(line.y_at_x(10.0), 8.0, 1e-9));
        assert!(approx_eq(line.x_at_y(8.0), 10.0, 1e-9));
        for p in &pts {
            assert!(line.distance_to(*p) < 1e-9);
        }
    }

    #[test]
    fn vertical_population_has_infinite_slope() {
        let pts: Vec<[f64; 2]> = (0..20).map(|i| [7.0, i as f64]).collect();
        let line = Line::fit(pts).expect("line");
        assert!(line.slope().is_infinite());
        assert!(approx_eq(line.inverted_slope(), 0.0, 1e-12));
        assert!(approx_eq(line.x_at_y(100.0), 7.0, 1e-9));
        assert!(line.direction().y > 0.0);
    }

    #[test]
    fn degenerate_populations_fit_nothing() {
        assert!(Line::fit(Vec::<[f64; 2]>::new()).is_none());
        assert!(Line::fit(vec![[1.0, 1.0]]).is_none());
        assert!(Line::fit(vec![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]]).is_none());
        assert!(Line::through([2.0, 2.0], [2.0, 2.0]).is_none());
    }

    #[test]
    fn through_two_points_is_oriented_left_to_right() {
        let line = Line::through([10.0, 4.0], [0.0, 0.0]).unwrap();
        assert!(line.direction().x > 0.0);
        assert!(approx_eq(line.slope(), 0.4, 1e-12));
        assert!(approx_eq(line.distance_to([0.0, 1.0]), 1.0 / (1.0f64 + 0.16).sqrt(), 1e-9));
    }
}
