//! Geometry kernel: vector algebra, point/segment distances, and axis-aligned
//! bounding boxes.
//!
//! All coordinates are metric `f64`. Segment distances use the standard
//! closest-points-between-segments algorithm with a fixed degeneracy
//! threshold ([`EPSILON`]); bounding boxes support an *empty* state that acts
//! as the identity for accumulation.

use core::ops::{Add, Mul, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Degeneracy threshold for segment-distance computations.
///
/// Direction vectors with squared length below this value are treated as
/// points, and interpolation parameters with magnitude below it snap to zero
/// to avoid cancellation noise.
pub const EPSILON: f64 = 1e-6;

/// A 3D point (or displacement vector). Immutable value type.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    /// Origin.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Dot product.
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product.
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Euclidean length.
    #[must_use]
    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self - other).norm()
    }
}

impl Add for Point {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// An axis-aligned bounding box with six scalar bounds.
///
/// A box may be *empty* (lower bound above upper bound on every axis), which
/// serves as the identity for [`Aabb::expand`]. Centre and circle radius are
/// defined only for non-empty boxes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    min: Point,
    max: Point,
}

impl Aabb {
    /// The empty box: expanding it by a point yields the point's tight box.
    pub const EMPTY: Self = Self {
        min: Point::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
        max: Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
    };

    /// The tight box containing both points.
    #[must_use]
    pub fn hull(a: Point, b: Point) -> Self {
        let mut aabb = Self::EMPTY;
        aabb.expand(a);
        aabb.expand(b);
        aabb
    }

    /// Grows the box to contain `point`.
    pub fn expand(&mut self, point: Point) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// Returns the box with all six bounds pushed outward by `margin`.
    #[must_use]
    pub fn widened(&self, margin: f64) -> Self {
        let m = Point::new(margin, margin, margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Lower corner.
    #[must_use]
    pub fn min(&self) -> Point {
        self.min
    }

    /// Upper corner.
    #[must_use]
    pub fn max(&self) -> Point {
        self.max
    }

    /// Geometric centre.
    ///
    /// # Panics
    ///
    /// Panics if the box is empty; an empty box has no centre.
    #[must_use]
    pub fn centre(&self) -> Point {
        assert!(!self.is_empty(), "centre of an empty box is undefined");
        (self.min + self.max) * 0.5
    }

    /// Half the length of the 3D diagonal: the radius of the smallest sphere
    /// centred at [`Aabb::centre`] that contains the whole box.
    ///
    /// # Panics
    ///
    /// Panics if the box is empty.
    #[must_use]
    pub fn circle_radius(&self) -> f64 {
        assert!(
            !self.is_empty(),
            "circle radius of an empty box is undefined"
        );
        (self.max - self.min).norm() * 0.5
    }

    /// True when the boxes share no point. Empty boxes are disjoint from
    /// everything, including themselves.
    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return true;
        }
        self.min.x > other.max.x
            || self.max.x < other.min.x
            || self.min.y > other.max.y
            || self.max.y < other.min.y
            || self.min.z > other.max.z
            || self.max.z < other.min.z
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

fn clamp01(t: f64) -> f64 {
    t.clamp(0.0, 1.0)
}

/// Snaps sub-threshold parameter magnitudes to exactly zero.
fn snap(t: f64) -> f64 {
    if t.abs() < EPSILON {
        0.0
    } else {
        t
    }
}

/// Minimum distance between the finite segments `[p1, q1]` and `[p2, q2]`.
///
/// Computes the quadratic-form coefficients of the two direction vectors and
/// their offset, derives candidate interpolation parameters and clamps each
/// into `[0, 1]` using the companion parameter's boundary condition. Segments
/// whose direction vectors are degenerate or near-parallel (denominator below
/// [`EPSILON`]) force the first parameter to zero.
#[must_use]
pub fn segment_segment_distance(p1: Point, q1: Point, p2: Point, q2: Point) -> f64 {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);

    let (s, t) = if a <= EPSILON && e <= EPSILON {
        // Both segments degenerate to points.
        (0.0, 0.0)
    } else if a <= EPSILON {
        (0.0, clamp01(f / e))
    } else {
        let c = d1.dot(r);
        if e <= EPSILON {
            (clamp01(-c / a), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            // Near-parallel: any s gives the same separation, pick s = 0.
            let mut s = if denom > EPSILON {
                clamp01((b * f - c * e) / denom)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = clamp01(-c / a);
            } else if t > 1.0 {
                t = 1.0;
                s = clamp01((b - c) / a);
            }
            (s, t)
        }
    };

    let closest1 = p1 + d1 * snap(s);
    let closest2 = p2 + d2 * snap(t);
    closest1.distance(closest2)
}

/// Minimum distance between the point `p` and the finite segment `[a, b]`:
/// the specialization of [`segment_segment_distance`] with a degenerate
/// first segment.
#[must_use]
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let d = b - a;
    let e = d.dot(d);
    if e <= EPSILON {
        return p.distance(a);
    }
    let t = snap(clamp01((p - a).dot(d) / e));
    p.distance(a + d * t)
}
