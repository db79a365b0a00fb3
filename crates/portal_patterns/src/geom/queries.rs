//! Precomputed containment and distance queries.
//!
//! Each query caches the cross products of its defining points so that the
//! per-portal test is a handful of dot products.

use super::{sign, Point};

/// Region test used by the partitioning helpers.
pub trait Region {
    fn contains(&self, p: &Point) -> bool;
}

/// Strict interior of a spherical triangle.
#[derive(Clone, Copy, Debug)]
pub struct TriangleQuery {
    ab: Point,
    bc: Point,
    ca: Point,
}

impl TriangleQuery {
    /// Corners are canonicalised to CCW order, so any permutation gives the same region.
    pub fn new(a: &Point, b: &Point, c: &Point) -> Self {
        let (b, c) = if sign(a, b, c) { (b, c) } else { (c, b) };
        Self {
            ab: a.cross(b),
            bc: b.cross(c),
            ca: c.cross(a),
        }
    }

    #[inline]
    pub fn contains(&self, p: &Point) -> bool {
        self.ab.dot(p) > 0.0 && self.bc.dot(p) > 0.0 && self.ca.dot(p) > 0.0
    }
}

impl Region for TriangleQuery {
    #[inline]
    fn contains(&self, p: &Point) -> bool {
        TriangleQuery::contains(self, p)
    }
}

/// Wedge at apex `a` between the rays `ab` and `ac` (angle < π).
#[derive(Clone, Copy, Debug)]
pub struct WedgeQuery {
    ab: Point,
    ca: Point,
}

impl WedgeQuery {
    pub fn new(a: &Point, b: &Point, c: &Point) -> Self {
        let (b, c) = if sign(a, b, c) { (b, c) } else { (c, b) };
        Self {
            ab: a.cross(b),
            ca: c.cross(a),
        }
    }

    /// True iff the ray `ap` lies strictly between `ab` and `ac` in CCW order.
    #[inline]
    pub fn contains(&self, p: &Point) -> bool {
        self.ab.dot(p) > 0.0 && self.ca.dot(p) > 0.0
    }
}

impl Region for WedgeQuery {
    #[inline]
    fn contains(&self, p: &Point) -> bool {
        WedgeQuery::contains(self, p)
    }
}

/// Distance from a point to the great-circle segment `ab`.
#[derive(Clone, Copy, Debug)]
pub struct DistanceQuery {
    a: Point,
    b: Point,
    n: Point,
    n_norm_sq: f64,
    n_cross_a: Point,
    b_cross_n: Point,
}

impl DistanceQuery {
    pub fn new(a: &Point, b: &Point) -> Self {
        let n = a.cross(b);
        Self {
            a: *a,
            b: *b,
            n,
            n_norm_sq: n.norm_squared(),
            n_cross_a: n.cross(a),
            b_cross_n: b.cross(&n),
        }
    }

    /// Squared chord distance from `p` to the closest point of the segment.
    ///
    /// Monotone in arc distance, so it can be used directly as a sort key.
    pub fn chord_angle_sq(&self, p: &Point) -> f64 {
        if self.n_norm_sq > 0.0 && p.dot(&self.n_cross_a) > 0.0 && p.dot(&self.b_cross_n) > 0.0 {
            // Closest point lies strictly inside the arc: use the distance to the great circle.
            let pn = p.dot(&self.n);
            let sin_sq = (pn * pn / self.n_norm_sq).min(1.0);
            let cos = (1.0 - sin_sq).sqrt();
            return 2.0 * sin_sq / (1.0 + cos);
        }
        (p - self.a).norm_squared().min((p - self.b).norm_squared())
    }
}
