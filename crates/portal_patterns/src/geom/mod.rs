//! Spherical geometry on unit vectors.
//!
//! Purpose
//! - Express every predicate directly on unit-sphere points derived from
//!   latitude/longitude; no planar projection is used anywhere in the engines.
//! - Keep all containment tests strict: colinear or coincident points are never
//!   "inside", which fixes the tie-breaks of every engine built on top.
//!
//! Code cross-refs: `queries::{TriangleQuery, WedgeQuery, DistanceQuery}`.

mod queries;

pub use queries::{DistanceQuery, Region, TriangleQuery, WedgeQuery};

use nalgebra::Vector3;

/// Unit vector on the sphere.
pub type Point = Vector3<f64>;

/// Scale from unit-sphere radians to approximate metres (Earth circumference 4·10⁷ m).
pub const RADIANS_TO_METERS: f64 = 20_000_000.0 / std::f64::consts::PI;
/// Scale applied to unit-sphere areas before they are scored as `f32`.
pub const UNIT_AREA_TO_SQUARE_METERS: f64 = 5.1e14;

/// Geographic location in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[inline]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn to_point(self) -> Point {
        let lat = self.lat.to_radians();
        let lng = self.lng.to_radians();
        let cos_lat = lat.cos();
        Vector3::new(cos_lat * lng.cos(), cos_lat * lng.sin(), lat.sin())
    }

    pub fn from_point(p: &Point) -> Self {
        let lat = p.z.atan2((p.x * p.x + p.y * p.y).sqrt());
        let lng = p.y.atan2(p.x);
        Self {
            lat: lat.to_degrees(),
            lng: lng.to_degrees(),
        }
    }
}

/// True iff `a → b → c` turns strictly counter-clockwise, i.e. `(a × b) · c > 0`.
#[inline]
pub fn sign(a: &Point, b: &Point, c: &Point) -> bool {
    a.cross(b).dot(c) > 0.0
}

/// Great-circle angle between two unit vectors, in radians.
#[inline]
pub fn angle(a: &Point, b: &Point) -> f64 {
    a.cross(b).norm().atan2(a.dot(b))
}

/// Great-circle distance in (scaled) metres.
#[inline]
pub fn distance_meters(a: &Point, b: &Point) -> f64 {
    angle(a, b) * RADIANS_TO_METERS
}

/// Squared chord length corresponding to a great-circle distance in metres.
#[inline]
pub fn meters_to_chord_sq(meters: f64) -> f64 {
    let half = 0.5 * meters / RADIANS_TO_METERS;
    let s = half.sin();
    4.0 * s * s
}

/// Angle between two planes given by their (not necessarily unit) normals.
#[inline]
pub fn normal_angle(n1: &Point, n2: &Point) -> f64 {
    n1.cross(n2).norm().atan2(n1.dot(n2))
}

/// Interior angle at `v` of the spherical triangle `(v, x, y)`.
#[inline]
pub fn corner_angle(v: &Point, x: &Point, y: &Point) -> f64 {
    normal_angle(&v.cross(x), &v.cross(y))
}

/// Signed spherical excess of the triangle `(a, b, c)`; positive iff CCW.
pub fn triangle_area(a: &Point, b: &Point, c: &Point) -> f64 {
    let triple = a.dot(&b.cross(c));
    let denom = 1.0 + a.dot(b) + b.dot(c) + c.dot(a);
    2.0 * triple.atan2(denom)
}

/// Normalised centroid of `points` and the largest angle from it to any point.
///
/// Returns `None` for an empty input or a centroid that vanishes (antipodal spread).
pub fn enclosing_cap(points: impl IntoIterator<Item = Point> + Clone) -> Option<(Point, f64)> {
    let sum = points
        .clone()
        .into_iter()
        .fold(Vector3::zeros(), |acc: Point, p| acc + p);
    let norm = sum.norm();
    if !(norm.is_finite()) || norm <= 1e-12 {
        return None;
    }
    let center = sum / norm;
    let radius = points
        .into_iter()
        .map(|p| angle(&center, &p))
        .fold(0.0, f64::max);
    Some((center, radius))
}
