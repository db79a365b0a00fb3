//! Seeded portal fixtures shared by the integration tests.
#![allow(dead_code)]

use portal_patterns::geom::TriangleQuery;
use portal_patterns::{LatLng, Point, Portal, PortalIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `n` portals scattered uniformly over a `span` × `span` degree box at `(lat, lng)`.
pub fn scattered(seed: u64, n: usize, lat: f64, lng: f64, span: f64) -> Vec<Portal> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let at = LatLng::new(lat + rng.gen_range(0.0..span), lng + rng.gen_range(0.0..span));
            Portal::new(format!("{seed:x}.{i:04}"), format!("Portal {i}"), at)
        })
        .collect()
}

/// About 25 portals in a park-sized area, like a typical input file.
pub fn park(seed: u64) -> Vec<Portal> {
    scattered(seed, 25, 51.5, -0.12, 0.01)
}

pub fn point(portals: &[Portal], i: PortalIndex) -> Point {
    portals[i.get()].lat_lng.to_point()
}

/// Whether `p` is strictly inside `t`; a corner never is.
pub fn inside(portals: &[Portal], t: [PortalIndex; 3], p: PortalIndex) -> bool {
    if t.contains(&p) {
        return false;
    }
    let [a, b, c] = t.map(|i| point(portals, i));
    TriangleQuery::new(&a, &b, &c).contains(&point(portals, p))
}

pub fn distinct(indices: &[PortalIndex]) -> bool {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len() == indices.len()
}
