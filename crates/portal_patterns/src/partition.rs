//! Partitioning of portal slices by triangle or wedge membership.
//!
//! Only set membership of the retained portals matters to callers; their order
//! is unspecified.

use crate::geom::{Region, TriangleQuery, WedgeQuery};
use crate::portal::{PortalData, PortalIndex};

/// Replace `out` with the portals of `candidates` strictly inside `region`.
///
/// The portals spanning the region are skipped by index: for them the strict
/// sign tests only see rounding noise.
#[inline]
fn partition_into(
    candidates: &[PortalData],
    region: &impl Region,
    corners: [PortalIndex; 3],
    out: &mut Vec<PortalData>,
) {
    out.clear();
    out.extend(
        candidates
            .iter()
            .filter(|p| !corners.contains(&p.index) && region.contains(&p.point)),
    );
}

/// Portals strictly inside the triangle `(a, b, c)`; corners are never included.
pub fn partition_portals_inside_triangle(
    candidates: &[PortalData],
    a: &PortalData,
    b: &PortalData,
    c: &PortalData,
    out: &mut Vec<PortalData>,
) {
    partition_into(
        candidates,
        &TriangleQuery::new(&a.point, &b.point, &c.point),
        [a.index, b.index, c.index],
        out,
    );
}

/// Portals strictly inside the wedge at `apex` between the rays towards `b` and `c`.
///
/// When `candidates` already lie inside a triangle having `bc` as a side and
/// containing `apex`, this is exactly the interior of `(apex, b, c)`. The apex
/// and both ray ends are never included.
pub fn partition_portals_inside_wedge(
    candidates: &[PortalData],
    apex: &PortalData,
    b: &PortalData,
    c: &PortalData,
    out: &mut Vec<PortalData>,
) {
    partition_into(
        candidates,
        &WedgeQuery::new(&apex.point, &b.point, &c.point),
        [apex.index, b.index, c.index],
        out,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::LatLng;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeSet;

    fn data(points: &[(f64, f64)]) -> Vec<PortalData> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(lat, lng))| PortalData {
                index: PortalIndex(i as u16),
                point: LatLng::new(lat, lng).to_point(),
            })
            .collect()
    }

    #[test]
    fn interior_portals_are_retained() {
        let portals = data(&[
            (0.0, 0.0),
            (0.0, 0.01),
            (0.01, 0.005),
            (0.003, 0.005),
            (0.002, 0.004),
            (0.02, 0.02),
            (-0.01, 0.0),
        ]);
        let (a, b, c) = (portals[0], portals[1], portals[2]);
        let mut out = Vec::new();
        partition_portals_inside_triangle(&portals, &a, &b, &c, &mut out);
        let inside: BTreeSet<u16> = out.iter().map(|p| p.index.0).collect();
        assert_eq!(inside, BTreeSet::from([3, 4]));
    }

    #[test]
    fn corners_are_never_inside() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..2000 {
            let pts: Vec<(f64, f64)> = (0..3)
                .map(|_| (rng.gen_range(0.0..0.01), rng.gen_range(0.0..0.01)))
                .collect();
            let portals = data(&pts);
            let (a, b, c) = (portals[0], portals[1], portals[2]);
            let mut out = Vec::new();
            for (x, y, z) in [(a, b, c), (b, c, a), (c, a, b), (a, c, b)] {
                partition_portals_inside_triangle(&portals, &x, &y, &z, &mut out);
                assert!(out.is_empty());
                partition_portals_inside_wedge(&portals, &x, &y, &z, &mut out);
                assert!(out.is_empty());
            }
        }
    }

    #[test]
    fn wedge_within_triangle_is_next_triangle() {
        let portals = data(&[
            (0.0, 0.0),
            (0.0, 0.01),
            (0.01, 0.005),
            (0.004, 0.005),
            (0.001, 0.006),
            (0.006, 0.004),
            (0.0015, 0.0015),
        ]);
        let (p0, p1, p2) = (portals[0], portals[1], portals[2]);
        let mut inside = Vec::new();
        partition_portals_inside_triangle(&portals, &p0, &p1, &p2, &mut inside);
        let x = portals[3];
        let mut wedge = Vec::new();
        partition_portals_inside_wedge(&inside, &x, &p1, &p2, &mut wedge);
        let mut tri = Vec::new();
        partition_portals_inside_triangle(&portals, &x, &p1, &p2, &mut tri);
        let a: BTreeSet<u16> = wedge.iter().map(|p| p.index.0).collect();
        let b: BTreeSet<u16> = tri.iter().map(|p| p.index.0).collect();
        assert_eq!(a, b);
    }
}
