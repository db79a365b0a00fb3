use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::geom::{corner_angle, triangle_area, LatLng, Point, TriangleQuery};
use crate::progress::no_progress;

fn portals_at(points: &[Point]) -> Vec<Portal> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| Portal::new(format!("g{i}"), format!("p{i}"), LatLng::from_point(p)))
        .collect()
}

fn push_centroids(a: Point, b: Point, c: Point, depth: u16, out: &mut Vec<Point>) {
    if depth <= 1 {
        return;
    }
    // Depth-dependent weights keep midpoints of nested levels off shared great circles.
    let w = 1.0 + 0.13 * f64::from(depth);
    let m = (a + b * w + c * w * w).normalize();
    out.push(m);
    push_centroids(m, b, c, depth - 1, out);
    push_centroids(a, m, c, depth - 1, out);
    push_centroids(a, b, m, depth - 1, out);
}

/// A pure field of `depth` built from weighted centroids of a small triangle.
fn nested(depth: u16) -> Vec<Point> {
    let corners = [
        LatLng::new(0.0, 0.0).to_point(),
        LatLng::new(0.0, 0.03).to_point(),
        LatLng::new(0.025, 0.012).to_point(),
    ];
    let mut points = corners.to_vec();
    push_centroids(corners[0], corners[1], corners[2], depth, &mut points);
    points
}

/// Walk the preorder encoding and check every midpoint splits its triangle.
fn assert_field(portals: &[Portal], field: &HomogeneousField) {
    assert_eq!(field.portals.len(), field_portal_count(field.depth));
    let pt = |i: PortalIndex| portals[i.get()].lat_lng.to_point();
    let mut rest = field.portals[3..].iter().copied();
    fn walk(
        pt: &dyn Fn(PortalIndex) -> Point,
        rest: &mut dyn Iterator<Item = PortalIndex>,
        t: [PortalIndex; 3],
        depth: u16,
    ) {
        if depth <= 1 {
            return;
        }
        let m = rest.next().unwrap();
        let q = TriangleQuery::new(&pt(t[0]), &pt(t[1]), &pt(t[2]));
        assert!(q.contains(&pt(m)), "{m:?} not inside {t:?}");
        walk(pt, rest, [m, t[1], t[2]], depth - 1);
        walk(pt, rest, [t[0], m, t[2]], depth - 1);
        walk(pt, rest, [t[0], t[1], m], depth - 1);
    }
    let root = [field.portals[0], field.portals[1], field.portals[2]];
    walk(&pt, &mut rest, root, field.depth);
    let mut seen = field.portals.clone();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), field.portals.len());
}

fn cfg(mode: HomogeneousMode, max_depth: u16) -> HomogeneousCfg {
    HomogeneousCfg {
        max_depth,
        mode,
        num_workers: 2,
        ..HomogeneousCfg::default()
    }
}

#[test]
fn interior_counts() {
    assert_eq!(pure::pure_interior_count(1), 0);
    assert_eq!(pure::pure_interior_count(2), 1);
    assert_eq!(pure::pure_interior_count(3), 4);
    assert_eq!(pure::pure_interior_count(4), 13);
    assert_eq!(field_portal_count(6), 124);
}

#[test]
fn nested_field_is_found_in_every_mode() {
    let ps = portals_at(&nested(3));
    for mode in [HomogeneousMode::Deepest, HomogeneousMode::Pretty, HomogeneousMode::Pure] {
        let field = deepest_homogeneous(&ps, &cfg(mode, 6), &mut no_progress).unwrap();
        assert_eq!(field.depth, 3, "{mode:?}");
        assert_field(&ps, &field);
    }
}

#[test]
fn pure_field_uses_every_portal() {
    let ps = portals_at(&nested(4));
    let field = deepest_homogeneous(&ps, &cfg(HomogeneousMode::Pure, 6), &mut no_progress).unwrap();
    assert_eq!(field.depth, 4);
    assert_eq!(field.portals.len(), ps.len());
    assert_field(&ps, &field);
}

#[test]
fn pure_extension_goes_past_bootstrap_depth() {
    let ps = portals_at(&nested(5));
    let field = deepest_homogeneous(&ps, &cfg(HomogeneousMode::Pure, 6), &mut no_progress).unwrap();
    assert_eq!(field.depth, 5);
    assert_field(&ps, &field);
}

#[test]
fn depth_is_capped() {
    let ps = portals_at(&nested(4));
    let field = deepest_homogeneous(&ps, &cfg(HomogeneousMode::Deepest, 2), &mut no_progress).unwrap();
    assert_eq!(field.depth, 2);
    assert_eq!(field.portals.len(), 4);
    assert_field(&ps, &field);
}

#[test]
fn extra_portal_breaks_purity_of_the_root() {
    let mut points = nested(3);
    let (a, b, c) = (points[0], points[1], points[2]);
    // Slightly off the first midpoint, inside the root triangle.
    points.push((a + b + c * 1.1).normalize());
    let ps = portals_at(&points);
    let general = deepest_homogeneous(&ps, &cfg(HomogeneousMode::Deepest, 6), &mut no_progress).unwrap();
    let pure = deepest_homogeneous(&ps, &cfg(HomogeneousMode::Pure, 6), &mut no_progress).unwrap();
    assert_eq!(general.depth, 3);
    assert!(pure.depth <= general.depth);
    assert_field(&ps, &pure);
    let mut root = pure.portals[..3].to_vec();
    root.sort_unstable();
    assert!(pure.depth < 3 || root != [PortalIndex(0), PortalIndex(1), PortalIndex(2)]);
}

#[test]
fn fixed_corners_restrict_the_root() {
    let ps = portals_at(&nested(3));
    let mut c = cfg(HomogeneousMode::Deepest, 6);
    c.fixed_corners = vec![PortalIndex(1)];
    let field = deepest_homogeneous(&ps, &c, &mut no_progress).unwrap();
    assert_eq!(field.depth, 3);
    assert!(field.portals[..3].contains(&PortalIndex(1)));

    // The first midpoint cannot be a corner of a depth-3 field.
    c.fixed_corners = vec![PortalIndex(3)];
    for mode in [HomogeneousMode::Deepest, HomogeneousMode::Pure] {
        c.mode = mode;
        let field = deepest_homogeneous(&ps, &c, &mut no_progress).unwrap();
        assert!(field.depth < 3, "{mode:?}");
        assert!(field.portals[..3].contains(&PortalIndex(3)));
        assert_field(&ps, &field);
    }
}

#[test]
fn pure_search_agrees_across_worker_counts() {
    let ps = portals_at(&nested(4));
    let mut c = cfg(HomogeneousMode::Pure, 6);
    c.num_workers = 1;
    let one = deepest_homogeneous(&ps, &c, &mut no_progress).unwrap();
    c.num_workers = 4;
    let many = deepest_homogeneous(&ps, &c, &mut no_progress).unwrap();
    assert_eq!(one, many);
}

#[test]
fn invalid_depth_is_rejected() {
    let ps = portals_at(&nested(2));
    let r = deepest_homogeneous(&ps, &cfg(HomogeneousMode::Deepest, 0), &mut no_progress);
    assert!(matches!(r, Err(PatternError::InvalidOption(_))));
    let r = deepest_homogeneous(&ps, &cfg(HomogeneousMode::Deepest, MAX_DEPTH + 1), &mut no_progress);
    assert!(matches!(r, Err(PatternError::InvalidOption(_))));
}

#[test]
fn progress_reaches_total() {
    let ps = portals_at(&nested(3));
    let mut last = (0, 1);
    let mut record = |done: u32, total: u32| last = (done, total);
    deepest_homogeneous(&ps, &cfg(HomogeneousMode::Deepest, 6), &mut record).unwrap();
    assert_eq!(last.0, last.1);
    assert_eq!(last.1, 35);
}

#[test]
fn random_triangles_are_depth_one() {
    let mut rng = StdRng::seed_from_u64(6);
    for _ in 0..60 {
        let ps: Vec<Portal> = (0..3)
            .map(|i| {
                let at = LatLng::new(rng.gen_range(0.0..0.01), rng.gen_range(0.0..0.01));
                Portal::new(format!("g{i}"), "", at)
            })
            .collect();
        for mode in [HomogeneousMode::Deepest, HomogeneousMode::Pretty, HomogeneousMode::Pure] {
            let field = deepest_homogeneous(&ps, &cfg(mode, 6), &mut no_progress).unwrap();
            assert_eq!(field.depth, 1, "{mode:?}");
            assert_eq!(field.portals.len(), 3);
        }
    }
}

/// Convex pentagon: every root triangle is empty, so only the scorer decides.
fn pentagon() -> Vec<Portal> {
    [0.0, 1.1, 2.0, 3.5, 5.0]
        .iter()
        .enumerate()
        .map(|(i, &t): (usize, &f64)| {
            Portal::new(format!("g{i}"), "", LatLng::new(0.01 * t.sin(), 0.015 * t.cos()))
        })
        .collect()
}

fn root_of(ps: &[Portal], scorer: TriangleScorer, mode: HomogeneousMode) -> [Point; 3] {
    let mut c = cfg(mode, 6);
    c.scorer = scorer;
    let field = deepest_homogeneous(ps, &c, &mut no_progress).unwrap();
    assert_eq!(field.depth, 1);
    [0, 1, 2].map(|k| ps[field.portals[k].get()].lat_lng.to_point())
}

fn all_roots(ps: &[Portal]) -> Vec<[Point; 3]> {
    let pts: Vec<Point> = ps.iter().map(|p| p.lat_lng.to_point()).collect();
    let mut roots = Vec::new();
    for i in 0..pts.len() {
        for j in (i + 1)..pts.len() {
            for k in (j + 1)..pts.len() {
                roots.push([pts[i], pts[j], pts[k]]);
            }
        }
    }
    roots
}

fn area(t: &[Point; 3]) -> f64 {
    triangle_area(&t[0], &t[1], &t[2]).abs()
}

fn smallest_angle(t: &[Point; 3]) -> f64 {
    corner_angle(&t[0], &t[1], &t[2])
        .min(corner_angle(&t[1], &t[2], &t[0]))
        .min(corner_angle(&t[2], &t[0], &t[1]))
}

#[test]
fn scorer_picks_among_equal_depth_roots() {
    let ps = pentagon();
    let roots = all_roots(&ps);
    let max_area = roots.iter().map(area).fold(0.0, f64::max);
    let min_area = roots.iter().map(area).fold(f64::INFINITY, f64::min);
    let max_angle = roots.iter().map(smallest_angle).fold(0.0, f64::max);
    for mode in [HomogeneousMode::Deepest, HomogeneousMode::Pure] {
        let largest = root_of(&ps, TriangleScorer::LargestArea, mode);
        let smallest = root_of(&ps, TriangleScorer::SmallestArea, mode);
        assert!(area(&largest) >= max_area * (1.0 - 1e-5), "{mode:?}");
        assert!(area(&smallest) <= min_area * (1.0 + 1e-5), "{mode:?}");
        let fat = root_of(&ps, TriangleScorer::MostEquilateral, mode);
        assert!(smallest_angle(&fat) >= max_angle - 1e-5, "{mode:?}");
    }
}

#[test]
fn random_scorer_is_seeded() {
    let ps = pentagon();
    let pick = |seed| root_of(&ps, TriangleScorer::Random { seed }, HomogeneousMode::Deepest);
    assert_eq!(pick(1), pick(1));
    let areas: Vec<f64> = (1..9).map(|seed| area(&pick(seed))).collect();
    assert!(areas.iter().any(|&a| a != areas[0]));
}

fn small_points() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((0.0..0.02f64, 0.0..0.02f64), 3..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn pure_is_never_deeper_than_general(points in small_points()) {
        let ps: Vec<Portal> = points
            .iter()
            .enumerate()
            .map(|(i, &(lat, lng))| Portal::new(format!("g{i}"), "", LatLng::new(lat, lng)))
            .collect();
        let general = deepest_homogeneous(&ps, &cfg(HomogeneousMode::Deepest, 4), &mut no_progress).unwrap();
        let pure = deepest_homogeneous(&ps, &cfg(HomogeneousMode::Pure, 4), &mut no_progress).unwrap();
        prop_assert!(pure.depth <= general.depth);
        assert_field(&ps, &general);
        assert_field(&ps, &pure);
    }
}
