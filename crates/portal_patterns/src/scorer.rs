//! Top-level triangle scorers.
//!
//! When several root triangles reach the same depth, the scorer decides which
//! one is reported. Higher scores win; the first root seen wins exact ties.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geom::{corner_angle, triangle_area, Point, UNIT_AREA_TO_SQUARE_METERS};

/// Closed family of root-triangle preferences.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TriangleScorer {
    /// Keep the first triangle found.
    #[default]
    Arbitrary,
    LargestArea,
    SmallestArea,
    /// Maximise the smallest corner angle.
    MostEquilateral,
    /// Prefer subdivisions whose midpoints sit far from their parent's sides.
    /// Scored by the homogeneous engine itself, see `homogeneous::pretty`.
    SpreadAround,
    Random {
        seed: u64,
    },
}

impl TriangleScorer {
    pub(crate) fn start(self) -> ActiveScorer {
        let rng = match self {
            TriangleScorer::Random { seed } => Some(StdRng::seed_from_u64(seed)),
            _ => None,
        };
        ActiveScorer { kind: self, rng }
    }
}

/// Scorer instance carrying the RNG of the `Random` variant.
pub(crate) struct ActiveScorer {
    kind: TriangleScorer,
    rng: Option<StdRng>,
}

impl ActiveScorer {
    /// Score of the root triangle `(a, b, c)`; higher is better.
    pub(crate) fn score(&mut self, a: &Point, b: &Point, c: &Point) -> f32 {
        match self.kind {
            TriangleScorer::Arbitrary | TriangleScorer::SpreadAround => 0.0,
            TriangleScorer::LargestArea => area_m2(a, b, c),
            TriangleScorer::SmallestArea => -area_m2(a, b, c),
            TriangleScorer::MostEquilateral => corner_angle(a, b, c)
                .min(corner_angle(b, c, a))
                .min(corner_angle(c, a, b)) as f32,
            TriangleScorer::Random { .. } => self.rng.as_mut().map_or(0.0, |rng| rng.gen::<f32>()),
        }
    }
}

#[inline]
fn area_m2(a: &Point, b: &Point, c: &Point) -> f32 {
    (triangle_area(a, b, c).abs() * UNIT_AREA_TO_SQUARE_METERS) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::LatLng;

    fn ll(lat: f64, lng: f64) -> Point {
        LatLng::new(lat, lng).to_point()
    }

    #[test]
    fn area_scorers_are_opposite() {
        let (a, b, c) = (ll(0.0, 0.0), ll(0.0, 0.01), ll(0.01, 0.0));
        let large = TriangleScorer::LargestArea.start().score(&a, &b, &c);
        let small = TriangleScorer::SmallestArea.start().score(&a, &b, &c);
        assert!(large > 0.0);
        assert_eq!(large, -small);
        // 0.01° legs: about 1.52e-8 sr.
        assert!(large > 7.5e6 && large < 8.0e6);
    }

    #[test]
    fn equilateral_beats_sliver() {
        let mut s = TriangleScorer::MostEquilateral.start();
        let fat = s.score(&ll(0.0, 0.0), &ll(0.0, 0.01), &ll(0.00866, 0.005));
        let sliver = s.score(&ll(0.0, 0.0), &ll(0.0, 0.01), &ll(0.0005, 0.005));
        assert!(fat > sliver);
        assert!((fat - std::f32::consts::FRAC_PI_3).abs() < 1e-2);
    }

    #[test]
    fn random_is_seeded() {
        let p = ll(0.0, 0.0);
        let draw = |seed| {
            let mut s = TriangleScorer::Random { seed }.start();
            (0..5).map(|_| s.score(&p, &p, &p)).collect::<Vec<_>>()
        };
        assert_eq!(draw(7), draw(7));
        assert_ne!(draw(7), draw(8));
    }
}
