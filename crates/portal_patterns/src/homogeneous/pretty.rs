//! Spread-around scoring for homogeneous fields.
//!
//! The spread of a depth-`d` field is the smallest distance (in square metres
//! of chord-angle) from any midpoint to the sides of the triangle it splits.
//! `spread(T, 1) = +inf`; for deeper fields the midpoint is chosen to maximize
//! `min(height(m, T), spread(children, d - 1))` among midpoints whose children
//! all reach depth `d - 1`.

use crate::geom::{DistanceQuery, RADIANS_TO_METERS};
use crate::partition::partition_portals_inside_triangle;
use crate::portal::{PortalData, PortalIndex};

use super::SubdivisionQuery;

#[derive(Clone, Copy, Debug)]
pub(super) struct SpreadEntry {
    pub score: f32,
    pub midpoint: PortalIndex,
}

impl SpreadEntry {
    pub const UNKNOWN: SpreadEntry = SpreadEntry {
        score: f32::NAN,
        midpoint: PortalIndex::INVALID,
    };

    fn is_known(&self) -> bool {
        !self.score.is_nan()
    }
}

/// Squared chord-angle from `point` to the nearest side, scaled to square metres.
pub(super) fn height(sides: &[DistanceQuery; 3], point: &crate::geom::Point) -> f32 {
    let min = sides
        .iter()
        .map(|side| side.chord_angle_sq(point))
        .fold(f64::INFINITY, f64::min);
    (min * RADIANS_TO_METERS * RADIANS_TO_METERS) as f32
}

pub(super) fn sides_of(p0: &PortalData, p1: &PortalData, p2: &PortalData) -> [DistanceQuery; 3] {
    [
        DistanceQuery::new(&p1.point, &p2.point),
        DistanceQuery::new(&p0.point, &p2.point),
        DistanceQuery::new(&p0.point, &p1.point),
    ]
}

impl SubdivisionQuery<'_> {
    /// Best spread of a depth-`depth` field over `(p0, p1, p2)`.
    ///
    /// Callers must only ask for depths the triangle actually reaches.
    pub(super) fn spread(
        &mut self,
        p0: &PortalData,
        p1: &PortalData,
        p2: &PortalData,
        candidates: &[PortalData],
        depth: u16,
        level: usize,
    ) -> f32 {
        if depth <= 1 {
            return f32::INFINITY;
        }
        let slot = usize::from(depth - 2);
        let known = self.spread[slot].get(p0.index, p1.index, p2.index);
        if known.is_known() {
            return known.score;
        }
        self.ensure_level(level);
        let sides = sides_of(p0, p1, p2);
        let mut best = SpreadEntry {
            score: f32::NEG_INFINITY,
            midpoint: PortalIndex::INVALID,
        };
        for m in candidates {
            let mut score = height(&sides, &m.point);
            if score <= best.score {
                continue;
            }
            for (a, b, c) in [(m, p1, p2), (p0, m, p2), (p0, p1, m)] {
                let mut inside = std::mem::take(&mut self.scratch[level]);
                partition_portals_inside_triangle(candidates, a, b, c, &mut inside);
                let child = if self.depth(a, b, c, &inside, level + 1) >= depth - 1 {
                    self.spread(a, b, c, &inside, depth - 1, level + 1)
                } else {
                    f32::NEG_INFINITY
                };
                self.scratch[level] = inside;
                score = score.min(child);
                if score <= best.score {
                    break;
                }
            }
            if score > best.score {
                best = SpreadEntry {
                    score,
                    midpoint: m.index,
                };
            }
        }
        self.spread[slot].set_permutations(p0.index, p1.index, p2.index, best);
        best.score
    }
}
