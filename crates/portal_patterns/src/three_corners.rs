//! Three corners: a nested chain of triangles over three coloured portal sets.
//!
//! Each triangle has one corner of every colour. The next portal (of any
//! colour) must lie strictly inside the current triangle and replaces the
//! corner of its own colour. Longest chain wins; equal lengths prefer fewer
//! colour changes between consecutive picks.
//!
//! The memo keeps, per triangle, the best continuation for each colour of its
//! first pick. A parent then charges a change only when its own pick's colour
//! differs from the continuation it follows, so the tie-break is exact.

use tracing::info;

use crate::error::PatternError;
use crate::memo::TripleTable;
use crate::parallel::with_deep_stack;
use crate::partition::{partition_portals_inside_triangle, partition_portals_inside_wedge};
use crate::portal::{prepare_portals, Portal, PortalData, PortalIndex};
use crate::progress::ProgressTicker;

/// A portal of the result: its colour and its index within that colour's list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColoredIndex {
    pub color: u8,
    pub index: PortalIndex,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThreeCornerField {
    /// Corners of colours 0, 1, 2 followed by the picks in order.
    pub portals: Vec<ColoredIndex>,
    pub color_changes: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CornerSolution {
    index: PortalIndex,
    length: u16,
    color_changes: u16,
}

impl CornerSolution {
    const EMPTY: Self = Self {
        index: PortalIndex::INVALID,
        length: 0,
        color_changes: 0,
    };

    fn beats(&self, other: &Self) -> bool {
        self.length > other.length
            || (self.length == other.length && self.color_changes < other.color_changes)
    }
}

/// Best continuation of a triangle, by colour of its first pick.
type ByColor = [CornerSolution; 3];

const UNKNOWN: ByColor = [CornerSolution {
    index: PortalIndex::INVALID,
    length: u16::MAX,
    color_changes: 0,
}; 3];

fn is_known(options: &ByColor) -> bool {
    options[0].length != u16::MAX
}

/// Colour, length and colour changes of the best continuation after a pick of colour `prev`.
///
/// `None` when the triangle is empty. Ties go to the smallest colour.
fn follow(options: &ByColor, prev: Option<usize>) -> Option<(usize, u16, u16)> {
    let mut best: Option<(usize, u16, u16)> = None;
    for (color, s) in options.iter().enumerate() {
        if s.length == 0 {
            continue;
        }
        let changes = s.color_changes + u16::from(prev.is_some_and(|p| p != color));
        if best.is_none_or(|(_, l, c)| s.length > l || (s.length == l && changes < c)) {
            best = Some((color, s.length, changes));
        }
    }
    best
}

/// Longest three-corner chain with corners from `portals[0]`, `portals[1]`, `portals[2]`.
pub fn largest_three_corner(
    portals: [&[Portal]; 3],
    progress: &mut (dyn FnMut(u32, u32) + Send),
) -> Result<ThreeCornerField, PatternError> {
    for list in portals {
        if list.is_empty() {
            return Err(PatternError::TooFewPortals { needed: 1, got: 0 });
        }
    }
    let combined: Vec<Portal> = portals.iter().flat_map(|list| list.iter().cloned()).collect();
    let data = prepare_portals(&combined, 3)?;
    let offsets = [0, portals[0].len(), portals[0].len() + portals[1].len()];
    let colors: Vec<u8> = (0u8..3)
        .flat_map(|c| std::iter::repeat(c).take(portals[usize::from(c)].len()))
        .collect();
    let table = TripleTable::new(data.len(), UNKNOWN)?;
    let mut query = ThreeCornerQuery {
        by_color: [
            &data[offsets[0]..offsets[1]],
            &data[offsets[1]..offsets[2]],
            &data[offsets[2]..],
        ],
        table,
        scratch: Vec::new(),
    };
    let (chain, color_changes) = with_deep_stack(move || query.solve(progress))?;
    let portals: Vec<ColoredIndex> = chain
        .into_iter()
        .map(|i| {
            let color = colors[i.get()];
            ColoredIndex {
                color,
                index: PortalIndex::from_usize(i.get() - offsets[usize::from(color)]),
            }
        })
        .collect();
    info!(portals = portals.len(), color_changes, "three corners");
    Ok(ThreeCornerField {
        portals,
        color_changes,
    })
}

type ColorLists = [Vec<PortalData>; 3];

struct ThreeCornerQuery<'a> {
    by_color: [&'a [PortalData]; 3],
    table: TripleTable<ByColor>,
    scratch: Vec<ColorLists>,
}

impl ThreeCornerQuery<'_> {
    fn solve(&mut self, progress: &mut (dyn FnMut(u32, u32) + Send)) -> (Vec<PortalIndex>, u16) {
        let [c0, c1, c2] = self.by_color;
        let mut ticker = ProgressTicker::new(c0.len() * c1.len() * c2.len(), progress);
        let mut inside: ColorLists = Default::default();
        let mut best: Option<([PortalIndex; 3], CornerSolution)> = None;
        for a in c0 {
            for b in c1 {
                for c in c2 {
                    ticker.tick();
                    for (list, all) in inside.iter_mut().zip(self.by_color) {
                        partition_portals_inside_triangle(all, a, b, c, list);
                    }
                    let options = self.find_best(a, b, c, &inside, 0);
                    let (length, color_changes) =
                        follow(&options, None).map_or((0, 0), |(_, l, c)| (l, c));
                    let solution = CornerSolution {
                        index: PortalIndex::INVALID,
                        length,
                        color_changes,
                    };
                    if best.is_none_or(|(_, s)| solution.beats(&s)) {
                        best = Some(([a.index, b.index, c.index], solution));
                    }
                }
            }
        }
        ticker.finish();
        match best {
            Some((root, solution)) => (self.chain_from(root), solution.color_changes),
            None => (Vec::new(), 0),
        }
    }

    /// Best chains below the triangle `(p0, p1, p2)` (corners indexed by colour).
    ///
    /// `candidates[c]` are exactly the colour-`c` portals inside the triangle.
    fn find_best(
        &mut self,
        p0: &PortalData,
        p1: &PortalData,
        p2: &PortalData,
        candidates: &ColorLists,
        level: usize,
    ) -> ByColor {
        let known = self.table.get(p0.index, p1.index, p2.index);
        if is_known(&known) {
            return known;
        }
        if self.scratch.len() <= level {
            self.scratch.resize_with(level + 1, Default::default);
        }
        let mut best = [CornerSolution::EMPTY; 3];
        for color in 0..3 {
            for x in &candidates[color] {
                let mut corners = [p0, p1, p2];
                corners[color] = x;
                let [q0, q1, q2] = corners;
                let (o1, o2) = match color {
                    0 => (p1, p2),
                    1 => (p0, p2),
                    _ => (p0, p1),
                };
                let mut next = std::mem::take(&mut self.scratch[level]);
                for (list, all) in next.iter_mut().zip(candidates) {
                    partition_portals_inside_wedge(all, x, o1, o2, list);
                }
                let child = self.find_best(q0, q1, q2, &next, level + 1);
                self.scratch[level] = next;
                let (length, color_changes) =
                    follow(&child, Some(color)).map_or((1, 0), |(_, l, c)| (l + 1, c));
                let solution = CornerSolution {
                    index: x.index,
                    length,
                    color_changes,
                };
                if solution.beats(&best[color]) {
                    best[color] = solution;
                }
            }
        }
        self.table.set(p0.index, p1.index, p2.index, best);
        best
    }

    fn chain_from(&self, root: [PortalIndex; 3]) -> Vec<PortalIndex> {
        let mut chain = root.to_vec();
        let mut corners = root;
        let mut prev = None;
        loop {
            let options = self.table.get(corners[0], corners[1], corners[2]);
            let Some((color, _, _)) = follow(&options, prev) else {
                break;
            };
            let next = options[color].index;
            chain.push(next);
            corners[color] = next;
            prev = Some(color);
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{LatLng, TriangleQuery};
    use crate::progress::no_progress;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn portals(points: &[(f64, f64)]) -> Vec<Portal> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(lat, lng))| Portal::new(format!("g{i}"), format!("p{i}"), LatLng::new(lat, lng)))
            .collect()
    }

    fn split(points: &[(u8, (f64, f64))]) -> [Vec<Portal>; 3] {
        let mut lists: [Vec<(f64, f64)>; 3] = Default::default();
        for &(color, p) in points {
            lists[usize::from(color)].push(p);
        }
        lists.map(|l| portals(&l))
    }

    fn run(lists: &[Vec<Portal>; 3]) -> ThreeCornerField {
        largest_three_corner(lists.each_ref().map(Vec::as_slice), &mut no_progress).unwrap()
    }

    fn assert_nested(lists: &[Vec<Portal>; 3], field: &ThreeCornerField) {
        let pt = |c: ColoredIndex| lists[usize::from(c.color)][c.index.get()].lat_lng.to_point();
        let colors: Vec<u8> = field.portals.iter().map(|c| c.color).collect();
        assert_eq!(&colors[..3], &[0, 1, 2]);
        let mut corners = [field.portals[0], field.portals[1], field.portals[2]];
        for &next in &field.portals[3..] {
            let q = TriangleQuery::new(&pt(corners[0]), &pt(corners[1]), &pt(corners[2]));
            assert!(q.contains(&pt(next)));
            corners[usize::from(next.color)] = next;
        }
        let changes = colors[3..].windows(2).filter(|w| w[0] != w[1]).count();
        assert_eq!(changes, usize::from(field.color_changes));
    }

    /// Alternating colours, each pick close to the centroid of the current corners.
    fn chain(len: usize) -> Vec<(u8, (f64, f64))> {
        let mut corners = [(0.0, 0.0), (0.0, 0.04), (0.03, 0.02)];
        let mut out: Vec<(u8, (f64, f64))> = corners.iter().enumerate().map(|(c, &p)| (c as u8, p)).collect();
        for k in 0..len {
            let color = k % 3;
            let w = [0.3, 0.33, 0.37];
            let p = (
                w.iter().zip(corners).map(|(w, c)| w * c.0).sum::<f64>(),
                w.iter().zip(corners).map(|(w, c)| w * c.1).sum::<f64>(),
            );
            out.push((color as u8, p));
            corners[color] = p;
        }
        out
    }

    #[test]
    fn alternating_chain_uses_every_portal() {
        let lists = split(&chain(7));
        let field = run(&lists);
        assert_eq!(field.portals.len(), 10);
        assert!(field.color_changes <= 6);
        assert_nested(&lists, &field);
    }

    #[test]
    fn empty_triangle_is_trivial() {
        let lists = split(&[(0, (0.0, 0.0)), (1, (0.0, 0.01)), (2, (0.01, 0.005))]);
        let field = run(&lists);
        assert_eq!(field.portals.len(), 3);
        assert_eq!(field.color_changes, 0);
    }

    #[test]
    fn equal_length_prefers_fewer_color_changes() {
        // Two picks either as colour 0 then colour 1, or twice colour 2.
        let lists = split(&[
            (0, (0.0, 0.0)),
            (1, (0.0, 0.04)),
            (2, (0.03, 0.02)),
            (0, (0.009, 0.011)),
            (1, (0.015, 0.02)),
            (2, (0.001, 0.003)),
            (2, (0.011, 0.028)),
        ]);
        let field = run(&lists);
        assert_eq!(field.portals.len(), 5);
        assert_eq!(field.color_changes, 0);
        assert_nested(&lists, &field);
    }

    #[test]
    fn every_color_is_required() {
        let lists = split(&[(0, (0.0, 0.0)), (1, (0.0, 0.01)), (1, (0.01, 0.005))]);
        assert!(largest_three_corner(lists.each_ref().map(Vec::as_slice), &mut no_progress).is_err());
    }

    #[test]
    fn random_triangles_are_trivial() {
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..100 {
            let pts: Vec<(u8, (f64, f64))> = (0..3)
                .map(|c| (c, (rng.gen_range(0.0..0.01), rng.gen_range(0.0..0.01))))
                .collect();
            let field = run(&split(&pts));
            assert_eq!(field.portals.len(), 3, "{pts:?}");
        }
    }
}
