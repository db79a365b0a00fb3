//! Pure homogeneous fields: fields that use every portal inside the root.
//!
//! A depth-`d` field over a triangle is pure when the triangle holds exactly
//! `(3^(d-1) - 1) / 2` portals and some interior midpoint splits it into three
//! pure depth-`d-1` fields.
//!
//! Search
//! - Bootstrap: enumerate every CCW triangle (one rotation, smallest index
//!   first) on the worker pool, keep those with the right interior count and
//!   verify them recursively with a per-worker memo.
//! - Extension: a depth-`d+1` field over `(u, v, w)` with midpoint `m` is made
//!   of the depth-`d` fields `(m, v, w)`, `(u, m, w)`, `(u, v, m)`. Workers
//!   take one known field each and look up the other two by shared edge at
//!   `m`; the interior count then decides.

use std::collections::HashMap;

use tracing::debug;

use crate::cobweb::has_fixed_corners;
use crate::error::PatternError;
use crate::geom::{sign, TriangleQuery};
use crate::parallel::{run_pool, BufferPool};
use crate::partition::partition_portals_inside_triangle;
use crate::portal::{PortalData, PortalIndex};
use crate::progress::ProgressTicker;
use crate::scorer::TriangleScorer;

use super::pretty::{height, sides_of};
use super::{HomogeneousCfg, HomogeneousField};

/// Deepest pure field the bootstrap enumerates directly.
const BOOTSTRAP_DEPTH: u16 = 4;

/// Portals strictly inside a pure field of depth `depth`.
pub(crate) fn pure_interior_count(depth: u16) -> usize {
    (3usize.pow(u32::from(depth.saturating_sub(1))) - 1) / 2
}

type TriangleKey = [PortalIndex; 3];

fn key(a: PortalIndex, b: PortalIndex, c: PortalIndex) -> TriangleKey {
    let mut k = [a, b, c];
    k.sort_unstable();
    k
}

/// Known pure fields: `levels[d]` lists depth-`d` roots, `midpoints` every verified split.
#[derive(Default)]
struct PureFields {
    levels: Vec<Vec<TriangleKey>>,
    midpoints: HashMap<TriangleKey, PortalIndex>,
}

impl PureFields {
    fn level(&self, depth: u16) -> &[TriangleKey] {
        self.levels
            .get(usize::from(depth))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn set_level(&mut self, depth: u16, roots: Vec<TriangleKey>) {
        let d = usize::from(depth);
        if self.levels.len() <= d {
            self.levels.resize_with(d + 1, Vec::new);
        }
        self.levels[d] = roots;
    }

    fn push_midpoints(&self, corners: TriangleKey, depth: u16, out: &mut Vec<PortalIndex>) {
        if depth <= 1 {
            return;
        }
        let [p0, p1, p2] = corners;
        let Some(&m) = self.midpoints.get(&key(p0, p1, p2)) else {
            debug_assert!(false, "pure field without midpoint");
            return;
        };
        out.push(m);
        self.push_midpoints([m, p1, p2], depth - 1, out);
        self.push_midpoints([p0, m, p2], depth - 1, out);
        self.push_midpoints([p0, p1, m], depth - 1, out);
    }

    /// Spread of a known field, as defined for pretty fields.
    fn spread(&self, data: &[PortalData], corners: TriangleKey, depth: u16) -> f32 {
        if depth <= 1 {
            return f32::INFINITY;
        }
        let [p0, p1, p2] = corners;
        let Some(&m) = self.midpoints.get(&key(p0, p1, p2)) else {
            return f32::NEG_INFINITY;
        };
        let at = |i: PortalIndex| &data[i.get()];
        let own = height(&sides_of(at(p0), at(p1), at(p2)), &at(m).point);
        [[m, p1, p2], [p0, m, p2], [p0, p1, m]]
            .into_iter()
            .map(|child| self.spread(data, child, depth - 1))
            .fold(own, f32::min)
    }
}

/// Worker-side scratch: recursive purity checks memoized per request.
#[derive(Default)]
struct PureScratch {
    half: Vec<PortalData>,
    inside: Vec<PortalData>,
    memo: HashMap<TriangleKey, Option<PortalIndex>>,
}

#[derive(Default)]
struct FoundFields {
    roots: Vec<TriangleKey>,
    midpoints: Vec<(TriangleKey, PortalIndex)>,
}

impl PureScratch {
    fn is_pure(
        &mut self,
        a: &PortalData,
        b: &PortalData,
        c: &PortalData,
        inside: &[PortalData],
        depth: u16,
    ) -> bool {
        if depth <= 1 {
            return inside.is_empty();
        }
        let target = pure_interior_count(depth - 1);
        if inside.len() != 3 * target + 1 {
            return false;
        }
        let k = key(a.index, b.index, c.index);
        if let Some(known) = self.memo.get(&k) {
            return known.is_some();
        }
        let mut found = None;
        let mut parts: [Vec<PortalData>; 3] = Default::default();
        for m in inside {
            let children = [(m, b, c), (a, m, c), (a, b, m)];
            let balanced = children.iter().zip(parts.iter_mut()).all(|(&(x, y, z), part)| {
                partition_portals_inside_triangle(inside, x, y, z, part);
                part.len() == target
            });
            if balanced
                && children
                    .iter()
                    .zip(parts.iter())
                    .all(|(&(x, y, z), part)| self.is_pure(x, y, z, part, depth - 1))
            {
                found = Some(m.index);
                break;
            }
        }
        self.memo.insert(k, found);
        found.is_some()
    }

    /// Pure depth-`depth` fields whose smallest corner is `p0`.
    fn roots_from(
        &mut self,
        data: &[PortalData],
        p0: &PortalData,
        depth: u16,
        fixed: Option<&[PortalIndex]>,
        out: &mut FoundFields,
    ) {
        out.roots.clear();
        out.midpoints.clear();
        self.memo.clear();
        let target = pure_interior_count(depth);
        for p1 in data.iter().filter(|p| p.index > p0.index) {
            let mut half = std::mem::take(&mut self.half);
            half.clear();
            half.extend(data.iter().filter(|p| {
                p.index != p0.index && p.index != p1.index && sign(&p0.point, &p1.point, &p.point)
            }));
            for p2 in half.iter().filter(|p| p.index > p0.index) {
                if fixed.is_some_and(|f| !has_fixed_corners(f, [p0.index, p1.index, p2.index])) {
                    continue;
                }
                let mut inside = std::mem::take(&mut self.inside);
                partition_portals_inside_triangle(&half, p0, p1, p2, &mut inside);
                if inside.len() == target && self.is_pure(p0, p1, p2, &inside, depth) {
                    out.roots.push(key(p0.index, p1.index, p2.index));
                }
                self.inside = inside;
            }
            self.half = half;
        }
        out.midpoints.extend(
            self.memo
                .iter()
                .filter_map(|(k, m)| m.map(|m| (*k, m))),
        );
    }
}

/// All pure depth-`depth` roots (optionally restricted to ones holding `fixed`).
fn bootstrap_level(
    data: &[PortalData],
    depth: u16,
    fixed: Option<&[PortalIndex]>,
    num_workers: usize,
    fields: &mut PureFields,
    progress: &mut (dyn FnMut(u32, u32) + Send),
) {
    let mut ticker = ProgressTicker::new(data.len(), progress);
    let pool: BufferPool<FoundFields> = BufferPool::new();
    let mut roots = Vec::new();
    run_pool(
        num_workers,
        data.iter(),
        &pool,
        PureScratch::default,
        |scratch, p0, found| scratch.roots_from(data, p0, depth, fixed, found),
        |(), found| {
            ticker.tick();
            roots.append(&mut found.roots);
            fields.midpoints.extend(found.midpoints.drain(..));
        },
    );
    ticker.finish();
    // Arrival order depends on scheduling.
    roots.sort_unstable();
    debug!(depth, roots = roots.len(), "pure bootstrap");
    fields.set_level(depth, roots);
}

/// Depth-`depth + 1` roots assembled from the known depth-`depth` ones.
///
/// Every known field is one request. A parent `(u, v, w)` around midpoint `m`
/// is reachable from all three of its fields; only the field whose edge
/// partner `w` is the largest corner emits it.
fn extend_level(
    data: &[PortalData],
    depth: u16,
    num_workers: usize,
    fields: &mut PureFields,
    progress: &mut (dyn FnMut(u32, u32) + Send),
) -> Vec<TriangleKey> {
    let level = fields.level(depth);
    let mut by_edge: HashMap<(PortalIndex, PortalIndex), Vec<PortalIndex>> = HashMap::new();
    for &[a, b, c] in level {
        by_edge.entry((a, b)).or_default().push(c);
        by_edge.entry((a, c)).or_default().push(b);
        by_edge.entry((b, c)).or_default().push(a);
    }
    let by_edge = &by_edge;
    let edge = move |x: PortalIndex, y: PortalIndex| {
        by_edge
            .get(&(x.min(y), x.max(y)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    };
    let target = pure_interior_count(depth + 1);

    let mut ticker = ProgressTicker::new(level.len(), progress);
    let pool: BufferPool<Vec<(TriangleKey, PortalIndex)>> = BufferPool::new();
    let mut found = Vec::new();
    run_pool(
        num_workers,
        level.iter().copied(),
        &pool,
        || (),
        |_, corners, out| {
            out.clear();
            for (m, u, v) in [
                (corners[0], corners[1], corners[2]),
                (corners[1], corners[0], corners[2]),
                (corners[2], corners[0], corners[1]),
            ] {
                // Fields (m, u, v), (m, u, w) and (m, v, w) share the midpoint m.
                for &w in edge(m, u) {
                    if w <= u || w <= v || !edge(m, v).contains(&w) {
                        continue;
                    }
                    let (pu, pv, pw) = (&data[u.get()], &data[v.get()], &data[w.get()]);
                    let query = TriangleQuery::new(&pu.point, &pv.point, &pw.point);
                    if !query.contains(&data[m.get()].point) {
                        continue;
                    }
                    let inside = data
                        .iter()
                        .filter(|p| {
                            p.index != u && p.index != v && p.index != w && query.contains(&p.point)
                        })
                        .count();
                    if inside == target {
                        out.push((key(u, v, w), m));
                    }
                }
            }
        },
        |_, out| {
            ticker.tick();
            found.append(out);
        },
    );
    ticker.finish();
    // Arrival order depends on scheduling; keep the smallest midpoint per parent.
    found.sort_unstable();
    found.dedup_by_key(|(parent, _)| *parent);
    let mut roots = Vec::with_capacity(found.len());
    for (parent, m) in found {
        fields.midpoints.insert(parent, m);
        roots.push(parent);
    }
    debug!(depth = depth + 1, roots = roots.len(), "pure extension");
    roots
}

fn pick_root(
    data: &[PortalData],
    fields: &PureFields,
    roots: &[TriangleKey],
    depth: u16,
    fixed: &[PortalIndex],
    scorer: TriangleScorer,
) -> Option<TriangleKey> {
    let mut active = scorer.start();
    let mut best: Option<(TriangleKey, f32)> = None;
    for &root in roots.iter().filter(|r| has_fixed_corners(fixed, **r)) {
        let score = if scorer == TriangleScorer::SpreadAround {
            fields.spread(data, root, depth)
        } else {
            let [a, b, c] = root;
            active.score(&data[a.get()].point, &data[b.get()].point, &data[c.get()].point)
        };
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((root, score));
        }
    }
    best.map(|(root, _)| root)
}

fn field_from(fields: &PureFields, root: TriangleKey, depth: u16) -> HomogeneousField {
    let mut portals = root.to_vec();
    fields.push_midpoints(root, depth, &mut portals);
    HomogeneousField { depth, portals }
}

pub(super) fn deepest_pure(
    data: &[PortalData],
    cfg: &HomogeneousCfg,
    progress: &mut (dyn FnMut(u32, u32) + Send),
) -> Result<HomogeneousField, PatternError> {
    let fixed = cfg.fixed_corners.as_slice();
    let mut fields = PureFields::default();
    let start = cfg.max_depth.min(BOOTSTRAP_DEPTH);
    let mut boot = None;
    for depth in (1..=start).rev() {
        bootstrap_level(data, depth, None, cfg.num_workers, &mut fields, progress);
        if !fields.level(depth).is_empty() {
            boot = Some(depth);
            break;
        }
    }
    let Some(boot) = boot else {
        return Ok(HomogeneousField {
            depth: 1,
            portals: trivial_triangle(data.len(), fixed),
        });
    };
    let mut top = boot;
    while top < cfg.max_depth {
        let next = extend_level(data, top, cfg.num_workers, &mut fields, progress);
        if next.is_empty() {
            break;
        }
        top += 1;
        fields.set_level(top, next);
    }
    for depth in (boot..=top).rev() {
        if let Some(root) = pick_root(data, &fields, fields.level(depth), depth, fixed, cfg.scorer) {
            return Ok(field_from(&fields, root, depth));
        }
    }
    // Nothing at or above the bootstrap depth holds the fixed corners.
    for depth in (1..boot).rev() {
        bootstrap_level(data, depth, Some(fixed), cfg.num_workers, &mut fields, progress);
        if let Some(root) = pick_root(data, &fields, fields.level(depth), depth, fixed, cfg.scorer) {
            return Ok(field_from(&fields, root, depth));
        }
    }
    Ok(HomogeneousField {
        depth: 1,
        portals: trivial_triangle(data.len(), fixed),
    })
}

/// Fixed corners topped up with the smallest remaining indices.
fn trivial_triangle(n: usize, fixed: &[PortalIndex]) -> Vec<PortalIndex> {
    let mut corners = fixed.to_vec();
    for i in (0..n).map(PortalIndex::from_usize) {
        if corners.len() == 3 {
            break;
        }
        if !corners.contains(&i) {
            corners.push(i);
        }
    }
    corners
}
