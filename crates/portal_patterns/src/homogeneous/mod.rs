//! Homogeneous fields: ternary subdivisions of a root triangle.
//!
//! Purpose
//! - A depth-`d` field over `(p0, p1, p2)` picks a midpoint `m` strictly inside
//!   and builds depth-`d-1` fields over `(m, p1, p2)`, `(p0, m, p2)` and
//!   `(p0, p1, m)`. Depth 1 is a bare triangle.
//! - One engine serves three modes: `Deepest` (plain depth DP), `Pretty`
//!   (depth DP plus spread-around scoring of midpoints) and `Pure` (every
//!   interior portal participates, see `pure`).
//!
//! Result encoding
//! - `[p0, p1, p2, m, <field (m,p1,p2)>, <field (p0,m,p2)>, <field (p0,p1,m)>]`
//!   in preorder, so a depth-`d` field lists `3 + (3^(d-1) - 1) / 2` portals.
//!
//! Code cross-refs: `memo::TripleTable`, `scorer::TriangleScorer`, `pretty`, `pure`.

mod pretty;
mod pure;

use tracing::info;

use crate::cobweb::{check_fixed_corners, has_fixed_corners};
use crate::error::PatternError;
use crate::memo::{BestSolution, TripleTable};
use crate::parallel::{default_num_workers, with_deep_stack};
use crate::partition::partition_portals_inside_triangle;
use crate::portal::{prepare_portals, Portal, PortalData, PortalIndex};
use crate::progress::ProgressTicker;
use crate::scorer::TriangleScorer;

use pretty::SpreadEntry;

/// Deepest field supported: larger depths need more portals than an index can address.
pub const MAX_DEPTH: u16 = 11;

/// Which homogeneous variant to search for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HomogeneousMode {
    #[default]
    Deepest,
    /// Deepest field, ties broken by how far midpoints sit from their parent's sides.
    Pretty,
    /// Deepest field that uses every portal inside its root triangle.
    Pure,
}

/// Homogeneous search options.
#[derive(Clone, Debug)]
pub struct HomogeneousCfg {
    pub max_depth: u16,
    pub mode: HomogeneousMode,
    /// Tie-break between root triangles of equal depth (`Pretty` forces `SpreadAround`).
    pub scorer: TriangleScorer,
    pub fixed_corners: Vec<PortalIndex>,
    /// Workers for the pure bootstrap; the DP modes are single-threaded.
    pub num_workers: usize,
}

impl Default for HomogeneousCfg {
    fn default() -> Self {
        Self {
            max_depth: 6,
            mode: HomogeneousMode::Deepest,
            scorer: TriangleScorer::Arbitrary,
            fixed_corners: Vec::new(),
            num_workers: default_num_workers(),
        }
    }
}

/// A homogeneous field in preorder encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HomogeneousField {
    pub depth: u16,
    pub portals: Vec<PortalIndex>,
}

/// Number of portals of a depth-`depth` field, corners included.
pub fn field_portal_count(depth: u16) -> usize {
    3 + pure::pure_interior_count(depth)
}

/// Deepest homogeneous field over `portals` (bounded by `cfg.max_depth`).
pub fn deepest_homogeneous(
    portals: &[Portal],
    cfg: &HomogeneousCfg,
    progress: &mut (dyn FnMut(u32, u32) + Send),
) -> Result<HomogeneousField, PatternError> {
    if cfg.max_depth == 0 || cfg.max_depth > MAX_DEPTH {
        return Err(PatternError::InvalidOption(format!(
            "max_depth must be in 1..={MAX_DEPTH}, got {}",
            cfg.max_depth
        )));
    }
    let data = prepare_portals(portals, 3)?;
    check_fixed_corners(&cfg.fixed_corners, data.len())?;
    let field = match cfg.mode {
        HomogeneousMode::Pure => pure::deepest_pure(&data, cfg, progress)?,
        HomogeneousMode::Deepest | HomogeneousMode::Pretty => {
            let scorer = if cfg.mode == HomogeneousMode::Pretty {
                TriangleScorer::SpreadAround
            } else {
                cfg.scorer
            };
            let mut query = SubdivisionQuery::new(&data, cfg.max_depth, scorer)?;
            let fixed = cfg.fixed_corners.as_slice();
            with_deep_stack(move || query.solve(fixed, scorer, progress))?
        }
    };
    info!(depth = field.depth, portals = field.portals.len(), mode = ?cfg.mode, "homogeneous field");
    Ok(field)
}

/// Memoized depth DP (and, for spread-around scoring, the per-depth spread tables).
struct SubdivisionQuery<'a> {
    portals: &'a [PortalData],
    max_depth: u16,
    depths: TripleTable<BestSolution>,
    /// `spread[d - 2]` holds depth-`d` spread scores; empty unless scoring by spread.
    spread: Vec<TripleTable<SpreadEntry>>,
    scratch: Vec<Vec<PortalData>>,
}

impl<'a> SubdivisionQuery<'a> {
    fn new(
        portals: &'a [PortalData],
        max_depth: u16,
        scorer: TriangleScorer,
    ) -> Result<Self, PatternError> {
        let n = portals.len();
        let depths = TripleTable::new(n, BestSolution::UNKNOWN)?;
        let spread = if scorer == TriangleScorer::SpreadAround {
            (2..=max_depth)
                .map(|_| TripleTable::new(n, SpreadEntry::UNKNOWN))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };
        Ok(Self {
            portals,
            max_depth,
            depths,
            spread,
            scratch: Vec::new(),
        })
    }

    fn solve(
        &mut self,
        fixed: &[PortalIndex],
        scorer: TriangleScorer,
        progress: &mut (dyn FnMut(u32, u32) + Send),
    ) -> HomogeneousField {
        let n = self.portals.len();
        let mut ticker = ProgressTicker::new(n * (n - 1) * (n - 2) / 6, progress);
        let mut active = scorer.start();
        let mut inside = Vec::with_capacity(n);
        let mut best: Option<([PortalIndex; 3], u16, f32)> = None;
        for i in 0..n {
            for j in (i + 1)..n {
                for k in (j + 1)..n {
                    ticker.tick();
                    let (a, b, c) = (self.portals[i], self.portals[j], self.portals[k]);
                    if !has_fixed_corners(fixed, [a.index, b.index, c.index]) {
                        continue;
                    }
                    partition_portals_inside_triangle(self.portals, &a, &b, &c, &mut inside);
                    let depth = self.depth(&a, &b, &c, &inside, 0);
                    if best.is_some_and(|(_, d, _)| depth < d) {
                        continue;
                    }
                    let score = if scorer == TriangleScorer::SpreadAround {
                        self.spread(&a, &b, &c, &inside, depth, 0)
                    } else {
                        active.score(&a.point, &b.point, &c.point)
                    };
                    if best.is_none_or(|(_, d, s)| depth > d || score > s) {
                        best = Some(([a.index, b.index, c.index], depth, score));
                    }
                }
            }
        }
        ticker.finish();
        let Some((root, depth, _)) = best else {
            return HomogeneousField {
                depth: 1,
                portals: Vec::new(),
            };
        };
        let mut portals = root.to_vec();
        let [p0, p1, p2] = root;
        self.push_midpoints(p0, p1, p2, depth, scorer == TriangleScorer::SpreadAround, &mut portals);
        HomogeneousField { depth, portals }
    }

    fn ensure_level(&mut self, level: usize) {
        if self.scratch.len() <= level {
            self.scratch.resize_with(level + 1, Vec::new);
        }
    }

    /// Depth of the deepest field over `(p0, p1, p2)`, capped at `max_depth`.
    ///
    /// `candidates` are exactly the portals strictly inside the triangle.
    fn depth(
        &mut self,
        p0: &PortalData,
        p1: &PortalData,
        p2: &PortalData,
        candidates: &[PortalData],
        level: usize,
    ) -> u16 {
        let known = self.depths.get(p0.index, p1.index, p2.index);
        if known.is_known() {
            return known.length;
        }
        self.ensure_level(level);
        let mut best = BestSolution::new(PortalIndex::INVALID, 1);
        if self.max_depth > 1 {
            for m in candidates {
                let mut depth = self.max_depth - 1;
                for (a, b, c) in [(m, p1, p2), (p0, m, p2), (p0, p1, m)] {
                    depth = depth.min(self.child_depth(a, b, c, candidates, level));
                    if depth < best.length {
                        break;
                    }
                }
                if depth + 1 > best.length {
                    best = BestSolution::new(m.index, depth + 1);
                    if best.length == self.max_depth {
                        break;
                    }
                }
            }
        }
        self.depths
            .set_permutations(p0.index, p1.index, p2.index, best);
        best.length
    }

    fn child_depth(
        &mut self,
        a: &PortalData,
        b: &PortalData,
        c: &PortalData,
        parent_candidates: &[PortalData],
        level: usize,
    ) -> u16 {
        let known = self.depths.get(a.index, b.index, c.index);
        if known.is_known() {
            return known.length;
        }
        let mut inside = std::mem::take(&mut self.scratch[level]);
        partition_portals_inside_triangle(parent_candidates, a, b, c, &mut inside);
        let depth = self.depth(a, b, c, &inside, level + 1);
        self.scratch[level] = inside;
        depth
    }

    fn midpoint(&self, p0: PortalIndex, p1: PortalIndex, p2: PortalIndex, depth: u16, by_spread: bool) -> PortalIndex {
        if by_spread {
            self.spread[usize::from(depth - 2)].get(p0, p1, p2).midpoint
        } else {
            self.depths.get(p0, p1, p2).index
        }
    }

    fn push_midpoints(
        &self,
        p0: PortalIndex,
        p1: PortalIndex,
        p2: PortalIndex,
        depth: u16,
        by_spread: bool,
        out: &mut Vec<PortalIndex>,
    ) {
        if depth <= 1 {
            return;
        }
        let m = self.midpoint(p0, p1, p2, depth, by_spread);
        debug_assert!(m.is_valid());
        out.push(m);
        self.push_midpoints(m, p1, p2, depth - 1, by_spread, out);
        self.push_midpoints(p0, m, p2, depth - 1, by_spread, out);
        self.push_midpoints(p0, p1, m, depth - 1, by_spread, out);
    }
}

#[cfg(test)]
mod tests;
