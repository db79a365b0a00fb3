//! Largest cobweb: a chain of nested triangles where each new portal lies
//! strictly inside the triangle of the three most recent ones.
//!
//! Model
//! - State `(p0, p1, p2)` is an ordered triple, `p2` the most recent portal.
//!   Any portal `x` strictly inside leads to state `(p1, p2, x)`.
//! - `find_best_cobweb` fills the `N³` table with the best next portal and the
//!   number of portals that can still be added below each state.
//! - Candidates of `(p1, p2, x)` are the caller's candidates inside the wedge at
//!   `x` towards `p1, p2`, which is exactly the next triangle's interior.
//!
//! Code cross-refs: `memo::TripleTable`, `partition::partition_portals_inside_wedge`.

use tracing::info;

use crate::error::PatternError;
use crate::memo::{BestSolution, TripleTable};
use crate::parallel::with_deep_stack;
use crate::partition::{partition_portals_inside_triangle, partition_portals_inside_wedge};
use crate::portal::{check_indices, prepare_portals, Portal, PortalData, PortalIndex};
use crate::progress::ProgressTicker;

/// Cobweb search options.
#[derive(Clone, Debug, Default)]
pub struct CobwebCfg {
    /// Up to three portals that must be among the first three corners.
    pub fixed_corners: Vec<PortalIndex>,
}

/// Longest cobweb over `portals`.
///
/// Returns `[q0, q1, q2, q3, …]` where every `q_k` (k ≥ 3) lies strictly inside
/// `(q_{k-3}, q_{k-2}, q_{k-1})`.
pub fn largest_cobweb(
    portals: &[Portal],
    cfg: &CobwebCfg,
    progress: &mut (dyn FnMut(u32, u32) + Send),
) -> Result<Vec<PortalIndex>, PatternError> {
    let data = prepare_portals(portals, 3)?;
    check_fixed_corners(&cfg.fixed_corners, data.len())?;
    let table = TripleTable::new(data.len(), BestSolution::UNKNOWN)?;
    let mut query = CobwebQuery::new(&data, table);
    let fixed = cfg.fixed_corners.as_slice();
    let result = with_deep_stack(move || query.solve(fixed, progress))?;
    info!(portals = result.len(), "largest cobweb");
    Ok(result)
}

pub(crate) fn check_fixed_corners(
    fixed: &[PortalIndex],
    num_portals: usize,
) -> Result<(), PatternError> {
    if fixed.len() > 3 {
        return Err(PatternError::InvalidOption(format!(
            "at most 3 fixed corners, got {}",
            fixed.len()
        )));
    }
    check_indices(fixed, num_portals)
}

/// True iff the triple contains every fixed corner.
#[inline]
pub(crate) fn has_fixed_corners(fixed: &[PortalIndex], triple: [PortalIndex; 3]) -> bool {
    fixed.iter().all(|f| triple.contains(f))
}

struct CobwebQuery<'a> {
    portals: &'a [PortalData],
    table: TripleTable<BestSolution>,
    /// Candidate buffers, one per recursion level.
    scratch: Vec<Vec<PortalData>>,
}

impl<'a> CobwebQuery<'a> {
    fn new(portals: &'a [PortalData], table: TripleTable<BestSolution>) -> Self {
        Self {
            portals,
            table,
            scratch: Vec::new(),
        }
    }

    fn solve(
        &mut self,
        fixed: &[PortalIndex],
        progress: &mut (dyn FnMut(u32, u32) + Send),
    ) -> Vec<PortalIndex> {
        let n = self.portals.len();
        let total = n * (n - 1) * (n - 2) / 6;
        let mut ticker = ProgressTicker::new(total, progress);
        let mut inside = Vec::with_capacity(n);
        let mut best: Option<([PortalIndex; 3], u16)> = None;
        for i in 0..n {
            for j in (i + 1)..n {
                for k in (j + 1)..n {
                    ticker.tick();
                    let (a, b, c) = (self.portals[i], self.portals[j], self.portals[k]);
                    if !has_fixed_corners(fixed, [a.index, b.index, c.index]) {
                        continue;
                    }
                    partition_portals_inside_triangle(self.portals, &a, &b, &c, &mut inside);
                    for (p0, p1, p2) in [(a, b, c), (a, c, b), (b, a, c), (b, c, a), (c, a, b), (c, b, a)] {
                        if !self.table.get(p0.index, p1.index, p2.index).is_known() {
                            self.find_best_cobweb(&p0, &p1, &p2, &inside, 0);
                        }
                        let length = self.table.get(p0.index, p1.index, p2.index).length;
                        if best.is_none_or(|(_, l)| length > l) {
                            best = Some(([p0.index, p1.index, p2.index], length));
                        }
                    }
                }
            }
        }
        ticker.finish();
        match best {
            Some((root, _)) => self.chain_from(root),
            None => Vec::new(),
        }
    }

    /// Fill the entry of `(p0, p1, p2)`; `candidates` are exactly the portals inside it.
    fn find_best_cobweb(
        &mut self,
        p0: &PortalData,
        p1: &PortalData,
        p2: &PortalData,
        candidates: &[PortalData],
        level: usize,
    ) {
        debug_assert!(!self.table.get(p0.index, p1.index, p2.index).is_known());
        let mut best = BestSolution::new(PortalIndex::INVALID, 0);
        if self.scratch.len() <= level {
            self.scratch.resize_with(level + 1, Vec::new);
        }
        for x in candidates {
            if !self.table.get(p1.index, p2.index, x.index).is_known() {
                let mut next = std::mem::take(&mut self.scratch[level]);
                partition_portals_inside_wedge(candidates, x, p1, p2, &mut next);
                self.find_best_cobweb(p1, p2, x, &next, level + 1);
                self.scratch[level] = next;
            }
            let length = self.table.get(p1.index, p2.index, x.index).length + 1;
            if length > best.length {
                best = BestSolution::new(x.index, length);
            }
        }
        self.table.set(p0.index, p1.index, p2.index, best);
    }

    fn chain_from(&self, root: [PortalIndex; 3]) -> Vec<PortalIndex> {
        let mut chain = root.to_vec();
        let [mut p0, mut p1, mut p2] = root;
        loop {
            let next = self.table.get(p0, p1, p2);
            if next.length == 0 {
                break;
            }
            chain.push(next.index);
            (p0, p1, p2) = (p1, p2, next.index);
        }
        chain
    }
}
