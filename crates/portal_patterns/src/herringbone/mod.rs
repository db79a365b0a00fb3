//! Herringbone: a backbone of portals nested over one base edge.
//!
//! For an ordered base `(b0, b1)` the backbone `s_0, s_1, ...` lies on the CCW
//! side of `b0 → b1` and every `s_k` (k ≥ 1) is strictly inside the triangle
//! `(b0, b1, s_{k-1})`.
//!
//! Per base
//! - Portals on the CCW side get two angular keys: the corner angle at `b0`
//!   (towards `b1`) and at `b1` (towards `b0`). `s'` is inside `(b0, b1, s)`
//!   iff both keys of `s'` are strictly smaller than those of `s`.
//! - Sorting by squared distance from the base makes the nesting relation
//!   point backwards, so a single `O(K²)` pass finds the longest chain, ties
//!   going to the smaller accumulated link length.
//!
//! Bases are independent requests on the `parallel` worker pool.
//!
//! Code cross-refs: `double` (both sides of a base), `geom::DistanceQuery`.

mod double;

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::error::PatternError;
use crate::geom::{corner_angle, distance_meters, sign, DistanceQuery};
use crate::parallel::{default_num_workers, run_pool, BufferPool};
use crate::portal::{check_indices, prepare_portals, Portal, PortalData, PortalIndex};
use crate::progress::ProgressTicker;

pub use double::{largest_double_herringbone, DoubleHerringbone};

/// Herringbone search options.
#[derive(Clone, Debug)]
pub struct HerringboneCfg {
    /// Up to two portals that must be part of the base.
    pub fixed_base: Vec<PortalIndex>,
    pub num_workers: usize,
}

impl Default for HerringboneCfg {
    fn default() -> Self {
        Self {
            fixed_base: Vec::new(),
            num_workers: default_num_workers(),
        }
    }
}

/// Base edge plus backbone, outermost portal first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Herringbone {
    pub b0: PortalIndex,
    pub b1: PortalIndex,
    pub backbone: Vec<PortalIndex>,
}

/// Candidate backbone portal of one base.
#[derive(Clone, Copy, Debug)]
struct Node {
    index: PortalIndex,
    start: f64,
    end: f64,
    distance: f64,
    length: u16,
    /// Accumulated link length (metres) of the chain below this node.
    weight: f32,
    next: Option<usize>,
}

/// Per-worker herringbone state.
#[derive(Debug, Default)]
pub(crate) struct BackboneScratch {
    nodes: Vec<Node>,
}

impl BackboneScratch {
    /// Longest backbone on the CCW side of `b0 → b1`, written to `out`.
    ///
    /// Returns the backbone's accumulated link length in metres.
    pub(crate) fn solve(
        &mut self,
        portals: &[PortalData],
        b0: &PortalData,
        b1: &PortalData,
        out: &mut Vec<PortalIndex>,
    ) -> f32 {
        out.clear();
        let base = DistanceQuery::new(&b0.point, &b1.point);
        self.nodes.clear();
        self.nodes.extend(
            portals
                .iter()
                .filter(|p| {
                    p.index != b0.index
                        && p.index != b1.index
                        && sign(&b0.point, &b1.point, &p.point)
                })
                .map(|p| Node {
                    index: p.index,
                    start: corner_angle(&b0.point, &b1.point, &p.point),
                    end: corner_angle(&b1.point, &b0.point, &p.point),
                    distance: base.chord_angle_sq(&p.point),
                    length: 1,
                    weight: 0.0,
                    next: None,
                }),
        );
        self.nodes
            .sort_unstable_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));

        let mut best: Option<usize> = None;
        for i in 0..self.nodes.len() {
            let (head, tail) = self.nodes.split_at_mut(i);
            let node = &mut tail[0];
            let at = &portals[node.index.get()].point;
            for (j, inner) in head.iter().enumerate() {
                if inner.start >= node.start || inner.end >= node.end {
                    continue;
                }
                let length = inner.length + 1;
                let weight = inner.weight + distance_meters(at, &portals[inner.index.get()].point) as f32;
                if length > node.length || (length == node.length && weight < node.weight) {
                    node.length = length;
                    node.weight = weight;
                    node.next = Some(j);
                }
            }
            let node = &self.nodes[i];
            if best.is_none_or(|b| {
                let b = &self.nodes[b];
                node.length > b.length || (node.length == b.length && node.weight < b.weight)
            }) {
                best = Some(i);
            }
        }

        let Some(first) = best else {
            return 0.0;
        };
        let weight = self.nodes[first].weight;
        let mut at = Some(first);
        while let Some(i) = at {
            out.push(self.nodes[i].index);
            at = self.nodes[i].next;
        }
        weight
    }
}

/// True when `later` should replace `current` (longer, or as long and lighter).
pub(crate) fn is_better(length: usize, weight: f32, current: Option<(usize, f32)>) -> bool {
    match current {
        None => true,
        Some((l, w)) => length > l || (length == l && weight < w),
    }
}

pub(crate) fn check_fixed_base(fixed: &[PortalIndex], num_portals: usize) -> Result<(), PatternError> {
    if fixed.len() > 2 {
        return Err(PatternError::InvalidOption(format!(
            "at most 2 fixed base portals, got {}",
            fixed.len()
        )));
    }
    check_indices(fixed, num_portals)
}

/// Longest herringbone over any ordered base pair.
pub fn largest_herringbone(
    portals: &[Portal],
    cfg: &HerringboneCfg,
    progress: &mut (dyn FnMut(u32, u32) + Send),
) -> Result<Herringbone, PatternError> {
    let data = prepare_portals(portals, 2)?;
    check_fixed_base(&cfg.fixed_base, data.len())?;
    let fixed = cfg.fixed_base.as_slice();
    let n = data.len();
    let bases = move || {
        (0..n)
            .flat_map(move |i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .filter(move |&(i, j)| fixed.iter().all(|f| f.get() == i || f.get() == j))
    };

    let mut ticker = ProgressTicker::new(bases().count(), progress);
    let pool: BufferPool<Vec<PortalIndex>> = BufferPool::new();
    let mut best: Option<(usize, f32)> = None;
    let mut result = Herringbone {
        b0: PortalIndex::INVALID,
        b1: PortalIndex::INVALID,
        backbone: Vec::new(),
    };
    let data_ref = data.as_slice();
    run_pool(
        cfg.num_workers,
        bases(),
        &pool,
        BackboneScratch::default,
        |scratch, (i, j), out| {
            let weight = scratch.solve(data_ref, &data_ref[i], &data_ref[j], out);
            (i, j, weight)
        },
        |(i, j, weight), backbone| {
            ticker.tick();
            if is_better(backbone.len(), weight, best) {
                best = Some((backbone.len(), weight));
                result.b0 = data_ref[i].index;
                result.b1 = data_ref[j].index;
                std::mem::swap(&mut result.backbone, backbone);
                debug!(b0 = i, b1 = j, length = result.backbone.len(), "herringbone improved");
            }
        },
    );
    ticker.finish();
    info!(backbone = result.backbone.len(), "herringbone");
    Ok(result)
}
