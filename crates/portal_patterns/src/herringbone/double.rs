//! Double herringbone: independent backbones on both sides of one base.

use tracing::{debug, info};

use crate::error::PatternError;
use crate::parallel::{run_pool, BufferPool};
use crate::portal::{prepare_portals, Portal, PortalIndex};
use crate::progress::ProgressTicker;

use super::{check_fixed_base, is_better, BackboneScratch, HerringboneCfg};

/// Base `(b0, b1)` with the backbone left of `b0 → b1` (`ccw`) and the one right of it (`cw`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DoubleHerringbone {
    pub b0: PortalIndex,
    pub b1: PortalIndex,
    pub ccw: Vec<PortalIndex>,
    pub cw: Vec<PortalIndex>,
}

#[derive(Debug, Default)]
struct SidePair {
    ccw: Vec<PortalIndex>,
    cw: Vec<PortalIndex>,
}

/// Base maximizing the combined length of both backbones.
pub fn largest_double_herringbone(
    portals: &[Portal],
    cfg: &HerringboneCfg,
    progress: &mut (dyn FnMut(u32, u32) + Send),
) -> Result<DoubleHerringbone, PatternError> {
    let data = prepare_portals(portals, 2)?;
    check_fixed_base(&cfg.fixed_base, data.len())?;
    let fixed = cfg.fixed_base.as_slice();
    let n = data.len();
    let bases = move || {
        (0..n)
            .flat_map(move |i| ((i + 1)..n).map(move |j| (i, j)))
            .filter(move |&(i, j)| fixed.iter().all(|f| f.get() == i || f.get() == j))
    };

    let mut ticker = ProgressTicker::new(bases().count(), progress);
    let pool: BufferPool<SidePair> = BufferPool::new();
    let mut best: Option<(usize, f32)> = None;
    let mut result = DoubleHerringbone {
        b0: PortalIndex::INVALID,
        b1: PortalIndex::INVALID,
        ccw: Vec::new(),
        cw: Vec::new(),
    };
    let data_ref = data.as_slice();
    run_pool(
        cfg.num_workers,
        bases(),
        &pool,
        BackboneScratch::default,
        |scratch, (i, j), sides| {
            let (b0, b1) = (&data_ref[i], &data_ref[j]);
            let ccw = scratch.solve(data_ref, b0, b1, &mut sides.ccw);
            let cw = scratch.solve(data_ref, b1, b0, &mut sides.cw);
            (i, j, ccw + cw)
        },
        |(i, j, weight), sides| {
            ticker.tick();
            let length = sides.ccw.len() + sides.cw.len();
            if is_better(length, weight, best) {
                best = Some((length, weight));
                result.b0 = data_ref[i].index;
                result.b1 = data_ref[j].index;
                std::mem::swap(&mut result.ccw, &mut sides.ccw);
                std::mem::swap(&mut result.cw, &mut sides.cw);
                debug!(b0 = i, b1 = j, length, "double herringbone improved");
            }
        },
    );
    ticker.finish();
    info!(ccw = result.ccw.len(), cw = result.cw.len(), "double herringbone");
    Ok(result)
}
