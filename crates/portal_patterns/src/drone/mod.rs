//! Drone flight: the longest tour a drone can fly by jumping between portals.
//!
//! Purpose
//! - Short jumps (≤ 500 m) are free; long jumps (≤ 1250 m, only with
//!   `use_long_jumps`) need a key to the destination portal.
//! - Phase 1 runs a BFS from every candidate start on the worker pool and keeps
//!   the `(start, end)` pair farthest apart by great-circle distance.
//! - Phase 2 finds the cheapest route between them: fewest keys, then fewest
//!   jumps (or fewest jumps only).
//!
//! A fixed end without a fixed start is searched on the reversed graph with the
//! endpoints swapped; the route is flipped back before it is returned.
//!
//! Code cross-refs: `cells` (neighbourhood buckets), `graph`, `search`.

mod cells;
mod graph;
mod search;

use tracing::{debug, info};

use crate::error::PatternError;
use crate::geom::distance_meters;
use crate::parallel::{default_num_workers, run_pool, BufferPool};
use crate::portal::{check_indices, prepare_portals, Portal, PortalIndex};
use crate::progress::ProgressTicker;

use graph::DroneGraph;
use search::{cheapest_route, BfsScratch, Reach};

pub use graph::{LONG_JUMP_METERS, SHORT_JUMP_METERS};

#[derive(Clone, Debug)]
pub struct DroneFlightCfg {
    pub start: Option<PortalIndex>,
    pub end: Option<PortalIndex>,
    pub use_long_jumps: bool,
    /// Minimize keys before jumps; otherwise jumps only.
    pub optimize_num_keys: bool,
    pub num_workers: usize,
}

impl Default for DroneFlightCfg {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            use_long_jumps: false,
            optimize_num_keys: true,
            num_workers: default_num_workers(),
        }
    }
}

/// A flight route, the portals whose keys its long jumps need and its span.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DroneFlight {
    pub route: Vec<PortalIndex>,
    /// Destinations of long jumps, in route order.
    pub keys_needed: Vec<PortalIndex>,
    /// Great-circle distance between the first and last portal of the route.
    pub distance_m: f64,
}

/// Longest drone flight, honouring a fixed start and/or end.
pub fn longest_drone_flight(
    portals: &[Portal],
    cfg: &DroneFlightCfg,
    progress: &mut (dyn FnMut(u32, u32) + Send),
) -> Result<DroneFlight, PatternError> {
    let data = prepare_portals(portals, 2)?;
    let pins: Vec<PortalIndex> = cfg.start.into_iter().chain(cfg.end).collect();
    check_indices(&pins, data.len())?;

    let forward = DroneGraph::build(&data, cfg.use_long_jumps);
    let reverse_search = cfg.start.is_none() && cfg.end.is_some();
    let reversed;
    let (graph, start, end) = if reverse_search {
        reversed = forward.reversed();
        (&reversed, cfg.end, cfg.start)
    } else {
        (&forward, cfg.start, cfg.end)
    };
    let starts: Vec<usize> = match start {
        Some(s) => vec![s.get()],
        None => (0..data.len()).collect(),
    };

    let mut ticker = ProgressTicker::new(starts.len(), progress);
    let pool: BufferPool<()> = BufferPool::new();
    let mut best: Option<Reach> = None;
    let data_ref = data.as_slice();
    let end_index = end.map(PortalIndex::get);
    run_pool(
        cfg.num_workers,
        starts,
        &pool,
        BfsScratch::default,
        |scratch, s, _| scratch.farthest(graph, data_ref, s, end_index),
        |reach, _| {
            ticker.tick();
            if let Some(reach) = reach {
                if best.is_none_or(|b| reach.beats(&b)) {
                    best = Some(reach);
                }
            }
        },
    );
    ticker.finish();

    let Some(reach) = best.filter(|r| r.start != r.end) else {
        info!("drone flight: no reachable endpoint");
        return Ok(DroneFlight::default());
    };
    debug!(start = reach.start, end = reach.end, distance_m = reach.distance_m, "farthest pair");

    let optimize = cfg.optimize_num_keys;
    let mut route = cheapest_route(graph, reach.start, reach.end, optimize);
    if start.is_none() {
        if let Some(back) = cheapest_route(graph, reach.end, reach.start, optimize) {
            if route.as_ref().is_none_or(|r| back.cost(optimize) < r.cost(optimize)) {
                route = Some(back);
            }
        }
    }
    let Some(route) = route else {
        return Ok(DroneFlight::default());
    };
    let mut path = route.portals;
    if reverse_search {
        path.reverse();
    }

    let keys_needed = path
        .windows(2)
        .filter(|w| forward.edge(w[0], w[1]).is_some_and(|e| e.key_needed))
        .map(|w| data[w[1]].index)
        .collect::<Vec<_>>();
    let distance_m = match (path.first(), path.last()) {
        (Some(&a), Some(&b)) => distance_meters(&data[a].point, &data[b].point),
        _ => 0.0,
    };
    let flight = DroneFlight {
        route: path.iter().map(|&i| data[i].index).collect(),
        keys_needed,
        distance_m,
    };
    info!(
        jumps = flight.route.len().saturating_sub(1),
        keys = flight.keys_needed.len(),
        distance_m = flight.distance_m,
        "drone flight"
    );
    Ok(flight)
}
