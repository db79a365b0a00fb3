//! Reachability and cheapest-route searches over the jump graph.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use crate::geom::distance_meters;
use crate::portal::PortalData;

use super::graph::DroneGraph;

/// Farthest reachable endpoint of one start.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Reach {
    pub start: usize,
    pub end: usize,
    pub distance_m: f64,
}

impl Reach {
    /// Farther wins; equal distances go to the smaller start, then the smaller end.
    pub(crate) fn beats(&self, other: &Reach) -> bool {
        self.distance_m > other.distance_m
            || (self.distance_m == other.distance_m && (self.start, self.end) < (other.start, other.end))
    }
}

/// Per-worker BFS state.
#[derive(Debug, Default)]
pub(crate) struct BfsScratch {
    queue: VecDeque<usize>,
    visited: Vec<bool>,
}

impl BfsScratch {
    /// Farthest portal (by great-circle distance) reachable from `start`.
    ///
    /// With a fixed `end` the search stops once it is dequeued and fails if it
    /// never is.
    pub(crate) fn farthest(
        &mut self,
        graph: &DroneGraph,
        portals: &[PortalData],
        start: usize,
        end: Option<usize>,
    ) -> Option<Reach> {
        self.visited.clear();
        self.visited.resize(graph.adjacency.len(), false);
        self.queue.clear();
        self.visited[start] = true;
        self.queue.push_back(start);
        let origin = &portals[start].point;
        let mut best = Reach {
            start,
            end: start,
            distance_m: 0.0,
        };
        while let Some(at) = self.queue.pop_front() {
            let distance_m = distance_meters(origin, &portals[at].point);
            if end == Some(at) {
                return Some(Reach {
                    start,
                    end: at,
                    distance_m,
                });
            }
            if distance_m > best.distance_m || (distance_m == best.distance_m && at < best.end) {
                best = Reach {
                    start,
                    end: at,
                    distance_m,
                };
            }
            for n in &graph.adjacency[at] {
                if !self.visited[n.index] {
                    self.visited[n.index] = true;
                    self.queue.push_back(n.index);
                }
            }
        }
        match end {
            Some(_) => None,
            None => Some(best),
        }
    }
}

/// Route with its key and jump counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Route {
    pub portals: Vec<usize>,
    pub keys: u32,
    pub jumps: u32,
}

impl Route {
    /// Comparison key: `(keys, jumps)` when keys are optimized, else jumps alone.
    pub(crate) fn cost(&self, optimize_keys: bool) -> (u32, u32) {
        if optimize_keys {
            (self.keys, self.jumps)
        } else {
            (self.jumps, 0)
        }
    }
}

/// Lexicographically cheapest route from `start` to `end`.
pub(crate) fn cheapest_route(
    graph: &DroneGraph,
    start: usize,
    end: usize,
    optimize_keys: bool,
) -> Option<Route> {
    let n = graph.adjacency.len();
    let mut cost: Vec<Option<(u32, u32)>> = vec![None; n];
    let mut previous = vec![usize::MAX; n];
    let mut heap = BinaryHeap::new();
    cost[start] = Some((0, 0));
    heap.push(Reverse(((0u32, 0u32), start)));
    while let Some(Reverse((c, at))) = heap.pop() {
        if cost[at].is_some_and(|best| c > best) {
            continue;
        }
        if at == end {
            break;
        }
        for nb in &graph.adjacency[at] {
            let step = match (optimize_keys, nb.key_needed) {
                (true, key) => (u32::from(key), 1),
                (false, _) => (1, 0),
            };
            let next = (c.0 + step.0, c.1 + step.1);
            if cost[nb.index].is_none_or(|known| next < known) {
                cost[nb.index] = Some(next);
                previous[nb.index] = at;
                heap.push(Reverse((next, nb.index)));
            }
        }
    }
    if cost[end].is_none() {
        return None;
    }

    let mut portals = vec![end];
    let mut at = end;
    while at != start {
        at = previous[at];
        portals.push(at);
    }
    portals.reverse();
    let keys = portals
        .windows(2)
        .filter(|w| graph.edge(w[0], w[1]).is_some_and(|e| e.key_needed))
        .count() as u32;
    let jumps = portals.len() as u32 - 1;
    Some(Route {
        portals,
        keys,
        jumps,
    })
}
