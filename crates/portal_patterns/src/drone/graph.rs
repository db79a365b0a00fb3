//! Directed jump graph between portals.
//!
//! `p → q` is a short jump when `q` is within 500 m of `p` and a long jump
//! (needs a key to `q`) when it is within 1250 m but not short. Neighbour
//! candidates come from the cells covering the jump cap around `p`.

use std::collections::HashMap;

use tracing::debug;

use crate::geom::distance_meters;
use crate::portal::PortalData;

use super::cells::{cap_covering, CellId};

pub const SHORT_JUMP_METERS: f64 = 500.0;
pub const LONG_JUMP_METERS: f64 = 1250.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Neighbor {
    pub index: usize,
    pub key_needed: bool,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct DroneGraph {
    pub adjacency: Vec<Vec<Neighbor>>,
}

impl DroneGraph {
    pub(crate) fn build(portals: &[PortalData], use_long_jumps: bool) -> Self {
        let mut by_cell: HashMap<CellId, Vec<usize>> = HashMap::new();
        for (i, p) in portals.iter().enumerate() {
            by_cell.entry(CellId::from_point(&p.point)).or_default().push(i);
        }
        let radius = if use_long_jumps {
            LONG_JUMP_METERS
        } else {
            SHORT_JUMP_METERS
        };
        let mut adjacency = Vec::with_capacity(portals.len());
        let mut edges = 0;
        for (i, p) in portals.iter().enumerate() {
            let mut neighbors = Vec::new();
            for cell in cap_covering(&p.point, radius) {
                for &j in by_cell.get(&cell).into_iter().flatten() {
                    if j == i {
                        continue;
                    }
                    let d = distance_meters(&p.point, &portals[j].point);
                    if d <= SHORT_JUMP_METERS {
                        neighbors.push(Neighbor {
                            index: j,
                            key_needed: false,
                        });
                    } else if use_long_jumps && d <= LONG_JUMP_METERS {
                        neighbors.push(Neighbor {
                            index: j,
                            key_needed: true,
                        });
                    }
                }
            }
            neighbors.sort_unstable_by_key(|n| n.index);
            edges += neighbors.len();
            adjacency.push(neighbors);
        }
        debug!(portals = portals.len(), edges, use_long_jumps, "drone graph");
        Self { adjacency }
    }

    /// Same graph with every edge flipped; the key flag stays with the edge.
    pub(crate) fn reversed(&self) -> Self {
        let mut adjacency = vec![Vec::new(); self.adjacency.len()];
        for (from, neighbors) in self.adjacency.iter().enumerate() {
            for n in neighbors {
                adjacency[n.index].push(Neighbor {
                    index: from,
                    key_needed: n.key_needed,
                });
            }
        }
        Self { adjacency }
    }

    pub(crate) fn edge(&self, from: usize, to: usize) -> Option<Neighbor> {
        self.adjacency[from].iter().copied().find(|n| n.index == to)
    }
}
