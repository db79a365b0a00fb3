//! Level-16 cube-face cells for bucketing portals by neighbourhood.
//!
//! Points are projected onto the face of the enclosing cube with the largest
//! coordinate, mapped to `(u, v)` on that face and through the quadratic
//! `uv → st` transform onto a `2^16 × 2^16` grid, so cells are about 150 m
//! across. Lines of constant `u` or `v` are great circles, hence cell edges are
//! geodesic segments.

use std::collections::{HashSet, VecDeque};

use crate::geom::{meters_to_chord_sq, DistanceQuery, Point};

pub(crate) const CELL_LEVEL: u32 = 16;
const CELLS_PER_SIDE: i32 = 1 << CELL_LEVEL;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct CellId {
    face: u8,
    i: i32,
    j: i32,
}

fn face_of(p: &Point) -> u8 {
    let (ax, ay, az) = (p.x.abs(), p.y.abs(), p.z.abs());
    if ax >= ay && ax >= az {
        if p.x >= 0.0 {
            0
        } else {
            3
        }
    } else if ay >= az {
        if p.y >= 0.0 {
            1
        } else {
            4
        }
    } else if p.z >= 0.0 {
        2
    } else {
        5
    }
}

fn xyz_to_uv(face: u8, p: &Point) -> (f64, f64) {
    match face {
        0 => (p.y / p.x, p.z / p.x),
        1 => (-p.x / p.y, p.z / p.y),
        2 => (-p.x / p.z, -p.y / p.z),
        3 => (p.z / p.x, p.y / p.x),
        4 => (p.z / p.y, -p.x / p.y),
        _ => (-p.y / p.z, -p.x / p.z),
    }
}

fn uv_to_xyz(face: u8, u: f64, v: f64) -> Point {
    match face {
        0 => Point::new(1.0, u, v),
        1 => Point::new(-u, 1.0, v),
        2 => Point::new(-u, -v, 1.0),
        3 => Point::new(-1.0, -v, -u),
        4 => Point::new(v, -1.0, -u),
        _ => Point::new(v, u, -1.0),
    }
}

fn uv_to_st(u: f64) -> f64 {
    if u >= 0.0 {
        0.5 * (1.0 + 3.0 * u).sqrt()
    } else {
        1.0 - 0.5 * (1.0 - 3.0 * u).sqrt()
    }
}

fn st_to_uv(s: f64) -> f64 {
    if s >= 0.5 {
        (4.0 * s * s - 1.0) / 3.0
    } else {
        (1.0 - 4.0 * (1.0 - s) * (1.0 - s)) / 3.0
    }
}

fn st_to_ij(s: f64) -> i32 {
    ((s * f64::from(CELLS_PER_SIDE)).floor() as i32).clamp(0, CELLS_PER_SIDE - 1)
}

impl CellId {
    pub(crate) fn from_point(p: &Point) -> Self {
        let face = face_of(p);
        let (u, v) = xyz_to_uv(face, p);
        Self {
            face,
            i: st_to_ij(uv_to_st(u)),
            j: st_to_ij(uv_to_st(v)),
        }
    }

    /// Point at grid offset `(di, dj)` from the cell's lower corner, in cell units.
    ///
    /// Offsets outside the cell (even outside the face) stay on the face plane.
    fn point_at(&self, di: f64, dj: f64) -> Point {
        let side = f64::from(CELLS_PER_SIDE);
        let s = (f64::from(self.i) + di) / side;
        let t = (f64::from(self.j) + dj) / side;
        uv_to_xyz(self.face, st_to_uv(s), st_to_uv(t)).normalize()
    }

    pub(crate) fn vertices(&self) -> [Point; 4] {
        [
            self.point_at(0.0, 0.0),
            self.point_at(1.0, 0.0),
            self.point_at(1.0, 1.0),
            self.point_at(0.0, 1.0),
        ]
    }

    /// The eight surrounding cells, across face boundaries where needed.
    pub(crate) fn neighbors(&self) -> impl Iterator<Item = CellId> + '_ {
        [(-1, -1), (-1, 0), (-1, 1), (0, -1), (0, 1), (1, -1), (1, 0), (1, 1)]
            .into_iter()
            .map(|(di, dj): (i32, i32)| {
                CellId::from_point(&self.point_at(f64::from(di) + 0.5, f64::from(dj) + 0.5))
            })
    }

    /// Whether any part of the cell lies within chord distance² `chord_sq` of `center`.
    pub(crate) fn intersects_cap(&self, center: &Point, chord_sq: f64) -> bool {
        if CellId::from_point(center) == *self {
            return true;
        }
        let v = self.vertices();
        (0..4).any(|k| DistanceQuery::new(&v[k], &v[(k + 1) % 4]).chord_angle_sq(center) <= chord_sq)
    }
}

/// Cells intersecting the cap of `radius_m` metres around `center` (flood fill).
pub(crate) fn cap_covering(center: &Point, radius_m: f64) -> Vec<CellId> {
    let chord_sq = meters_to_chord_sq(radius_m);
    let start = CellId::from_point(center);
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    let mut covering = Vec::new();
    while let Some(cell) = queue.pop_front() {
        covering.push(cell);
        for next in cell.neighbors() {
            if seen.insert(next) && next.intersects_cap(center, chord_sq) {
                queue.push_back(next);
            }
        }
    }
    covering
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{distance_meters, LatLng};

    #[test]
    fn st_and_uv_are_inverse() {
        for u in [-1.0, -0.4, 0.0, 0.3, 1.0] {
            assert!((st_to_uv(uv_to_st(u)) - u).abs() < 1e-12);
        }
    }

    #[test]
    fn points_map_into_their_own_cell() {
        for (lat, lng) in [(0.0, 0.0), (45.0, 7.0), (-33.9, 151.2), (89.0, -120.0), (10.0, 179.99)] {
            let p = LatLng::new(lat, lng).to_point();
            let cell = CellId::from_point(&p);
            let v = cell.vertices();
            let size = distance_meters(&v[0], &v[2]);
            assert!(size > 50.0 && size < 400.0, "cell diagonal {size}");
            assert!(cell.intersects_cap(&p, 0.0));
        }
    }

    #[test]
    fn neighbors_are_distinct_and_adjacent() {
        let p = LatLng::new(52.5, 13.4).to_point();
        let cell = CellId::from_point(&p);
        let around: HashSet<CellId> = cell.neighbors().collect();
        assert_eq!(around.len(), 8);
        assert!(!around.contains(&cell));
    }

    #[test]
    fn covering_crosses_face_boundaries() {
        // lng 45 is the boundary between faces 0 and 1 on the equator.
        let p = LatLng::new(0.0, 45.0 - 1e-5).to_point();
        let faces: HashSet<u8> = cap_covering(&p, 500.0).iter().map(|c| c.face).collect();
        assert_eq!(faces, HashSet::from([0, 1]));
    }

    #[test]
    fn covering_contains_every_nearby_point() {
        let center = LatLng::new(48.85, 2.35).to_point();
        let cells: HashSet<CellId> = cap_covering(&center, 500.0).into_iter().collect();
        for k in 0..64 {
            let a = f64::from(k) * std::f64::consts::TAU / 64.0;
            let p = LatLng::new(48.85 + 0.0044 * a.sin(), 2.35 + 0.0066 * a.cos()).to_point();
            if distance_meters(&center, &p) <= 500.0 {
                assert!(cells.contains(&CellId::from_point(&p)));
            }
        }
    }
}
