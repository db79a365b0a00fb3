//! DrawTools JSON output.
//!
//! The layout is consumed verbatim by the IITC draw-tools plugin, so objects
//! are written by hand: fixed key order, no whitespace, six decimals.

use std::fmt::Write as _;

use portal_patterns::{
    DoubleHerringbone, DroneFlight, FlipField, Herringbone, HomogeneousField, LatLng, Portal,
    PortalIndex, ThreeCornerField,
};

const COLOR: &str = "#a24ac3";

#[derive(Debug, Default)]
pub struct DrawTools {
    objects: Vec<String>,
}

fn write_lat_lng(out: &mut String, ll: LatLng) {
    let _ = write!(out, "{{\"lat\":{:.6},\"lng\":{:.6}}}", ll.lat, ll.lng);
}

impl DrawTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn polyline(&mut self, points: impl IntoIterator<Item = LatLng>) {
        let mut obj = String::from("{\"type\":\"polyline\",\"latLngs\":[");
        for (i, ll) in points.into_iter().enumerate() {
            if i > 0 {
                obj.push(',');
            }
            write_lat_lng(&mut obj, ll);
        }
        let _ = write!(obj, "],\"color\":\"{COLOR}\"}}");
        self.objects.push(obj);
    }

    pub fn marker(&mut self, ll: LatLng) {
        let mut obj = String::from("{\"type\":\"marker\",\"latLng\":");
        write_lat_lng(&mut obj, ll);
        let _ = write!(obj, ",\"color\":\"{COLOR}\"}}");
        self.objects.push(obj);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn to_json(&self) -> String {
        format!("[{}]", self.objects.join(","))
    }
}

/// Indexed lookup of portal locations for the renderers below.
struct Locate<'a>(&'a [Portal]);

impl Locate<'_> {
    fn at(&self, i: PortalIndex) -> LatLng {
        self.0[i.get()].lat_lng
    }

    fn path(&self, path: &[PortalIndex]) -> Vec<LatLng> {
        path.iter().map(|&i| self.at(i)).collect()
    }
}

/// Each portal after the third links to its two predecessors; drawn as a
/// single zig-zag path.
pub fn cobweb(portals: &[Portal], cobweb: &[PortalIndex]) -> DrawTools {
    let loc = Locate(portals);
    let mut dt = DrawTools::new();
    if cobweb.len() < 3 {
        return dt;
    }
    let mut path = vec![cobweb[1], cobweb[0], cobweb[2], cobweb[1]];
    for k in 3..cobweb.len() {
        path.push(cobweb[k]);
        path.push(cobweb[k - 1]);
    }
    dt.polyline(loc.path(&path));
    dt
}

fn herringbone_side(
    dt: &mut DrawTools,
    loc: &Locate,
    b0: PortalIndex,
    b1: PortalIndex,
    backbone: &[PortalIndex],
) {
    if !backbone.is_empty() {
        dt.polyline(loc.path(backbone));
    }
    for &p in backbone {
        dt.polyline([loc.at(b0), loc.at(p), loc.at(b1)]);
    }
}

pub fn herringbone(portals: &[Portal], hb: &Herringbone) -> DrawTools {
    let loc = Locate(portals);
    let mut dt = DrawTools::new();
    dt.polyline([loc.at(hb.b0), loc.at(hb.b1)]);
    herringbone_side(&mut dt, &loc, hb.b0, hb.b1, &hb.backbone);
    dt
}

pub fn double_herringbone(portals: &[Portal], hb: &DoubleHerringbone) -> DrawTools {
    let loc = Locate(portals);
    let mut dt = DrawTools::new();
    dt.polyline([loc.at(hb.b0), loc.at(hb.b1)]);
    herringbone_side(&mut dt, &loc, hb.b0, hb.b1, &hb.ccw);
    herringbone_side(&mut dt, &loc, hb.b0, hb.b1, &hb.cw);
    dt
}

/// Root triangle, then every midpoint linked to the corners of its triangle.
/// `field.portals` holds the root corners followed by the midpoints in preorder.
pub fn homogeneous(portals: &[Portal], field: &HomogeneousField) -> DrawTools {
    fn walk(
        dt: &mut DrawTools,
        loc: &Locate,
        rest: &mut std::slice::Iter<'_, PortalIndex>,
        t: [PortalIndex; 3],
        depth: u16,
    ) {
        if depth <= 1 {
            return;
        }
        let Some(&m) = rest.next() else { return };
        dt.polyline([loc.at(t[0]), loc.at(m), loc.at(t[1])]);
        dt.polyline([loc.at(m), loc.at(t[2])]);
        walk(dt, loc, rest, [m, t[1], t[2]], depth - 1);
        walk(dt, loc, rest, [t[0], m, t[2]], depth - 1);
        walk(dt, loc, rest, [t[0], t[1], m], depth - 1);
    }

    let loc = Locate(portals);
    let mut dt = DrawTools::new();
    if field.portals.len() < 3 {
        return dt;
    }
    let root = [field.portals[0], field.portals[1], field.portals[2]];
    dt.polyline(loc.path(&[root[0], root[1], root[2], root[0]]));
    let mut rest = field.portals[3..].iter();
    walk(&mut dt, &loc, &mut rest, root, field.depth);
    dt
}

/// `lists` are the three colour lists the field was computed over.
pub fn three_corners(lists: [&[Portal]; 3], field: &ThreeCornerField) -> DrawTools {
    let mut dt = DrawTools::new();
    if field.portals.len() < 3 {
        return dt;
    }
    let at = |c: &portal_patterns::ColoredIndex| lists[c.color as usize][c.index.get()].lat_lng;
    let mut corners = [at(&field.portals[0]), at(&field.portals[1]), at(&field.portals[2])];
    dt.polyline([corners[0], corners[1], corners[2], corners[0]]);
    for pick in &field.portals[3..] {
        let p = at(pick);
        let own = pick.color as usize;
        let (a, b) = ((own + 1) % 3, (own + 2) % 3);
        dt.polyline([corners[a], p, corners[b]]);
        dt.polyline([p, corners[own]]);
        corners[own] = p;
    }
    dt
}

/// Backbone path, then every flip portal linked to both backbone ends.
pub fn flip_field(portals: &[Portal], field: &FlipField) -> DrawTools {
    let loc = Locate(portals);
    let mut dt = DrawTools::new();
    let (Some(&first), Some(&last)) = (field.backbone.first(), field.backbone.last()) else {
        return dt;
    };
    dt.polyline(loc.path(&field.backbone));
    for &p in &field.flip_portals {
        dt.polyline([loc.at(first), loc.at(p), loc.at(last)]);
    }
    dt
}

/// Route path plus a marker on every portal whose key a long jump needs.
pub fn drone_flight(portals: &[Portal], flight: &DroneFlight) -> DrawTools {
    let loc = Locate(portals);
    let mut dt = DrawTools::new();
    if flight.route.len() >= 2 {
        dt.polyline(loc.path(&flight.route));
    }
    for &k in &flight.keys_needed {
        dt.marker(loc.at(k));
    }
    dt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portal(i: usize, lat: f64, lng: f64) -> Portal {
        Portal::new(format!("g{i}"), format!("p{i}"), LatLng::new(lat, lng))
    }

    fn idx(v: &[u16]) -> Vec<PortalIndex> {
        v.iter().map(|&i| PortalIndex(i)).collect()
    }

    #[test]
    fn layout_is_byte_exact() {
        let mut dt = DrawTools::new();
        dt.polyline([LatLng::new(52.5, 13.25), LatLng::new(-1.0, 0.1234567)]);
        dt.marker(LatLng::new(1.0, 2.0));
        assert_eq!(
            dt.to_json(),
            "[{\"type\":\"polyline\",\"latLngs\":[{\"lat\":52.500000,\"lng\":13.250000},\
             {\"lat\":-1.000000,\"lng\":0.123457}],\"color\":\"#a24ac3\"},\
             {\"type\":\"marker\",\"latLng\":{\"lat\":1.000000,\"lng\":2.000000},\"color\":\"#a24ac3\"}]"
        );
        assert_eq!(DrawTools::new().to_json(), "[]");
    }

    #[test]
    fn cobweb_path_covers_every_link() {
        let portals: Vec<Portal> = (0..5).map(|i| portal(i, i as f64 * 0.001, 0.0)).collect();
        let dt = cobweb(&portals, &idx(&[0, 1, 2, 3, 4]));
        assert_eq!(dt.len(), 1);
        let json = dt.to_json();
        // 1,0,2,1 + (3,2) + (4,3) = 8 points.
        assert_eq!(json.matches("\"lat\"").count(), 8);
    }

    #[test]
    fn homogeneous_draws_two_polylines_per_midpoint() {
        let portals: Vec<Portal> = (0..4).map(|i| portal(i, 0.0, i as f64 * 0.001)).collect();
        let field = HomogeneousField {
            depth: 2,
            portals: idx(&[0, 1, 2, 3]),
        };
        assert_eq!(homogeneous(&portals, &field).len(), 3);
    }

    #[test]
    fn drone_flight_marks_keys() {
        let portals: Vec<Portal> = (0..3).map(|i| portal(i, 0.0, i as f64 * 0.001)).collect();
        let flight = DroneFlight {
            route: idx(&[0, 1, 2]),
            keys_needed: idx(&[2]),
            distance_m: 222.0,
        };
        let dt = drone_flight(&portals, &flight);
        assert_eq!(dt.len(), 2);
        assert!(dt.to_json().contains("\"type\":\"marker\",\"latLng\":{\"lat\":0.000000,\"lng\":0.002000}"));
    }
}
