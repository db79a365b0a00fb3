//! Portal identity, compact indices and the unit-sphere view used by the engines.
//!
//! - `Portal`: external identity (guid, name) plus its location in degrees.
//! - `PortalIndex`: stable 16-bit position in the input slice; `u16::MAX` is reserved.
//! - `PortalData`: index plus unit-sphere point, the only form the engines see.

use std::collections::HashMap;

use tracing::debug;

use crate::error::PatternError;
use crate::geom::{enclosing_cap, LatLng, Point};

/// Position of a portal in the caller's portal slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortalIndex(pub u16);

impl PortalIndex {
    pub const INVALID: Self = Self(u16::MAX);
    /// Largest number of portals an engine accepts.
    pub const MAX_PORTALS: usize = u16::MAX as usize - 1;

    #[inline]
    pub fn get(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    /// Index for a position that is known to fit (callers validate counts up front).
    #[inline]
    pub(crate) fn from_usize(i: usize) -> Self {
        debug_assert!(i < Self::MAX_PORTALS + 1);
        Self(i as u16)
    }
}

/// A named, geo-located portal as loaded from input files.
#[derive(Clone, Debug, PartialEq)]
pub struct Portal {
    pub guid: String,
    pub name: String,
    pub lat_lng: LatLng,
}

impl Portal {
    pub fn new(guid: impl Into<String>, name: impl Into<String>, lat_lng: LatLng) -> Self {
        Self {
            guid: guid.into(),
            name: name.into(),
            lat_lng,
        }
    }
}

/// Engine-side view of a portal.
#[derive(Clone, Copy, Debug)]
pub struct PortalData {
    pub index: PortalIndex,
    pub point: Point,
}

/// Validate `portals` and convert them to unit-sphere points.
///
/// Rejects inputs with fewer than `min_portals` or more than 65534 portals, and
/// inputs spread over a cap of angular radius ≥ 1 rad.
pub fn prepare_portals(
    portals: &[Portal],
    min_portals: usize,
) -> Result<Vec<PortalData>, PatternError> {
    if portals.len() < min_portals {
        return Err(PatternError::TooFewPortals {
            needed: min_portals,
            got: portals.len(),
        });
    }
    if portals.len() > PortalIndex::MAX_PORTALS {
        return Err(PatternError::TooManyPortals { got: portals.len() });
    }
    let data: Vec<PortalData> = portals
        .iter()
        .enumerate()
        .map(|(i, p)| PortalData {
            index: PortalIndex::from_usize(i),
            point: p.lat_lng.to_point(),
        })
        .collect();
    if !data.is_empty() {
        let radius = enclosing_cap(data.iter().map(|p| p.point))
            .map(|(_, r)| r)
            .unwrap_or(std::f64::consts::PI);
        if radius >= 1.0 {
            return Err(PatternError::PortalsTooDistant { radius_rad: radius });
        }
        debug!(portals = data.len(), radius_rad = radius, "prepared portals");
    }
    Ok(data)
}

/// Check that every index refers to a portal of `portals`.
pub(crate) fn check_indices(indices: &[PortalIndex], num_portals: usize) -> Result<(), PatternError> {
    match indices.iter().find(|i| i.get() >= num_portals) {
        Some(bad) => Err(PatternError::InvalidPortalIndex { index: bad.get() }),
        None => Ok(()),
    }
}

/// Collapse repeated guids. Same guid with different coordinates is an error.
///
/// The first occurrence keeps its position; later duplicates are dropped.
pub fn merge_duplicate_portals(portals: Vec<Portal>) -> Result<Vec<Portal>, PatternError> {
    let mut seen: HashMap<String, LatLng> = HashMap::with_capacity(portals.len());
    let mut out = Vec::with_capacity(portals.len());
    for portal in portals {
        match seen.get(&portal.guid) {
            Some(existing) if *existing == portal.lat_lng => continue,
            Some(_) => return Err(PatternError::DuplicateGuid { guid: portal.guid }),
            None => {
                seen.insert(portal.guid.clone(), portal.lat_lng);
                out.push(portal);
            }
        }
    }
    Ok(out)
}

/// Parse a `"lat,lng"` pin as used on the command line.
pub fn parse_lat_lng(text: &str) -> Result<LatLng, PatternError> {
    let invalid = || PatternError::InvalidOption(format!("expected \"lat,lng\", got {text:?}"));
    let (lat, lng) = text.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(invalid());
    }
    Ok(LatLng::new(lat, lng))
}

/// Index of the portal located at `lat_lng` (within 1e-6 degrees).
pub fn find_portal_by_lat_lng(portals: &[Portal], lat_lng: LatLng) -> Option<PortalIndex> {
    const EPS_DEG: f64 = 1e-6;
    portals
        .iter()
        .position(|p| {
            (p.lat_lng.lat - lat_lng.lat).abs() <= EPS_DEG
                && (p.lat_lng.lng - lat_lng.lng).abs() <= EPS_DEG
        })
        .map(PortalIndex::from_usize)
}
