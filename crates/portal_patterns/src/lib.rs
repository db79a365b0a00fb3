//! Maximum-score link patterns over geo-located portals.
//!
//! Every engine works on portals projected onto the unit sphere (`PortalData`)
//! and returns indices into the caller's portal slice.
//!
//! Layout
//! - `geom`: strict spherical predicates (CCW sign, triangle/wedge containment,
//!   segment distance, area, corner angles).
//! - `portal`, `partition`, `memo`: portal indexing, in-place partitioning and the
//!   flat `N³` memoization table shared by the subdivision engines.
//! - `cobweb`, `homogeneous`, `three_corners`: triangle-subdivision dynamic programs.
//! - `herringbone`, `flip_field`, `drone`: per-root searches run on the `parallel` harness.

pub mod cobweb;
pub mod drone;
pub mod error;
pub mod flip_field;
pub mod geom;
pub mod herringbone;
pub mod homogeneous;
pub mod memo;
pub mod parallel;
pub mod partition;
pub mod portal;
pub mod progress;
pub mod scorer;
pub mod three_corners;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use cobweb::{largest_cobweb, CobwebCfg};
pub use drone::{
    longest_drone_flight, DroneFlight, DroneFlightCfg, LONG_JUMP_METERS, SHORT_JUMP_METERS,
};
pub use error::PatternError;
pub use flip_field::{largest_flip_field, FlipField, FlipFieldCfg, PortalLimit};
pub use geom::{LatLng, Point, RADIANS_TO_METERS, UNIT_AREA_TO_SQUARE_METERS};
pub use herringbone::{
    largest_double_herringbone, largest_herringbone, DoubleHerringbone, Herringbone,
    HerringboneCfg,
};
pub use homogeneous::{deepest_homogeneous, HomogeneousCfg, HomogeneousField, HomogeneousMode};
pub use portal::{Portal, PortalData, PortalIndex};
pub use scorer::TriangleScorer;
pub use three_corners::{largest_three_corner, ColoredIndex, ThreeCornerField};

/// Common exports for callers driving the engines.
pub mod prelude {
    pub use crate::geom::{LatLng, Point};
    pub use crate::parallel::default_num_workers;
    pub use crate::portal::{find_portal_by_lat_lng, merge_duplicate_portals, Portal, PortalIndex};
    pub use crate::progress::no_progress;
    pub use crate::{
        deepest_homogeneous, largest_cobweb, largest_double_herringbone, largest_flip_field,
        largest_herringbone, largest_three_corner, longest_drone_flight, PatternError,
    };
}
