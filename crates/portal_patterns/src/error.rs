use thiserror::Error;

/// Errors surfaced by the pattern engines.
///
/// All of them describe unusable input or options; the searches themselves
/// cannot fail once the portal set has been accepted.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("need at least {needed} portals, got {got}")]
    TooFewPortals { needed: usize, got: usize },

    #[error("too many portals: {got} (at most 65534 supported)")]
    TooManyPortals { got: usize },

    #[error("portals are too far apart: enclosing cap radius {radius_rad:.3} rad (must be < 1)")]
    PortalsTooDistant { radius_rad: f64 },

    #[error("portal {guid} appears twice with different coordinates")]
    DuplicateGuid { guid: String },

    #[error("portal index {index} is out of range")]
    InvalidPortalIndex { index: usize },

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("cannot allocate the solution table for {portals} portals")]
    TableTooLarge { portals: usize },

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
