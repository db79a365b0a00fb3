//! Flip fields: a backbone polyline plus the portals visible from all of it.
//!
//! For a backbone `b_0 .. b_{m-1}` (CCW variant) a portal `p` is a flip portal
//! iff `sign(b_i, b_{i+1}, p)` for every edge and `sign(b_0, b_i, p)` for every
//! `i ≥ 1`. The CW variant mirrors every predicate. The score is
//! `min(|F|, max_flip_portals) · (2m - 1)`; equal scores prefer the shorter
//! backbone.
//!
//! Search
//! - Every ordered root pair `(p0, p1)` in both orientations is one request.
//! - Greedy growth: try every portal at every backbone position (prepend,
//!   insert, append), keep the extension with the best score, repeat until the
//!   backbone is full or (under `LessEqual`) nothing improves.
//! - Flip sets only shrink, so a root is abandoned once its bound
//!   `min(|F|, max_flip) · (2 · max_backbone - 1)` drops below the best score
//!   any worker has reached.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use crate::error::PatternError;
use crate::geom::{distance_meters, sign, Point};
use crate::parallel::{default_num_workers, run_pool, BufferPool};
use crate::portal::{prepare_portals, Portal, PortalData, PortalIndex};
use crate::progress::ProgressTicker;

/// How the backbone length bound applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PortalLimit {
    /// Only backbones of exactly `max_backbone_portals` qualify.
    #[default]
    Equal,
    /// Any backbone up to `max_backbone_portals`.
    LessEqual,
}

#[derive(Clone, Debug)]
pub struct FlipFieldCfg {
    pub max_backbone_portals: usize,
    pub num_portal_limit: PortalLimit,
    /// Cap on the flip portals counted (and returned); 0 means no cap.
    pub max_flip_portals: usize,
    /// Require the backbone to sweep monotonically around its first portal.
    pub simple_backbone: bool,
    pub num_workers: usize,
}

impl Default for FlipFieldCfg {
    fn default() -> Self {
        Self {
            max_backbone_portals: 16,
            num_portal_limit: PortalLimit::Equal,
            max_flip_portals: 0,
            simple_backbone: false,
            num_workers: default_num_workers(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlipField {
    pub backbone: Vec<PortalIndex>,
    pub flip_portals: Vec<PortalIndex>,
}

#[derive(Clone, Copy, Debug)]
struct Limits {
    max_backbone: usize,
    max_flips: usize,
    kind: PortalLimit,
    simple: bool,
}

impl Limits {
    fn score(&self, flips: usize, backbone: usize) -> u64 {
        flips.min(self.max_flips) as u64 * (2 * backbone as u64 - 1)
    }

    fn bound(&self, flips: usize) -> u64 {
        self.score(flips, self.max_backbone)
    }
}

/// Score plus backbone length in metres; larger score, then shorter backbone wins.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Rating {
    score: u64,
    arc: f64,
}

impl Rating {
    fn beats(&self, other: &Rating) -> bool {
        self.score > other.score || (self.score == other.score && self.arc < other.arc)
    }
}

#[derive(Clone, Copy, Debug)]
struct Extension {
    portal: PortalData,
    at: usize,
    rating: Rating,
}

#[derive(Debug, Default)]
struct FlipScratch {
    backbone: Vec<PortalData>,
    flips: Vec<PortalData>,
}

/// One root orientation: `side` is `sign` for CCW and mirrored for CW.
struct Orientation {
    ccw: bool,
}

impl Orientation {
    #[inline]
    fn side(&self, a: &Point, b: &Point, p: &Point) -> bool {
        if self.ccw {
            sign(a, b, p)
        } else {
            sign(b, a, p)
        }
    }

    /// Whether flip portal `p` stays valid once `x` is placed at position `at`.
    fn keeps(&self, backbone: &[PortalData], x: &Point, at: usize, p: &Point) -> bool {
        let m = backbone.len();
        if at == 0 {
            return backbone.iter().all(|b| self.side(x, &b.point, p));
        }
        let first = &backbone[0].point;
        let prev = &backbone[at - 1].point;
        if !self.side(prev, x, p) || !self.side(first, x, p) {
            return false;
        }
        at == m || self.side(x, &backbone[at].point, p)
    }

    /// `!side(b_0, b_{i-1}, b_i)` for every `i ≥ 2` of the extended backbone.
    fn simple_after(&self, backbone: &[PortalData], x: &PortalData, at: usize) -> bool {
        let mut seq = backbone[..at]
            .iter()
            .chain(std::iter::once(x))
            .chain(backbone[at..].iter());
        let (Some(first), Some(mut prev)) = (seq.next(), seq.next()) else {
            return true;
        };
        for b in seq {
            if self.side(&first.point, &prev.point, &b.point) {
                return false;
            }
            prev = b;
        }
        true
    }
}

fn arc_delta(backbone: &[PortalData], x: &Point, at: usize) -> f64 {
    let m = backbone.len();
    let d = |a: &PortalData| distance_meters(&a.point, x);
    if at == 0 {
        d(&backbone[0])
    } else if at == m {
        d(&backbone[m - 1])
    } else {
        d(&backbone[at - 1]) + d(&backbone[at])
            - distance_meters(&backbone[at - 1].point, &backbone[at].point)
    }
}

impl FlipScratch {
    /// Greedy flip field grown from `(p0, p1)`; `None` when the root does not qualify.
    fn grow(
        &mut self,
        portals: &[PortalData],
        root: (&PortalData, &PortalData),
        orientation: &Orientation,
        limits: &Limits,
        best_known: &AtomicU64,
        out: &mut FlipField,
    ) -> Option<Rating> {
        let (p0, p1) = root;
        self.backbone.clear();
        self.backbone.extend([*p0, *p1]);
        self.flips.clear();
        self.flips.extend(portals.iter().filter(|p| {
            p.index != p0.index
                && p.index != p1.index
                && orientation.side(&p0.point, &p1.point, &p.point)
        }));
        let mut rating = Rating {
            score: limits.score(self.flips.len(), 2),
            arc: distance_meters(&p0.point, &p1.point),
        };

        while self.backbone.len() < limits.max_backbone {
            if limits.bound(self.flips.len()) < best_known.load(Ordering::Relaxed) {
                return None;
            }
            let Some(ext) = self.best_extension(portals, orientation, limits, rating.arc) else {
                break;
            };
            if limits.kind == PortalLimit::LessEqual && !ext.rating.beats(&rating) {
                break;
            }
            let x = ext.portal;
            let backbone = &self.backbone;
            self.flips.retain(|p| {
                p.index != x.index && orientation.keeps(backbone, &x.point, ext.at, &p.point)
            });
            self.backbone.insert(ext.at, x);
            rating = ext.rating;
        }

        if limits.kind == PortalLimit::Equal && self.backbone.len() != limits.max_backbone {
            return None;
        }
        best_known.fetch_max(rating.score, Ordering::Relaxed);
        out.backbone.clear();
        out.backbone.extend(self.backbone.iter().map(|p| p.index));
        out.flip_portals.clear();
        out.flip_portals.extend(self.flips.iter().map(|p| p.index));
        out.flip_portals.sort_unstable();
        out.flip_portals.truncate(limits.max_flips);
        Some(rating)
    }

    fn best_extension(
        &self,
        portals: &[PortalData],
        orientation: &Orientation,
        limits: &Limits,
        arc: f64,
    ) -> Option<Extension> {
        let m = self.backbone.len();
        let mut best: Option<Extension> = None;
        for x in portals {
            if self.backbone.iter().any(|b| b.index == x.index) {
                continue;
            }
            for at in 0..=m {
                if limits.simple && !orientation.simple_after(&self.backbone, x, at) {
                    continue;
                }
                let flips = self
                    .flips
                    .iter()
                    .filter(|p| {
                        p.index != x.index
                            && orientation.keeps(&self.backbone, &x.point, at, &p.point)
                    })
                    .count();
                let rating = Rating {
                    score: limits.score(flips, m + 1),
                    arc: arc + arc_delta(&self.backbone, &x.point, at),
                };
                if best.is_none_or(|b| rating.beats(&b.rating)) {
                    best = Some(Extension {
                        portal: *x,
                        at,
                        rating,
                    });
                }
            }
        }
        best
    }
}

/// Best flip field over all roots.
pub fn largest_flip_field(
    portals: &[Portal],
    cfg: &FlipFieldCfg,
    progress: &mut (dyn FnMut(u32, u32) + Send),
) -> Result<FlipField, PatternError> {
    if cfg.max_backbone_portals < 2 {
        return Err(PatternError::InvalidOption(format!(
            "max_backbone_portals must be at least 2, got {}",
            cfg.max_backbone_portals
        )));
    }
    let data = prepare_portals(portals, 3)?;
    if cfg.num_portal_limit == PortalLimit::Equal && data.len() < cfg.max_backbone_portals {
        return Err(PatternError::TooFewPortals {
            needed: cfg.max_backbone_portals,
            got: data.len(),
        });
    }
    let limits = Limits {
        max_backbone: cfg.max_backbone_portals,
        max_flips: if cfg.max_flip_portals == 0 {
            usize::MAX
        } else {
            cfg.max_flip_portals
        },
        kind: cfg.num_portal_limit,
        simple: cfg.simple_backbone,
    };
    let n = data.len();
    let roots = (0..n)
        .flat_map(move |i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
        .flat_map(|(i, j)| [(i, j, true), (i, j, false)]);

    let mut ticker = ProgressTicker::new(2 * n * (n - 1), progress);
    let pool: BufferPool<FlipField> = BufferPool::new();
    let best_known = AtomicU64::new(0);
    let mut best: Option<Rating> = None;
    let mut result = FlipField::default();
    let data_ref = data.as_slice();
    run_pool(
        cfg.num_workers,
        roots,
        &pool,
        FlipScratch::default,
        |scratch, (i, j, ccw), out| {
            let orientation = Orientation { ccw };
            scratch.grow(
                data_ref,
                (&data_ref[i], &data_ref[j]),
                &orientation,
                &limits,
                &best_known,
                out,
            )
        },
        |rating, field| {
            ticker.tick();
            let Some(rating) = rating else {
                return;
            };
            if best.is_none_or(|b| rating.beats(&b)) {
                best = Some(rating);
                std::mem::swap(&mut result, field);
                debug!(
                    score = rating.score,
                    backbone = result.backbone.len(),
                    flips = result.flip_portals.len(),
                    "flip field improved"
                );
            }
        },
    );
    ticker.finish();
    info!(
        backbone = result.backbone.len(),
        flips = result.flip_portals.len(),
        "flip field"
    );
    Ok(result)
}
