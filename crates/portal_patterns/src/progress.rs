//! Progress reporting: a plain `(done, total)` callback.
//!
//! Engines report roughly once per `max(total / 1000, 2)` units and once on
//! completion. The callback must not block; animation is the caller's business.

/// Callback that ignores progress.
pub fn no_progress(_done: u32, _total: u32) {}

/// Throttles a progress callback to about a thousand calls per run.
pub struct ProgressTicker<'a> {
    callback: &'a mut dyn FnMut(u32, u32),
    total: u32,
    done: u32,
    step: u32,
    next_report: u32,
}

impl<'a> ProgressTicker<'a> {
    pub fn new(total: usize, callback: &'a mut dyn FnMut(u32, u32)) -> Self {
        let total = u32::try_from(total).unwrap_or(u32::MAX);
        let step = (total / 1000).max(2);
        callback(0, total);
        Self {
            callback,
            total,
            done: 0,
            step,
            next_report: step,
        }
    }

    #[inline]
    pub fn tick(&mut self) {
        self.advance(1);
    }

    pub fn advance(&mut self, units: u32) {
        self.done = self.done.saturating_add(units).min(self.total);
        if self.done >= self.next_report {
            (self.callback)(self.done, self.total);
            self.next_report = self.done.saturating_add(self.step);
        }
    }

    pub fn finish(self) {
        (self.callback)(self.total, self.total);
    }
}
