/// Scroll-driven incremental rendering
///
/// The grid never builds every tile at once. It materializes a prefix of the
/// query result, one batch at a time, whenever the user has scrolled past a
/// threshold. Checks are debounced and at most one is ever pending.
///
/// Time is always passed in, so the state machine is deterministic.
use std::ops::Range;
use std::time::{Duration, Instant};

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing scheduled
    Idle,
    /// A check fires once `due` has passed
    CheckPending { due: Instant },
}

#[derive(Debug, Clone)]
pub struct RenderScheduler {
    batch_size: usize,
    /// Scroll fraction that must be exceeded before loading more
    threshold: f32,
    debounce: Duration,
    total: usize,
    rendered: usize,
    /// Bottom edge of the viewport as a fraction of the content height
    scroll: f32,
    columns: usize,
    phase: Phase,
}

impl RenderScheduler {
    pub fn new(batch_size: usize, threshold: f32, debounce: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            threshold: threshold.clamp(0.0, 1.0),
            debounce,
            total: 0,
            rendered: 0,
            scroll: 0.0,
            columns: 1,
            phase: Phase::Idle,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Length of the materialized prefix
    pub fn rendered_count(&self) -> usize {
        self.rendered
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_check_pending(&self) -> bool {
        matches!(self.phase, Phase::CheckPending { .. })
    }

    pub fn scroll_fraction(&self) -> f32 {
        self.scroll
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn is_complete(&self) -> bool {
        self.rendered >= self.total
    }

    /// Drop the materialized prefix for a new list of `total` items and
    /// jump back to the top. Nothing is materialized until `load_batch`.
    pub fn reset(&mut self, total: usize) {
        self.total = total;
        self.rendered = 0;
        self.scroll = 0.0;
        self.phase = Phase::Idle;
    }

    /// Reset and immediately materialize the first batch
    pub fn restart(&mut self, total: usize) -> Range<usize> {
        self.reset(total);
        self.load_batch()
    }

    /// Materialize the next batch. Returns the newly covered range,
    /// which is empty once everything is rendered.
    pub fn load_batch(&mut self) -> Range<usize> {
        let start = self.rendered;
        let end = (start + self.batch_size).min(self.total);
        self.rendered = end;
        start..end
    }

    /// New scroll position from the viewport
    pub fn on_scroll(&mut self, fraction: f32, now: Instant) {
        self.scroll = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.request_check(now);
    }

    /// Schedule a debounced check unless one is already pending or there is
    /// nothing left. Returns true if a check was scheduled by this call.
    pub fn request_check(&mut self, now: Instant) -> bool {
        if self.is_check_pending() || self.is_complete() {
            return false;
        }
        self.phase = Phase::CheckPending {
            due: now + self.debounce,
        };
        true
    }

    /// Drive the state machine. An idle scheduler schedules a check; a due
    /// check either loads a batch (and chains another check) or goes idle.
    pub fn poll(&mut self, now: Instant) -> Range<usize> {
        let empty = self.rendered..self.rendered;
        match self.phase {
            Phase::Idle => {
                self.request_check(now);
                empty
            }
            Phase::CheckPending { due } if now >= due => {
                self.phase = Phase::Idle;
                if self.scroll > self.threshold && !self.is_complete() {
                    let batch = self.load_batch();
                    // Keep going while the user is still near the bottom
                    self.request_check(now);
                    batch
                } else {
                    empty
                }
            }
            Phase::CheckPending { .. } => empty,
        }
    }

    /// Update the column count. Returns true if the layout changed, in which
    /// case the caller restarts rendering; otherwise tiles just re-flow.
    pub fn set_columns(&mut self, columns: usize) -> bool {
        let columns = columns.max(1);
        if columns == self.columns {
            return false;
        }
        self.columns = columns;
        true
    }

    /// How many tiles of `tile_width` (plus a gap on each side) fit in `width`
    pub fn columns_for_width(width: f32, tile_width: f32, gap: f32) -> usize {
        let slot = tile_width + 2.0 * gap;
        if slot <= 0.0 || !width.is_finite() {
            return 1;
        }
        ((width / slot).floor() as usize).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_millis(50);

    fn scheduler(total: usize) -> RenderScheduler {
        let mut s = RenderScheduler::new(24, 0.6, DEBOUNCE);
        s.reset(total);
        s
    }

    #[test]
    fn test_reset_starts_from_zero() {
        let mut s = scheduler(100);
        assert_eq!(s.rendered_count(), 0);
        assert_eq!(s.load_batch(), 0..24);

        s.on_scroll(0.9, Instant::now());
        s.reset(10);
        assert_eq!(s.rendered_count(), 0);
        assert_eq!(s.scroll_fraction(), 0.0);
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.restart(10), 0..10);
    }

    #[test]
    fn test_check_waits_for_debounce() {
        let t0 = Instant::now();
        let mut s = scheduler(100);
        s.load_batch();

        s.on_scroll(0.9, t0);
        assert!(s.is_check_pending());
        assert!(s.poll(t0 + Duration::from_millis(10)).is_empty());
        assert_eq!(s.rendered_count(), 24);

        assert_eq!(s.poll(t0 + DEBOUNCE), 24..48);
        assert_eq!(s.rendered_count(), 48);
    }

    #[test]
    fn test_checks_coalesce() {
        let t0 = Instant::now();
        let mut s = scheduler(100);
        s.load_batch();

        s.on_scroll(0.7, t0);
        s.on_scroll(0.8, t0 + Duration::from_millis(40));
        // Still the first deadline, not pushed back by the second event
        assert_eq!(s.phase(), Phase::CheckPending { due: t0 + DEBOUNCE });
        assert!(!s.request_check(t0 + Duration::from_millis(45)));
        assert_eq!(s.scroll_fraction(), 0.8);
    }

    #[test]
    fn test_below_threshold_goes_idle() {
        let t0 = Instant::now();
        let mut s = scheduler(100);
        s.load_batch();

        s.on_scroll(0.6, t0);
        assert!(s.poll(t0 + DEBOUNCE).is_empty());
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.rendered_count(), 24);
    }

    #[test]
    fn test_chained_checks_load_to_the_end() {
        let mut now = Instant::now();
        let mut s = scheduler(60);
        s.load_batch();
        s.on_scroll(1.0, now);

        let mut batches = Vec::new();
        for _ in 0..10 {
            now += DEBOUNCE;
            let batch = s.poll(now);
            if !batch.is_empty() {
                batches.push(batch);
            }
        }
        assert_eq!(batches, vec![24..48, 48..60]);
        assert_eq!(s.rendered_count(), 60);
        assert!(s.is_complete());
        // Nothing left, so nothing gets scheduled
        assert!(!s.request_check(now));
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn test_rendered_count_is_monotonic_and_bounded() {
        let mut now = Instant::now();
        let mut s = scheduler(50);
        s.load_batch();
        let mut last = s.rendered_count();

        let fractions = [0.1, 0.9, 0.3, 1.0, 0.65, 0.0, 0.99, 0.99, 0.99];
        for fraction in fractions {
            s.on_scroll(fraction, now);
            now += DEBOUNCE;
            s.poll(now);
            assert!(s.rendered_count() >= last);
            assert!(s.rendered_count() <= s.total());
            last = s.rendered_count();
        }
        assert_eq!(last, 50);
    }

    #[test]
    fn test_idle_poll_schedules_a_check() {
        let t0 = Instant::now();
        let mut s = scheduler(30);
        s.load_batch();
        assert!(s.poll(t0).is_empty());
        assert!(s.is_check_pending());
    }

    #[test]
    fn test_scroll_fraction_is_sanitized() {
        let mut s = scheduler(30);
        s.on_scroll(f32::NAN, Instant::now());
        assert_eq!(s.scroll_fraction(), 0.0);
        s.on_scroll(3.0, Instant::now());
        assert_eq!(s.scroll_fraction(), 1.0);
    }

    #[test]
    fn test_columns() {
        assert_eq!(RenderScheduler::columns_for_width(1000.0, 330.0, 5.0), 2);
        assert_eq!(RenderScheduler::columns_for_width(100.0, 330.0, 5.0), 1);
        assert_eq!(RenderScheduler::columns_for_width(1400.0, 330.0, 5.0), 4);

        let mut s = scheduler(10);
        assert!(!s.set_columns(1));
        assert!(s.set_columns(3));
        assert!(!s.set_columns(3));
        assert_eq!(s.columns(), 3);
    }
}
