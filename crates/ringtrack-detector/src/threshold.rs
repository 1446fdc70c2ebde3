//! Binarization threshold search across consecutive failures.
//!
//! Failure `n` probes the threshold at the centre of cell `n - div` of a grid
//! with `div` cells over the per-channel range, `div` being the largest power
//! of two not above `n`. Probes therefore visit 1/2, 1/4, 3/4, 1/8, 3/8, ... of
//! the range, refining until the cell width drops to `min_step`, after which
//! the search starts over.

/// Threshold probed for a given failure count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Probe {
    /// Threshold on the three-channel sum.
    pub threshold: i32,
    /// Cell width per channel at this refinement level.
    pub step: i32,
}

/// Per-channel intensity range covered by the search.
const CHANNEL_RANGE: i32 = 256;

/// Threshold probe for failure count `n`.
pub fn probe(n: u32) -> Probe {
    let n = n.max(1);
    let div = 1u32 << (31 - n.leading_zeros());
    let step = (CHANNEL_RANGE / div as i32).max(1);
    let cell = (n - div) as i32;
    Probe {
        threshold: 3 * (step * cell + step / 2),
        step,
    }
}

/// Failure-driven threshold state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThresholdSchedule {
    threshold: i32,
    last_good: i32,
    failures: u32,
    max_failed: u32,
    min_step: i32,
}

impl ThresholdSchedule {
    pub fn new(initial: i32, max_failed: u32, min_step: i32) -> Self {
        Self {
            threshold: initial,
            last_good: initial,
            failures: 0,
            max_failed,
            min_step,
        }
    }

    /// Threshold to binarize the next frame with.
    #[inline]
    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    #[inline]
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Threshold of the last successful detection.
    #[inline]
    pub fn last_good(&self) -> i32 {
        self.last_good
    }

    /// A marker was found; continue from `threshold`.
    pub fn record_success(&mut self, threshold: i32) {
        self.threshold = threshold;
        self.last_good = threshold;
        self.failures = 0;
    }

    /// No marker this frame: advance the search.
    ///
    /// Below `max_failed` failures the schedule alternates between a fresh
    /// probe and the last good threshold, so a single bad frame does not lose
    /// a threshold that worked. Past that it probes on every failure and
    /// wraps once the refinement reaches `min_step`.
    pub fn record_failure(&mut self) {
        if self.failures < self.max_failed {
            let previous = self.failures;
            self.failures += 1;
            self.threshold = if previous % 2 == 0 {
                probe(self.failures).threshold
            } else {
                self.last_good
            };
        } else {
            self.failures += 1;
            let next = probe(self.failures);
            self.threshold = next.threshold;
            if next.step <= self.min_step {
                self.failures = 0;
            }
        }
    }

    /// Forget the search progress and go back to `initial`.
    pub fn reset(&mut self, initial: i32) {
        *self = Self::new(initial, self.max_failed, self.min_step);
    }
}
