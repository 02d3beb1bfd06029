//! Lazy-windowed strategy: a bounded neighborhood around the playhead.
//!
//! Only `2*range+1` indices around the pivot are requested, interleaved
//! outward (`p, p+1, p-1, p+2, ...`) and wrapping circularly inside the
//! `[min, max]` bounds fixed at construction. Every current-index change
//! re-centers the window; frames already requested are memoized and only
//! re-announced, never refetched.

use log::debug;
use std::collections::HashSet;

use crate::frame::Frame;
use crate::index_list::{FrameIdx, IndexList};

use super::{FramesLoader, LoaderCore, LoadingStats, PumpMilestones};

/// Window of `2*range+1` indices expanding outward from `pivot`, right step
/// first, wrapping circularly into `[min, max]`.
///
/// An overflow of `n` past `max` lands on `min + (n-1)`; underflow below
/// `min` mirrors onto `max`. With a range wider than the span, values
/// repeat — the window length is fixed regardless.
pub fn ranged_bounded_indexes(
    pivot: FrameIdx,
    range: usize,
    min: FrameIdx,
    max: FrameIdx,
) -> Vec<FrameIdx> {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    let span = (max - min + 1) as i64;
    let wrap = |v: i64| -> FrameIdx { min + (v - min as i64).rem_euclid(span) as FrameIdx };

    let pivot = pivot as i64;
    let mut indexes = Vec::with_capacity(2 * range + 1);
    indexes.push(wrap(pivot));
    for step in 1..=range as i64 {
        indexes.push(wrap(pivot + step));
        indexes.push(wrap(pivot - step));
    }
    indexes
}

pub struct LazyLoader {
    core: LoaderCore,
    range: usize,
    min: FrameIdx,
    max: FrameIdx,
    /// Frames of the initial window still unsettled; ready fires when empty.
    initial_pending: HashSet<FrameIdx>,
}

impl LazyLoader {
    pub(crate) fn new(
        core: LoaderCore,
        range: usize,
        start: FrameIdx,
        min: FrameIdx,
        max: FrameIdx,
    ) -> Self {
        let mut loader = Self {
            core,
            range,
            min,
            max,
            initial_pending: HashSet::new(),
        };
        let requested = loader.load_window(start);
        loader.initial_pending = requested;
        loader
    }

    /// Request the window around `pivot`; memoized members are
    /// re-announced instead. Returns the newly requested indices.
    fn load_window(&mut self, pivot: FrameIdx) -> HashSet<FrameIdx> {
        let mut requested = HashSet::new();
        for idx in ranged_bounded_indexes(pivot, self.range, self.min, self.max) {
            // Bounds can exceed the sequence; such indices are skipped
            // entirely (and never gate readiness).
            if idx >= self.core.frames_count() {
                continue;
            }
            if self.core.request(idx) {
                requested.insert(idx);
            } else if !self.core.is_destroyed() {
                self.core.reprocess(idx);
            }
        }
        requested
    }
}

impl FramesLoader for LazyLoader {
    fn stats(&self) -> LoadingStats {
        self.core.stats()
    }

    fn frames_count(&self) -> usize {
        self.core.frames_count()
    }

    fn frames(&self) -> &[Option<Frame>] {
        self.core.frames()
    }

    fn frame(&self, idx: FrameIdx) -> Option<Frame> {
        self.core.frame(idx)
    }

    fn loaded_frames(&self) -> &IndexList {
        self.core.loaded_frames()
    }

    fn pump(&mut self) -> PumpMilestones {
        let mut milestones = PumpMilestones::default();
        while let Some(idx) = self.core.try_recv_settled() {
            self.core.apply_settle(idx);
            self.initial_pending.remove(&idx);
            if self.initial_pending.is_empty() {
                milestones.ready |= self.core.fire_ready();
            }
            milestones.fully_loaded |= self.core.latch_fully_loaded();
        }
        milestones
    }

    fn notify_frame_changed(&mut self, idx: FrameIdx) {
        if self.core.is_destroyed() {
            return;
        }
        debug!("Lazy window re-centering on frame {}", idx);
        self.load_window(idx);
    }

    fn is_fully_loaded(&self) -> bool {
        self.core.is_fully_loaded()
    }

    fn destroy(&mut self) {
        self.initial_pending.clear();
        self.core.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{drive, Counters, TestSource};
    use super::super::{FramesLoader, Loader, LoaderCore};
    use super::*;
    use crate::workers::Workers;
    use std::sync::Arc;

    fn lazy(
        frames_count: usize,
        range: usize,
        start: FrameIdx,
        source: Arc<TestSource>,
        callbacks: super::super::FrameCallbacks,
    ) -> Loader {
        let core = LoaderCore::new(frames_count, source, Arc::new(Workers::new(2)), callbacks);
        Loader::Lazy(LazyLoader::new(
            core,
            range,
            start,
            0,
            frames_count - 1,
        ))
    }

    #[test]
    fn window_interleaves_outward() {
        let window = ranged_bounded_indexes(100, 10, 50, 300);
        assert_eq!(window.len(), 21);
        assert_eq!(&window[..5], &[100, 101, 99, 102, 98]);
        assert!(window.iter().all(|&i| (50..=300).contains(&i)));
    }

    #[test]
    fn window_wraps_at_max() {
        // Overflow of n past max lands on min + (n - 1).
        assert_eq!(ranged_bounded_indexes(9, 2, 0, 9), vec![9, 0, 8, 1, 7]);
    }

    #[test]
    fn window_wraps_at_min() {
        assert_eq!(ranged_bounded_indexes(0, 2, 0, 9), vec![0, 1, 9, 2, 8]);
    }

    #[test]
    fn window_has_fixed_length_with_narrow_bounds() {
        // Range wider than the span: values repeat, length stays 2r+1.
        let window = ranged_bounded_indexes(5, 4, 4, 6);
        assert_eq!(window.len(), 9);
        assert!(window.iter().all(|&i| (4..=6).contains(&i)));
    }

    #[test]
    fn ready_after_initial_window_fully_fires_later() {
        let source = Arc::new(TestSource::new());
        let counters = Counters::default();
        let mut loader = lazy(9, 1, 4, Arc::clone(&source), counters.callbacks());

        // Initial window is [4, 5, 3].
        let milestones = drive(&mut loader, |l| l.stats().processed >= 3);
        assert!(milestones.ready);
        assert!(!milestones.fully_loaded);
        assert_eq!(counters.ready.get(), 1);
        let mut fetched = source.fetched();
        fetched.sort_unstable();
        assert_eq!(fetched, vec![3, 4, 5]);

        // Walk the playhead across the sequence; windows cover everything.
        for idx in 0..9 {
            loader.notify_frame_changed(idx);
        }
        let milestones = drive(&mut loader, |l| l.is_fully_loaded());
        assert!(milestones.fully_loaded);
        assert_eq!(counters.ready.get(), 1);
        assert_eq!(counters.fully.get(), 1);
        assert_eq!(loader.stats().processed, 9);
    }

    #[test]
    fn recentering_memoizes_existing_frames() {
        let source = Arc::new(TestSource::new());
        let counters = Counters::default();
        let mut loader = lazy(9, 1, 4, Arc::clone(&source), counters.callbacks());
        drive(&mut loader, |l| l.stats().processed >= 3);
        assert_eq!(counters.process.get(), 3);

        // Same pivot: all members memoized, re-announced with frozen stats.
        loader.notify_frame_changed(4);
        assert_eq!(source.fetched().len(), 3);
        assert_eq!(counters.process.get(), 6);
        assert_eq!(loader.stats().processed, 3);

        // Shifted pivot: the one new member is fetched, the rest memoized.
        loader.notify_frame_changed(5);
        drive(&mut loader, |l| l.stats().processed >= 4);
        let mut fetched = source.fetched();
        fetched.sort_unstable();
        assert_eq!(fetched, vec![3, 4, 5, 6]);
    }

    #[test]
    fn failed_window_frames_still_gate_ready() {
        let source = Arc::new(TestSource::failing([3, 4]));
        let counters = Counters::default();
        let mut loader = lazy(9, 1, 4, source, counters.callbacks());

        let milestones = drive(&mut loader, |l| l.stats().processed >= 3);
        assert!(milestones.ready);
        assert_eq!(loader.stats().failed, 2);
        assert_eq!(loader.loaded_frames().get(), &[5]);
    }
}
