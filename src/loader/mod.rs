//! Frame-loading strategies
//!
//! **Why**: Different embeddings want frames fetched in different orders —
//! everything upfront, a window around the playhead, or progressive
//! level-of-detail refinement. The three strategies sit behind one
//! `enum_dispatch` trait; each owns its frames table, loaded-index list and
//! stats, with no shared mutable base state.
//!
//! **Used by**: `SequencePlayer` (owns exactly one loader; pumps it every
//! tick and notifies it on every current-index change).
//!
//! # Pump model
//!
//! Fetch/decode runs on the worker pool; a settled frame's index arrives on
//! the completion channel. `pump()` drains that channel on the caller
//! thread and, per settle, applies bookkeeping in a fixed order: stats and
//! loaded-index update, then `on_frame_load` xor `on_frame_error`, then
//! `on_frame_process`, then strategy milestones (ready gates, pass
//! advance), then the fully-loaded latch. Observers therefore always see
//! aggregate state that already includes the frame they are notified about.
//!
//! Milestones are also returned from `pump()` so the owner can react (first
//! render, events) without routing callbacks back into itself.

use crossbeam_channel::{Receiver, Sender};
use enum_dispatch::enum_dispatch;
use log::{debug, warn};
use std::sync::Arc;

use crate::frame::Frame;
use crate::index_list::{FrameIdx, IndexList};
use crate::source::FrameSource;
use crate::workers::Workers;
use crate::config::LoaderConfig;

mod eager;
mod lazy;
mod lod;

pub use eager::EagerLoader;
pub use lazy::{ranged_bounded_indexes, LazyLoader};
pub use lod::LodLoader;

/// Aggregate load counters. Monotonically non-decreasing over a strategy's
/// lifetime; zeroed only by `destroy`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingStats {
    /// Frames settled either way.
    pub processed: usize,
    pub loaded: usize,
    pub failed: usize,
}

/// Per-frame and milestone callbacks, invoked on the pumping thread.
#[derive(Default)]
pub struct FrameCallbacks {
    /// Fires for every settle (after `on_frame_load`/`on_frame_error`),
    /// and again for memoized frames a lazy re-center touches.
    pub on_frame_process: Option<Box<dyn FnMut(&Frame, LoadingStats)>>,
    pub on_frame_load: Option<Box<dyn FnMut(&Frame, LoadingStats)>>,
    pub on_frame_error: Option<Box<dyn FnMut(&Frame, LoadingStats)>>,
    /// Fires at most once, at the strategy's ready milestone.
    pub on_ready: Option<Box<dyn FnMut()>>,
    /// Fires exactly once, when `processed` first reaches `frames_count`.
    pub on_fully_loaded: Option<Box<dyn FnMut()>>,
}

/// Milestones crossed during one `pump()` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpMilestones {
    pub ready: bool,
    pub fully_loaded: bool,
}

impl PumpMilestones {
    pub fn merge(&mut self, other: PumpMilestones) {
        self.ready |= other.ready;
        self.fully_loaded |= other.fully_loaded;
    }
}

/// Common contract of the three strategies.
#[enum_dispatch]
pub trait FramesLoader {
    fn stats(&self) -> LoadingStats;

    fn frames_count(&self) -> usize;

    /// Sparse frames table, index-addressed, populated on demand.
    fn frames(&self) -> &[Option<Frame>];

    fn frame(&self, idx: FrameIdx) -> Option<Frame>;

    /// Ascending indices of successfully loaded frames.
    fn loaded_frames(&self) -> &IndexList;

    /// Drain settled loads, run callbacks, advance strategy scheduling.
    fn pump(&mut self) -> PumpMilestones;

    /// External signal that the current frame index changed (the lazy
    /// strategy re-centers its window on it; others ignore it).
    fn notify_frame_changed(&mut self, idx: FrameIdx);

    fn is_fully_loaded(&self) -> bool;

    /// Drop the completion channel, clear frames and indices, zero stats.
    /// A destroyed loader is inert and must not be reused.
    fn destroy(&mut self);
}

/// Tagged union over the strategies, selected by `LoaderConfig::strategy`.
#[enum_dispatch(FramesLoader)]
pub enum Loader {
    Eager(EagerLoader),
    Lazy(LazyLoader),
    Lod(LodLoader),
}

impl Loader {
    /// Build the configured strategy. `start` seeds the lazy window pivot
    /// and the LOD first fetch; `min`/`max` bound the lazy window.
    pub fn new(
        config: &LoaderConfig,
        start: FrameIdx,
        min: FrameIdx,
        max: FrameIdx,
        source: Arc<dyn FrameSource>,
        workers: Arc<Workers>,
        callbacks: FrameCallbacks,
    ) -> Self {
        let core = LoaderCore::new(config.frames_count, source, workers, callbacks);
        match config.strategy {
            crate::config::Strategy::Eager => Loader::Eager(EagerLoader::new(core)),
            crate::config::Strategy::Lazy => Loader::Lazy(LazyLoader::new(
                core,
                config.frames_loading_range,
                start,
                min,
                max,
            )),
            crate::config::Strategy::Lod => {
                Loader::Lod(LodLoader::new(core, start, config.level))
            }
        }
    }
}

/// State shared by every strategy: the frames table, loaded-index list,
/// stats, callbacks, and the worker/completion plumbing.
pub(crate) struct LoaderCore {
    frames_count: usize,
    frames: Vec<Option<Frame>>,
    loaded_frames: IndexList,
    stats: LoadingStats,
    callbacks: FrameCallbacks,
    source: Arc<dyn FrameSource>,
    workers: Arc<Workers>,
    settle_tx: Option<Sender<FrameIdx>>,
    settle_rx: Option<Receiver<FrameIdx>>,
    ready_fired: bool,
    fully_loaded_fired: bool,
    destroyed: bool,
}

impl LoaderCore {
    fn new(
        frames_count: usize,
        source: Arc<dyn FrameSource>,
        workers: Arc<Workers>,
        callbacks: FrameCallbacks,
    ) -> Self {
        let (settle_tx, settle_rx) = crossbeam_channel::unbounded();
        Self {
            frames_count,
            frames: vec![None; frames_count],
            loaded_frames: IndexList::new(),
            stats: LoadingStats::default(),
            callbacks,
            source,
            workers,
            settle_tx: Some(settle_tx),
            settle_rx: Some(settle_rx),
            ready_fired: false,
            fully_loaded_fired: false,
            destroyed: false,
        }
    }

    pub(crate) fn frames_count(&self) -> usize {
        self.frames_count
    }

    pub(crate) fn stats(&self) -> LoadingStats {
        self.stats
    }

    pub(crate) fn frames(&self) -> &[Option<Frame>] {
        &self.frames
    }

    pub(crate) fn frame(&self, idx: FrameIdx) -> Option<Frame> {
        self.frames.get(idx).and_then(|f| f.clone())
    }

    pub(crate) fn loaded_frames(&self) -> &IndexList {
        &self.loaded_frames
    }

    pub(crate) fn is_fully_loaded(&self) -> bool {
        self.fully_loaded_fired
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Request the frame at `idx`. Memoized: an index with an existing
    /// resource is never fetched twice. Returns whether a fetch was issued.
    pub(crate) fn request(&mut self, idx: FrameIdx) -> bool {
        if self.destroyed {
            return false;
        }
        if idx >= self.frames_count {
            debug!("Skipping out-of-range frame request: {}", idx);
            return false;
        }
        if self.frames[idx].is_some() {
            return false;
        }
        let Some(tx) = self.settle_tx.clone() else {
            return false;
        };

        let frame = Frame::new(idx);
        self.frames[idx] = Some(frame.clone());

        let source = Arc::clone(&self.source);
        self.workers.execute(move || {
            match source.fetch(idx) {
                Ok(image) => frame.settle_loaded(image),
                Err(e) => {
                    warn!("Frame {} failed to load: {}", idx, e);
                    frame.settle_failed(e.to_string());
                }
            }
            // Receiver gone after destroy: the settle is silently dropped.
            let _ = tx.send(idx);
        });
        true
    }

    /// Next settled frame index, if any arrived.
    pub(crate) fn try_recv_settled(&mut self) -> Option<FrameIdx> {
        self.settle_rx.as_ref()?.try_recv().ok()
    }

    /// Apply one settle: stats and index-list update first, then the
    /// load/error callback, then the process callback.
    pub(crate) fn apply_settle(&mut self, idx: FrameIdx) {
        let Some(frame) = self.frame(idx) else {
            return;
        };

        self.stats.processed += 1;
        if frame.is_loaded() {
            self.stats.loaded += 1;
            self.loaded_frames.insert(idx);
            if let Some(cb) = &mut self.callbacks.on_frame_load {
                cb(&frame, self.stats);
            }
        } else {
            self.stats.failed += 1;
            if let Some(cb) = &mut self.callbacks.on_frame_error {
                cb(&frame, self.stats);
            }
        }
        if let Some(cb) = &mut self.callbacks.on_frame_process {
            cb(&frame, self.stats);
        }
    }

    /// Re-announce a memoized frame: `on_frame_process` with unchanged
    /// stats, no refetch.
    pub(crate) fn reprocess(&mut self, idx: FrameIdx) {
        let Some(frame) = self.frame(idx) else {
            return;
        };
        if let Some(cb) = &mut self.callbacks.on_frame_process {
            cb(&frame, self.stats);
        }
    }

    /// Fire `on_ready` if it has not fired yet.
    pub(crate) fn fire_ready(&mut self) -> bool {
        if self.ready_fired {
            return false;
        }
        self.ready_fired = true;
        if let Some(cb) = &mut self.callbacks.on_ready {
            cb();
        }
        true
    }

    /// Fire `on_fully_loaded` once `processed` reaches the frame count.
    /// Latched: memoized re-processing can never re-fire it.
    pub(crate) fn latch_fully_loaded(&mut self) -> bool {
        if self.fully_loaded_fired || self.stats.processed < self.frames_count {
            return false;
        }
        self.fully_loaded_fired = true;
        if let Some(cb) = &mut self.callbacks.on_fully_loaded {
            cb();
        }
        true
    }

    pub(crate) fn destroy(&mut self) {
        self.settle_tx = None;
        self.settle_rx = None;
        self.frames.clear();
        self.loaded_frames.clear();
        self.stats = LoadingStats::default();
        self.destroyed = true;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Strategy;
    use crate::source::SourceError;
    use image::RgbaImage;
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::rc::Rc;
    use std::sync::Mutex;
    use std::thread;
    use std::time::{Duration, Instant};

    /// In-memory source: records fetch order, fails configured indices.
    pub(crate) struct TestSource {
        fail: HashSet<FrameIdx>,
        fetched: Mutex<Vec<FrameIdx>>,
    }

    impl TestSource {
        pub(crate) fn new() -> Self {
            Self {
                fail: HashSet::new(),
                fetched: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing<I: IntoIterator<Item = FrameIdx>>(fail: I) -> Self {
            Self {
                fail: fail.into_iter().collect(),
                fetched: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn fetched(&self) -> Vec<FrameIdx> {
            self.fetched.lock().unwrap().clone()
        }
    }

    impl FrameSource for TestSource {
        fn fetch(&self, idx: FrameIdx) -> Result<RgbaImage, SourceError> {
            self.fetched.lock().unwrap().push(idx);
            if self.fail.contains(&idx) {
                Err(SourceError::Image(format!("synthetic failure at {}", idx)))
            } else {
                Ok(RgbaImage::from_pixel(
                    2,
                    2,
                    image::Rgba([idx as u8, 0, 0, 255]),
                ))
            }
        }
    }

    pub(crate) fn build(
        strategy: Strategy,
        frames_count: usize,
        start: FrameIdx,
        source: Arc<TestSource>,
        callbacks: FrameCallbacks,
    ) -> Loader {
        let config = LoaderConfig {
            strategy,
            frames_count,
            ..Default::default()
        };
        Loader::new(
            &config,
            start,
            0,
            frames_count.saturating_sub(1),
            source,
            Arc::new(Workers::new(2)),
            callbacks,
        )
    }

    /// Pump until the predicate holds, accumulating milestones.
    pub(crate) fn drive(loader: &mut Loader, pred: impl Fn(&Loader) -> bool) -> PumpMilestones {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut acc = PumpMilestones::default();
        loop {
            acc.merge(loader.pump());
            if pred(loader) {
                return acc;
            }
            assert!(Instant::now() < deadline, "loader did not settle in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[derive(Clone, Default)]
    pub(crate) struct Counters {
        pub process: Rc<Cell<usize>>,
        pub load: Rc<Cell<usize>>,
        pub error: Rc<Cell<usize>>,
        pub ready: Rc<Cell<usize>>,
        pub fully: Rc<Cell<usize>>,
    }

    impl Counters {
        pub(crate) fn callbacks(&self) -> FrameCallbacks {
            let process = Rc::clone(&self.process);
            let load = Rc::clone(&self.load);
            let error = Rc::clone(&self.error);
            let ready = Rc::clone(&self.ready);
            let fully = Rc::clone(&self.fully);
            FrameCallbacks {
                on_frame_process: Some(Box::new(move |_, _| process.set(process.get() + 1))),
                on_frame_load: Some(Box::new(move |_, _| load.set(load.get() + 1))),
                on_frame_error: Some(Box::new(move |_, _| error.set(error.get() + 1))),
                on_ready: Some(Box::new(move || ready.set(ready.get() + 1))),
                on_fully_loaded: Some(Box::new(move || fully.set(fully.get() + 1))),
            }
        }
    }

    #[test]
    fn fully_loaded_fires_once_under_fail_mix() {
        let source = Arc::new(TestSource::failing([1, 3, 5]));
        let counters = Counters::default();
        let mut loader = build(
            Strategy::Eager,
            8,
            0,
            Arc::clone(&source),
            counters.callbacks(),
        );

        let milestones = drive(&mut loader, |l| l.is_fully_loaded());
        assert!(milestones.fully_loaded);

        let stats = loader.stats();
        assert_eq!(stats.processed, 8);
        assert_eq!(stats.loaded, 5);
        assert_eq!(stats.failed, 3);
        assert_eq!(counters.fully.get(), 1);
        assert_eq!(counters.load.get(), 5);
        assert_eq!(counters.error.get(), 3);
        assert_eq!(counters.process.get(), 8);
        // Failed frames never enter the loaded set.
        assert_eq!(loader.loaded_frames().get(), &[0, 2, 4, 6, 7]);

        // Further pumps change nothing.
        let again = loader.pump();
        assert_eq!(again, PumpMilestones::default());
        assert_eq!(counters.fully.get(), 1);
    }

    #[test]
    fn callbacks_observe_updated_stats() {
        // Inside on_frame_load the stats must already count that frame.
        let consistent = Rc::new(Cell::new(true));
        let seen = Rc::clone(&consistent);
        let callbacks = FrameCallbacks {
            on_frame_load: Some(Box::new(move |frame, stats| {
                if stats.loaded == 0 || stats.processed < stats.loaded || !frame.is_loaded() {
                    seen.set(false);
                }
            })),
            ..Default::default()
        };
        let source = Arc::new(TestSource::new());
        let mut loader = build(Strategy::Eager, 6, 0, source, callbacks);
        drive(&mut loader, |l| l.is_fully_loaded());
        assert!(consistent.get());
    }

    #[test]
    fn destroy_clears_state_and_ignores_stale_settles() {
        let source = Arc::new(TestSource::new());
        let mut loader = build(Strategy::Eager, 16, 0, Arc::clone(&source), FrameCallbacks::default());

        loader.destroy();
        assert_eq!(loader.stats(), LoadingStats::default());
        assert!(loader.loaded_frames().is_empty());
        assert!(loader.frames().is_empty());
        assert!(loader.frame(0).is_none());

        // In-flight settles after destroy are dropped, not applied.
        thread::sleep(Duration::from_millis(20));
        assert_eq!(loader.pump(), PumpMilestones::default());
        assert_eq!(loader.stats(), LoadingStats::default());
    }
}
