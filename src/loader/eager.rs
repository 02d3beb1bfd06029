//! Eager strategy: every frame requested upfront, in index order.
//!
//! No earlier milestone exists, so "ready" coincides with "fully loaded":
//! both fire on the settle that completes the sequence, ready first.

use crate::index_list::{FrameIdx, IndexList};
use crate::frame::Frame;

use super::{FramesLoader, LoaderCore, LoadingStats, PumpMilestones};

pub struct EagerLoader {
    core: LoaderCore,
}

impl EagerLoader {
    pub(crate) fn new(mut core: LoaderCore) -> Self {
        for idx in 0..core.frames_count() {
            core.request(idx);
        }
        Self { core }
    }
}

impl FramesLoader for EagerLoader {
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
            if self.core.stats().processed == self.core.frames_count() {
                milestones.ready |= self.core.fire_ready();
            }
            milestones.fully_loaded |= self.core.latch_fully_loaded();
        }
        milestones
    }

    fn notify_frame_changed(&mut self, _idx: FrameIdx) {}

    fn is_fully_loaded(&self) -> bool {
        self.core.is_fully_loaded()
    }

    fn destroy(&mut self) {
        self.core.destroy();
    }
}
