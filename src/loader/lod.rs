//! Level-of-detail progressive strategy: coarse-to-fine sequential passes.
//!
//! The start frame loads first; then each pass requests `{0} ∪ {multiples
//! of step}`, with step beginning at `level` (default: `frames_count - 1`,
//! first and last only) and halving until it reaches 1. Passes are strictly
//! sequential — the next begins only after every resource the previous one
//! created has settled. Ready fires when the first (coarsest) pass
//! completes, long before the full pyramid does.

use std::collections::HashSet;

use crate::frame::Frame;
use crate::index_list::{FrameIdx, IndexList};

use super::{FramesLoader, LoaderCore, LoadingStats, PumpMilestones};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LodPhase {
    /// Waiting for the start frame.
    Start,
    /// Waiting for the pass at this step to settle.
    Pass { step: usize },
    Done,
}

pub struct LodLoader {
    core: LoaderCore,
    /// Initial (coarsest) pass step, >= 1.
    level: usize,
    phase: LodPhase,
    /// Resources the current phase created and is waiting on.
    pending: HashSet<FrameIdx>,
}

impl LodLoader {
    pub(crate) fn new(mut core: LoaderCore, start: FrameIdx, level: Option<usize>) -> Self {
        let level = level
            .filter(|&l| l >= 1)
            .unwrap_or_else(|| core.frames_count().saturating_sub(1))
            .max(1);

        let mut pending = HashSet::new();
        if core.request(start) {
            pending.insert(start);
        }
        let mut loader = Self {
            core,
            level,
            phase: LodPhase::Start,
            pending,
        };
        // A zero-length or already-satisfied start cascades straight into
        // the passes.
        if loader.pending.is_empty() {
            let mut unused = PumpMilestones::default();
            loader.advance_phase(&mut unused);
        }
        loader
    }

    /// Indices of one pass: frame 0 plus every multiple of `step`.
    fn pass_indexes(step: usize, frames_count: usize) -> impl Iterator<Item = FrameIdx> {
        (0..frames_count).step_by(step.max(1))
    }

    /// The current phase's pending set drained: begin the next pass.
    /// Passes whose members are all memoized complete immediately and
    /// cascade to the one after.
    fn advance_phase(&mut self, milestones: &mut PumpMilestones) {
        loop {
            let next_step = match self.phase {
                LodPhase::Start => Some(self.level),
                LodPhase::Pass { step } => {
                    if step == self.level {
                        milestones.ready |= self.core.fire_ready();
                    }
                    let half = step / 2;
                    (half >= 1).then_some(half)
                }
                LodPhase::Done => None,
            };
            let Some(step) = next_step else {
                self.phase = LodPhase::Done;
                return;
            };

            self.phase = LodPhase::Pass { step };
            for idx in Self::pass_indexes(step, self.core.frames_count()) {
                if self.core.request(idx) {
                    self.pending.insert(idx);
                }
            }
            if !self.pending.is_empty() {
                return;
            }
        }
    }
}

impl FramesLoader for LodLoader {
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
            if self.pending.remove(&idx) && self.pending.is_empty() {
                self.advance_phase(&mut milestones);
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
        self.pending.clear();
        self.phase = LodPhase::Done;
        self.core.destroy();
    }
}
