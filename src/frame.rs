//! Single frame resource: status machine plus decoded pixels
//!
//! **Why**: A frame is settled by a worker thread while the owning strategy
//! and the player read it, so all mutable state sits behind one mutex in a
//! cheaply clonable handle.
//!
//! **Used by**: Loading strategies (creation, bookkeeping), worker jobs
//! (settling), SequencePlayer (render lookup).

use image::RgbaImage;
use std::sync::{Arc, Mutex};

use crate::index_list::FrameIdx;

/// Load status. A frame begins `Loading` the moment it exists and settles
/// exactly once to `Loaded` or `Failed`; it is never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug)]
struct FrameData {
    status: FrameStatus,
    image: Option<Arc<RgbaImage>>,
    error: Option<String>,
}

/// Shared handle to one frame of the sequence.
#[derive(Debug, Clone)]
pub struct Frame {
    idx: FrameIdx,
    data: Arc<Mutex<FrameData>>,
}

impl Frame {
    /// Create a frame in the `Loading` state. The caller is expected to
    /// schedule the fetch that will settle it.
    pub fn new(idx: FrameIdx) -> Self {
        Self {
            idx,
            data: Arc::new(Mutex::new(FrameData {
                status: FrameStatus::Loading,
                image: None,
                error: None,
            })),
        }
    }

    pub fn idx(&self) -> FrameIdx {
        self.idx
    }

    pub fn status(&self) -> FrameStatus {
        self.data.lock().unwrap().status
    }

    pub fn is_loaded(&self) -> bool {
        self.status() == FrameStatus::Loaded
    }

    /// Decoded pixels, present only once the frame is `Loaded`.
    pub fn image(&self) -> Option<Arc<RgbaImage>> {
        self.data.lock().unwrap().image.clone()
    }

    /// Failure text, present only once the frame is `Failed`.
    pub fn error(&self) -> Option<String> {
        self.data.lock().unwrap().error.clone()
    }

    /// Settle as loaded. Only the first settle wins; later calls are ignored.
    pub fn settle_loaded(&self, image: RgbaImage) {
        let mut data = self.data.lock().unwrap();
        if data.status != FrameStatus::Loading {
            return;
        }
        data.image = Some(Arc::new(image));
        data.status = FrameStatus::Loaded;
    }

    /// Settle as failed with the error text. Only the first settle wins.
    pub fn settle_failed(&self, error: impl Into<String>) {
        let mut data = self.data.lock().unwrap();
        if data.status != FrameStatus::Loading {
            return;
        }
        data.error = Some(error.into());
        data.status = FrameStatus::Failed;
    }
}
