//! flipbook - Image sequence player engine
//!
//! A headless player for numbered image sequences: frames are fetched and
//! decoded on a worker pool under a pluggable loading strategy (eager,
//! lazy-windowed, or progressive level-of-detail), composited onto an owned
//! RGBA canvas with CSS-style object-fit/object-position placement, and
//! advanced by a tick-driven playback engine.

pub mod canvas;
pub mod cli;
pub mod config;
pub mod events;
pub mod frame;
pub mod index_list;
pub mod loader;
pub mod placement;
pub mod player;
pub mod source;
pub mod workers;

// Re-export the embedding surface
pub use canvas::Canvas;
pub use config::{LoaderConfig, PlaybackOptions, PlayerConfig, RenderOptions, RenderOverrides, Strategy};
pub use events::{PlayerEvent, PlayerEventSender};
pub use frame::{Frame, FrameStatus};
pub use index_list::{FrameIdx, IndexList};
pub use loader::{FrameCallbacks, FramesLoader, Loader, LoadingStats};
pub use placement::{ObjectFit, ObjectPlacement, Placement};
pub use player::{PlayerError, SequencePlayer};
pub use source::{FrameSource, PatternSource, SourceError};
pub use workers::Workers;
