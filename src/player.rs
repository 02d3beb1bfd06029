//! Sequence player: playback loop, seeks, render orchestration
//!
//! **Why**: Ties the pieces together — owns the canvas and the loading
//! strategy, advances the current frame at the configured fps, resolves
//! which loaded frame to draw, and emits lifecycle events.
//!
//! **Used by**: The CLI binary and embedding applications.
//!
//! # Timing Model
//!
//! The host drives `tick()` at whatever cadence it likes (an animation
//! callback, a render loop, a test). Each tick pumps the loader and, while
//! playing, renders-then-advances at most once per `1/fps` seconds — a
//! frame-rate limiter, not an accumulator: ticks arriving faster are
//! skipped, never queued. `tick_at` takes an explicit clock for
//! deterministic tests.
//!
//! # Error Policy
//!
//! Expected runtime conditions (missing canvas, no loadable frame,
//! unparseable position, invalid bounds) are logged and skipped; the
//! public surface never panics for them.

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Instant;

use crate::canvas::Canvas;
use crate::config::{PlaybackOptions, PlayerConfig, RenderOptions, RenderOverrides, DEFAULT_FPS};
use crate::events::{PlayerEvent, PlayerEventSender};
use crate::frame::Frame;
use crate::index_list::FrameIdx;
use crate::loader::{FrameCallbacks, FramesLoader, Loader, LoadingStats};
use crate::placement::ObjectPlacement;
use crate::source::FrameSource;
use crate::workers::Workers;

/// Player construction errors.
#[derive(Debug)]
pub enum PlayerError {
    Config(String),
}

impl std::fmt::Display for PlayerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerError::Config(e) => write!(f, "Config error: {}", e),
        }
    }
}

impl std::error::Error for PlayerError {}

/// Resolved playback state; merged-into by `play()` options.
#[derive(Debug, Clone, Copy)]
struct Playback {
    fps: f32,
    looped: bool,
    reverse: bool,
    min: FrameIdx,
    max: FrameIdx,
}

pub struct SequencePlayer {
    canvas: Option<Canvas>,
    loader: Option<Loader>,
    placement: ObjectPlacement,
    playback: Playback,
    render_opts: RenderOptions,
    frames_count: usize,
    current_frame_idx: FrameIdx,
    last_rendered_idx: Option<FrameIdx>,
    playing: bool,
    last_tick: Option<Instant>,
    events: PlayerEventSender,
}

impl SequencePlayer {
    /// Build a player: resolves playback defaults, seeds the placement
    /// container from the canvas, and starts the configured strategy.
    pub fn new(
        config: PlayerConfig,
        canvas: Option<Canvas>,
        source: Arc<dyn FrameSource>,
        callbacks: FrameCallbacks,
        events: PlayerEventSender,
        workers: Arc<Workers>,
    ) -> Result<Self, PlayerError> {
        let frames_count = config.loader.frames_count;
        if frames_count == 0 {
            return Err(PlayerError::Config(
                "frames_count must be greater than zero".to_string(),
            ));
        }

        let (playback, start) = resolve_playback(&config.playback, frames_count);
        let loader = Loader::new(
            &config.loader,
            start,
            playback.min,
            playback.max,
            source,
            workers,
            callbacks,
        );

        let mut placement = ObjectPlacement::new();
        if let Some(canvas) = &canvas {
            placement.set_container(canvas.size());
        }

        info!(
            "Player created: {} frames, strategy {}, start {}",
            frames_count, config.loader.strategy, start
        );

        Ok(Self {
            canvas,
            loader: Some(loader),
            placement,
            playback,
            render_opts: config.render,
            frames_count,
            current_frame_idx: start,
            last_rendered_idx: None,
            playing: false,
            last_tick: None,
            events,
        })
    }

    pub fn frames_count(&self) -> usize {
        self.frames_count
    }

    pub fn current_frame_idx(&self) -> FrameIdx {
        self.current_frame_idx
    }

    pub fn last_rendered_idx(&self) -> Option<FrameIdx> {
        self.last_rendered_idx
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    pub fn stats(&self) -> Option<LoadingStats> {
        self.loader.as_ref().map(|l| l.stats())
    }

    pub fn is_fully_loaded(&self) -> bool {
        self.loader.as_ref().is_some_and(|l| l.is_fully_loaded())
    }

    /// Effective playback range `(min, max)`.
    pub fn playback_bounds(&self) -> (FrameIdx, FrameIdx) {
        (self.playback.min, self.playback.max)
    }

    /// One host tick at the current time.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// One host tick with an injected clock: pump the loader (first render
    /// on ready), then, while playing and the fps interval elapsed,
    /// render-then-advance.
    pub fn tick_at(&mut self, now: Instant) {
        let Some(loader) = &mut self.loader else {
            return;
        };
        let milestones = loader.pump();
        if milestones.ready {
            self.render(RenderOverrides {
                force: Some(true),
                fallback_to_closest_frame: Some(true),
                ..Default::default()
            });
            self.events.emit(PlayerEvent::Ready {
                idx: self.current_frame_idx,
            });
        }
        if milestones.fully_loaded {
            self.events.emit(PlayerEvent::FullyLoaded {
                idx: self.current_frame_idx,
            });
        }

        if !self.playing {
            return;
        }
        let interval = 1.0 / self.playback.fps;
        match self.last_tick {
            None => self.last_tick = Some(now),
            Some(last) if now.duration_since(last).as_secs_f32() >= interval => {
                self.last_tick = Some(now);
                self.render(RenderOverrides::default());
                self.advance();
            }
            // Ticks faster than the interval are skipped, not queued.
            Some(_) => {}
        }
    }

    /// Enable playback, merging partial options over the current state.
    /// A supplied start frame is validated against the bounds in effect
    /// before the merge; out of bounds is a logged no-op for the jump.
    pub fn play(&mut self, options: PlaybackOptions) {
        if self.loader.is_none() {
            warn!("play: player is destroyed");
            return;
        }
        let last = self.frames_count - 1;

        if let Some(start) = options.start_frame_idx {
            let start = start.min(last);
            if start < self.playback.min || start > self.playback.max {
                warn!(
                    "play: start frame {} outside bounds {}..{}, ignoring",
                    start, self.playback.min, self.playback.max
                );
            } else {
                self.set_current(start);
            }
        }

        if let Some(fps) = options.fps {
            if fps > 0.0 {
                self.playback.fps = fps;
            } else {
                warn!("play: ignoring non-positive fps {}", fps);
            }
        }
        if let Some(looped) = options.looped {
            self.playback.looped = looped;
        }
        if let Some(reverse) = options.reverse {
            self.playback.reverse = reverse;
        }
        if let Some(min) = options.min_frame_idx {
            self.playback.min = min.min(last);
        }
        if let Some(max) = options.max_frame_idx {
            self.playback.max = max.min(last);
        }

        self.playing = true;
        self.last_tick = None;
        self.events.emit(PlayerEvent::Play {
            idx: self.current_frame_idx,
        });
    }

    /// Disable playback. Emits `stop` only on an actual transition.
    pub fn stop(&mut self) {
        if !self.playing {
            return;
        }
        self.playing = false;
        self.last_tick = None;
        self.events.emit(PlayerEvent::Stop {
            idx: self.current_frame_idx,
        });
    }

    /// Play a bounded, non-looping run from the current frame to the
    /// position `progress` maps to on `[min, max]`.
    pub fn play_to_progress(&mut self, progress: f32) {
        let progress = progress.clamp(0.0, 1.0);
        let (min, max) = (self.playback.min, self.playback.max);
        let target = min + ((max - min) as f32 * progress).round() as FrameIdx;
        let current = self.current_frame_idx;
        if target == current {
            debug!("play_to_progress: already at frame {}", target);
            return;
        }

        let reverse = target < current;
        self.play(PlaybackOptions {
            looped: Some(false),
            reverse: Some(reverse),
            min_frame_idx: Some(current.min(target)),
            max_frame_idx: Some(current.max(target)),
            ..Default::default()
        });
    }

    /// Render the current frame (or closest loaded fallback) onto the
    /// canvas. Logged no-op when prerequisites are missing, the index was
    /// already rendered (unless forced), or the position fails to parse.
    pub fn render(&mut self, overrides: RenderOverrides) {
        if self.canvas.is_none() || self.loader.is_none() {
            debug!("render: no canvas or loader, skipping");
            return;
        }
        let options = self.render_opts.merged(&overrides);
        let idx = self.current_frame_idx;
        if !options.force && self.last_rendered_idx == Some(idx) {
            debug!("render: frame {} already rendered, skipping", idx);
            return;
        }

        let Some(frame) = self.resolve_frame(idx, options.fallback_to_closest_frame) else {
            debug!("render: no loaded frame for index {}", idx);
            return;
        };
        let Some(image) = frame.image() else {
            debug!("render: frame {} has no pixels", frame.idx());
            return;
        };

        let object = glam::Vec2::new(image.width() as f32, image.height() as f32);
        let Some(rect) =
            self.placement
                .calc(object, options.object_fit, &options.object_position)
        else {
            warn!(
                "render: unsupported object-position {:?}, skipping draw",
                options.object_position
            );
            return;
        };

        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };
        if options.should_clear {
            canvas.clear_rect(&rect);
        }
        canvas.draw_image(&image, &rect);
        self.last_rendered_idx = Some(idx);
    }

    /// Direct seek to an exact index, then one render. Not bounded by the
    /// playback min/max.
    pub fn render_by_frame_idx(&mut self, idx: FrameIdx) {
        self.set_current(idx);
        self.render(RenderOverrides::default());
    }

    /// Direct seek by linear progress over the whole sequence, then one
    /// render. Not bounded by the playback min/max.
    pub fn render_by_progress(&mut self, progress: f32) {
        let progress = progress.clamp(0.0, 1.0);
        let idx = ((self.frames_count - 1) as f32 * progress).round() as FrameIdx;
        self.render_by_frame_idx(idx);
    }

    /// Re-derive the surface for a new layout box and re-render forced.
    pub fn resize(&mut self, width: u32, height: u32) {
        let Some(canvas) = &mut self.canvas else {
            debug!("resize: no canvas");
            return;
        };
        canvas.resize(width, height);
        self.placement.set_container(canvas.size());
        self.render(RenderOverrides {
            force: Some(true),
            ..Default::default()
        });
    }

    /// Stop playback, destroy the strategy, release the canvas. The
    /// player is inert afterwards.
    pub fn destroy(&mut self) {
        self.stop();
        if let Some(mut loader) = self.loader.take() {
            loader.destroy();
        }
        self.canvas = None;
    }

    /// Exact frame if loaded, else (opt-in) the nearest loaded one.
    fn resolve_frame(&self, idx: FrameIdx, fallback: bool) -> Option<Frame> {
        let loader = self.loader.as_ref()?;
        let exact = loader.frame(idx).filter(|f| f.is_loaded());
        if exact.is_some() {
            return exact;
        }
        if !fallback {
            return None;
        }
        let closest = loader.loaded_frames().closest(idx)?;
        loader.frame(closest)
    }

    fn set_current(&mut self, idx: FrameIdx) {
        if idx == self.current_frame_idx {
            return;
        }
        self.current_frame_idx = idx;
        self.events.emit(PlayerEvent::FrameChanged { idx });
        if let Some(loader) = &mut self.loader {
            loader.notify_frame_changed(idx);
        }
    }

    /// One playback step: next index per direction, wrap or stop at the
    /// bounds. An inverted or collapsed range halts playback.
    fn advance(&mut self) {
        let Playback {
            min, max, looped, reverse, ..
        } = self.playback;
        if min >= max {
            error!(
                "advance: invalid playback bounds {}..{}, stopping",
                min, max
            );
            self.stop();
            return;
        }

        let next = if reverse {
            self.current_frame_idx.checked_sub(1)
        } else {
            Some(self.current_frame_idx + 1)
        };

        match next.filter(|&n| n >= min && n <= max) {
            Some(n) => self.set_current(n),
            None if looped => self.set_current(if reverse { max } else { min }),
            None => self.stop(),
        }
    }
}

fn resolve_playback(options: &PlaybackOptions, frames_count: usize) -> (Playback, FrameIdx) {
    let last = frames_count - 1;
    let min = options.min_frame_idx.unwrap_or(0).min(last);
    let max = options.max_frame_idx.unwrap_or(last).min(last);
    let fps = match options.fps {
        Some(fps) if fps > 0.0 => fps,
        Some(fps) => {
            warn!("ignoring non-positive fps {}, using {}", fps, DEFAULT_FPS);
            DEFAULT_FPS
        }
        None => DEFAULT_FPS,
    };
    let start = options.start_frame_idx.unwrap_or(min).min(last);
    (
        Playback {
            fps,
            looped: options.looped.unwrap_or(false),
            reverse: options.reverse.unwrap_or(false),
            min,
            max,
        },
        start,
    )
}
