//! Player configuration
//!
//! Serde-derived config structs: strategy selection, playback options (a
//! partial that merges over defaults with clamping at the player), and
//! render options with per-call overrides. The CLI reads a whole
//! [`PlayerConfig`] from JSON; embedders build it in code.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::index_list::FrameIdx;
use crate::placement::ObjectFit;

pub const DEFAULT_FPS: f32 = 24.0;
pub const DEFAULT_LOADING_RANGE: usize = 10;

/// Frame-loading strategy discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Fetch every frame upfront, in index order.
    #[default]
    Eager,
    /// Fetch a bounded window around the current frame, re-centered on seeks.
    Lazy,
    /// Progressive level-of-detail passes, step halving until every frame.
    Lod,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eager" => Ok(Strategy::Eager),
            "lazy" => Ok(Strategy::Lazy),
            "lod" => Ok(Strategy::Lod),
            other => Err(format!("unknown strategy: {}", other)),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Strategy::Eager => "eager",
            Strategy::Lazy => "lazy",
            Strategy::Lod => "lod",
        };
        f.write_str(name)
    }
}

/// Loader section of the player config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub strategy: Strategy,
    /// Total frames in the sequence. Must be > 0.
    pub frames_count: usize,
    /// Lazy only: window radius around the current frame.
    pub frames_loading_range: usize,
    /// LOD only: initial pass step. Values < 1 are treated as unset
    /// (coarsest possible: `frames_count - 1`).
    pub level: Option<usize>,
    /// Worker pool size override.
    pub threads: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            frames_count: 0,
            frames_loading_range: DEFAULT_LOADING_RANGE,
            level: None,
            threads: None,
        }
    }
}

/// Partial playback options. Unset fields keep their current value: the
/// defaults at construction (fps 24, no loop, forward, full range, start at
/// min), or whatever a previous `play()` left in effect.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackOptions {
    pub fps: Option<f32>,
    pub looped: Option<bool>,
    pub reverse: Option<bool>,
    pub start_frame_idx: Option<FrameIdx>,
    pub min_frame_idx: Option<FrameIdx>,
    pub max_frame_idx: Option<FrameIdx>,
}

/// Base render options, merged with [`RenderOverrides`] per render call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Bypass the "already rendered this index" short-circuit.
    pub force: bool,
    /// Substitute the nearest loaded frame when the exact one is missing.
    /// Opt-in: a plain render skips instead of substituting.
    pub fallback_to_closest_frame: bool,
    /// Clear the destination rect before drawing.
    pub should_clear: bool,
    pub object_fit: ObjectFit,
    /// Raw object-position tokens, parsed at render time. Unparseable
    /// tokens make the render call a logged no-op.
    pub object_position: Vec<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            force: false,
            fallback_to_closest_frame: false,
            should_clear: false,
            object_fit: ObjectFit::Contain,
            object_position: vec!["center".to_string()],
        }
    }
}

/// Per-call render overrides; unset fields fall back to the base options.
#[derive(Debug, Clone, Default)]
pub struct RenderOverrides {
    pub force: Option<bool>,
    pub fallback_to_closest_frame: Option<bool>,
    pub should_clear: Option<bool>,
    pub object_fit: Option<ObjectFit>,
    pub object_position: Option<Vec<String>>,
}

impl RenderOptions {
    pub fn merged(&self, overrides: &RenderOverrides) -> RenderOptions {
        RenderOptions {
            force: overrides.force.unwrap_or(self.force),
            fallback_to_closest_frame: overrides
                .fallback_to_closest_frame
                .unwrap_or(self.fallback_to_closest_frame),
            should_clear: overrides.should_clear.unwrap_or(self.should_clear),
            object_fit: overrides.object_fit.unwrap_or(self.object_fit),
            object_position: overrides
                .object_position
                .clone()
                .unwrap_or_else(|| self.object_position.clone()),
        }
    }
}

/// Full player configuration (serializable part; the frame source, worker
/// pool, callbacks and event channel are passed alongside at construction).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub loader: LoaderConfig,
    pub playback: PlaybackOptions,
    pub render: RenderOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_and_prints() {
        assert_eq!("eager".parse::<Strategy>(), Ok(Strategy::Eager));
        assert_eq!("lazy".parse::<Strategy>(), Ok(Strategy::Lazy));
        assert_eq!("lod".parse::<Strategy>(), Ok(Strategy::Lod));
        assert!("instant".parse::<Strategy>().is_err());
        assert_eq!(Strategy::Lod.to_string(), "lod");
    }

    #[test]
    fn config_parses_from_partial_json() {
        let config: PlayerConfig = serde_json::from_str(
            r#"{
                "loader": { "strategy": "lazy", "frames_count": 120, "frames_loading_range": 5 },
                "playback": { "fps": 30, "looped": true, "max_frame_idx": 99 },
                "render": { "object_fit": "cover", "object_position": ["left", "25%"] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.loader.strategy, Strategy::Lazy);
        assert_eq!(config.loader.frames_count, 120);
        assert_eq!(config.loader.frames_loading_range, 5);
        assert_eq!(config.loader.level, None);
        assert_eq!(config.playback.fps, Some(30.0));
        assert_eq!(config.playback.looped, Some(true));
        assert_eq!(config.playback.min_frame_idx, None);
        assert_eq!(config.playback.max_frame_idx, Some(99));
        assert_eq!(config.render.object_fit, ObjectFit::Cover);
        assert_eq!(config.render.object_position, vec!["left", "25%"]);
        // Unspecified render fields keep defaults.
        assert!(!config.render.should_clear);
        assert!(!config.render.fallback_to_closest_frame);
    }

    #[test]
    fn render_defaults() {
        let render = RenderOptions::default();
        assert!(!render.force);
        // Closest-frame substitution and clearing are per-call opt-ins.
        assert!(!render.fallback_to_closest_frame);
        assert!(!render.should_clear);
        assert_eq!(render.object_fit, ObjectFit::Contain);
        assert_eq!(render.object_position, vec!["center"]);
    }

    #[test]
    fn overrides_merge_over_base() {
        let base = RenderOptions::default();
        let merged = base.merged(&RenderOverrides {
            force: Some(true),
            object_fit: Some(ObjectFit::None),
            ..Default::default()
        });
        assert!(merged.force);
        assert_eq!(merged.object_fit, ObjectFit::None);
        assert!(!merged.should_clear);
        assert_eq!(merged.object_position, base.object_position);

        let untouched = base.merged(&RenderOverrides::default());
        assert_eq!(untouched, base);
    }
}
