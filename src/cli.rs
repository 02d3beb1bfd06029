use clap::Parser;
use std::path::PathBuf;

use crate::config::{PlayerConfig, Strategy};
use crate::placement::ObjectFit;

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Formats: PNG, JPEG, TIFF, TGA\n",
    "Target:  ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Headless image sequence player
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Sequence pattern: printf-style (render.%04d.png) or glob (render.*.png)
    #[arg(value_name = "PATTERN")]
    pub pattern: String,

    /// Frame count override (default: detected from files on disk)
    #[arg(short = 'n', long = "frames", value_name = "N")]
    pub frames: Option<usize>,

    /// Loading strategy: eager, lazy, lod (default: eager)
    #[arg(short = 's', long = "strategy")]
    pub strategy: Option<Strategy>,

    /// Lazy strategy: window radius around the current frame
    #[arg(long = "range", value_name = "N")]
    pub loading_range: Option<usize>,

    /// LOD strategy: initial pass step (default: coarsest possible)
    #[arg(long = "level", value_name = "N")]
    pub level: Option<usize>,

    /// Playback frames per second
    #[arg(long = "fps", value_name = "FPS")]
    pub fps: Option<f32>,

    /// Loop playback
    #[arg(short = 'o', long = "loop")]
    pub looped: bool,

    /// Play backwards
    #[arg(short = 'r', long = "reverse")]
    pub reverse: bool,

    /// Start frame index (0-based)
    #[arg(long = "start", value_name = "N")]
    pub start_frame: Option<usize>,

    /// Playback range lower bound
    #[arg(long = "min", value_name = "N")]
    pub min_frame: Option<usize>,

    /// Playback range upper bound
    #[arg(long = "max", value_name = "N")]
    pub max_frame: Option<usize>,

    /// Canvas size as WxH (default: native size of the first frame)
    #[arg(long = "size", value_name = "WxH", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Object-fit mode: fill, contain, cover, none, scale-down (default: contain)
    #[arg(long = "fit")]
    pub fit: Option<ObjectFit>,

    /// Object-position tokens, e.g. "center", "left top", "25% 10px"
    #[arg(long = "position", num_args = 1..=2)]
    pub position: Option<Vec<String>>,

    /// Poster mode: render the frame at this progress (0..1) and exit
    #[arg(long = "progress", value_name = "P")]
    pub progress: Option<f32>,

    /// Play for this many seconds, dumping each rendered frame
    #[arg(long = "play-secs", value_name = "SECS")]
    pub play_secs: Option<f32>,

    /// Output pattern for rendered frames (printf or glob style)
    #[arg(short = 'O', long = "out", value_name = "PATTERN")]
    pub out: Option<PathBuf>,

    /// Full player configuration from a JSON file (CLI flags win)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Worker threads override
    #[arg(long = "workers", value_name = "N")]
    pub workers: Option<usize>,
}

impl Args {
    /// Overlay the flags that were actually given onto a player config.
    /// Absent flags leave the config (from a file or the defaults)
    /// untouched, so `--config` settings survive unless overridden.
    pub fn apply(&self, config: &mut PlayerConfig) {
        if let Some(strategy) = self.strategy {
            config.loader.strategy = strategy;
        }
        if let Some(range) = self.loading_range {
            config.loader.frames_loading_range = range;
        }
        if let Some(level) = self.level {
            config.loader.level = Some(level);
        }
        if let Some(workers) = self.workers {
            config.loader.threads = Some(workers);
        }
        if let Some(fps) = self.fps {
            config.playback.fps = Some(fps);
        }
        if self.looped {
            config.playback.looped = Some(true);
        }
        if self.reverse {
            config.playback.reverse = Some(true);
        }
        if let Some(start) = self.start_frame {
            config.playback.start_frame_idx = Some(start);
        }
        if let Some(min) = self.min_frame {
            config.playback.min_frame_idx = Some(min);
        }
        if let Some(max) = self.max_frame {
            config.playback.max_frame_idx = Some(max);
        }
        if let Some(fit) = self.fit {
            config.render.object_fit = fit;
        }
        if let Some(position) = &self.position {
            config.render.object_position = position.clone();
        }
    }
}

/// Parse "WxH" into a pixel size.
fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got: {}", s))?;
    let w = w.trim().parse::<u32>().map_err(|e| format!("bad width: {}", e))?;
    let h = h.trim().parse::<u32>().map_err(|e| format!("bad height: {}", e))?;
    if w == 0 || h == 0 {
        return Err("size must be non-zero".to_string());
    }
    Ok((w, h))
}
