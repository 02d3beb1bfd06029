use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use flipbook::cli::Args;
use flipbook::{
    Canvas, FrameCallbacks, FrameIdx, PatternSource, PlaybackOptions, PlayerConfig,
    PlayerEvent, PlayerEventSender, RenderOverrides, SequencePlayer, Workers,
};

fn main() -> Result<()> {
    let args = Args::parse();

    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let default_level = match args.verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    info!("flipbook starting");
    debug!("Command-line args: {:?}", args);

    let (source, detected_count) = PatternSource::discover(&args.pattern)
        .with_context(|| format!("failed to resolve sequence: {}", args.pattern))?;
    let frames_count = args.frames.unwrap_or(detected_count);
    if frames_count == 0 {
        return Err(anyhow!("sequence has no frames"));
    }

    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            serde_json::from_str::<PlayerConfig>(&json)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => PlayerConfig::default(),
    };

    // Flags that were actually given win over the JSON config.
    config.loader.frames_count = frames_count;
    args.apply(&mut config);

    // Canvas size: explicit, or the native size of the first readable frame.
    let (width, height) = match args.size {
        Some(size) => size,
        None => {
            let probe = probe_frame(&source, frames_count)?;
            (probe.width(), probe.height())
        }
    };
    info!(
        "Canvas {}x{}, {} frames, strategy {}",
        width, height, frames_count, config.loader.strategy
    );

    let workers = Arc::new(
        config
            .loader
            .threads
            .map(Workers::new)
            .unwrap_or_else(Workers::with_default_size),
    );

    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let mut player = SequencePlayer::new(
        config,
        Some(Canvas::new(width, height)),
        Arc::new(source),
        FrameCallbacks::default(),
        PlayerEventSender::new(event_tx),
        workers,
    )?;

    // Wait for the strategy's ready milestone before doing anything.
    let ready_deadline = Instant::now() + Duration::from_secs(60);
    'ready: loop {
        player.tick();
        for event in event_rx.try_iter() {
            debug!("Event: {:?}", event);
            if matches!(event, PlayerEvent::Ready { .. }) {
                break 'ready;
            }
        }
        if Instant::now() >= ready_deadline {
            return Err(anyhow!("sequence never became ready"));
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    info!("Ready at frame {}", player.current_frame_idx());

    if let Some(progress) = args.progress {
        // Poster mode: one frame at the given progress, then exit. The
        // exact frame may have failed to load; substitute the nearest.
        player.render_by_progress(progress);
        player.render(RenderOverrides {
            force: Some(true),
            fallback_to_closest_frame: Some(true),
            ..Default::default()
        });
        save_frame(&player, args.out.as_deref(), player.current_frame_idx())?;
        report(&player);
        player.destroy();
        return Ok(());
    }

    let play_secs = args.play_secs.unwrap_or(0.0);
    if play_secs > 0.0 {
        player.play(PlaybackOptions::default());
        let deadline = Instant::now() + Duration::from_secs_f32(play_secs);
        let mut dumped: Option<FrameIdx> = None;
        while Instant::now() < deadline {
            player.tick();
            for event in event_rx.try_iter() {
                debug!("Event: {:?}", event);
            }
            if args.out.is_some() && player.last_rendered_idx() != dumped {
                if let Some(idx) = player.last_rendered_idx() {
                    save_frame(&player, args.out.as_deref(), idx)?;
                    dumped = Some(idx);
                }
            }
            if !player.is_playing() {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        player.stop();
    } else {
        // Default: render the first frame, optionally save it.
        player.render(RenderOverrides::default());
        if args.out.is_some() {
            save_frame(&player, args.out.as_deref(), player.current_frame_idx())?;
        }
    }

    report(&player);
    player.destroy();
    info!("flipbook exiting");
    Ok(())
}

/// Decode the first loadable frame to learn the native resolution.
fn probe_frame(source: &PatternSource, frames_count: usize) -> Result<image::RgbaImage> {
    use flipbook::FrameSource;
    for idx in 0..frames_count {
        match source.fetch(idx) {
            Ok(image) => return Ok(image),
            Err(e) => warn!("Probe skipping frame {}: {}", idx, e),
        }
    }
    Err(anyhow!("no frame in the sequence could be decoded"))
}

/// Save the canvas under the output pattern (or a default name).
fn save_frame(player: &SequencePlayer, out: Option<&Path>, idx: FrameIdx) -> Result<()> {
    let Some(canvas) = player.canvas() else {
        return Ok(());
    };
    let path = match out {
        Some(pattern) => out_path(pattern, idx)?,
        None => PathBuf::from(format!("flipbook.{:04}.png", idx)),
    };
    canvas
        .save(&path)
        .with_context(|| format!("failed to save {}", path.display()))?;
    info!("Saved frame {} to {}", idx, path.display());
    Ok(())
}

/// Resolve an output path: pattern-style paths format the index in, plain
/// paths are used verbatim.
fn out_path(pattern: &Path, idx: FrameIdx) -> Result<PathBuf> {
    let s = pattern
        .to_str()
        .ok_or_else(|| anyhow!("output pattern is not valid UTF-8"))?;
    if s.contains('%') || s.contains('*') {
        let source = PatternSource::new(s).map_err(|e| anyhow!("bad output pattern: {}", e))?;
        Ok(source.path_for(idx))
    } else {
        Ok(pattern.to_path_buf())
    }
}

fn report(player: &SequencePlayer) {
    if let Some(stats) = player.stats() {
        info!(
            "Loading stats: {} processed, {} loaded, {} failed (fully loaded: {})",
            stats.processed,
            stats.loaded,
            stats.failed,
            player.is_fully_loaded()
        );
    }
}
