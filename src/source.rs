//! Frame sources: resolving a frame index to decoded pixels
//!
//! **Why**: The engine addresses frames only by index; where the bytes come
//! from (numbered files on disk, a test fixture, an embedder's store) is
//! behind one object-safe trait so strategies and workers stay agnostic.
//!
//! **Used by**: Worker jobs (fetch + decode off the owner thread), CLI
//! (pattern/glob resolution and range discovery).
//!
//! # Patterns
//!
//! Two path pattern styles, matching common sequence tooling:
//! - printf-style: `render.%04d.png` (padding taken from the token)
//! - glob-style: `render.*.png` (every `*` replaced by the padded number)
//!
//! `discover()` globs the pattern to derive the on-disk frame range, so a
//! sequence starting at `0037` still maps to indices `0..frames_count`.

use log::{debug, info};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;

use image::RgbaImage;

use crate::index_list::FrameIdx;

/// Frame fetch/decode errors.
#[derive(Debug)]
pub enum SourceError {
    Pattern(String),
    Image(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Pattern(e) => write!(f, "Pattern error: {}", e),
            SourceError::Image(e) => write!(f, "Image error: {}", e),
        }
    }
}

impl std::error::Error for SourceError {}

/// One image resource per frame index. Implementations run on worker
/// threads, hence the `Send + Sync` bound.
pub trait FrameSource: Send + Sync {
    fn fetch(&self, idx: FrameIdx) -> Result<RgbaImage, SourceError>;
}

#[derive(Debug, Clone)]
enum PatternKind {
    /// Exact `%0Nd` token to substitute, e.g. `%04d`.
    Printf { token: String },
    /// Every `*` is substituted.
    Glob,
}

/// Pattern-based file source: formats a path per index and decodes it with
/// the `image` crate.
#[derive(Debug, Clone)]
pub struct PatternSource {
    pattern: String,
    kind: PatternKind,
    padding: usize,
    /// On-disk number of index 0 (sequences rarely start at zero).
    first_frame: usize,
}

impl PatternSource {
    /// Accepts printf-style (`%0Nd`) or glob-style (`*`) patterns.
    pub fn new(pattern: &str) -> Result<Self, SourceError> {
        if pattern.contains('%') {
            let re = Regex::new(r"%0(\d+)d")
                .map_err(|e| SourceError::Pattern(format!("regex error: {}", e)))?;
            let caps = re.captures(pattern).ok_or_else(|| {
                SourceError::Pattern(format!("'%' pattern without %0Nd token: {}", pattern))
            })?;
            let token = caps
                .get(0)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let padding = caps
                .get(1)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .unwrap_or(4);
            return Ok(Self {
                pattern: pattern.to_string(),
                kind: PatternKind::Printf { token },
                padding,
                first_frame: 0,
            });
        }

        if pattern.contains('*') {
            return Ok(Self {
                pattern: pattern.to_string(),
                kind: PatternKind::Glob,
                padding: 4,
                first_frame: 0,
            });
        }

        Err(SourceError::Pattern(format!(
            "pattern needs a %0Nd token or a '*': {}",
            pattern
        )))
    }

    /// Build a source from the pattern and detect the frame range from the
    /// files actually on disk. Returns the source plus the frame count
    /// (`max - min + 1`; gaps stay addressable and simply fail to load).
    pub fn discover(pattern: &str) -> Result<(Self, usize), SourceError> {
        let mut source = Self::new(pattern)?;

        let glob_pattern = match &source.kind {
            PatternKind::Printf { token } => source.pattern.replacen(token.as_str(), "*", 1),
            PatternKind::Glob => source.pattern.clone(),
        };

        let paths = glob::glob(&glob_pattern)
            .map_err(|e| SourceError::Pattern(format!("glob error: {}", e)))?;
        let mut files: Vec<PathBuf> = paths.filter_map(Result::ok).collect();
        files.sort();

        if files.is_empty() {
            return Err(SourceError::Pattern(format!(
                "no files match pattern: {}",
                glob_pattern
            )));
        }

        // Last run of digits in the stem is the frame number.
        let re = Regex::new(r"(\d+)")
            .map_err(|e| SourceError::Pattern(format!("regex error: {}", e)))?;
        let mut numbers: BTreeMap<usize, usize> = BTreeMap::new(); // number -> digits
        for path in &files {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            if let Some(m) = re.find_iter(stem).last() {
                if let Ok(num) = m.as_str().parse::<usize>() {
                    numbers.insert(num, m.as_str().len());
                }
            }
        }

        let (&first, &digits) = numbers.first_key_value().ok_or_else(|| {
            SourceError::Pattern(format!("no frame numbers found in: {}", glob_pattern))
        })?;
        let &last = numbers.last_key_value().map(|(k, _)| k).unwrap_or(&first);

        source.first_frame = first;
        if matches!(source.kind, PatternKind::Glob) {
            source.padding = digits;
        }

        let frames_count = last - first + 1;
        info!(
            "Detected sequence: {} frames ({}..{}), padding {}, pattern {}",
            frames_count, first, last, source.padding, source.pattern
        );
        Ok((source, frames_count))
    }

    /// Resolved path for a frame index.
    pub fn path_for(&self, idx: FrameIdx) -> PathBuf {
        let number = self.first_frame + idx;
        let formatted = format!("{:0width$}", number, width = self.padding);
        let path = match &self.kind {
            PatternKind::Printf { token } => {
                self.pattern.replacen(token.as_str(), &formatted, 1)
            }
            PatternKind::Glob => self.pattern.replace('*', &formatted),
        };
        PathBuf::from(path)
    }

    pub fn first_frame(&self) -> usize {
        self.first_frame
    }
}

impl FrameSource for PatternSource {
    fn fetch(&self, idx: FrameIdx) -> Result<RgbaImage, SourceError> {
        let path = self.path_for(idx);
        debug!("Fetching frame {}: {}", idx, path.display());
        let img = image::open(&path)
            .map_err(|e| SourceError::Image(format!("{}: {}", path.display(), e)))?;
        Ok(img.to_rgba8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn printf_pattern_formats_with_padding() {
        let src = PatternSource::new("seq/render.%04d.png").unwrap();
        assert_eq!(src.path_for(0), PathBuf::from("seq/render.0000.png"));
        assert_eq!(src.path_for(37), PathBuf::from("seq/render.0037.png"));

        let src = PatternSource::new("shot_%02d.jpg").unwrap();
        assert_eq!(src.path_for(5), PathBuf::from("shot_05.jpg"));
        assert_eq!(src.path_for(123), PathBuf::from("shot_123.jpg"));
    }

    #[test]
    fn glob_pattern_defaults_to_four_digits() {
        let src = PatternSource::new("seq/render.*.png").unwrap();
        assert_eq!(src.path_for(3), PathBuf::from("seq/render.0003.png"));
    }

    #[test]
    fn plain_paths_are_rejected() {
        assert!(PatternSource::new("seq/render.0001.png").is_err());
        assert!(PatternSource::new("render.%d.png").is_err());
    }

    #[test]
    fn discover_reads_range_from_disk() {
        let dir = std::env::temp_dir().join(format!("flipbook-discover-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for n in [3, 4, 7] {
            File::create(dir.join(format!("aaa.{:04}.png", n))).unwrap();
        }

        let pattern = dir.join("aaa.*.png");
        let (src, count) = PatternSource::discover(pattern.to_str().unwrap()).unwrap();
        // Range 3..=7 -> five addressable frames, gaps included.
        assert_eq!(count, 5);
        assert_eq!(src.first_frame(), 3);
        assert_eq!(src.path_for(0), dir.join("aaa.0003.png"));
        assert_eq!(src.path_for(4), dir.join("aaa.0007.png"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn discover_fails_on_empty_match() {
        let dir = std::env::temp_dir().join(format!("flipbook-empty-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let pattern = dir.join("nothing.*.png");
        assert!(PatternSource::discover(pattern.to_str().unwrap()).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
