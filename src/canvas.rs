//! Owned RGBA8 drawing surface
//!
//! **Why**: The player needs a 2-D target it can clear and composite frames
//! onto without any windowing system. The canvas is a plain pixel buffer
//! with a scaled alpha-over blit; hosts read or save it after rendering.
//!
//! Destination rectangles come straight from the placement calculator and
//! may start at negative offsets or exceed the surface (cover/none
//! overflow) — drawing clips, the placement does not.

use glam::Vec2;
use image::RgbaImage;
use rayon::prelude::*;
use std::path::Path;

use crate::placement::Placement;

/// RGBA8 surface. Starts fully transparent.
#[derive(Debug, Clone)]
pub struct Canvas {
    buffer: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.buffer.width() as f32, self.buffer.height() as f32)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.buffer
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.buffer.get_pixel(x, y).0
    }

    /// Replace the surface with a fresh transparent one of the given size.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.buffer = RgbaImage::new(width, height);
    }

    /// Reset a rectangle to transparent black, clipped to the surface.
    pub fn clear_rect(&mut self, rect: &Placement) {
        let width = self.buffer.width() as usize;
        let height = self.buffer.height() as usize;
        let Some((x0, x1, y0, y1)) = clip_rect(rect, width, height) else {
            return;
        };

        let row_bytes = width * 4;
        let dst: &mut [u8] = &mut self.buffer;
        for y in y0..y1 {
            dst[y * row_bytes + x0 * 4..y * row_bytes + x1 * 4].fill(0);
        }
    }

    /// Draw `src` scaled into the destination rectangle with bilinear
    /// sampling and straight-alpha over blending. Rows run in parallel.
    pub fn draw_image(&mut self, src: &RgbaImage, rect: &Placement) {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let src_w = src.width() as usize;
        let src_h = src.height() as usize;
        if src_w == 0 || src_h == 0 {
            return;
        }

        let width = self.buffer.width() as usize;
        let height = self.buffer.height() as usize;
        let Some((x0, x1, y0, y1)) = clip_rect(rect, width, height) else {
            return;
        };

        let scale_x = src_w as f32 / rect.width;
        let scale_y = src_h as f32 / rect.height;
        let src_buf: &[u8] = src;
        let row_bytes = width * 4;

        let dst: &mut [u8] = &mut self.buffer;
        dst.par_chunks_mut(row_bytes)
            .enumerate()
            .for_each(|(y, row)| {
                if y < y0 || y >= y1 {
                    return;
                }
                let sy = ((y as f32 + 0.5 - rect.y) * scale_y - 0.5)
                    .clamp(0.0, src_h as f32 - 1.0);
                for x in x0..x1 {
                    let sx = ((x as f32 + 0.5 - rect.x) * scale_x - 0.5)
                        .clamp(0.0, src_w as f32 - 1.0);
                    let top = sample_u8(src_buf, src_w, src_h, sx, sy);

                    let i = x * 4;
                    let alpha = top[3];
                    let inv_alpha = 1.0 - alpha;
                    for c in 0..3 {
                        let below = row[i + c] as f32 / 255.0;
                        row[i + c] =
                            ((below * inv_alpha + top[c] * alpha) * 255.0).clamp(0.0, 255.0) as u8;
                    }
                    let below_a = row[i + 3] as f32 / 255.0;
                    row[i + 3] = ((below_a * inv_alpha + alpha) * 255.0).clamp(0.0, 255.0) as u8;
                }
            });
    }

    /// Save the surface; format is inferred from the extension.
    pub fn save(&self, path: &Path) -> Result<(), image::ImageError> {
        self.buffer.save(path)
    }
}

/// Integer pixel bounds of a rect clipped to the surface, or `None` when
/// nothing remains.
fn clip_rect(rect: &Placement, width: usize, height: usize) -> Option<(usize, usize, usize, usize)> {
    let x0 = rect.x.round().max(0.0) as usize;
    let y0 = rect.y.round().max(0.0) as usize;
    let x1 = (rect.x + rect.width).round().clamp(0.0, width as f32) as usize;
    let y1 = (rect.y + rect.height).round().clamp(0.0, height as f32) as usize;
    (x0 < x1 && y0 < y1).then_some((x0, x1.min(width), y0, y1.min(height)))
}

/// Sample an RGBA8 buffer with bilinear interpolation.
///
/// Returns `[R, G, B, A]` in 0-1 range, or `[0,0,0,0]` if outside bounds.
#[inline]
fn sample_u8(buffer: &[u8], width: usize, height: usize, x: f32, y: f32) -> [f32; 4] {
    if x < 0.0 || y < 0.0 || x >= width as f32 || y >= height as f32 {
        return [0.0, 0.0, 0.0, 0.0];
    }

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let idx00 = (y0 * width + x0) * 4;
    let idx10 = (y0 * width + x1) * 4;
    let idx01 = (y1 * width + x0) * 4;
    let idx11 = (y1 * width + x1) * 4;

    let mut result = [0.0f32; 4];
    for c in 0..4 {
        let c00 = buffer[idx00 + c] as f32;
        let c10 = buffer[idx10 + c] as f32;
        let c01 = buffer[idx01 + c] as f32;
        let c11 = buffer[idx11 + c] as f32;

        let top = c00 * (1.0 - fx) + c10 * fx;
        let bottom = c01 * (1.0 - fx) + c11 * fx;
        result[c] = (top * (1.0 - fy) + bottom * fy) / 255.0;
    }

    result
}
