use anyhow::{Context, Result};
use image::{ImageFormat, RgbaImage};
use std::path::Path;

pub type Rgba = [u8; 4];

pub const WHITE: Rgba = [255, 255, 255, 255];
pub const BLACK: Rgba = [0, 0, 0, 255];
pub const GRID: Rgba = [220, 220, 220, 255];
pub const AXIS: Rgba = [90, 90, 90, 255];
pub const BLUE: Rgba = [31, 119, 180, 255];
pub const ORANGE: Rgba = [255, 127, 14, 255];
pub const GREEN: Rgba = [44, 160, 44, 255];
pub const RED: Rgba = [214, 39, 40, 255];

/// Pixel rectangle, origin at the top-left.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Shrink by the given margins, never below zero size.
    pub fn inset(&self, left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            x: self.x + left.min(self.width),
            y: self.y + top.min(self.height),
            width: self.width.saturating_sub(left + right),
            height: self.height.saturating_sub(top + bottom),
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// RGBA software canvas.
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgba) -> Self {
        let pixels = background
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Set a pixel; coordinates outside the canvas are ignored.
    pub fn put(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = ((y as u32 * self.width + x as u32) * 4) as usize;
        self.pixels[i..i + 4].copy_from_slice(&color);
    }

    /// Alpha-blend `color` over the pixel with coverage `alpha` in `[0, 1]`.
    pub fn blend(&mut self, x: i64, y: i64, color: Rgba, alpha: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = ((y as u32 * self.width + x as u32) * 4) as usize;
        let a = alpha.clamp(0.0, 1.0) * color[3] as f32 / 255.0;
        for c in 0..3 {
            let dst = self.pixels[i + c] as f32;
            self.pixels[i + c] = (color[c] as f32 * a + dst * (1.0 - a)) as u8;
        }
        self.pixels[i + 3] = 255;
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        let x_end = rect.right().min(self.width);
        let y_end = rect.bottom().min(self.height);
        for y in rect.y..y_end {
            for x in rect.x..x_end {
                self.put(x as i64, y as i64, color);
            }
        }
    }

    pub fn stroke_rect(&mut self, rect: Rect, color: Rgba) {
        if rect.width == 0 || rect.height == 0 {
            return;
        }
        let (x0, y0) = (rect.x as i64, rect.y as i64);
        let (x1, y1) = (rect.right() as i64 - 1, rect.bottom() as i64 - 1);
        self.line(x0, y0, x1, y0, color);
        self.line(x0, y1, x1, y1, color);
        self.line(x0, y0, x0, y1, color);
        self.line(x1, y0, x1, y1, color);
    }

    /// Bresenham line, clipped per pixel.
    pub fn line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y) = (x0, y0);
        let mut err = dx + dy;
        loop {
            self.put(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    pub fn polyline(&mut self, points: &[(f32, f32)], color: Rgba) {
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if !(a.0.is_finite() && a.1.is_finite() && b.0.is_finite() && b.1.is_finite()) {
                continue;
            }
            self.line(
                a.0.round() as i64,
                a.1.round() as i64,
                b.0.round() as i64,
                b.1.round() as i64,
                color,
            );
        }
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        let image = RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .context("Canvas size does not match its pixel buffer")?;
        image
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("Failed to write PNG: {}", path.display()))
    }
}

/// Jet colormap: blue, cyan, yellow, red over `t` in `[0, 1]`.
pub fn jet(t: f32) -> Rgba {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let channel = |offset: f32| ((1.5 - (4.0 * t - offset).abs()).clamp(0.0, 1.0) * 255.0) as u8;
    [channel(3.0), channel(2.0), channel(1.0), 255]
}
