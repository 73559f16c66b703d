use anyhow::{anyhow, Context, Result};
use fontdue::{Font, FontSettings};
use std::path::{Path, PathBuf};

use super::canvas::{Canvas, Rgba};

/// Monospace fonts tried when no font is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/liberation-mono/LiberationMono-Regular.ttf",
    "/Library/Fonts/Courier New.ttf",
    "/System/Library/Fonts/Supplemental/Courier New.ttf",
    "C:\\Windows\\Fonts\\consola.ttf",
];

/// Rasterized labels for graph images.
pub struct TextOverlay {
    font: Font,
    font_size: f32,
}

impl TextOverlay {
    pub fn from_bytes(bytes: &[u8], font_size: f32) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| anyhow!("Failed to parse font: {}", e))?;
        Ok(Self { font, font_size })
    }

    pub fn load(path: &Path, font_size: f32) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font: {}", path.display()))?;
        Self::from_bytes(&bytes, font_size)
    }

    /// Load `configured`, or else the first system font found. Labels are
    /// optional: `None` just means graphs are drawn without text.
    pub fn discover(configured: Option<&Path>, font_size: f32) -> Option<Self> {
        let candidates: Vec<PathBuf> = match configured {
            Some(path) => vec![path.to_path_buf()],
            None => SYSTEM_FONTS.iter().map(PathBuf::from).collect(),
        };
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load(path, font_size) {
                Ok(overlay) => {
                    log::debug!("Graph labels use font {}", path.display());
                    return Some(overlay);
                }
                Err(err) => log::warn!("{:#}", err),
            }
        }
        log::debug!("No font found, graphs are drawn without labels");
        None
    }

    pub fn line_height(&self) -> u32 {
        self.font_size.ceil() as u32
    }

    /// Draw `text` with its top-left corner at `(x, y)`.
    pub fn composite(&self, canvas: &mut Canvas, text: &str, x: i64, y: i64, color: Rgba) {
        let mut cursor_x = x;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, self.font_size);
            let glyph_y = y + self.font_size as i64 - metrics.height as i64 - metrics.ymin as i64;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let alpha = bitmap[gy * metrics.width + gx];
                    if alpha == 0 {
                        continue;
                    }
                    canvas.blend(
                        cursor_x + metrics.xmin as i64 + gx as i64,
                        glyph_y + gy as i64,
                        color,
                        alpha as f32 / 255.0,
                    );
                }
            }

            cursor_x += metrics.advance_width.round() as i64;
        }
    }

    /// Width of rendered text in pixels.
    pub fn measure_width(&self, text: &str) -> u32 {
        let width: f32 = text
            .chars()
            .map(|ch| self.font.metrics(ch, self.font_size).advance_width)
            .sum();
        width.ceil() as u32
    }
}
