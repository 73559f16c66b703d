//! Static graph figures for one [`Analysis`].

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::canvas::{self, jet, Canvas, Rect, Rgba};
use super::text::TextOverlay;
use super::{decimate, value_range};
use crate::audio::features::Analysis;
use crate::dsp::weighting::Level;
use crate::output;

/// Lowest value shown on dB axes, relative to the maximum.
const DB_DISPLAY_RANGE: f32 = 120.0;

/// Plotting area of one panel with its data ranges.
struct Plot {
    area: Rect,
    x: (f32, f32),
    y: (f32, f32),
}

impl Plot {
    fn px(&self, x: f32, y: f32) -> (f32, f32) {
        let fx = (x - self.x.0) / (self.x.1 - self.x.0);
        let fy = (y.clamp(self.y.0, self.y.1) - self.y.0) / (self.y.1 - self.y.0);
        (
            self.area.x as f32 + fx * self.area.width.saturating_sub(1) as f32,
            self.area.bottom() as f32 - 1.0 - fy * self.area.height.saturating_sub(1) as f32,
        )
    }

    fn grid(&self, canvas: &mut Canvas) {
        for i in 1..4 {
            let gx = (self.area.x + self.area.width * i / 4) as i64;
            let gy = (self.area.y + self.area.height * i / 4) as i64;
            canvas.line(gx, self.area.y as i64, gx, self.area.bottom() as i64 - 1, canvas::GRID);
            canvas.line(self.area.x as i64, gy, self.area.right() as i64 - 1, gy, canvas::GRID);
        }
    }

    fn series(&self, canvas: &mut Canvas, xs: &[f32], ys: &[f32], color: Rgba) {
        let points: Vec<(f32, f32)> = decimate(xs, ys, self.area.width as usize)
            .into_iter()
            .map(|(x, y)| self.px(x as f32, y as f32))
            .collect();
        canvas.polyline(&points, color);
    }

    /// Small square markers, skipping `y <= 0` (unvoiced frames).
    fn markers(&self, canvas: &mut Canvas, xs: &[f32], ys: &[f32], color: Rgba) {
        for (&x, &y) in xs.iter().zip(ys) {
            if y <= 0.0 {
                continue;
            }
            let (px, py) = self.px(x, y);
            canvas.fill_rect(
                Rect::new(
                    (px as u32).saturating_sub(1),
                    (py as u32).saturating_sub(1),
                    3,
                    3,
                ),
                color,
            );
        }
    }

    fn bars(&self, canvas: &mut Canvas, xs: &[f32], ys: &[f32], color: Rgba) {
        let (_, base) = self.px(self.x.0, self.y.0);
        for (&x, &y) in xs.iter().zip(ys) {
            let (px, py) = self.px(x, y);
            for dx in -1..=1 {
                canvas.line(
                    px as i64 + dx,
                    base as i64,
                    px as i64 + dx,
                    py as i64,
                    color,
                );
            }
        }
    }

    /// `frames[t][f]`, time along x and frequency along y.
    fn heatmap(&self, canvas: &mut Canvas, frames: &[Vec<f32>], range: (f32, f32)) {
        let bins = frames.first().map_or(0, Vec::len);
        if frames.is_empty() || bins == 0 {
            return;
        }
        let span = (range.1 - range.0).max(1e-6);
        for col in 0..self.area.width {
            let t = (col as usize * frames.len() / self.area.width as usize).min(frames.len() - 1);
            for row in 0..self.area.height {
                let f = ((self.area.height - 1 - row) as usize * bins / self.area.height as usize)
                    .min(bins - 1);
                let color = jet((frames[t][f] - range.0) / span);
                canvas.put(
                    (self.area.x + col) as i64,
                    (self.area.y + row) as i64,
                    color,
                );
            }
        }
    }
}

/// Panel layout: outer rectangle, title and text overlay.
struct PanelFrame<'a> {
    text: Option<&'a TextOverlay>,
}

impl PanelFrame<'_> {
    fn plot(
        &self,
        canvas: &mut Canvas,
        outer: Rect,
        title: &str,
        x: (f32, f32),
        y: (f32, f32),
    ) -> Plot {
        let area = match self.text {
            Some(t) => {
                let lh = t.line_height();
                outer.inset(t.measure_width("-000.0") + 12, lh + 8, 16, lh + 8)
            }
            None => outer.inset(12, 12, 12, 12),
        };
        let plot = Plot { area, x, y };
        plot.grid(canvas);
        canvas.stroke_rect(area, canvas::AXIS);

        if let Some(t) = self.text {
            let lh = t.line_height() as i64;
            t.composite(canvas, title, area.x as i64, outer.y as i64 + 2, canvas::BLACK);
            let label = |v: f32| format!("{:.1}", v);
            let y_hi = label(y.1);
            let y_lo = label(y.0);
            let left = |s: &str| area.x as i64 - t.measure_width(s) as i64 - 6;
            t.composite(canvas, &y_hi, left(&y_hi), area.y as i64, canvas::AXIS);
            t.composite(canvas, &y_lo, left(&y_lo), area.bottom() as i64 - lh, canvas::AXIS);
            let x_lo = label(x.0);
            let x_hi = label(x.1);
            let below = area.bottom() as i64 + 4;
            t.composite(canvas, &x_lo, area.x as i64, below, canvas::AXIS);
            t.composite(
                canvas,
                &x_hi,
                area.right() as i64 - t.measure_width(&x_hi) as i64,
                below,
                canvas::AXIS,
            );
        }
        plot
    }
}

/// Display range of a level-scaled series; dB floors are cut off.
fn level_range(values: &[f32], level: Level) -> (f32, f32) {
    let (lo, hi) = value_range(values);
    if level.is_db() {
        (lo.max(hi - DB_DISPLAY_RANGE), hi + 5.0)
    } else {
        (lo.min(0.0), hi * 1.05)
    }
}

/// Number of panels drawn for `analysis`.
pub fn panel_count(analysis: &Analysis) -> usize {
    1 + analysis.spectrum.is_some() as usize
        + analysis.spectrogram.is_some() as usize
        + 2 * analysis.mel.is_some() as usize
        + analysis.pitch.is_some() as usize
}

/// Draw every available result of `analysis` as stacked panels.
pub fn render(
    analysis: &Analysis,
    width: u32,
    height: u32,
    text: Option<&TextOverlay>,
) -> Canvas {
    let mut canvas = Canvas::new(width, height, canvas::WHITE);
    let panels = panel_count(analysis) as u32;
    let panel_height = height / panels;
    let mut slots = (0..panels).map(|i| Rect::new(0, i * panel_height, width, panel_height));
    let frame = PanelFrame { text };
    let sr = analysis.sample_rate as f32;

    if let Some(outer) = slots.next() {
        let wave = &analysis.waveform;
        let amp = analysis.peak.max(1.0);
        let plot = frame.plot(
            &mut canvas,
            outer,
            "Time wave [s]",
            (0.0, analysis.duration.max(1e-3)),
            (-amp, amp),
        );
        plot.series(&mut canvas, &wave.times(), &wave.samples, canvas::BLUE);
    }

    if let Some((spectrum, outer)) =
        analysis.spectrum.as_ref().and_then(|s| slots.next().map(|r| (s, r)))
    {
        let mut range = level_range(&spectrum.amplitude, spectrum.level);
        if let Some(c) = &analysis.cepstrum {
            let env = level_range(&c.envelope, c.level);
            range = (range.0.min(env.0), range.1.max(env.1));
        }
        let title = format!("Frequency response [{}]", spectrum.level.unit_label());
        let plot = frame.plot(&mut canvas, outer, &title, (0.0, sr / 2.0), range);
        plot.series(&mut canvas, &spectrum.freqs, &spectrum.amplitude, canvas::BLUE);
        if let Some(c) = &analysis.cepstrum {
            plot.series(&mut canvas, &c.envelope_freqs, &c.envelope, canvas::ORANGE);
        }
    }

    if let Some((spectrogram, outer)) =
        analysis.spectrogram.as_ref().and_then(|s| slots.next().map(|r| (s, r)))
    {
        let flat: Vec<f32> = spectrogram.frames.iter().flatten().copied().collect();
        let range = level_range(&flat, spectrogram.level);
        let title = format!("Spectrogram [{}]", spectrogram.level.unit_label());
        let plot = frame.plot(
            &mut canvas,
            outer,
            &title,
            (0.0, spectrogram.final_time.max(1e-3)),
            (0.0, sr / 2.0),
        );
        plot.heatmap(&mut canvas, &spectrogram.frames, range);
    }

    if let Some((mel, outer)) = analysis.mel.as_ref().and_then(|m| slots.next().map(|r| (m, r)))
    {
        let range = level_range(&mel.amplitude, mel.level);
        let title = format!("Mel spectrum [{}]", mel.level.unit_label());
        let plot = frame.plot(&mut canvas, outer, &title, (0.0, sr / 2.0), range);
        plot.bars(&mut canvas, &mel.centers, &mel.amplitude, canvas::GREEN);
    }

    if let Some((bank, outer)) = analysis
        .mel
        .as_ref()
        .and_then(|m| slots.next().map(|r| (&m.filter_bank, r)))
    {
        let plot = frame.plot(&mut canvas, outer, "Mel filter bank", (0.0, sr / 2.0), (0.0, 1.05));
        for (i, filter) in bank.weights.iter().enumerate() {
            let color = if i % 2 == 0 { canvas::GREEN } else { canvas::BLUE };
            plot.series(&mut canvas, &bank.freqs, filter, color);
        }
    }

    if let Some((pitch, outer)) =
        analysis.pitch.as_ref().and_then(|p| slots.next().map(|r| (p, r)))
    {
        let top = pitch.f0.iter().copied().fold(0.0f32, f32::max).max(100.0) * 1.2;
        let plot = frame.plot(
            &mut canvas,
            outer,
            "f0 [Hz]",
            (0.0, analysis.duration.max(1e-3)),
            (0.0, top),
        );
        plot.markers(&mut canvas, &pitch.times, &pitch.f0, canvas::RED);
    }

    canvas
}

/// File name prefix of graphs for `analysis`.
pub fn graph_prefix(analysis: &Analysis) -> String {
    format!("{}_", analysis.kind)
}

/// Render and save `dir/<kind>_<YYYYmmdd_HHMMSS>.png`.
pub fn save(
    analysis: &Analysis,
    dir: &Path,
    width: u32,
    height: u32,
    text: Option<&TextOverlay>,
) -> Result<PathBuf> {
    output::ensure_dir(dir)?;
    let path = output::timestamped_path(dir, &graph_prefix(analysis), "png");
    render(analysis, width, height, text).save_png(&path)?;
    log::info!("Saved graph: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analysis::{analyze, AnalysisKind, AnalysisSettings};
    use crate::audio::features::Waveform;
    use crate::dsp::pitch::PitchParams;
    use std::f32::consts::PI;

    fn analysis(kind: AnalysisKind) -> Analysis {
        let samples = (0..8192)
            .map(|n| 0.3 * (2.0 * PI * 440.0 * n as f32 / 16000.0).sin())
            .collect();
        let settings = AnalysisSettings {
            kind,
            pitch: PitchParams {
                frame_size: 1024,
                ..PitchParams::default()
            },
            ..AnalysisSettings::default()
        };
        analyze(&Waveform::new(samples, 16000), &settings).unwrap()
    }

    fn has_color_in(canvas: &Canvas, rows: std::ops::Range<u32>, pred: impl Fn(Rgba) -> bool) -> bool {
        rows.flat_map(|y| (0..canvas.width()).map(move |x| (x, y)))
            .any(|(x, y)| canvas.pixel(x, y).map_or(false, &pred))
    }

    #[test]
    fn panel_counts_follow_kind() {
        assert_eq!(panel_count(&analysis(AnalysisKind::Spectrum)), 2);
        assert_eq!(panel_count(&analysis(AnalysisKind::Spectrogram)), 3);
        assert_eq!(panel_count(&analysis(AnalysisKind::Cepstrum)), 5);
    }

    #[test]
    fn spectrum_figure_draws_both_panels() {
        let canvas = render(&analysis(AnalysisKind::Spectrum), 400, 300, None);
        assert_eq!((canvas.width(), canvas.height()), (400, 300));
        assert!(has_color_in(&canvas, 0..150, |p| p == canvas::BLUE));
        assert!(has_color_in(&canvas, 150..300, |p| p == canvas::BLUE));
    }

    #[test]
    fn spectrogram_panel_is_a_heatmap() {
        let canvas = render(&analysis(AnalysisKind::Spectrogram), 300, 300, None);
        // Middle third holds the heatmap: jet colors have a zero channel.
        assert!(has_color_in(&canvas, 100..200, |p| p[3] == 255
            && (p[0] == 0 || p[2] == 0)
            && p != canvas::BLACK));
    }

    #[test]
    fn cepstrum_figure_overlays_envelope() {
        // Five 80-pixel panels: wave, spectrum, mel bands, filter bank, f0.
        let canvas = render(&analysis(AnalysisKind::Cepstrum), 400, 400, None);
        assert!(has_color_in(&canvas, 80..160, |p| p == canvas::ORANGE));
        assert!(has_color_in(&canvas, 160..240, |p| p == canvas::GREEN));
        assert!(!has_color_in(&canvas, 160..240, |p| p == canvas::BLUE));
        assert!(has_color_in(&canvas, 320..400, |p| p == canvas::RED));
    }

    #[test]
    fn cepstrum_figure_draws_filter_bank() {
        let canvas = render(&analysis(AnalysisKind::Cepstrum), 400, 400, None);
        // Alternating filters in green and blue.
        assert!(has_color_in(&canvas, 240..320, |p| p == canvas::GREEN));
        assert!(has_color_in(&canvas, 240..320, |p| p == canvas::BLUE));
        assert!(!has_color_in(&canvas, 240..320, |p| p == canvas::RED));
    }

    #[test]
    fn save_writes_png_with_kind_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = save(&analysis(AnalysisKind::Spectrum), dir.path(), 200, 160, None).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("spectrum_"));
        assert!(name.ends_with(".png"));
        assert_eq!(image::open(&path).unwrap().width(), 200);
    }
}
