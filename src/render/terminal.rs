//! Live terminal view for the real-time mode.

use anyhow::{Context, Result};
use ratatui::{
    buffer::Buffer,
    crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    symbols,
    text::Line,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Widget},
    DefaultTerminal, Frame,
};
use std::time::Duration;

use super::canvas::jet;
use super::{decimate, value_range};
use crate::audio::features::Analysis;

/// Status shown next to the graphs.
#[derive(Clone, Debug, Default)]
pub struct Status {
    pub device: String,
    pub iteration: u64,
    pub dropped_chunks: usize,
}

/// Spectrogram drawn as background-colored cells, time along x.
pub struct Heatmap<'a> {
    frames: &'a [Vec<f32>],
    range: (f32, f32),
    block: Option<Block<'a>>,
}

impl<'a> Heatmap<'a> {
    pub fn new(frames: &'a [Vec<f32>], range: (f32, f32)) -> Self {
        Self {
            frames,
            range,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for Heatmap<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.render(area, buf);
                inner
            }
            None => area,
        };
        let bins = self.frames.first().map_or(0, Vec::len);
        if self.frames.is_empty() || bins == 0 || inner.width == 0 || inner.height == 0 {
            return;
        }

        let span = (self.range.1 - self.range.0).max(1e-6);
        for col in 0..inner.width {
            let t = (col as usize * self.frames.len() / inner.width as usize)
                .min(self.frames.len() - 1);
            for row in 0..inner.height {
                let f = ((inner.height - 1 - row) as usize * bins / inner.height as usize)
                    .min(bins - 1);
                let [r, g, b, _] = jet((self.frames[t][f] - self.range.0) / span);
                buf[(inner.x + col, inner.y + row)]
                    .set_symbol(" ")
                    .set_bg(Color::Rgb(r, g, b));
            }
        }
    }
}

fn line_chart<'a>(
    title: String,
    datasets: Vec<Dataset<'a>>,
    x: (f64, f64),
    y: (f64, f64),
) -> Chart<'a> {
    let label = |v: f64| Line::from(format!("{:.0}", v));
    Chart::new(datasets)
        .block(Block::default().title(title).borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .bounds([x.0, x.1])
                .labels([label(x.0), label(x.1)])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([y.0, y.1])
                .labels([label(y.0), label(y.1)])
                .style(Style::default().fg(Color::DarkGray)),
        )
}

fn dataset(data: &[(f64, f64)], color: Color) -> Dataset<'_> {
    Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(data)
}

/// Clip a dB range to its top 100 dB so floored bins do not flatten the view.
fn display_range(values: &[f32], is_db: bool) -> (f64, f64) {
    let (lo, hi) = value_range(values);
    let lo = if is_db { lo.max(hi - 100.0) } else { lo.min(0.0) };
    (lo as f64, hi as f64)
}

/// Draw one frame of the live view.
pub fn draw(frame: &mut Frame, analysis: &Analysis, status: &Status) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(45),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(rows[2]);

    let columns = (rows[0].width as usize).max(1) * 2;
    let sr = analysis.sample_rate as f64;

    let wave = &analysis.waveform;
    let wave_points = decimate(&wave.times(), &wave.samples, columns);
    let amp = analysis.peak.max(1.0) as f64;
    frame.render_widget(
        line_chart(
            " Time wave [s] ".into(),
            vec![dataset(&wave_points, Color::Cyan)],
            (0.0, analysis.duration.max(1e-3) as f64),
            (-amp, amp),
        ),
        rows[0],
    );

    if let Some(spectrogram) = &analysis.spectrogram {
        let (lo, hi) = display_range(&spectrogram.mean, spectrogram.level.is_db());
        let title = format!(" Spectrogram [{}] ", spectrogram.level.unit_label());
        frame.render_widget(
            Heatmap::new(&spectrogram.frames, (lo as f32, hi as f32))
                .block(Block::default().title(title).borders(Borders::ALL)),
            rows[1],
        );
    } else if let Some(spectrum) = &analysis.spectrum {
        let spectrum_points = decimate(&spectrum.freqs, &spectrum.amplitude, columns);
        let envelope_points = analysis
            .cepstrum
            .as_ref()
            .map(|c| decimate(&c.envelope_freqs, &c.envelope, columns))
            .unwrap_or_default();
        let mut datasets = vec![dataset(&spectrum_points, Color::Yellow)];
        if !envelope_points.is_empty() {
            datasets.push(dataset(&envelope_points, Color::LightRed));
        }
        let (lo, hi) = display_range(&spectrum.amplitude, spectrum.level.is_db());
        frame.render_widget(
            line_chart(
                format!(" Frequency response [{}] ", spectrum.level.unit_label()),
                datasets,
                (0.0, sr / 2.0),
                (lo, hi + 5.0),
            ),
            rows[1],
        );
    }

    let pitch_points: Vec<(f64, f64)> = analysis
        .pitch
        .as_ref()
        .map(|p| {
            p.times
                .iter()
                .zip(&p.f0)
                .filter(|(_, &f)| f > 0.0)
                .map(|(&t, &f)| (t as f64, f as f64))
                .collect()
        })
        .unwrap_or_default();
    let f0_top = pitch_points.iter().map(|p| p.1).fold(100.0, f64::max) * 1.2;
    frame.render_widget(
        line_chart(
            " f0 [Hz] ".into(),
            vec![dataset(&pitch_points, Color::Green).graph_type(GraphType::Scatter)],
            (0.0, analysis.duration.max(1e-3) as f64),
            (0.0, f0_top),
        ),
        bottom[0],
    );

    let f0_text = analysis
        .fundamental_hz()
        .map_or_else(|| "-".to_string(), |f| format!("{:.1} Hz", f));
    let info = vec![
        Line::from(format!("device:  {}", status.device)),
        Line::from(format!("mode:    {}", analysis.kind)),
        Line::from(format!("rate:    {} Hz", analysis.sample_rate)),
        Line::from(format!("peak:    {:.3}", analysis.peak)),
        Line::from(format!("rms:     {:.3}", analysis.rms)),
        Line::from(format!("f0:      {}", f0_text)),
        Line::from(format!("frames:  {}", status.iteration)),
        Line::from(format!("dropped: {}", status.dropped_chunks)),
    ];
    frame.render_widget(
        Paragraph::new(info).block(Block::default().title(" Info ").borders(Borders::ALL)),
        bottom[1],
    );

    frame.render_widget(
        Paragraph::new(" [Q]/[Esc]/[Ctrl+C] Quit").style(Style::default().fg(Color::DarkGray)),
        rows[3],
    );
}

/// `true` for the keys that end the live view.
pub fn is_quit_key(code: KeyCode, modifiers: KeyModifiers) -> bool {
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
        KeyCode::Char('c') => modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Owns the terminal while the live view is shown.
pub struct LiveView {
    terminal: DefaultTerminal,
    pause: Duration,
    previous_level: log::LevelFilter,
    restored: bool,
}

impl LiveView {
    /// Take over the terminal. Log output is limited to warnings until
    /// [`LiveView::finish`] so it does not tear the screen.
    pub fn start(pause: Duration) -> Result<Self> {
        let previous_level = log::max_level();
        log::set_max_level(log::LevelFilter::Warn.min(previous_level));
        let terminal = ratatui::try_init().context("Failed to initialize terminal")?;
        Ok(Self {
            terminal,
            pause,
            previous_level,
            restored: false,
        })
    }

    pub fn draw(&mut self, analysis: &Analysis, status: &Status) -> Result<()> {
        self.terminal
            .draw(|frame| draw(frame, analysis, status))
            .context("Failed to draw terminal view")?;
        Ok(())
    }

    /// Wait up to the pause interval for input; `true` when the user quit.
    pub fn poll_quit(&mut self) -> Result<bool> {
        if !event::poll(self.pause).context("Failed to poll terminal events")? {
            return Ok(false);
        }
        match event::read().context("Failed to read terminal event")? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                Ok(is_quit_key(key.code, key.modifiers))
            }
            _ => Ok(false),
        }
    }

    pub fn finish(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if !self.restored {
            ratatui::restore();
            log::set_max_level(self.previous_level);
            self.restored = true;
        }
    }
}

impl Drop for LiveView {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analysis::{analyze, AnalysisKind, AnalysisSettings};
    use crate::audio::features::Waveform;
    use crate::dsp::pitch::PitchParams;
    use ratatui::{backend::TestBackend, Terminal};
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

    fn buffer_text(buffer: &Buffer) -> String {
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn draws_spectrum_view() {
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        let analysis = analysis(AnalysisKind::Cepstrum);
        let status = Status {
            device: "test mic".into(),
            iteration: 3,
            dropped_chunks: 0,
        };
        terminal.draw(|f| draw(f, &analysis, &status)).unwrap();

        let text = buffer_text(terminal.backend().buffer());
        assert!(text.contains("Time wave"));
        assert!(text.contains("Frequency response"));
        assert!(text.contains("test mic"));
        assert!(text.contains("Quit"));
    }

    #[test]
    fn draws_spectrogram_heatmap() {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        let analysis = analysis(AnalysisKind::Spectrogram);
        terminal
            .draw(|f| draw(f, &analysis, &Status::default()))
            .unwrap();

        let buffer = terminal.backend().buffer();
        assert!(buffer_text(buffer).contains("Spectrogram"));
        assert!(buffer
            .content()
            .iter()
            .any(|c| matches!(c.bg, Color::Rgb(..))));
    }

    #[test]
    fn heatmap_fills_inner_area() {
        let frames = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let area = Rect::new(0, 0, 4, 4);
        let mut buf = Buffer::empty(area);
        Heatmap::new(&frames, (0.0, 1.0)).render(area, &mut buf);

        // Bottom-left is frame 0, bin 0 (low), top-left frame 0, bin 1 (high).
        assert_eq!(buf[(0, 3)].bg, Color::Rgb(0, 0, 127));
        assert_eq!(buf[(0, 0)].bg, Color::Rgb(127, 0, 0));
        assert_eq!(buf[(3, 0)].bg, Color::Rgb(0, 0, 127));
    }

    #[test]
    fn quit_keys() {
        assert!(is_quit_key(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(is_quit_key(KeyCode::Esc, KeyModifiers::NONE));
        assert!(is_quit_key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!is_quit_key(KeyCode::Char('c'), KeyModifiers::NONE));
        assert!(!is_quit_key(KeyCode::Enter, KeyModifiers::NONE));
    }
}
