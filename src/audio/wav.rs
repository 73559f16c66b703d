use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};

use super::pcm::I16_FULL_SCALE;
use crate::output;

/// File name prefix of saved recordings.
pub const RECORDING_PREFIX: &str = "recorded-sound_";

/// Write `samples` as 16-bit mono PCM. Samples are clamped to `[-1, 1]`.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<PathBuf> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;
    for &sample in samples {
        writer
            .write_sample((sample.clamp(-1.0, 1.0) * I16_FULL_SCALE) as i16)
            .context("Failed to write WAV sample")?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;

    Ok(path.to_path_buf())
}

/// Save a recording as `dir/recorded-sound_<YYYYmmdd_HHMMSS>.wav`.
pub fn save_wav(dir: &Path, samples: &[f32], sample_rate: u32) -> Result<PathBuf> {
    output::ensure_dir(dir)?;
    let path = output::timestamped_path(dir, RECORDING_PREFIX, "wav");
    write_wav(&path, samples, sample_rate)?;
    log::info!(
        "Saved recording: {} ({:.1}s)",
        path.display(),
        samples.len() as f32 / sample_rate as f32
    );
    Ok(path)
}
