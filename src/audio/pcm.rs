//! Raw PCM helpers shared by capture, file input and analysis.

/// Full-scale value of a signed 16-bit sample (`2^15 - 1`).
pub const I16_FULL_SCALE: f32 = 32767.0;

/// Scale signed 16-bit samples to `[-1, 1]`.
pub fn normalize_i16(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / I16_FULL_SCALE).collect()
}

/// Average interleaved channels down to mono. A trailing partial frame is dropped.
pub fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Time in seconds of each sample.
pub fn time_axis(len: usize, sample_rate: u32) -> Vec<f32> {
    (0..len).map(|i| i as f32 / sample_rate as f32).collect()
}

pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}
