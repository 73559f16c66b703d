use super::{check_sample_rate, DspError, Result};

/// Overlapping frames of a signal, borrowed from it rather than copied.
#[derive(Clone, Debug)]
pub struct Segments<'a> {
    data: &'a [f32],
    /// Start index of each frame in the source signal.
    pub starts: Vec<usize>,
    pub frame_size: usize,
    /// End time in seconds of the last frame.
    pub final_time: f32,
}

impl<'a> Segments<'a> {
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Frame `index` as a slice of the source signal.
    pub fn frame(&self, index: usize) -> &'a [f32] {
        let start = self.starts[index];
        &self.data[start..start + self.frame_size]
    }

    /// Centre time in seconds of every frame.
    pub fn centre_times(&self, sample_rate: u32) -> Vec<f32> {
        let half = self.frame_size as f32 / 2.0;
        self.starts
            .iter()
            .map(|&s| (s as f32 + half) / sample_rate as f32)
            .collect()
    }
}

pub(crate) fn check_frame(frame_size: usize, overlap_rate: f32) -> Result<()> {
    if frame_size < 2 {
        return Err(DspError::InvalidFrameSize(frame_size));
    }
    if !(0.0..100.0).contains(&overlap_rate) {
        return Err(DspError::InvalidOverlap(overlap_rate));
    }
    Ok(())
}

/// Cut `data` into `frame_size` frames overlapping by `overlap_rate` percent.
///
/// The frame count is `floor((len - overlap) / hop)`, with hop
/// `frame_size * (1 - rate/100)`; frame `i` starts at `floor(hop * i)`.
pub fn overlap(
    data: &[f32],
    sample_rate: u32,
    frame_size: usize,
    overlap_rate: f32,
) -> Result<Segments<'_>> {
    check_sample_rate(sample_rate)?;
    check_frame(frame_size, overlap_rate)?;
    if data.is_empty() {
        return Err(DspError::EmptySignal);
    }

    let ratio = overlap_rate as f64 / 100.0;
    let hop = frame_size as f64 * (1.0 - ratio);
    let overlap_len = frame_size as f64 * ratio;
    let count = ((data.len() as f64 - overlap_len) / hop).floor().max(0.0) as usize;

    let starts: Vec<usize> = (0..count)
        .map(|i| (hop * i as f64) as usize)
        .take_while(|&start| start + frame_size <= data.len())
        .collect();

    let Some(&last) = starts.last() else {
        return Err(DspError::SignalTooShort {
            len: data.len(),
            frame: frame_size,
        });
    };

    Ok(Segments {
        data,
        starts,
        frame_size,
        final_time: (last + frame_size) as f32 / sample_rate as f32,
    })
}
