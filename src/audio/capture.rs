//! Microphone capture over cpal.
//!
//! cpal delivers samples on its own callback thread. The callback converts them
//! to `i16` and hands each chunk to a bounded channel; [`MicStream::read`]
//! blocks on that channel until a full buffer has arrived.

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleFormat, SizedSample, StreamConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::time::Duration;

/// A read that receives nothing for this long fails.
pub const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Chunks buffered between the callback and the reader.
const CHANNEL_CAPACITY: usize = 64;

/// Blocking source of interleaved 16-bit frames.
pub trait SampleSource {
    fn channels(&self) -> u16;
    fn sample_rate(&self) -> u32;
    /// Block until `frames` frames (`frames * channels` samples) are available.
    fn read(&mut self, frames: usize) -> Result<Vec<i16>>;
    /// Chunks lost because the reader fell behind.
    fn dropped_chunks(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub is_default: bool,
    pub max_input_channels: u16,
    pub default_sample_rate: Option<u32>,
}

/// Enumerate the input devices of the default host.
pub fn list_devices() -> Result<Vec<DeviceInfo>> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());
    let devices = host
        .input_devices()
        .context("Failed to enumerate input devices")?;

    let mut infos = Vec::new();
    for (index, device) in devices.enumerate() {
        let name = device.name().unwrap_or_else(|_| "Unknown Device".to_string());
        let max_input_channels = device
            .supported_input_configs()
            .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
            .unwrap_or(0);
        let default_sample_rate = device.default_input_config().ok().map(|c| c.sample_rate().0);

        infos.push(DeviceInfo {
            index,
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
            max_input_channels,
            default_sample_rate,
        });
    }

    Ok(infos)
}

fn find_device(index: Option<usize>) -> Result<Device> {
    let host = cpal::default_host();
    match index {
        None => host
            .default_input_device()
            .ok_or_else(|| anyhow!("No default input device found")),
        Some(i) => host
            .input_devices()
            .context("Failed to enumerate input devices")?
            .nth(i)
            .ok_or_else(|| anyhow!("No input device with index {}", i)),
    }
}

/// Reassembles fixed-size reads from variable-size callback chunks.
struct ChunkReader {
    receiver: Receiver<Vec<i16>>,
    pending: Vec<i16>,
    timeout: Duration,
}

impl ChunkReader {
    fn new(receiver: Receiver<Vec<i16>>, timeout: Duration) -> Self {
        Self {
            receiver,
            pending: Vec::new(),
            timeout,
        }
    }

    fn read(&mut self, samples: usize) -> Result<Vec<i16>> {
        while self.pending.len() < samples {
            match self.receiver.recv_timeout(self.timeout) {
                Ok(chunk) => self.pending.extend_from_slice(&chunk),
                Err(RecvTimeoutError::Timeout) => bail!(
                    "No audio received from the input device for {:.1}s",
                    self.timeout.as_secs_f32()
                ),
                Err(RecvTimeoutError::Disconnected) => bail!("Audio stream closed"),
            }
        }
        Ok(self.pending.drain(..samples).collect())
    }
}

/// An open microphone input stream.
pub struct MicStream {
    stream: Option<cpal::Stream>,
    reader: ChunkReader,
    dropped: Arc<AtomicUsize>,
    name: String,
    channels: u16,
    sample_rate: u32,
}

impl MicStream {
    /// Open `device` (default input when `None`) and start capturing.
    pub fn open(
        device: Option<usize>,
        channels: u16,
        sample_rate: u32,
        frames_per_buffer: u32,
    ) -> Result<Self> {
        let device = find_device(device)?;
        let name = device.name().unwrap_or_else(|_| "Unknown Device".to_string());
        let sample_format = device
            .default_input_config()
            .with_context(|| format!("Failed to query input config of '{}'", name))?
            .sample_format();

        let (tx, rx) = mpsc::sync_channel(CHANNEL_CAPACITY);
        let dropped = Arc::new(AtomicUsize::new(0));

        let mut config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: BufferSize::Fixed(frames_per_buffer),
        };
        let stream = match build_stream(&device, &config, sample_format, tx.clone(), dropped.clone()) {
            Ok(stream) => stream,
            Err(err) => {
                log::warn!(
                    "Fixed buffer of {} frames rejected ({}), using the device default",
                    frames_per_buffer,
                    err
                );
                config.buffer_size = BufferSize::Default;
                build_stream(&device, &config, sample_format, tx, dropped.clone())
                    .with_context(|| format!("Failed to open input stream on '{}'", name))?
            }
        };
        stream.play().context("Failed to start input stream")?;

        log::info!(
            "Opened '{}': {}Hz, {} channel(s), {:?}, {} frames/buffer",
            name,
            sample_rate,
            channels,
            sample_format,
            frames_per_buffer
        );

        Ok(Self {
            stream: Some(stream),
            reader: ChunkReader::new(rx, READ_TIMEOUT),
            dropped,
            name,
            channels,
            sample_rate,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pause and release the device. Later reads fail once buffered data runs out.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream.pause().context("Failed to pause input stream")?;
            let dropped = self.dropped_chunks();
            if dropped > 0 {
                log::warn!("{} audio chunk(s) dropped while the reader was busy", dropped);
            }
            log::info!("Input stream stopped");
        }
        Ok(())
    }
}

impl SampleSource for MicStream {
    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read(&mut self, frames: usize) -> Result<Vec<i16>> {
        self.reader.read(frames * self.channels as usize)
    }

    fn dropped_chunks(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    format: SampleFormat,
    tx: SyncSender<Vec<i16>>,
    dropped: Arc<AtomicUsize>,
) -> Result<cpal::Stream> {
    match format {
        SampleFormat::I16 => build_typed::<i16>(device, config, tx, dropped),
        SampleFormat::U16 => build_typed::<u16>(device, config, tx, dropped),
        SampleFormat::I32 => build_typed::<i32>(device, config, tx, dropped),
        SampleFormat::F32 => build_typed::<f32>(device, config, tx, dropped),
        other => bail!("Unsupported sample format: {:?}", other),
    }
}

fn build_typed<T>(
    device: &Device,
    config: &StreamConfig,
    tx: SyncSender<Vec<i16>>,
    dropped: Arc<AtomicUsize>,
) -> Result<cpal::Stream>
where
    T: SizedSample + Send + 'static,
    i16: cpal::FromSample<T>,
{
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let chunk: Vec<i16> = data
                .iter()
                .map(|&s| <i16 as cpal::Sample>::from_sample(s))
                .collect();
            match tx.try_send(chunk) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        },
        |err| log::error!("Audio stream error: {}", err),
        None,
    )?;
    Ok(stream)
}
