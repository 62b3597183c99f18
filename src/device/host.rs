//! Hardware devices through `cpal`
//!
//! cpal runs capture and playback as two streams with their own callbacks and
//! period sizes. Captured bytes go through a lock-free ring into the playback
//! callback, which re-chunks everything into periods of exactly `frame_count`
//! frames before invoking the stream callback.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, error, info, warn};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapRb};

use crate::audio::{FrameBuffer, SampleFormat};
use crate::device::backend::{Device, DeviceBackend, DeviceCallback, DeviceConfig, Direction};
use crate::error::{Result, TinyaudioError};

/// Periods of capture headroom held by the ring
const RING_PERIODS: usize = 8;

/// Default input and output devices of the platform's default host
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        CpalBackend
    }
}

impl DeviceBackend for CpalBackend {
    fn name(&self) -> &str {
        "cpal"
    }

    fn open(&self, config: &DeviceConfig) -> Result<Box<dyn Device>> {
        let sample_format = cpal_format(config.format)?;
        let host = cpal::default_host();

        let output = host
            .default_output_device()
            .ok_or_else(|| TinyaudioError::DeviceUnavailable {
                reason: "no default output device".to_string(),
            })?;
        let mut fixed_period = check_output_support(&output, config, sample_format)?;

        let input = match config.direction {
            Direction::Duplex => {
                let input = host.default_input_device().ok_or_else(|| {
                    TinyaudioError::DeviceUnavailable {
                        reason: "no default input device".to_string(),
                    }
                })?;
                fixed_period &= check_input_support(&input, config, sample_format)?;
                Some(input)
            }
            Direction::Playback => None,
        };

        info!(
            "Opened {} device '{}': {} x{} @ {} Hz",
            config.direction,
            output.name().unwrap_or_else(|_| "unknown".to_string()),
            config.format,
            config.channels,
            config.sample_rate
        );
        if !fixed_period {
            debug!(
                "Host rejects {}-frame periods, re-chunking from its default size",
                config.frame_count
            );
        }

        Ok(Box::new(CpalDevice {
            config: *config,
            sample_format,
            input,
            output,
            input_stream: None,
            output_stream: None,
            fixed_period,
            running: Arc::new(AtomicBool::new(false)),
            overruns: Arc::new(AtomicU64::new(0)),
        }))
    }
}

struct CpalDevice {
    config: DeviceConfig,
    sample_format: cpal::SampleFormat,
    input: Option<cpal::Device>,
    output: cpal::Device,
    input_stream: Option<cpal::Stream>,
    output_stream: Option<cpal::Stream>,
    fixed_period: bool,
    running: Arc<AtomicBool>,
    overruns: Arc<AtomicU64>,
}

impl CpalDevice {
    fn stream_config(&self) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels: self.config.channels as cpal::ChannelCount,
            sample_rate: cpal::SampleRate(self.config.sample_rate),
            buffer_size: if self.fixed_period {
                cpal::BufferSize::Fixed(self.config.frame_count as cpal::FrameCount)
            } else {
                cpal::BufferSize::Default
            },
        }
    }

    fn build_input(&self, device: &cpal::Device) -> Result<(cpal::Stream, HeapCons<u8>)> {
        let ring = HeapRb::<u8>::new(self.config.period_bytes() * RING_PERIODS);
        let (mut producer, consumer) = ring.split();
        let overruns = Arc::clone(&self.overruns);

        let stream = device
            .build_input_stream_raw(
                &self.stream_config(),
                self.sample_format,
                move |data: &cpal::Data, _: &cpal::InputCallbackInfo| {
                    let bytes = data.bytes();
                    // Whole blocks only, so the ring stays frame aligned
                    if producer.vacant_len() >= bytes.len() {
                        producer.push_slice(bytes);
                    } else {
                        overruns.fetch_add(1, Ordering::Relaxed);
                    }
                },
                |err| error!("Audio input stream error: {}", err),
                None,
            )
            .map_err(build_error)?;

        Ok((stream, consumer))
    }

    fn build_output(
        &self,
        mut capture: Option<HeapCons<u8>>,
        mut callback: DeviceCallback,
    ) -> Result<cpal::Stream> {
        let DeviceConfig {
            format,
            channels,
            frame_count,
            ..
        } = self.config;
        let running = Arc::clone(&self.running);

        let mut input = FrameBuffer::new(format, channels, frame_count);
        let mut output = FrameBuffer::new(format, channels, frame_count);
        let period_bytes = output.as_bytes().len();
        let mut offset = period_bytes;

        self.output
            .build_output_stream_raw(
                &self.stream_config(),
                self.sample_format,
                move |data: &mut cpal::Data, _: &cpal::OutputCallbackInfo| {
                    let out = data.bytes_mut();
                    if !running.load(Ordering::Acquire) {
                        out.fill(format.silence_byte());
                        return;
                    }

                    let mut written = 0;
                    while written < out.len() {
                        if offset == period_bytes {
                            match capture.as_mut() {
                                Some(ring) if ring.occupied_len() >= period_bytes => {
                                    ring.pop_slice(input.as_bytes_mut());
                                }
                                _ => input.fill_silence(),
                            }
                            output.fill_silence();
                            callback(&input.as_frames(), &mut output.as_frames_mut());
                            offset = 0;
                        }

                        let count = (out.len() - written).min(period_bytes - offset);
                        out[written..written + count]
                            .copy_from_slice(&output.as_bytes()[offset..offset + count]);
                        written += count;
                        offset += count;
                    }
                },
                |err| error!("Audio output stream error: {}", err),
                None,
            )
            .map_err(build_error)
    }
}

impl Device for CpalDevice {
    fn config(&self) -> &DeviceConfig {
        &self.config
    }

    fn start(&mut self, callback: DeviceCallback) -> Result<()> {
        if self.output_stream.is_some() {
            return Err(TinyaudioError::invalid_state("device is already running"));
        }

        let (input_stream, capture) = match &self.input {
            Some(device) => {
                let (stream, consumer) = self.build_input(device)?;
                (Some(stream), Some(consumer))
            }
            None => (None, None),
        };
        let output_stream = self.build_output(capture, callback)?;

        let streams: Vec<&cpal::Stream> = input_stream.iter().chain([&output_stream]).collect();
        play_streams(&self.running, &streams)?;

        self.input_stream = input_stream;
        self.output_stream = Some(output_stream);
        debug!("cpal streams running");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::Release);

        for stream in [self.output_stream.take(), self.input_stream.take()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = stream.pause() {
                warn!("Failed to pause cpal stream: {}", e);
            }
            // dropping the stream joins its callback thread
            drop(stream);
        }

        let overruns = self.overruns.swap(0, Ordering::Relaxed);
        if overruns > 0 {
            warn!("Dropped {} capture blocks while the ring was full", overruns);
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Error while closing cpal device: {}", e);
        }
        self.input = None;
    }

    fn is_running(&self) -> bool {
        self.output_stream.is_some() && self.running.load(Ordering::Acquire)
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        self.close();
    }
}

fn cpal_format(format: SampleFormat) -> Result<cpal::SampleFormat> {
    match format {
        SampleFormat::U8 => Ok(cpal::SampleFormat::U8),
        SampleFormat::S16 => Ok(cpal::SampleFormat::I16),
        SampleFormat::S32 => Ok(cpal::SampleFormat::I32),
        SampleFormat::F32 => Ok(cpal::SampleFormat::F32),
        // cpal has no packed 24-bit format
        SampleFormat::S24 => Err(TinyaudioError::sample_format_unavailable(format)),
    }
}

fn supports(
    range: &cpal::SupportedStreamConfigRange,
    config: &DeviceConfig,
    sample_format: cpal::SampleFormat,
) -> bool {
    range.channels() as usize == config.channels
        && range.sample_format() == sample_format
        && range.min_sample_rate().0 <= config.sample_rate
        && config.sample_rate <= range.max_sample_rate().0
}

/// Whether the host can run periods of exactly `frame_count` frames
fn accepts_period(range: &cpal::SupportedStreamConfigRange, config: &DeviceConfig) -> bool {
    match range.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } => {
            (*min as usize) <= config.frame_count && config.frame_count <= *max as usize
        }
        cpal::SupportedBufferSize::Unknown => false,
    }
}

/// Check the output side and report whether a fixed period size can be used
fn check_output_support(
    device: &cpal::Device,
    config: &DeviceConfig,
    sample_format: cpal::SampleFormat,
) -> Result<bool> {
    let ranges: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| TinyaudioError::DeviceUnavailable {
            reason: e.to_string(),
        })?
        .filter(|range| supports(range, config, sample_format))
        .collect();

    if ranges.is_empty() {
        return Err(unsupported_layout("output", config));
    }
    Ok(ranges.iter().any(|range| accepts_period(range, config)))
}

fn check_input_support(
    device: &cpal::Device,
    config: &DeviceConfig,
    sample_format: cpal::SampleFormat,
) -> Result<bool> {
    let ranges: Vec<_> = device
        .supported_input_configs()
        .map_err(|e| TinyaudioError::DeviceUnavailable {
            reason: e.to_string(),
        })?
        .filter(|range| supports(range, config, sample_format))
        .collect();

    if ranges.is_empty() {
        return Err(unsupported_layout("input", config));
    }
    Ok(ranges.iter().any(|range| accepts_period(range, config)))
}

fn unsupported_layout(side: &str, config: &DeviceConfig) -> TinyaudioError {
    TinyaudioError::DeviceUnavailable {
        reason: format!(
            "default {} device cannot run {} x{} @ {} Hz",
            side, config.format, config.channels, config.sample_rate
        ),
    }
}

fn build_error(err: cpal::BuildStreamError) -> TinyaudioError {
    match err {
        cpal::BuildStreamError::BackendSpecific { err }
            if err.description.to_lowercase().contains("busy") =>
        {
            TinyaudioError::DeviceBusy {
                reason: err.description,
            }
        }
        other => TinyaudioError::DeviceUnavailable {
            reason: other.to_string(),
        },
    }
}

/// Raise the running flag and play every stream, lowering it again if one fails
fn play_streams<S: StreamTrait>(running: &AtomicBool, streams: &[&S]) -> Result<()> {
    running.store(true, Ordering::Release);
    for stream in streams {
        if let Err(e) = stream.play() {
            running.store(false, Ordering::Release);
            return Err(play_error(e));
        }
    }
    Ok(())
}

fn play_error(err: cpal::PlayStreamError) -> TinyaudioError {
    TinyaudioError::DeviceUnavailable {
        reason: err.to_string(),
    }
}
