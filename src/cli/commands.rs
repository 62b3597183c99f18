//! CLI Command Implementations

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::audio::{Frames, FramesMut, Sample, SampleFormat, I24};
use crate::codec::probe as probe_file;
use crate::device::{default_backend, DeviceBackend, SimulatedBackend};
use crate::engine::{AudioSession, SessionConfig};

/// Print the header of a WAV file.
pub fn probe(path: &Path, json: bool) -> Result<()> {
    let info = probe_file(path).with_context(|| format!("cannot probe {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("File:        {}", path.display());
    println!("Format:      {} ({}-bit)", info.format, info.format.bits_per_sample());
    println!("Channels:    {}", info.channels);
    println!("Sample rate: {} Hz", info.sample_rate);
    println!("Frames:      {}", info.total_frame_count);
    println!("Payload:     {} bytes", info.payload_bytes());
    println!("Duration:    {:.3}s", info.duration().as_secs_f64());

    Ok(())
}

/// Options of the `render` command
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub format: Option<SampleFormat>,
    pub channels: Option<usize>,
    pub sample_rate: Option<u32>,
    pub frame_count: usize,
    pub gain: f32,
}

/// Render `input` into `output` offline.
pub fn render(input: &Path, output: &Path, options: RenderOptions) -> Result<()> {
    let info = probe_file(input).with_context(|| format!("cannot probe {}", input.display()))?;

    let config = SessionConfig::offline(
        input,
        output,
        options.format.unwrap_or(info.format),
        options.channels.unwrap_or(info.channels),
        options.sample_rate.unwrap_or(info.sample_rate),
        options.frame_count,
    );
    let mut session = AudioSession::new(config)?;
    let status = session.status();

    let gain = options.gain;
    session
        .start(
            move |input: &Frames<'_>, output: &mut FramesMut<'_>| apply_gain(input, output, gain),
            || debug!("Render complete"),
        )
        .with_context(|| format!("cannot render {}", input.display()))?;

    println!(
        "Rendered {} frames in {} callbacks to {}",
        info.total_frame_count,
        status.callback_count(),
        output.display()
    );
    Ok(())
}

/// Options of the `stream` command
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    pub config: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub looping: bool,
    pub format: Option<SampleFormat>,
    pub channels: Option<usize>,
    pub sample_rate: Option<u32>,
    pub frame_count: Option<usize>,
    pub seconds: f64,
    pub gain: f32,
    pub simulated: bool,
}

impl StreamOptions {
    /// Session configuration from the config file, with flags layered on top
    pub fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)
                .with_context(|| format!("cannot load {}", path.display()))?,
            None => SessionConfig::default(),
        };

        config.offline = false;
        if let Some(input) = &self.input {
            config.input_file_path = Some(input.clone());
        }
        if let Some(output) = &self.output {
            config.output_file_path = Some(output.clone());
        }
        if self.looping {
            config.looping_input_file = true;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(channels) = self.channels {
            config.channels = channels;
        }
        if let Some(sample_rate) = self.sample_rate {
            config.sample_rate = sample_rate;
        }
        if let Some(frame_count) = self.frame_count {
            config.frame_count = frame_count;
        }

        Ok(config)
    }
}

/// Stream through the device for the requested time, then stop.
pub fn stream(options: StreamOptions) -> Result<()> {
    let config = options.session_config()?;
    let backend: Box<dyn DeviceBackend> = if options.simulated {
        Box::new(SimulatedBackend::new())
    } else {
        default_backend()
    };

    let mut session = AudioSession::with_backend(config, backend)?;
    let status = session.status();

    let gain = options.gain;
    session.start(
        move |input: &Frames<'_>, output: &mut FramesMut<'_>| apply_gain(input, output, gain),
        || info!("Stream ended"),
    )?;

    println!(
        "Streaming via {} device for {:.1}s...",
        session.backend_name(),
        options.seconds
    );
    thread::sleep(Duration::from_secs_f64(options.seconds.max(0.0)));

    session.stop()?;
    println!("Delivered {} callbacks", status.callback_count());
    if let Some(path) = session.output_file_path() {
        println!("Recorded to {}", path.display());
    }
    Ok(())
}

/// Copy `input` to `output` scaled by `gain`
pub fn apply_gain(input: &Frames<'_>, output: &mut FramesMut<'_>, gain: f32) {
    if gain == 1.0 {
        output.copy_from(input);
        return;
    }

    match input.format() {
        SampleFormat::U8 => scale::<u8>(input, output, gain),
        SampleFormat::S16 => scale::<i16>(input, output, gain),
        SampleFormat::S24 => scale::<I24>(input, output, gain),
        SampleFormat::S32 => scale::<i32>(input, output, gain),
        SampleFormat::F32 => scale::<f32>(input, output, gain),
    }
}

fn scale<S: Sample>(input: &Frames<'_>, output: &mut FramesMut<'_>, gain: f32) {
    for (out, &sample) in output
        .as_samples_mut::<S>()
        .iter_mut()
        .zip(input.as_samples::<S>())
    {
        *out = S::from_f32(sample.to_f32() * gain);
    }
}
