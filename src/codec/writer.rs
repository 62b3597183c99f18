//! Sequential WAV encoding at frame granularity

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hound::WavWriter;
use log::debug;

use crate::audio::{Frames, SampleFormat, I24};
use crate::error::{Result, TinyaudioError};

/// Encodes PCM frames into a WAV file.
///
/// The header is rewritten with the final length by [`WavFileWriter::finalize`].
/// Dropping an unfinalized writer still patches the header but swallows errors.
pub struct WavFileWriter {
    path: PathBuf,
    writer: Option<WavWriter<BufWriter<File>>>,
    format: SampleFormat,
    channels: usize,
    sample_rate: u32,
    frames_written: u64,
}

impl WavFileWriter {
    /// Create (or truncate) `path` for writing frames of the given layout
    pub fn create<P: AsRef<Path>>(
        path: P,
        format: SampleFormat,
        channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        let path = path.as_ref();

        if channels == 0 || channels > u16::MAX as usize || sample_rate == 0 {
            return Err(TinyaudioError::invalid_config(format!(
                "cannot encode {} channels at {} Hz",
                channels, sample_rate
            )));
        }

        let writer = WavWriter::create(path, format.wav_spec(channels, sample_rate))
            .map_err(|e| TinyaudioError::from_create(path, e))?;

        debug!(
            "Opened {} for writing: {} x{} @ {} Hz",
            path.display(),
            format,
            channels,
            sample_rate
        );

        Ok(WavFileWriter {
            path: path.to_path_buf(),
            writer: Some(writer),
            format,
            channels,
            sample_rate,
            frames_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Append every frame in `frames`. Returns the number of frames written.
    pub fn write(&mut self, frames: &Frames<'_>) -> Result<usize> {
        if frames.format() != self.format || frames.channels() != self.channels {
            return Err(TinyaudioError::format_mismatch(
                &self.path,
                format!("{} x{}", self.format, self.channels),
                format!("{} x{}", frames.format(), frames.channels()),
            ));
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| TinyaudioError::invalid_state("writer is already finalized"))?;

        match self.format {
            SampleFormat::U8 => {
                for &byte in frames.as_samples::<u8>() {
                    writer
                        .write_sample((byte ^ 0x80) as i8)
                        .map_err(TinyaudioError::from_stream)?;
                }
            }
            SampleFormat::S16 => {
                for &sample in frames.as_samples::<i16>() {
                    writer.write_sample(sample).map_err(TinyaudioError::from_stream)?;
                }
            }
            SampleFormat::S24 => {
                for &sample in frames.as_samples::<I24>() {
                    writer
                        .write_sample(sample.to_i32())
                        .map_err(TinyaudioError::from_stream)?;
                }
            }
            SampleFormat::S32 => {
                for &sample in frames.as_samples::<i32>() {
                    writer.write_sample(sample).map_err(TinyaudioError::from_stream)?;
                }
            }
            SampleFormat::F32 => {
                for &sample in frames.as_samples::<f32>() {
                    writer.write_sample(sample).map_err(TinyaudioError::from_stream)?;
                }
            }
        }

        let count = frames.frame_count();
        self.frames_written += count as u64;
        Ok(count)
    }

    /// Flush buffered samples and patch the header lengths.
    ///
    /// Calling it again after success is a no-op.
    pub fn finalize(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().map_err(TinyaudioError::from_stream)?;
            debug!(
                "Finalized {} ({} frames)",
                self.path.display(),
                self.frames_written
            );
        }
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.writer.is_none()
    }
}

impl std::fmt::Debug for WavFileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavFileWriter")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .field("frames_written", &self.frames_written)
            .finish()
    }
}
