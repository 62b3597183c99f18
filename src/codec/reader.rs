//! Sequential WAV decoding at frame granularity

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use hound::WavReader;
use log::debug;

use crate::audio::{FramesMut, Sample, SampleFormat, I24};
use crate::codec::info::{open_wav, AudioFileInfo};
use crate::error::{Result, TinyaudioError};

/// Decodes PCM frames from a WAV file.
///
/// The reader can deliver samples in an encoding other than the file's own
/// (`open_as`), but never changes channel count or sample rate.
pub struct WavFileReader {
    path: PathBuf,
    reader: WavReader<BufReader<File>>,
    info: AudioFileInfo,
    format: SampleFormat,
    position: u64,
    looping: bool,
}

impl WavFileReader {
    /// Open `path`, decoding in the file's own encoding
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_wav(path)?;
        let info = AudioFileInfo::from_reader(path, &reader)?;

        debug!(
            "Opened {} for reading: {} x{} @ {} Hz, {} frames",
            path.display(),
            info.format,
            info.channels,
            info.sample_rate,
            info.total_frame_count
        );

        Ok(WavFileReader {
            path: path.to_path_buf(),
            reader,
            format: info.format,
            info,
            position: 0,
            looping: false,
        })
    }

    /// Open `path`, converting samples to `format` as they are decoded
    pub fn open_as<P: AsRef<Path>>(path: P, format: SampleFormat) -> Result<Self> {
        let mut reader = Self::open(path)?;
        reader.format = format;
        Ok(reader)
    }

    /// Header information of the underlying file
    pub fn info(&self) -> &AudioFileInfo {
        &self.info
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encoding of the frames produced by [`WavFileReader::read`]
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn channels(&self) -> usize {
        self.info.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.info.sample_rate
    }

    pub fn total_frame_count(&self) -> u64 {
        self.info.total_frame_count
    }

    /// Index of the next frame to be read
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn available_frame_count(&self) -> u64 {
        self.info.total_frame_count - self.position
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// When looping, reaching the end of the file rewinds to frame 0
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Reposition to `frame`, clamped to the end of the file
    pub fn seek(&mut self, frame: u64) -> Result<()> {
        let frame = frame.min(self.info.total_frame_count);
        self.reader.seek(frame as u32)?;
        self.position = frame;
        Ok(())
    }

    /// Fail unless the file can feed a stream with this layout
    pub fn check_layout(&self, channels: usize, sample_rate: u32) -> Result<()> {
        if self.info.channels != channels {
            return Err(TinyaudioError::format_mismatch(
                &self.path,
                format!("{} channels", channels),
                format!("{} channels", self.info.channels),
            ));
        }
        if self.info.sample_rate != sample_rate {
            return Err(TinyaudioError::format_mismatch(
                &self.path,
                format!("{} Hz", sample_rate),
                format!("{} Hz", self.info.sample_rate),
            ));
        }
        Ok(())
    }

    /// Fill `frames` from the current position.
    ///
    /// Returns the number of frames decoded. Frames past that count are set to
    /// silence. A looping reader wraps around and only returns fewer frames than
    /// requested for an empty file; otherwise a short count means end of file.
    pub fn read(&mut self, frames: &mut FramesMut<'_>) -> Result<usize> {
        if frames.format() != self.format || frames.channels() != self.info.channels {
            return Err(TinyaudioError::format_mismatch(
                &self.path,
                format!("{} x{}", self.format, self.info.channels),
                format!("{} x{}", frames.format(), frames.channels()),
            ));
        }

        let capacity = frames.frame_count();
        let bytes_per_frame = self.format.bytes_per_frame(self.info.channels);
        let mut filled = 0;

        while filled < capacity {
            if self.available_frame_count() == 0 {
                if !self.looping || self.info.total_frame_count == 0 {
                    break;
                }
                self.seek(0)?;
            }

            let count = (capacity - filled).min(self.available_frame_count() as usize);
            let start = filled * bytes_per_frame;
            let end = start + count * bytes_per_frame;
            self.decode_into(&mut frames.as_bytes_mut()[start..end])?;

            self.position += count as u64;
            filled += count;
        }

        let silence = self.format.silence_byte();
        frames.as_bytes_mut()[filled * bytes_per_frame..].fill(silence);

        Ok(filled)
    }

    /// Release the file handle
    pub fn close(self) {
        debug!("Closed {}", self.path.display());
    }

    fn decode_into(&mut self, out: &mut [u8]) -> Result<()> {
        let target = self.format;
        let sample_count = out.len() / target.size_in_bytes();

        match self.info.format {
            SampleFormat::U8 => transcode(
                self.reader
                    .samples::<i8>()
                    .take(sample_count)
                    .map(|s| s.map(|v| (v as u8) ^ 0x80)),
                target,
                out,
            ),
            SampleFormat::S16 => {
                transcode(self.reader.samples::<i16>().take(sample_count), target, out)
            }
            SampleFormat::S24 => transcode(
                self.reader
                    .samples::<i32>()
                    .take(sample_count)
                    .map(|s| s.map(I24::from_i32)),
                target,
                out,
            ),
            SampleFormat::S32 => {
                transcode(self.reader.samples::<i32>().take(sample_count), target, out)
            }
            SampleFormat::F32 => {
                transcode(self.reader.samples::<f32>().take(sample_count), target, out)
            }
        }
    }
}

impl std::fmt::Debug for WavFileReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavFileReader")
            .field("path", &self.path)
            .field("info", &self.info)
            .field("format", &self.format)
            .field("position", &self.position)
            .field("looping", &self.looping)
            .finish()
    }
}

/// Write decoded samples into `out`, converting them to `target`
fn transcode<S, I>(samples: I, target: SampleFormat, out: &mut [u8]) -> Result<()>
where
    S: Sample,
    I: Iterator<Item = hound::Result<S>>,
{
    let width = target.size_in_bytes();
    let expected = out.len() / width;
    let mut decoded = 0;

    for (slot, sample) in out.chunks_exact_mut(width).zip(samples) {
        encode_sample(sample.map_err(TinyaudioError::from_stream)?, target, slot);
        decoded += 1;
    }

    if decoded < expected {
        return Err(TinyaudioError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("payload ended after {} of {} samples", decoded, expected),
        )));
    }

    Ok(())
}

fn encode_sample<S: Sample>(value: S, target: SampleFormat, slot: &mut [u8]) {
    if S::FORMAT == target {
        slot.copy_from_slice(bytemuck::bytes_of(&value));
        return;
    }

    let normalized = value.to_f32();
    match target {
        SampleFormat::U8 => slot.copy_from_slice(bytemuck::bytes_of(&u8::from_f32(normalized))),
        SampleFormat::S16 => slot.copy_from_slice(bytemuck::bytes_of(&i16::from_f32(normalized))),
        SampleFormat::S24 => slot.copy_from_slice(bytemuck::bytes_of(&I24::from_f32(normalized))),
        SampleFormat::S32 => slot.copy_from_slice(bytemuck::bytes_of(&i32::from_f32(normalized))),
        SampleFormat::F32 => slot.copy_from_slice(bytemuck::bytes_of(&f32::from_f32(normalized))),
    }
}
