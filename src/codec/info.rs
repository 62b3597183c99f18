//! Header-only inspection of WAV files

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::Duration;

use hound::WavReader;
use serde::{Deserialize, Serialize};

use crate::audio::SampleFormat;
use crate::error::{Result, TinyaudioError};

/// Format, layout and length of an audio file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFileInfo {
    pub format: SampleFormat,
    pub channels: usize,
    pub sample_rate: u32,
    pub total_frame_count: u64,
}

impl AudioFileInfo {
    /// Read the header of the WAV file at `path`.
    ///
    /// Only the header is parsed; the payload is never read.
    ///
    /// # Errors
    /// * `FileNotFound` - If the path does not resolve
    /// * `UnsupportedFormat` - If the file is not a PCM WAV variant we can decode
    /// * `CorruptHeader` - If required header fields are missing or inconsistent
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_wav(path)?;
        Self::from_reader(path, &reader)
    }

    pub(crate) fn from_reader(path: &Path, reader: &WavReader<BufReader<File>>) -> Result<Self> {
        let spec = reader.spec();

        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(TinyaudioError::CorruptHeader {
                path: path.to_path_buf(),
                reason: format!(
                    "{} channels at {} Hz",
                    spec.channels, spec.sample_rate
                ),
            });
        }

        Ok(AudioFileInfo {
            format: SampleFormat::from_wav_spec(&spec)?,
            channels: spec.channels as usize,
            sample_rate: spec.sample_rate,
            total_frame_count: reader.duration() as u64,
        })
    }

    /// Playback length at the file's sample rate
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_frame_count as f64 / self.sample_rate as f64)
    }

    /// Size of the PCM payload in bytes
    pub fn payload_bytes(&self) -> u64 {
        self.total_frame_count * self.format.bytes_per_frame(self.channels) as u64
    }
}

/// Shorthand for [`AudioFileInfo::probe`]
pub fn probe<P: AsRef<Path>>(path: P) -> Result<AudioFileInfo> {
    AudioFileInfo::probe(path)
}

pub(crate) fn open_wav(path: &Path) -> Result<WavReader<BufReader<File>>> {
    if !path.exists() {
        return Err(TinyaudioError::FileNotFound {
            path: path.to_path_buf(),
            source: None,
        });
    }

    WavReader::open(path).map_err(|err| match err {
        // hound rejects odd bit depths before it looks at the codec
        hound::Error::FormatError(_) => match read_format_tag(path) {
            Some(tag) if !PCM_FORMAT_TAGS.contains(&tag) => TinyaudioError::UnsupportedFormat {
                format: format!("WAV codec 0x{:04x}", tag),
            },
            _ => TinyaudioError::from_hound(path, err),
        },
        other => TinyaudioError::from_hound(path, other),
    })
}

/// PCM, IEEE float and WAVE_FORMAT_EXTENSIBLE
const PCM_FORMAT_TAGS: [u16; 3] = [0x0001, 0x0003, 0xFFFE];

/// Format tag of the `fmt ` chunk, or `None` if the RIFF layout cannot be walked
fn read_format_tag(path: &Path) -> Option<u16> {
    let mut file = BufReader::new(File::open(path).ok()?);

    let mut riff = [0u8; 12];
    file.read_exact(&mut riff).ok()?;
    if &riff[0..4] != b"RIFF" || &riff[8..12] != b"WAVE" {
        return None;
    }

    loop {
        let mut header = [0u8; 8];
        file.read_exact(&mut header).ok()?;
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if &header[0..4] == b"fmt " {
            let mut tag = [0u8; 2];
            file.read_exact(&mut tag).ok()?;
            return Some(u16::from_le_bytes(tag));
        }

        // chunks are word aligned
        let skip = size as i64 + (size & 1) as i64;
        file.seek(SeekFrom::Current(skip)).ok()?;
    }
}
