//! PCM sample encodings

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TinyaudioError};

/// PCM encoding of a single sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// Unsigned 8-bit, silence at 0x80
    U8,
    /// Signed 16-bit little endian
    S16,
    /// Signed 24-bit little endian, packed in 3 bytes
    S24,
    /// Signed 32-bit little endian
    S32,
    /// 32-bit IEEE float, nominal range [-1.0, 1.0]
    #[default]
    F32,
}

impl SampleFormat {
    /// All supported encodings, narrowest first
    pub const ALL: [SampleFormat; 5] = [
        SampleFormat::U8,
        SampleFormat::S16,
        SampleFormat::S24,
        SampleFormat::S32,
        SampleFormat::F32,
    ];

    /// Width of one sample in bytes
    pub const fn size_in_bytes(self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::S16 => 2,
            SampleFormat::S24 => 3,
            SampleFormat::S32 => 4,
            SampleFormat::F32 => 4,
        }
    }

    /// Width of one sample in bits, as stored in a WAV header
    pub const fn bits_per_sample(self) -> u16 {
        (self.size_in_bytes() * 8) as u16
    }

    /// Width of one interleaved frame in bytes
    pub const fn bytes_per_frame(self, channels: usize) -> usize {
        self.size_in_bytes() * channels
    }

    pub const fn is_float(self) -> bool {
        matches!(self, SampleFormat::F32)
    }

    /// Byte value that encodes silence in every byte of a sample
    pub const fn silence_byte(self) -> u8 {
        match self {
            SampleFormat::U8 => 0x80,
            _ => 0,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SampleFormat::U8 => "u8",
            SampleFormat::S16 => "s16",
            SampleFormat::S24 => "s24",
            SampleFormat::S32 => "s32",
            SampleFormat::F32 => "f32",
        }
    }

    /// Resolve the encoding described by a WAV header
    pub fn from_wav_spec(spec: &hound::WavSpec) -> Result<Self> {
        match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 8) => Ok(SampleFormat::U8),
            (hound::SampleFormat::Int, 16) => Ok(SampleFormat::S16),
            (hound::SampleFormat::Int, 24) => Ok(SampleFormat::S24),
            (hound::SampleFormat::Int, 32) => Ok(SampleFormat::S32),
            (hound::SampleFormat::Float, 32) => Ok(SampleFormat::F32),
            (kind, bits) => Err(TinyaudioError::unsupported_sample(
                bits,
                kind == hound::SampleFormat::Float,
            )),
        }
    }

    /// WAV header describing this encoding
    pub fn wav_spec(self, channels: usize, sample_rate: u32) -> hound::WavSpec {
        hound::WavSpec {
            channels: channels as u16,
            sample_rate,
            bits_per_sample: self.bits_per_sample(),
            sample_format: if self.is_float() {
                hound::SampleFormat::Float
            } else {
                hound::SampleFormat::Int
            },
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleFormat {
    type Err = TinyaudioError;

    fn from_str(s: &str) -> Result<Self> {
        SampleFormat::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| TinyaudioError::UnsupportedFormat {
                format: format!("'{}' (expected one of u8, s16, s24, s32, f32)", s),
            })
    }
}
