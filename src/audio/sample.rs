//! Typed samples
//!
//! Each [`SampleFormat`] has exactly one Rust sample type. Frame buffers can be
//! viewed as slices of that type, and the WAV reader uses the float conversions to
//! translate between encodings.

use bytemuck::{Pod, Zeroable};

use crate::audio::SampleFormat;

/// A PCM sample type that can be viewed in place inside a frame buffer
pub trait Sample: Pod + Send + Sync + 'static {
    /// The encoding this type represents
    const FORMAT: SampleFormat;

    /// Normalize to [-1.0, 1.0]
    fn to_f32(self) -> f32;

    /// Quantize from [-1.0, 1.0], clamping out-of-range input
    fn from_f32(value: f32) -> Self;
}

/// Packed little-endian signed 24-bit sample
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct I24(pub [u8; 3]);

impl I24 {
    pub const MAX: i32 = (1 << 23) - 1;
    pub const MIN: i32 = -(1 << 23);

    /// Build from the low 24 bits of `value`, saturating out-of-range input
    pub fn from_i32(value: i32) -> Self {
        let bytes = value.clamp(Self::MIN, Self::MAX).to_le_bytes();
        I24([bytes[0], bytes[1], bytes[2]])
    }

    /// Sign-extend to 32 bits
    pub fn to_i32(self) -> i32 {
        let [b0, b1, b2] = self.0;
        i32::from_le_bytes([0, b0, b1, b2]) >> 8
    }
}

impl Sample for u8 {
    const FORMAT: SampleFormat = SampleFormat::U8;

    fn to_f32(self) -> f32 {
        (self as f32 - 128.0) / 128.0
    }

    fn from_f32(value: f32) -> Self {
        (value.clamp(-1.0, 1.0) * 127.0 + 128.0).round() as u8
    }
}

impl Sample for i16 {
    const FORMAT: SampleFormat = SampleFormat::S16;

    fn to_f32(self) -> f32 {
        self as f32 / 32768.0
    }

    fn from_f32(value: f32) -> Self {
        (value.clamp(-1.0, 1.0) * 32767.0).round() as i16
    }
}

impl Sample for I24 {
    const FORMAT: SampleFormat = SampleFormat::S24;

    fn to_f32(self) -> f32 {
        self.to_i32() as f32 / 8_388_608.0
    }

    fn from_f32(value: f32) -> Self {
        I24::from_i32((value.clamp(-1.0, 1.0) * I24::MAX as f32).round() as i32)
    }
}

impl Sample for i32 {
    const FORMAT: SampleFormat = SampleFormat::S32;

    fn to_f32(self) -> f32 {
        (self as f64 / 2_147_483_648.0) as f32
    }

    fn from_f32(value: f32) -> Self {
        (value.clamp(-1.0, 1.0) as f64 * i32::MAX as f64).round() as i32
    }
}

impl Sample for f32 {
    const FORMAT: SampleFormat = SampleFormat::F32;

    fn to_f32(self) -> f32 {
        self
    }

    fn from_f32(value: f32) -> Self {
        value
    }
}
