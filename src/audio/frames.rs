//! Interleaved frame buffers
//!
//! [`Frames`] and [`FramesMut`] are borrowed views over raw PCM bytes tagged with
//! their encoding and channel count. They are what the data callback receives.
//! [`FrameBuffer`] owns pre-allocated storage for a fixed number of frames and is
//! aligned to 4 bytes, so every typed view over it is valid.

use crate::audio::{Sample, SampleFormat};

/// Read-only interleaved frames
#[derive(Debug, Clone, Copy)]
pub struct Frames<'a> {
    data: &'a [u8],
    format: SampleFormat,
    channels: usize,
}

impl<'a> Frames<'a> {
    /// Wrap raw bytes. The length must be a whole number of frames.
    pub fn new(data: &'a [u8], format: SampleFormat, channels: usize) -> Self {
        debug_assert!(channels > 0);
        debug_assert_eq!(data.len() % format.bytes_per_frame(channels), 0);
        Frames {
            data,
            format,
            channels,
        }
    }

    /// Wrap a typed sample slice
    pub fn from_samples<S: Sample>(samples: &'a [S], channels: usize) -> Self {
        Frames::new(bytemuck::cast_slice(samples), S::FORMAT, channels)
    }

    #[inline]
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn byte_count(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn sample_count(&self) -> usize {
        self.data.len() / self.format.size_in_bytes()
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.sample_count() / self.channels
    }

    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// View the frames as samples of their encoding.
    ///
    /// # Panics
    /// If `S` does not match the frames' format.
    #[inline]
    pub fn as_samples<S: Sample>(&self) -> &'a [S] {
        assert_eq!(
            self.format,
            S::FORMAT,
            "format mismatch (frames: {}, requested: {})",
            self.format,
            S::FORMAT
        );
        bytemuck::cast_slice(self.data)
    }

    /// Iterate over frames, each a slice of `channels` samples
    pub fn iter<S: Sample>(&self) -> impl Iterator<Item = &'a [S]> {
        self.as_samples::<S>().chunks_exact(self.channels)
    }

    /// The first `frames` frames
    pub fn prefix(&self, frames: usize) -> Frames<'a> {
        let end = (frames * self.format.bytes_per_frame(self.channels)).min(self.data.len());
        Frames::new(&self.data[..end], self.format, self.channels)
    }
}

/// Writable interleaved frames
#[derive(Debug)]
pub struct FramesMut<'a> {
    data: &'a mut [u8],
    format: SampleFormat,
    channels: usize,
}

impl<'a> FramesMut<'a> {
    /// Wrap raw bytes. The length must be a whole number of frames.
    pub fn new(data: &'a mut [u8], format: SampleFormat, channels: usize) -> Self {
        debug_assert!(channels > 0);
        debug_assert_eq!(data.len() % format.bytes_per_frame(channels), 0);
        FramesMut {
            data,
            format,
            channels,
        }
    }

    /// Wrap a typed sample slice
    pub fn from_samples<S: Sample>(samples: &'a mut [S], channels: usize) -> Self {
        FramesMut::new(bytemuck::cast_slice_mut(samples), S::FORMAT, channels)
    }

    #[inline]
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn byte_count(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn sample_count(&self) -> usize {
        self.data.len() / self.format.size_in_bytes()
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.sample_count() / self.channels
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.data
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.data
    }

    /// Reborrow as read-only frames
    #[inline]
    pub fn as_frames(&self) -> Frames<'_> {
        Frames::new(self.data, self.format, self.channels)
    }

    /// View the frames as samples of their encoding.
    ///
    /// # Panics
    /// If `S` does not match the frames' format.
    #[inline]
    pub fn as_samples<S: Sample>(&self) -> &[S] {
        self.check_format::<S>();
        bytemuck::cast_slice(self.data)
    }

    /// Mutable variant of [`FramesMut::as_samples`]
    #[inline]
    pub fn as_samples_mut<S: Sample>(&mut self) -> &mut [S] {
        self.check_format::<S>();
        bytemuck::cast_slice_mut(self.data)
    }

    pub fn iter<S: Sample>(&self) -> impl Iterator<Item = &[S]> {
        let channels = self.channels;
        self.as_samples::<S>().chunks_exact(channels)
    }

    pub fn iter_mut<S: Sample>(&mut self) -> impl Iterator<Item = &mut [S]> {
        let channels = self.channels;
        self.as_samples_mut::<S>().chunks_exact_mut(channels)
    }

    /// Copy `source` into the leading frames and silence the rest.
    ///
    /// # Panics
    /// If the layouts differ or `source` is longer than `self`.
    pub fn copy_from(&mut self, source: &Frames<'_>) {
        assert_eq!(self.format, source.format(), "format mismatch");
        assert_eq!(self.channels, source.channels(), "channel count mismatch");
        let len = source.byte_count();
        self.data[..len].copy_from_slice(source.as_bytes());
        self.data[len..].fill(self.format.silence_byte());
    }

    /// Overwrite every sample with silence
    pub fn fill_silence(&mut self) {
        self.data.fill(self.format.silence_byte());
    }

    fn check_format<S: Sample>(&self) {
        assert_eq!(
            self.format,
            S::FORMAT,
            "format mismatch (frames: {}, requested: {})",
            self.format,
            S::FORMAT
        );
    }
}

/// Owned, fixed-capacity frame storage
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    // u32 words keep every typed view aligned
    words: Vec<u32>,
    byte_len: usize,
    format: SampleFormat,
    channels: usize,
}

impl FrameBuffer {
    /// Allocate `frame_count` frames of silence
    pub fn new(format: SampleFormat, channels: usize, frame_count: usize) -> Self {
        let byte_len = format.bytes_per_frame(channels) * frame_count;
        let mut buffer = FrameBuffer {
            words: vec![0; byte_len.div_ceil(4)],
            byte_len,
            format,
            channels,
        };
        buffer.fill_silence();
        buffer
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frame_count(&self) -> usize {
        self.byte_len / self.format.bytes_per_frame(self.channels)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u32, u8>(&self.words)[..self.byte_len]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u32, u8>(&mut self.words)[..self.byte_len]
    }

    pub fn as_frames(&self) -> Frames<'_> {
        Frames::new(self.as_bytes(), self.format, self.channels)
    }

    pub fn as_frames_mut(&mut self) -> FramesMut<'_> {
        let (format, channels) = (self.format, self.channels);
        FramesMut::new(self.as_bytes_mut(), format, channels)
    }

    pub fn fill_silence(&mut self) {
        let silence = self.format.silence_byte();
        self.as_bytes_mut().fill(silence);
    }
}
