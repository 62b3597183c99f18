//! Audio Data Types
//!
//! Sample encodings and the interleaved frame buffers passed to callbacks.

mod format;
mod frames;
mod sample;

pub use format::SampleFormat;
pub use frames::{FrameBuffer, Frames, FramesMut};
pub use sample::{Sample, I24};
