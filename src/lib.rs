//! Tinyaudio - Duplex Audio I/O Engine
//!
//! Tinyaudio runs a user callback over fixed-size buffers of interleaved PCM
//! frames, in one of two modes:
//! 1. Offline - render an input WAV file to an output WAV file synchronously
//! 2. Online - stream through a duplex device, optionally playing a (looping)
//!    input file and recording the callback output
//!
//! # Architecture
//!
//! - `audio`: sample formats and the frame buffers handed to callbacks
//! - `codec`: WAV probing, decoding and encoding
//! - `device`: device backends (simulated, and `cpal` behind a feature)
//! - `engine`: session configuration and the start/stop state machine

pub mod audio;
pub mod cli;
pub mod codec;
pub mod device;
pub mod engine;
pub mod error;

pub use audio::{FrameBuffer, Frames, FramesMut, Sample, SampleFormat, I24};
pub use codec::{probe, AudioFileInfo, WavFileReader, WavFileWriter};
pub use device::{DeviceBackend, SimulatedBackend};
pub use engine::{AudioSession, SessionConfig, SessionState, SessionStatus};
pub use error::{Result, TinyaudioError};
