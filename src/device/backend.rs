//! Device backend contract
//!
//! A backend opens devices; a device runs a callback on its own thread once per
//! period of `frame_count` frames until it is stopped.

use std::fmt;

use crate::audio::{Frames, FramesMut, SampleFormat};
use crate::error::Result;

/// Which halves of a duplex device a stream uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Capture and playback
    #[default]
    Duplex,
    /// Playback only; the capture buffer handed to the callback is silent
    Playback,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Duplex => write!(f, "duplex"),
            Direction::Playback => write!(f, "playback"),
        }
    }
}

/// Requested stream layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    pub direction: Direction,
    pub format: SampleFormat,
    pub channels: usize,
    pub sample_rate: u32,
    /// Frames per callback period
    pub frame_count: usize,
}

impl DeviceConfig {
    pub fn new(
        direction: Direction,
        format: SampleFormat,
        channels: usize,
        sample_rate: u32,
        frame_count: usize,
    ) -> Self {
        DeviceConfig {
            direction,
            format,
            channels,
            sample_rate,
            frame_count,
        }
    }

    /// Bytes in one period of one direction
    pub fn period_bytes(&self) -> usize {
        self.format.bytes_per_frame(self.channels) * self.frame_count
    }

    /// Wall-clock length of one period
    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.frame_count as f64 / self.sample_rate as f64)
    }
}

/// Per-period callback: capture frames in, playback frames out.
///
/// Both buffers hold exactly `frame_count` frames. Runs on the device thread.
pub type DeviceCallback = Box<dyn FnMut(&Frames<'_>, &mut FramesMut<'_>) + Send + 'static>;

/// Factory for devices
pub trait DeviceBackend: Send + Sync {
    /// Short backend identifier for logs
    fn name(&self) -> &str;

    /// Claim a device matching `config`.
    ///
    /// # Errors
    /// * `DeviceUnavailable` - If no device can run the requested layout
    /// * `DeviceBusy` - If the device is already claimed
    fn open(&self, config: &DeviceConfig) -> Result<Box<dyn Device>>;
}

/// An opened device
pub trait Device {
    fn config(&self) -> &DeviceConfig;

    /// Start invoking `callback` on the device thread
    fn start(&mut self, callback: DeviceCallback) -> Result<()>;

    /// Stop the callback thread.
    ///
    /// Blocks until the current callback, if any, has returned; no callback runs
    /// after this returns.
    fn stop(&mut self) -> Result<()>;

    /// Release the device. Stops it first if it is still running.
    fn close(&mut self);

    fn is_running(&self) -> bool;
}

/// The backend used when none is given explicitly
#[cfg(feature = "cpal")]
pub fn default_backend() -> Box<dyn DeviceBackend> {
    Box::new(crate::device::CpalBackend::new())
}

/// The backend used when none is given explicitly
#[cfg(not(feature = "cpal"))]
pub fn default_backend() -> Box<dyn DeviceBackend> {
    Box::new(crate::device::SimulatedBackend::new())
}
