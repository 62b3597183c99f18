//! Software duplex device
//!
//! Runs the callback on a dedicated thread, one period at a time. Capture is
//! silence unless a pattern is configured; playback can be recorded for
//! inspection. Paced devices sleep out each period so callbacks arrive at the
//! rate a hardware device would produce them.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{debug, error, warn};

use crate::audio::FrameBuffer;
use crate::device::backend::{Device, DeviceBackend, DeviceCallback, DeviceConfig, Direction};
use crate::error::{panic_message, Result, TinyaudioError};

const DEFAULT_MAX_CHANNELS: usize = 32;

/// Backend producing [`SimulatedBackend`] devices.
///
/// Clones share one device: opening it twice without closing the first handle
/// fails with `DeviceBusy`. Recorded playback is shared as well, so a clone kept
/// by the caller can inspect what a session played.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    claimed: Arc<AtomicBool>,
    paced: bool,
    max_channels: usize,
    capture: Option<Arc<Vec<u8>>>,
    playback: Option<Arc<Mutex<Vec<u8>>>>,
    periods: Arc<AtomicU64>,
}

impl SimulatedBackend {
    /// A real-time paced device with silent capture
    pub fn new() -> Self {
        SimulatedBackend {
            claimed: Arc::new(AtomicBool::new(false)),
            paced: true,
            max_channels: DEFAULT_MAX_CHANNELS,
            capture: None,
            playback: None,
            periods: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A device that runs periods back to back without sleeping
    pub fn unpaced() -> Self {
        SimulatedBackend {
            paced: false,
            ..Self::new()
        }
    }

    /// Loop `bytes` through the capture side. The pattern must be laid out in
    /// the stream's sample format.
    pub fn with_capture(mut self, bytes: Vec<u8>) -> Self {
        self.capture = Some(Arc::new(bytes));
        self
    }

    /// Keep every played byte for [`SimulatedBackend::played_bytes`]
    pub fn with_recorded_playback(mut self) -> Self {
        self.playback = Some(Arc::new(Mutex::new(Vec::new())));
        self
    }

    /// Refuse streams wider than `channels`
    pub fn with_max_channels(mut self, channels: usize) -> Self {
        self.max_channels = channels;
        self
    }

    /// Bytes played so far. Empty unless recording was enabled.
    pub fn played_bytes(&self) -> Vec<u8> {
        match &self.playback {
            Some(played) => played.lock().map(|p| p.clone()).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Periods completed across every device opened from this backend
    pub fn period_count(&self) -> u64 {
        self.periods.load(Ordering::Acquire)
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceBackend for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    fn open(&self, config: &DeviceConfig) -> Result<Box<dyn Device>> {
        if config.channels == 0 || config.channels > self.max_channels {
            return Err(TinyaudioError::DeviceUnavailable {
                reason: format!(
                    "simulated device supports 1 to {} channels, {} requested",
                    self.max_channels, config.channels
                ),
            });
        }
        if config.sample_rate == 0 || config.frame_count == 0 {
            return Err(TinyaudioError::DeviceUnavailable {
                reason: "sample rate and period size must be non-zero".to_string(),
            });
        }

        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TinyaudioError::DeviceBusy {
                reason: "simulated device is claimed by another stream".to_string(),
            });
        }

        debug!(
            "Opened simulated {} device: {} x{} @ {} Hz, {} frames/period",
            config.direction, config.format, config.channels, config.sample_rate, config.frame_count
        );

        Ok(Box::new(SimulatedDevice {
            config: *config,
            backend: self.clone(),
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
            closed: false,
        }))
    }
}

struct SimulatedDevice {
    config: DeviceConfig,
    backend: SimulatedBackend,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    closed: bool,
}

impl Device for SimulatedDevice {
    fn config(&self) -> &DeviceConfig {
        &self.config
    }

    fn start(&mut self, callback: DeviceCallback) -> Result<()> {
        if self.closed {
            return Err(TinyaudioError::invalid_state("device is closed"));
        }
        if self.thread.is_some() {
            return Err(TinyaudioError::invalid_state("device is already running"));
        }

        self.running.store(true, Ordering::Release);

        let clock = DeviceClock {
            config: self.config,
            paced: self.backend.paced,
            running: Arc::clone(&self.running),
            capture: self.backend.capture.clone(),
            playback: self.backend.playback.clone(),
            periods: Arc::clone(&self.backend.periods),
        };

        let handle = thread::Builder::new()
            .name("tinyaudio-simulated".to_string())
            .spawn(move || clock.run(callback))
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                TinyaudioError::DeviceUnavailable {
                    reason: format!("failed to spawn device thread: {}", e),
                }
            })?;

        self.thread = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::Release);

        let Some(handle) = self.thread.take() else {
            return Ok(());
        };

        if handle.thread().id() == thread::current().id() {
            return Err(TinyaudioError::invalid_state(
                "device cannot be stopped from its own callback",
            ));
        }

        handle.join().map_err(|payload| {
            let message = panic_message(payload.as_ref());
            error!("Simulated device thread panicked: {}", message);
            TinyaudioError::DeviceUnavailable {
                reason: format!("device thread panicked: {}", message),
            }
        })
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.stop() {
            warn!("Error while closing simulated device: {}", e);
        }
        self.closed = true;
        self.backend.claimed.store(false, Ordering::Release);
        debug!("Closed simulated device");
    }

    fn is_running(&self) -> bool {
        self.thread.is_some() && self.running.load(Ordering::Acquire)
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        self.close();
    }
}

/// State moved onto the device thread
struct DeviceClock {
    config: DeviceConfig,
    paced: bool,
    running: Arc<AtomicBool>,
    capture: Option<Arc<Vec<u8>>>,
    playback: Option<Arc<Mutex<Vec<u8>>>>,
    periods: Arc<AtomicU64>,
}

impl DeviceClock {
    fn run(self, mut callback: DeviceCallback) {
        let DeviceConfig {
            format,
            channels,
            frame_count,
            ..
        } = self.config;

        let mut input = FrameBuffer::new(format, channels, frame_count);
        let mut output = FrameBuffer::new(format, channels, frame_count);
        let mut capture_offset = 0;

        let period = self.config.period();
        let mut deadline = Instant::now();

        while self.running.load(Ordering::Acquire) {
            if self.config.direction == Direction::Duplex {
                if let Some(pattern) = self.capture.as_deref().filter(|p| !p.is_empty()) {
                    for byte in input.as_bytes_mut() {
                        *byte = pattern[capture_offset];
                        capture_offset = (capture_offset + 1) % pattern.len();
                    }
                }
            }

            output.fill_silence();
            callback(&input.as_frames(), &mut output.as_frames_mut());

            if let Some(played) = &self.playback {
                if let Ok(mut played) = played.lock() {
                    played.extend_from_slice(output.as_bytes());
                }
            }
            self.periods.fetch_add(1, Ordering::AcqRel);

            if self.paced {
                deadline += period;
                let now = Instant::now();
                if deadline > now {
                    thread::sleep(deadline - now);
                } else if now - deadline > period * 4 {
                    // fell far behind; resync instead of bursting
                    deadline = now;
                }
            } else {
                thread::yield_now();
            }
        }
    }
}
