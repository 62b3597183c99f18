//! Audio sessions
//!
//! An [`AudioSession`] runs a data callback over fixed-size buffers of frames in
//! one of two modes:
//!
//! - **offline**: the input file is rendered to the output file synchronously
//!   inside [`AudioSession::start`], with no device involved;
//! - **online**: a duplex device drives the callback on its own thread until
//!   [`AudioSession::stop`]. An input file, if set, replaces device capture and an
//!   output file, if set, records everything the callback plays.

use std::path::Path;

use log::{debug, info, warn};

use crate::audio::{Frames, FramesMut, SampleFormat};
use crate::device::{default_backend, DeviceBackend};
use crate::engine::config::SessionConfig;
use crate::engine::offline::OfflineRender;
use crate::engine::online::OnlineStream;
use crate::engine::state::{SessionState, SessionStatus};
use crate::error::{Result, TinyaudioError};

/// A configured, single-use audio session
pub struct AudioSession {
    config: SessionConfig,
    backend: Box<dyn DeviceBackend>,
    state: SessionState,
    status: SessionStatus,
    stream: Option<OnlineStream>,
}

impl AudioSession {
    /// Validate `config` and create a session on the default device backend.
    ///
    /// No file or device is opened until [`AudioSession::start`].
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::with_backend(config, default_backend())
    }

    /// Create a session that opens its device through `backend`
    pub fn with_backend(config: SessionConfig, backend: Box<dyn DeviceBackend>) -> Result<Self> {
        config.validate()?;
        debug!(
            "Created {} session: {} x{} @ {} Hz, {} frames/callback",
            if config.offline { "offline" } else { "online" },
            config.format,
            config.channels,
            config.sample_rate,
            config.frame_count
        );

        Ok(AudioSession {
            config,
            backend,
            state: SessionState::Idle,
            status: SessionStatus::new(),
            stream: None,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_offline(&self) -> bool {
        self.config.offline
    }

    pub fn format(&self) -> SampleFormat {
        self.config.format
    }

    pub fn channels(&self) -> usize {
        self.config.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn frame_count(&self) -> usize {
        self.config.frame_count
    }

    pub fn input_file_path(&self) -> Option<&Path> {
        self.config.input_file_path.as_deref()
    }

    pub fn output_file_path(&self) -> Option<&Path> {
        self.config.output_file_path.as_deref()
    }

    pub fn is_looping_input_file(&self) -> bool {
        self.config.looping_input_file
    }

    /// True while callbacks can be delivered
    pub fn is_started(&self) -> bool {
        self.status.is_started()
    }

    /// Handle for observing `started` from callbacks or other threads
    pub fn status(&self) -> SessionStatus {
        self.status.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Start the session.
    ///
    /// `data_callback` receives an input and an output buffer of `frame_count`
    /// frames each. `stop_callback` runs exactly once, after `started` has gone
    /// false.
    ///
    /// Offline, this renders the whole input file and returns when done. Online,
    /// it returns once the device is running. The callback must not stop its own
    /// session.
    ///
    /// # Errors
    /// * `InvalidState` - If the session was already started
    /// * File errors (`FileNotFound`, `UnsupportedFormat`, `CorruptHeader`,
    ///   `FormatMismatch`) - Before any callback fires
    /// * `DeviceUnavailable`, `DeviceBusy` - Online, if the device cannot be opened
    /// * `Io` - Offline, if rendering fails midway; the stop callback still runs
    pub fn start<D, S>(&mut self, data_callback: D, stop_callback: S) -> Result<()>
    where
        D: FnMut(&Frames<'_>, &mut FramesMut<'_>) + Send + 'static,
        S: FnOnce() + Send + 'static,
    {
        if self.state != SessionState::Idle {
            return Err(TinyaudioError::invalid_state(format!(
                "session cannot be started again (state: {})",
                self.state
            )));
        }

        if self.config.offline {
            let render = OfflineRender::open(&self.config)?;
            self.state = SessionState::Finished;
            return render.run(&self.config, &self.status, data_callback, stop_callback);
        }

        let stream = OnlineStream::start(
            &self.config,
            self.backend.as_ref(),
            &self.status,
            Box::new(data_callback),
            Box::new(stop_callback),
        )?;
        self.stream = Some(stream);
        self.state = SessionState::Streaming;
        Ok(())
    }

    /// Stop an online session.
    ///
    /// Blocks until the in-flight callback, if any, has returned. After this,
    /// `is_started()` is false, the stop callback has run, and the device and
    /// recording file are closed. Calling it on a session that is not streaming
    /// does nothing.
    ///
    /// # Errors
    /// The first error raised on the callback thread while streaming, or one
    /// raised while closing the device or the recording.
    pub fn stop(&mut self) -> Result<()> {
        let Some(stream) = self.stream.take() else {
            debug!("stop() on a {} session is a no-op", self.state);
            return Ok(());
        };

        self.state = SessionState::Finished;
        let result = stream.stop();
        info!("Session stopped");
        result
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        if self.stream.is_some() {
            if let Err(e) = self.stop() {
                warn!("Error while stopping dropped session: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for AudioSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSession")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .field("state", &self.state)
            .field("started", &self.is_started())
            .finish()
    }
}
