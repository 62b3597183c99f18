//! Device streaming
//!
//! The device thread owns nothing of the session: it reaches the reader, writer
//! and user callback through [`StreamShared`]. A delivery gate keeps callbacks
//! from starting once `stop` has begun, and the device's own `stop` waits out the
//! one that may be in flight.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info};

use crate::audio::{FrameBuffer, Frames, FramesMut};
use crate::codec::{WavFileReader, WavFileWriter};
use crate::device::{Device, DeviceBackend, DeviceConfig, Direction};
use crate::engine::config::SessionConfig;
use crate::engine::state::SessionStatus;
use crate::error::{Result, TinyaudioError};

pub(crate) type DataCallback = Box<dyn FnMut(&Frames<'_>, &mut FramesMut<'_>) + Send + 'static>;
pub(crate) type StopCallback = Box<dyn FnOnce() + Send + 'static>;

/// File endpoints and the user callback, touched only by the device thread
/// while streaming
struct StreamEngine {
    data_callback: DataCallback,
    input: Option<(WavFileReader, FrameBuffer)>,
    writer: Option<WavFileWriter>,
}

impl StreamEngine {
    fn process(&mut self, capture: &Frames<'_>, playback: &mut FramesMut<'_>) -> Result<()> {
        let input = match &mut self.input {
            Some((reader, buffer)) => {
                // a non-looping reader past its end yields silence
                reader.read(&mut buffer.as_frames_mut())?;
                buffer.as_frames()
            }
            None => *capture,
        };

        playback.fill_silence();
        let callback = &mut self.data_callback;
        panic::catch_unwind(AssertUnwindSafe(|| callback(&input, playback)))
            .map_err(|payload| TinyaudioError::callback_panicked(payload.as_ref()))?;

        if let Some(writer) = &mut self.writer {
            writer.write(&playback.as_frames())?;
        }
        Ok(())
    }

    fn close(self) -> Result<()> {
        if let Some((reader, _)) = self.input {
            reader.close();
        }
        match self.writer {
            Some(mut writer) => writer.finalize(),
            None => Ok(()),
        }
    }
}

/// State shared between the session and the device thread
struct StreamShared {
    status: SessionStatus,
    delivering: AtomicBool,
    engine: Mutex<Option<StreamEngine>>,
    stop_callback: Mutex<Option<StopCallback>>,
    error: Mutex<Option<TinyaudioError>>,
}

impl StreamShared {
    fn deliver(&self, capture: &Frames<'_>, playback: &mut FramesMut<'_>) {
        if !self.delivering.load(Ordering::Acquire) {
            playback.fill_silence();
            return;
        }

        let result = match lock(&self.engine).as_mut() {
            Some(engine) => engine.process(capture, playback),
            None => {
                playback.fill_silence();
                return;
            }
        };

        match result {
            Ok(()) => self.status.record_callback(),
            Err(err) => {
                playback.fill_silence();
                self.fail(err);
            }
        }
    }

    /// Park a callback-thread error and end delivery without tearing down the
    /// device, which must happen on the caller's thread.
    fn fail(&self, err: TinyaudioError) {
        error!("Stream stopped after a callback error: {}", err);
        self.delivering.store(false, Ordering::Release);

        let mut slot = lock(&self.error);
        if slot.is_none() {
            *slot = Some(err);
        }
        drop(slot);

        self.status.set_started(false);
        self.fire_stop_callback();
    }

    fn fire_stop_callback(&self) {
        let callback = lock(&self.stop_callback).take();
        if let Some(callback) = callback {
            callback();
        }
    }
}

/// A running device stream
pub(crate) struct OnlineStream {
    device: Box<dyn Device>,
    shared: Arc<StreamShared>,
}

impl OnlineStream {
    /// Open files and device, then start delivering callbacks.
    ///
    /// Nothing is left open when this fails.
    pub(crate) fn start(
        config: &SessionConfig,
        backend: &dyn DeviceBackend,
        status: &SessionStatus,
        data_callback: DataCallback,
        stop_callback: StopCallback,
    ) -> Result<Self> {
        let input = match &config.input_file_path {
            Some(path) => {
                let mut reader = WavFileReader::open_as(path, config.format)?;
                reader.check_layout(config.channels, config.sample_rate)?;
                reader.set_looping(config.looping_input_file);
                let buffer = FrameBuffer::new(config.format, config.channels, config.frame_count);
                Some((reader, buffer))
            }
            None => None,
        };

        let direction = if input.is_some() {
            Direction::Playback
        } else {
            Direction::Duplex
        };
        let device_config = DeviceConfig::new(
            direction,
            config.format,
            config.channels,
            config.sample_rate,
            config.frame_count,
        );
        let mut device = backend.open(&device_config)?;
        debug!("Opened {} device: {:?}", backend.name(), device.config());

        let writer = match &config.output_file_path {
            Some(path) => Some(WavFileWriter::create(
                path,
                config.format,
                config.channels,
                config.sample_rate,
            )?),
            None => None,
        };

        let shared = Arc::new(StreamShared {
            status: status.clone(),
            delivering: AtomicBool::new(true),
            engine: Mutex::new(Some(StreamEngine {
                data_callback,
                input,
                writer,
            })),
            stop_callback: Mutex::new(Some(stop_callback)),
            error: Mutex::new(None),
        });

        status.set_started(true);
        let callback_shared = Arc::clone(&shared);
        let started = device.start(Box::new(
            move |capture: &Frames<'_>, playback: &mut FramesMut<'_>| {
                callback_shared.deliver(capture, playback)
            },
        ));

        if let Err(e) = started {
            status.set_started(false);
            device.close();
            if let Some(engine) = lock(&shared.engine).take() {
                if let Err(close_err) = engine.close() {
                    debug!("Ignoring close error after failed start: {}", close_err);
                }
            }
            return Err(e);
        }

        info!(
            "Streaming via {} {} device: {} x{} @ {} Hz, {} frames/callback",
            backend.name(),
            direction,
            config.format,
            config.channels,
            config.sample_rate,
            config.frame_count
        );

        Ok(OnlineStream { device, shared })
    }

    /// Stop delivery, quiesce the device and release every handle.
    ///
    /// Returns the first error raised on the callback thread, if any, otherwise
    /// any error from stopping the device or finalizing the recording.
    pub(crate) fn stop(mut self) -> Result<()> {
        self.shared.delivering.store(false, Ordering::Release);
        let stopped = self.device.stop();

        let closed = match lock(&self.shared.engine).take() {
            Some(engine) => engine.close(),
            None => Ok(()),
        };
        self.device.close();

        self.shared.status.set_started(false);
        self.shared.fire_stop_callback();

        info!(
            "Stream stopped after {} callbacks",
            self.shared.status.callback_count()
        );

        if let Some(err) = lock(&self.shared.error).take() {
            return Err(err);
        }
        stopped?;
        closed
    }
}

/// Lock ignoring poison; a panicking user callback must not wedge `stop`
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
