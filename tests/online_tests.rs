//! Online Streaming Tests
//!
//! Device sessions on the simulated backend, which paces callbacks in real time
//! without audio hardware.

mod common;

use std::fs::OpenOptions;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tinyaudio::{
    probe, AudioSession, Frames, FramesMut, SampleFormat, SessionConfig, SessionState,
    SimulatedBackend,
};

use common::{wait_until, write_ramp, write_sine, CHANNELS, FRAME_COUNT, SAMPLE_RATE};

fn online_config() -> SessionConfig {
    SessionConfig::online(SampleFormat::F32, CHANNELS, SAMPLE_RATE, FRAME_COUNT)
}

fn session_on(config: SessionConfig, backend: &SimulatedBackend) -> AudioSession {
    AudioSession::with_backend(config, Box::new(backend.clone())).unwrap()
}

fn read_f32(path: &std::path::Path) -> Vec<f32> {
    hound::WavReader::open(path)
        .unwrap()
        .samples::<f32>()
        .map(|s| s.unwrap())
        .collect()
}

// === Lifecycle ===

#[test]
fn test_started_until_stopped() {
    let backend = SimulatedBackend::new();
    let mut session = session_on(online_config(), &backend);
    let status = session.status();

    let started_in_callback = Arc::new(AtomicBool::new(false));
    let stop_calls = Arc::new(AtomicUsize::new(0));
    let stopped_when_called = Arc::new(AtomicBool::new(false));

    let (seen, callback_status) = (Arc::clone(&started_in_callback), session.status());
    let (calls, stop_seen, stop_status) = (
        Arc::clone(&stop_calls),
        Arc::clone(&stopped_when_called),
        session.status(),
    );
    session
        .start(
            move |input: &Frames<'_>, output: &mut FramesMut<'_>| {
                if callback_status.is_started() {
                    seen.store(true, Ordering::SeqCst);
                }
                assert_eq!(input.frame_count(), FRAME_COUNT);
                assert_eq!(output.frame_count(), FRAME_COUNT);
                output.copy_from(input);
            },
            move || {
                stop_seen.store(!stop_status.is_started(), Ordering::SeqCst);
                calls.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();

    assert!(session.is_started());
    assert_eq!(session.state(), SessionState::Streaming);
    assert!(wait_until(|| status.callback_count() >= 3));

    session.stop().unwrap();
    assert!(!session.is_started());
    assert!(started_in_callback.load(Ordering::SeqCst));
    assert_eq!(stop_calls.load(Ordering::SeqCst), 1);
    assert!(stopped_when_called.load(Ordering::SeqCst));

    // stopping again changes nothing
    session.stop().unwrap();
    assert_eq!(stop_calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.state(), SessionState::Finished);
}

#[test]
fn test_panicking_callback_stops_stream() {
    let backend = SimulatedBackend::unpaced();
    let mut session = session_on(online_config(), &backend);
    let status = session.status();
    let stop_calls = Arc::new(AtomicUsize::new(0));

    let stop_count = Arc::clone(&stop_calls);
    session
        .start(
            |_: &Frames<'_>, _: &mut FramesMut<'_>| panic!("user bug"),
            move || {
                stop_count.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();

    // delivery ends on the device thread without waiting for stop
    assert!(wait_until(|| stop_calls.load(Ordering::SeqCst) == 1));
    assert!(!status.is_started());
    assert_eq!(status.callback_count(), 0);

    let err = session.stop().unwrap_err();
    assert_eq!(err.error_code(), "CALLBACK_PANICKED");
    assert!(err.to_string().contains("user bug"));
    assert_eq!(stop_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_no_callbacks_after_stop_returns() {
    let backend = SimulatedBackend::new();
    let mut session = session_on(online_config(), &backend);
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    session
        .start(
            move |_: &Frames<'_>, _: &mut FramesMut<'_>| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            || {},
        )
        .unwrap();
    assert!(wait_until(|| calls.load(Ordering::SeqCst) >= 2));

    session.stop().unwrap();
    let at_stop = calls.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(30));
    assert_eq!(calls.load(Ordering::SeqCst), at_stop);
}

#[test]
fn test_restart_is_invalid_state() {
    let backend = SimulatedBackend::new();
    let mut session = session_on(online_config(), &backend);

    session.start(|_, _| {}, || {}).unwrap();
    let err = session.start(|_, _| {}, || {}).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_STATE");

    session.stop().unwrap();
    let err = session.start(|_, _| {}, || {}).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_STATE");
}

#[test]
fn test_second_session_on_claimed_device_is_busy() {
    let backend = SimulatedBackend::new();
    let mut first = session_on(online_config(), &backend);
    let mut second = session_on(online_config(), &backend);

    first.start(|_, _| {}, || {}).unwrap();
    let err = second.start(|_, _| {}, || {}).unwrap_err();
    assert_eq!(err.error_code(), "DEVICE_BUSY");
    assert!(!second.is_started());

    first.stop().unwrap();
    assert!(!backend.is_claimed());
}

// === Data flow ===

#[test]
fn test_capture_reaches_playback() {
    let pattern: Vec<f32> = (0..FRAME_COUNT * CHANNELS).map(|i| i as f32 / 1000.0).collect();
    let backend = SimulatedBackend::new()
        .with_capture(bytemuck::cast_slice(&pattern).to_vec())
        .with_recorded_playback();
    let mut session = session_on(online_config(), &backend);
    let status = session.status();

    session
        .start(
            |input: &Frames<'_>, output: &mut FramesMut<'_>| output.copy_from(input),
            || {},
        )
        .unwrap();
    assert!(wait_until(|| status.callback_count() >= 2));
    session.stop().unwrap();

    let played = backend.played_bytes();
    let samples: Vec<f32> = played
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    let delivered = status.callback_count() as usize;
    assert!(delivered >= 2);
    assert!(samples.len() >= pattern.len() * delivered);
    // periods the device ran after delivery stopped are silent
    for period in samples.chunks_exact(pattern.len()).take(delivered) {
        assert_eq!(period, pattern.as_slice());
    }
}

#[test]
fn test_recording_matches_callback_output() {
    let dir = tempfile::tempdir().unwrap();
    let recording = dir.path().join("recording.wav");
    let backend = SimulatedBackend::new();
    let mut session = session_on(online_config().with_output_file(&recording), &backend);
    let status = session.status();

    let mut period = 0u32;
    session
        .start(
            move |_: &Frames<'_>, output: &mut FramesMut<'_>| {
                output.as_samples_mut::<f32>().fill(period as f32);
                period += 1;
            },
            || {},
        )
        .unwrap();
    assert!(wait_until(|| status.callback_count() >= 5));
    session.stop().unwrap();

    let info = probe(&recording).unwrap();
    assert_eq!(info.format, SampleFormat::F32);
    assert_eq!(info.channels, CHANNELS);
    assert_eq!(info.sample_rate, SAMPLE_RATE);
    assert_eq!(
        info.total_frame_count,
        status.callback_count() * FRAME_COUNT as u64
    );

    let samples = read_f32(&recording);
    for (index, block) in samples.chunks_exact(FRAME_COUNT * CHANNELS).enumerate() {
        assert!(block.iter().all(|&s| s == index as f32));
    }
}

#[test]
fn test_looping_input_wraps() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ramp.wav");
    write_ramp(&input, 8000, 10);

    let config = SessionConfig::online(SampleFormat::S16, 1, 8000, 4)
        .with_input_file(&input)
        .with_looping_input_file(true);
    let backend = SimulatedBackend::new();
    let mut session = session_on(config, &backend);
    assert!(session.is_looping_input_file());

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    session
        .start(
            move |input: &Frames<'_>, output: &mut FramesMut<'_>| {
                sink.lock().unwrap().extend_from_slice(input.as_samples::<i16>());
                output.copy_from(input);
            },
            || {},
        )
        .unwrap();
    assert!(wait_until(|| received.lock().unwrap().len() >= 24));
    session.stop().unwrap();

    let received = received.lock().unwrap();
    let expected: Vec<i16> = (0..24).map(|i| (i % 10) as i16).collect();
    assert_eq!(&received[..24], expected.as_slice());
}

#[test]
fn test_input_file_without_loop_ends_in_silence() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ramp.wav");
    write_ramp(&input, 8000, 6);

    let config = SessionConfig::online(SampleFormat::S16, 1, 8000, 4).with_input_file(&input);
    let backend = SimulatedBackend::new();
    let mut session = session_on(config, &backend);

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    session
        .start(
            move |input: &Frames<'_>, _: &mut FramesMut<'_>| {
                sink.lock().unwrap().extend_from_slice(input.as_samples::<i16>());
            },
            || {},
        )
        .unwrap();
    assert!(wait_until(|| received.lock().unwrap().len() >= 16));

    // the stream outlives the file
    assert!(session.is_started());
    session.stop().unwrap();

    let received = received.lock().unwrap();
    assert_eq!(&received[..8], &[0, 1, 2, 3, 4, 5, 0, 0]);
    assert!(received[8..].iter().all(|&s| s == 0));
}

// === Errors ===

#[test]
fn test_input_layout_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mono.wav");
    write_sine::<f32>(&input, 1, SAMPLE_RATE, 64);

    let backend = SimulatedBackend::new();
    let mut session = session_on(online_config().with_input_file(&input), &backend);
    let err = session.start(|_, _| {}, || {}).unwrap_err();

    assert_eq!(err.error_code(), "FORMAT_MISMATCH");
    assert!(!session.is_started());
    assert!(!backend.is_claimed());
}

#[test]
fn test_read_error_is_reported_by_stop() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("long.wav");
    write_ramp(&input, 8000, 200_000);

    let config = SessionConfig::online(SampleFormat::S16, 1, 8000, 64).with_input_file(&input);
    let backend = SimulatedBackend::new();
    let mut session = session_on(config, &backend);
    let status = session.status();

    let stop_calls = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&stop_calls);
    session
        .start(
            |input: &Frames<'_>, output: &mut FramesMut<'_>| output.copy_from(input),
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();
    assert!(wait_until(|| status.callback_count() >= 1));

    // cut the payload out from under the open reader
    OpenOptions::new()
        .write(true)
        .open(&input)
        .unwrap()
        .set_len(44)
        .unwrap();

    assert!(wait_until(|| !status.is_started()));
    assert_eq!(stop_calls.load(Ordering::SeqCst), 1);

    let err = session.stop().unwrap_err();
    assert_eq!(err.error_code(), "IO_ERROR");
    assert_eq!(stop_calls.load(Ordering::SeqCst), 1);
    assert!(!backend.is_claimed());
}
