//! Offline Rendering Tests
//!
//! File-to-file sessions driven synchronously from `start`.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use tinyaudio::{probe, AudioSession, Frames, FramesMut, SampleFormat, SessionConfig, SessionState};

use common::{sine_fixture, write_ramp, write_sine, CHANNELS, FRAME_COUNT, SAMPLE_RATE};

fn passthrough(input: &Frames<'_>, output: &mut FramesMut<'_>) {
    output.copy_from(input);
}

fn offline_session(input: &std::path::Path, output: &std::path::Path) -> AudioSession {
    AudioSession::new(SessionConfig::offline(
        input,
        output,
        SampleFormat::F32,
        CHANNELS,
        SAMPLE_RATE,
        FRAME_COUNT,
    ))
    .unwrap()
}

// === Lifecycle ===

#[test]
fn test_started_only_while_rendering() {
    let (dir, input) = sine_fixture(FRAME_COUNT * 10);
    let output = dir.path().join("out.wav");
    let mut session = offline_session(&input, &output);
    assert!(!session.is_started());

    let status = session.status();
    let seen_stopped = Arc::new(AtomicBool::new(false));
    let stop_calls = Arc::new(AtomicUsize::new(0));

    let stop_status = session.status();
    let stop_seen = Arc::clone(&seen_stopped);
    let stop_count = Arc::clone(&stop_calls);
    session
        .start(
            move |input: &Frames<'_>, output: &mut FramesMut<'_>| {
                assert!(status.is_started());
                assert_eq!(input.frame_count(), FRAME_COUNT);
                assert_eq!(output.frame_count(), FRAME_COUNT);
                output.copy_from(input);
            },
            move || {
                stop_seen.store(!stop_status.is_started(), Ordering::SeqCst);
                stop_count.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();

    assert!(!session.is_started());
    assert_eq!(stop_calls.load(Ordering::SeqCst), 1);
    assert!(seen_stopped.load(Ordering::SeqCst));
    assert_eq!(session.state(), SessionState::Finished);
    assert_eq!(session.status().callback_count(), 10);
}

#[test]
fn test_panicking_callback_ends_render() {
    let (dir, input) = sine_fixture(FRAME_COUNT * 10);
    let output = dir.path().join("out.wav");
    let mut session = offline_session(&input, &output);
    let stop_calls = Arc::new(AtomicUsize::new(0));

    let calls = Arc::new(AtomicUsize::new(0));
    let (counter, stop_count) = (Arc::clone(&calls), Arc::clone(&stop_calls));
    let err = session
        .start(
            move |input: &Frames<'_>, output: &mut FramesMut<'_>| {
                if counter.fetch_add(1, Ordering::SeqCst) == 3 {
                    panic!("bad chunk");
                }
                output.copy_from(input);
            },
            move || {
                stop_count.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap_err();

    assert_eq!(err.error_code(), "CALLBACK_PANICKED");
    assert!(err.to_string().contains("bad chunk"));
    assert!(!session.is_started());
    assert_eq!(stop_calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.state(), SessionState::Finished);

    // the chunks delivered before the panic were written and the file finalized
    assert_eq!(probe(&output).unwrap().total_frame_count, (FRAME_COUNT * 3) as u64);
}

#[test]
fn test_second_start_is_invalid_state() {
    let (dir, input) = sine_fixture(FRAME_COUNT);
    let mut session = offline_session(&input, &dir.path().join("out.wav"));

    session.start(passthrough, || {}).unwrap();
    let err = session.start(passthrough, || {}).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_STATE");
}

#[test]
fn test_stop_after_render_is_noop() {
    let (dir, input) = sine_fixture(FRAME_COUNT);
    let mut session = offline_session(&input, &dir.path().join("out.wav"));

    session.start(passthrough, || {}).unwrap();
    assert!(session.stop().is_ok());
    assert!(!session.is_started());
}

#[test]
fn test_looping_offline_rejected() {
    let config = SessionConfig::offline("in.wav", "out.wav", SampleFormat::F32, 2, 44100, 128)
        .with_looping_input_file(true);
    let err = AudioSession::new(config).unwrap_err();
    assert_eq!(err.error_code(), "INVALID_CONFIGURATION");
}

#[test]
fn test_offline_requires_both_files() {
    let config = SessionConfig {
        offline: true,
        input_file_path: Some("in.wav".into()),
        ..SessionConfig::default()
    };
    assert!(AudioSession::new(config).is_err());
}

// === Rendering ===

#[test]
fn test_passthrough_is_byte_identical() {
    let (dir, input) = sine_fixture(FRAME_COUNT * 7 + 31);
    let output = dir.path().join("out.wav");

    offline_session(&input, &output)
        .start(passthrough, || {})
        .unwrap();

    assert_eq!(probe(&output).unwrap(), probe(&input).unwrap());

    let original: Vec<f32> = hound::WavReader::open(&input)
        .unwrap()
        .samples::<f32>()
        .map(|s| s.unwrap())
        .collect();
    let rendered: Vec<f32> = hound::WavReader::open(&output)
        .unwrap()
        .samples::<f32>()
        .map(|s| s.unwrap())
        .collect();
    assert_eq!(rendered, original);
}

#[test]
fn test_final_chunk_is_zero_padded() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ramp.wav");
    let output = dir.path().join("out.wav");
    // 10 frames in chunks of 4: 4, 4, 2 + 2 frames of padding
    write_ramp(&input, 8000, 10);

    let chunks = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&chunks);

    let mut session = AudioSession::new(SessionConfig::offline(
        &input,
        &output,
        SampleFormat::S16,
        1,
        8000,
        4,
    ))
    .unwrap();
    session
        .start(
            move |input: &Frames<'_>, output: &mut FramesMut<'_>| {
                recorded.lock().unwrap().push(input.as_samples::<i16>().to_vec());
                output.copy_from(input);
            },
            || {},
        )
        .unwrap();

    let chunks = chunks.lock().unwrap();
    assert_eq!(
        *chunks,
        vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9, 0, 0]]
    );
    assert_eq!(probe(&output).unwrap().total_frame_count, 10);
}

#[test]
fn test_empty_input_fires_stop_only() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.wav");
    let output = dir.path().join("out.wav");
    write_sine::<f32>(&input, CHANNELS, SAMPLE_RATE, 0);

    let callbacks = Arc::new(AtomicUsize::new(0));
    let stopped = Arc::new(AtomicBool::new(false));
    let (count, flag) = (Arc::clone(&callbacks), Arc::clone(&stopped));

    offline_session(&input, &output)
        .start(
            move |_: &Frames<'_>, _: &mut FramesMut<'_>| {
                count.fetch_add(1, Ordering::SeqCst);
            },
            move || flag.store(true, Ordering::SeqCst),
        )
        .unwrap();

    assert_eq!(callbacks.load(Ordering::SeqCst), 0);
    assert!(stopped.load(Ordering::SeqCst));
    assert_eq!(probe(&output).unwrap().total_frame_count, 0);
}

#[test]
fn test_converts_file_encoding_to_session_format() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("s16.wav");
    let output = dir.path().join("f32.wav");
    write_sine::<i16>(&input, CHANNELS, SAMPLE_RATE, 1000);

    let formats = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&formats);

    offline_session(&input, &output)
        .start(
            move |input: &Frames<'_>, output: &mut FramesMut<'_>| {
                seen.lock().unwrap().push(input.format());
                output.copy_from(input);
            },
            || {},
        )
        .unwrap();

    assert!(formats.lock().unwrap().iter().all(|&f| f == SampleFormat::F32));
    let info = probe(&output).unwrap();
    assert_eq!(info.format, SampleFormat::F32);
    assert_eq!(info.total_frame_count, 1000);
}

#[test]
fn test_callback_output_is_written() {
    let (dir, input) = sine_fixture(FRAME_COUNT * 2);
    let output = dir.path().join("out.wav");

    offline_session(&input, &output)
        .start(
            |_: &Frames<'_>, output: &mut FramesMut<'_>| {
                output.as_samples_mut::<f32>().fill(0.25);
            },
            || {},
        )
        .unwrap();

    let rendered: Vec<f32> = hound::WavReader::open(&output)
        .unwrap()
        .samples::<f32>()
        .map(|s| s.unwrap())
        .collect();
    assert_eq!(rendered.len(), FRAME_COUNT * 2 * CHANNELS);
    assert!(rendered.iter().all(|&s| s == 0.25));
}

// === Errors ===

#[test]
fn test_missing_input_fails_before_callbacks() {
    let dir = tempfile::tempdir().unwrap();
    let stopped = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stopped);

    let mut session = offline_session(&dir.path().join("missing.wav"), &dir.path().join("out.wav"));
    let err = session
        .start(passthrough, move || flag.store(true, Ordering::SeqCst))
        .unwrap_err();

    assert_eq!(err.error_code(), "FILE_NOT_FOUND");
    assert!(!stopped.load(Ordering::SeqCst));
    assert!(!session.is_started());
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_channel_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mono.wav");
    write_sine::<f32>(&input, 1, SAMPLE_RATE, 256);

    let mut session = offline_session(&input, &dir.path().join("out.wav"));
    let err = session.start(passthrough, || {}).unwrap_err();
    assert_eq!(err.error_code(), "FORMAT_MISMATCH");
}
