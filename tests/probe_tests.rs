//! Probe Tests
//!
//! Header inspection of WAV files in every supported encoding.

mod common;

use std::io::Write;

use approx::assert_relative_eq;
use test_case::test_case;
use tinyaudio::{probe, AudioFileInfo, SampleFormat, I24};

use common::write_sine;

#[test_case(SampleFormat::U8; "u8")]
#[test_case(SampleFormat::S16; "s16")]
#[test_case(SampleFormat::S24; "s24")]
#[test_case(SampleFormat::S32; "s32")]
#[test_case(SampleFormat::F32; "f32")]
fn test_probe_reports_written_layout(format: SampleFormat) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    match format {
        SampleFormat::U8 => write_sine::<u8>(&path, 2, 8000, 1234),
        SampleFormat::S16 => write_sine::<i16>(&path, 2, 8000, 1234),
        SampleFormat::S24 => write_sine::<I24>(&path, 2, 8000, 1234),
        SampleFormat::S32 => write_sine::<i32>(&path, 2, 8000, 1234),
        SampleFormat::F32 => write_sine::<f32>(&path, 2, 8000, 1234),
    }

    let info = probe(&path).unwrap();
    assert_eq!(
        info,
        AudioFileInfo {
            format,
            channels: 2,
            sample_rate: 8000,
            total_frame_count: 1234,
        }
    );
}

#[test]
fn test_probe_duration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_sine::<i16>(&path, 2, 8000, 268_237);

    let info = probe(&path).unwrap();
    assert_relative_eq!(info.duration().as_secs_f64(), 268_237.0 / 8000.0, epsilon = 1e-6);
}

#[test]
fn test_probe_json() {
    let info = AudioFileInfo {
        format: SampleFormat::S16,
        channels: 2,
        sample_rate: 8000,
        total_frame_count: 268_237,
    };
    let json = serde_json::to_value(info).unwrap();

    assert_eq!(json["format"], "s16");
    assert_eq!(json["channels"], 2);
    assert_eq!(json["total_frame_count"], 268_237);
}

#[test]
fn test_probe_rejects_adpcm() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("adpcm.wav");

    // fmt chunk with format tag 2 (MS ADPCM)
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&36u32.to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&8000u32.to_le_bytes());
    bytes.extend_from_slice(&4000u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&4u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&0u32.to_le_bytes());
    std::fs::File::create(&path)
        .unwrap()
        .write_all(&bytes)
        .unwrap();

    let err = probe(&path).unwrap_err();
    assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
}
