//! Shared fixtures for the integration suites

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tinyaudio::{Sample, SampleFormat};

pub const CHANNELS: usize = 2;
pub const SAMPLE_RATE: u32 = 44100;
pub const FRAME_COUNT: usize = 128;

/// Write `frames` frames of a 440 Hz sine (different phase per channel)
pub fn write_sine<S: Sample>(path: &Path, channels: usize, sample_rate: u32, frames: usize) {
    let spec = S::FORMAT.wav_spec(channels, sample_rate);
    let mut writer = hound::WavWriter::create(path, spec).unwrap();

    for frame in 0..frames {
        for channel in 0..channels {
            let t = frame as f32 / sample_rate as f32;
            let value = 0.5 * (2.0 * std::f32::consts::PI * 440.0 * t + channel as f32).sin();
            match S::FORMAT {
                SampleFormat::U8 => writer.write_sample((u8::from_f32(value) ^ 0x80) as i8).unwrap(),
                SampleFormat::S16 => writer.write_sample(i16::from_f32(value)).unwrap(),
                SampleFormat::S24 => writer
                    .write_sample(tinyaudio::I24::from_f32(value).to_i32())
                    .unwrap(),
                SampleFormat::S32 => writer.write_sample(i32::from_f32(value)).unwrap(),
                SampleFormat::F32 => writer.write_sample(value).unwrap(),
            }
        }
    }
    writer.finalize().unwrap();
}

/// Write a mono S16 file whose samples count up from 0
pub fn write_ramp(path: &Path, sample_rate: u32, frames: usize) {
    let spec = SampleFormat::S16.wav_spec(1, sample_rate);
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames {
        writer.write_sample(i as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// A scratch directory holding a stereo F32 sine fixture
pub fn sine_fixture(frames: usize) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sine.wav");
    write_sine::<f32>(&path, CHANNELS, SAMPLE_RATE, frames);
    (dir, path)
}

/// Poll `condition` for up to five seconds
pub fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
