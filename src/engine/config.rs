//! Session configuration
//!
//! Everything an [`AudioSession`](crate::engine::AudioSession) needs is fixed up
//! front in a [`SessionConfig`]. The struct serializes to JSON so the CLI can load
//! stream setups from disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::SampleFormat;
use crate::error::{Result, TinyaudioError};

pub const DEFAULT_CHANNELS: usize = 2;
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_FRAME_COUNT: usize = 128;

/// Mode, stream layout and file endpoints of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Render file to file without a device
    pub offline: bool,
    pub format: SampleFormat,
    pub channels: usize,
    pub sample_rate: u32,
    /// Frames per callback
    pub frame_count: usize,
    /// Replaces device capture when set
    pub input_file_path: Option<PathBuf>,
    /// Records callback output when set
    pub output_file_path: Option<PathBuf>,
    /// Rewind the input file at its end (online only)
    pub looping_input_file: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            offline: false,
            format: SampleFormat::F32,
            channels: DEFAULT_CHANNELS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            frame_count: DEFAULT_FRAME_COUNT,
            input_file_path: None,
            output_file_path: None,
            looping_input_file: false,
        }
    }
}

impl SessionConfig {
    /// File-to-file rendering
    ///
    /// # Example
    /// ```
    /// use tinyaudio::{SampleFormat, SessionConfig};
    ///
    /// let config = SessionConfig::offline("in.wav", "out.wav", SampleFormat::S16, 2, 8000, 256);
    /// assert!(config.offline);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn offline<I, O>(
        input: I,
        output: O,
        format: SampleFormat,
        channels: usize,
        sample_rate: u32,
        frame_count: usize,
    ) -> Self
    where
        I: Into<PathBuf>,
        O: Into<PathBuf>,
    {
        SessionConfig {
            offline: true,
            format,
            channels,
            sample_rate,
            frame_count,
            input_file_path: Some(input.into()),
            output_file_path: Some(output.into()),
            looping_input_file: false,
        }
    }

    /// Device streaming without file endpoints
    pub fn online(format: SampleFormat, channels: usize, sample_rate: u32, frame_count: usize) -> Self {
        SessionConfig {
            offline: false,
            format,
            channels,
            sample_rate,
            frame_count,
            ..Default::default()
        }
    }

    pub fn with_input_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.input_file_path = Some(path.into());
        self
    }

    pub fn with_output_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output_file_path = Some(path.into());
        self
    }

    pub fn with_looping_input_file(mut self, looping: bool) -> Self {
        self.looping_input_file = looping;
        self
    }

    /// Check the configuration without touching any file or device
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            return Err(TinyaudioError::invalid_config("channel count must be non-zero"));
        }
        if self.channels > u16::MAX as usize {
            return Err(TinyaudioError::invalid_config(format!(
                "{} channels cannot be encoded",
                self.channels
            )));
        }
        if self.sample_rate == 0 {
            return Err(TinyaudioError::invalid_config("sample rate must be non-zero"));
        }
        if self.frame_count == 0 {
            return Err(TinyaudioError::invalid_config("frame count must be non-zero"));
        }

        if let (Some(input), Some(output)) = (&self.input_file_path, &self.output_file_path) {
            if input == output {
                return Err(TinyaudioError::invalid_config(format!(
                    "{} cannot be both the input and the output file",
                    input.display()
                )));
            }
        }

        if self.offline {
            if self.input_file_path.is_none() || self.output_file_path.is_none() {
                return Err(TinyaudioError::invalid_config(
                    "offline sessions need both an input and an output file",
                ));
            }
            if self.looping_input_file {
                return Err(TinyaudioError::invalid_config(
                    "offline sessions cannot loop the input file",
                ));
            }
        } else if self.looping_input_file && self.input_file_path.is_none() {
            return Err(TinyaudioError::invalid_config(
                "looping requires an input file",
            ));
        }

        Ok(())
    }

    /// Read a configuration from a JSON file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TinyaudioError::FileNotFound {
                path: path.to_path_buf(),
                source: Some(e),
            },
            _ => TinyaudioError::Io(e),
        })?;
        let config: SessionConfig = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
