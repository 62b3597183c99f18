//! Error handling for Tinyaudio
//!
//! Every fallible operation in the crate returns [`Result`]. Errors that happen on
//! the device callback thread are never thrown from it; they are parked in the
//! session and handed back from `AudioSession::stop`.

use std::path::PathBuf;

use thiserror::Error;

use crate::audio::SampleFormat;

/// Result type alias for Tinyaudio operations
pub type Result<T> = std::result::Result<T, TinyaudioError>;

/// Main error type for Tinyaudio operations
#[derive(Error, Debug)]
pub enum TinyaudioError {
    // File / codec errors
    #[error("File not found: {}", path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Corrupt WAV header in {}: {reason}", path.display())]
    CorruptHeader { path: PathBuf, reason: String },

    #[error(
        "Format mismatch in {}: session expects {expected}, file has {found}",
        path.display()
    )]
    FormatMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("WAV codec error: {0}")]
    Codec(#[source] hound::Error),

    // Device errors
    #[error("No audio device available: {reason}")]
    DeviceUnavailable { reason: String },

    #[error("Audio device is busy: {reason}")]
    DeviceBusy { reason: String },

    // Session errors
    #[error("Invalid session state: {reason}")]
    InvalidState { reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Data callback panicked: {message}")]
    CallbackPanicked { message: String },

    // Configuration file errors
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TinyaudioError {
    pub(crate) fn invalid_state(reason: impl Into<String>) -> Self {
        TinyaudioError::InvalidState {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        TinyaudioError::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub(crate) fn callback_panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        TinyaudioError::CallbackPanicked {
            message: panic_message(payload),
        }
    }

    pub(crate) fn unsupported_sample(bits_per_sample: u16, float: bool) -> Self {
        let kind = if float { "float" } else { "integer" };
        TinyaudioError::UnsupportedFormat {
            format: format!("{}-bit {} PCM", bits_per_sample, kind),
        }
    }

    pub(crate) fn format_mismatch(
        path: impl Into<PathBuf>,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        TinyaudioError::FormatMismatch {
            path: path.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Map a `hound` error raised while parsing the header of `path`.
    ///
    /// A missing RIFF/WAVE tag means the file is not a WAV container at all and
    /// is reported as unsupported. Any read failure inside the header, short
    /// reads included, points at a broken header.
    pub(crate) fn from_hound(path: &std::path::Path, err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                TinyaudioError::FileNotFound {
                    path: path.to_path_buf(),
                    source: Some(e),
                }
            }
            hound::Error::IoError(e) => TinyaudioError::CorruptHeader {
                path: path.to_path_buf(),
                reason: format!("header is incomplete ({})", e),
            },
            hound::Error::FormatError(reason)
                if reason.contains("RIFF") || reason.contains("WAVE") =>
            {
                TinyaudioError::UnsupportedFormat {
                    format: format!("not a RIFF/WAVE file ({})", reason),
                }
            }
            hound::Error::FormatError(reason) => TinyaudioError::CorruptHeader {
                path: path.to_path_buf(),
                reason: reason.to_string(),
            },
            hound::Error::Unsupported => TinyaudioError::UnsupportedFormat {
                format: "non-PCM WAV codec".to_string(),
            },
            hound::Error::InvalidSampleFormat | hound::Error::TooWide => {
                TinyaudioError::UnsupportedFormat {
                    format: err.to_string(),
                }
            }
            other => TinyaudioError::Codec(other),
        }
    }

    /// Map a `hound` error raised while creating `path` for writing.
    pub(crate) fn from_create(path: &std::path::Path, err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                TinyaudioError::FileNotFound {
                    path: path.to_path_buf(),
                    source: Some(e),
                }
            }
            other => TinyaudioError::from_stream(other),
        }
    }

    /// Map a `hound` error raised while streaming samples.
    pub(crate) fn from_stream(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => TinyaudioError::Io(e),
            other => TinyaudioError::Codec(other),
        }
    }

    #[cfg_attr(not(feature = "cpal"), allow(dead_code))]
    pub(crate) fn sample_format_unavailable(format: SampleFormat) -> Self {
        TinyaudioError::DeviceUnavailable {
            reason: format!("device does not accept {} samples", format),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            TinyaudioError::FileNotFound { .. } => "FILE_NOT_FOUND",
            TinyaudioError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            TinyaudioError::CorruptHeader { .. } => "CORRUPT_HEADER",
            TinyaudioError::FormatMismatch { .. } => "FORMAT_MISMATCH",
            TinyaudioError::Codec(_) => "CODEC_ERROR",
            TinyaudioError::DeviceUnavailable { .. } => "DEVICE_UNAVAILABLE",
            TinyaudioError::DeviceBusy { .. } => "DEVICE_BUSY",
            TinyaudioError::InvalidState { .. } => "INVALID_STATE",
            TinyaudioError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            TinyaudioError::CallbackPanicked { .. } => "CALLBACK_PANICKED",
            TinyaudioError::Config(_) => "CONFIG_ERROR",
            TinyaudioError::Io(_) => "IO_ERROR",
        }
    }

    /// Check if retrying with a different file or configuration can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TinyaudioError::FileNotFound { .. }
                | TinyaudioError::UnsupportedFormat { .. }
                | TinyaudioError::FormatMismatch { .. }
                | TinyaudioError::DeviceBusy { .. }
                | TinyaudioError::InvalidConfiguration { .. }
                | TinyaudioError::Config(_)
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TinyaudioError::FileNotFound { .. } => vec![
                "Check the file path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            TinyaudioError::UnsupportedFormat { .. } => vec![
                "Convert the file to PCM WAV first",
                "Supported encodings: u8, s16, s24, s32 and f32",
            ],
            TinyaudioError::CorruptHeader { .. } => vec![
                "The file may be truncated - try re-exporting it from the source",
            ],
            TinyaudioError::FormatMismatch { .. } => vec![
                "Match the session channel count and sample rate to the input file",
                "Run 'tinyaudio probe <file>' to inspect the file",
            ],
            TinyaudioError::DeviceUnavailable { .. } => vec![
                "Check that an input and an output device are connected",
                "Try a different sample format or sample rate",
            ],
            TinyaudioError::DeviceBusy { .. } => vec![
                "Stop the session that currently owns the device",
            ],
            TinyaudioError::InvalidConfiguration { .. } => vec![
                "Channels, sample rate and frame count must all be non-zero",
                "Offline sessions need both an input and an output file",
            ],
            TinyaudioError::CallbackPanicked { .. } => vec![
                "The session has stopped; fix the data callback and start a new session",
            ],
            _ => vec![],
        }
    }
}

/// Text of a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
