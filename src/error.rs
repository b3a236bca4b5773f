//! Error types

use thiserror::Error;

/// Failures that abandon the operation in progress.
///
/// Out-of-range grid access and undo/redo on an empty history are not
/// errors; they are silently ignored.
#[derive(Error, Debug)]
pub enum SynthError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Failed to get device config: {0}")]
    DeviceConfig(String),

    #[error("Failed to build stream: {0}")]
    StreamBuild(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("MIDI error: {0}")]
    Midi(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),
}

pub type SynthResult<T> = Result<T, SynthError>;
