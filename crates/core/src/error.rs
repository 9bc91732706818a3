//! Error taxonomy shared by every waveform operation.

use thiserror::Error;

/// Broad class of a [`WaveformError`].
///
/// Callers use this to decide whether a failure is a runtime condition to
/// recover from or a programming mistake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Conflicting or missing source options, or malformed local data.
    Configuration,
    /// Data that decoded but does not meet channel or shape requirements.
    Validation,
    /// Non-200 responses, network failures and aborted requests.
    Transport,
    /// Misuse of the API, such as resampling a virtual waveform.
    Usage,
}

/// Errors produced while acquiring, decoding or resampling waveform data.
#[derive(Debug, Error)]
pub enum WaveformError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to decode peak data: {0}")]
    Decode(String),

    #[error("only mono or stereo waveforms are supported, got {0} channels")]
    UnsupportedChannelCount(usize),

    #[error("detail response must contain exactly one channel, got {0}")]
    DetailChannelCount(usize),

    #[error("unable to fetch remote data, HTTP status {0}")]
    HttpStatus(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("zoom level too low: requested {requested} pixels but only {available} are available")]
    ScaleTooLow { requested: usize, available: usize },

    #[error("invalid resample arguments: {0}")]
    InvalidResampleArgs(String),

    #[error("virtual waveforms cannot be resampled, resample the original waveform instead")]
    ResampleVirtual,

    #[error("virtual waveforms support a single channel only, got {0}")]
    UnsupportedVirtualChannels(usize),

    #[error("virtual length {virtual_length} must exceed backing length {backing_length}")]
    InvalidVirtualLength {
        virtual_length: usize,
        backing_length: usize,
    },

    #[error("channel index {index} out of range for {channels} channel waveform")]
    ChannelIndex { index: usize, channels: usize },

    #[error("no detail provider configured, cannot stream higher resolution data")]
    NoDetailProvider,
}

impl WaveformError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::Decode(_) => ErrorKind::Configuration,
            Self::UnsupportedChannelCount(_) | Self::DetailChannelCount(_) => {
                ErrorKind::Validation
            }
            Self::HttpStatus(_) | Self::Transport(_) => ErrorKind::Transport,
            Self::ScaleTooLow { .. }
            | Self::InvalidResampleArgs(_)
            | Self::ResampleVirtual
            | Self::UnsupportedVirtualChannels(_)
            | Self::InvalidVirtualLength { .. }
            | Self::ChannelIndex { .. }
            | Self::NoDetailProvider => ErrorKind::Usage,
        }
    }
}
