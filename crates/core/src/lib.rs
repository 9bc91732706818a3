//! Peakview core
//!
//! Peak (min/max) waveform data shared by the display cache:
//!
//! - [`WaveformData`] and [`PeakChannel`] hold loaded per-pixel peaks
//! - min/max preserving downsampling via [`WaveformData::resample`]
//! - JSON and binary payload decoding behind [`WaveformDecoder`]
//! - the [`WaveformError`] taxonomy
//! - JSON-persisted [`ViewerConfig`]

pub use channel::{Peak, PeakChannel};
pub use codec::{PayloadFormat, PeakDataDecoder, WaveformDecoder};
pub use config::{ConfigError, ConfigManager, ViewerConfig};
pub use error::{ErrorKind, WaveformError};
pub use waveform::{ResampleArgs, WaveformData};

pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod waveform;
