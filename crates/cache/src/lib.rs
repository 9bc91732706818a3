//! Peakview Cache
//!
//! Virtual windowed waveform cache for interactive waveform display.
//!
//! # Features
//!
//! - Waveform acquisition from remote peak data, caller supplied data, or audio analysis
//! - Local min/max downsampling when loaded data covers the requested zoom
//! - Virtual waveforms of arbitrary length backed by a small resident window
//! - Background detail fetches with abort-on-supersede and generation tagging
//!
//! # Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use peakview_cache::{Capabilities, DataUri, Transport, WaveformBuilder, WaveformOptions};
//! # use peakview_core::ResampleArgs;
//! # async fn run(transport: Arc<dyn Transport>) -> Result<(), peakview_core::WaveformError> {
//! let builder = WaveformBuilder::new(transport, Capabilities::default());
//! let waveform = builder
//!     .init(WaveformOptions {
//!         data_uri: Some(DataUri::from_url("https://example.com/track.dat")),
//!         detail_uri_provider: Some(Arc::new(|from: f64, to: f64| {
//!             format!("https://example.com/detail?from={from}&to={to}")
//!         })),
//!         ..WaveformOptions::default()
//!     })
//!     .await?;
//!
//! let zoomed = waveform.resample(ResampleArgs::Width(100_000), Some(Arc::new(|| {
//!     // request a redraw
//! })))?;
//! let channel = zoomed.channel(0)?;
//! let (min, max) = (channel.min_sample(50_000), channel.max_sample(50_000));
//! # let _ = (min, max);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod detail;
pub mod resampling;
pub mod transport;
pub mod virtual_channel;
pub mod virtual_waveform;
pub mod waveform;

// Re-export main types
pub use builder::{
    AnalysisOptions, AudioAnalyzer, AudioBuffer, Capabilities, DataUri, MediaElement,
    WaveformBuilder, WaveformDataSource, WaveformOptions, WebAudioOptions,
};
pub use detail::{DetailProvider, DetailUriFn, RefreshCallback, DEFAULT_HALF_SPAN};
pub use resampling::ResamplingWaveform;
pub use transport::{HttpRequest, HttpResponse, Transport};
pub use virtual_channel::VirtualWindowChannel;
pub use virtual_waveform::VirtualWaveform;
pub use waveform::{Channel, Waveform};
