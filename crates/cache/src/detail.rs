//! Everything a virtual channel needs to fetch higher resolution data.

use std::fmt;
use std::sync::Arc;

use peakview_core::config::WINDOW_HALF_SPAN_RANGE;
use peakview_core::{PayloadFormat, PeakDataDecoder, WaveformDecoder};
use tokio::runtime::Handle;

use crate::transport::{HttpRequest, Transport};

/// Maps a time range in seconds to the URL of its peak data.
///
/// Called synchronously on every window refresh, so it must be cheap.
pub type DetailUriFn = Arc<dyn Fn(f64, f64) -> String + Send + Sync>;

/// Notification that a background refresh replaced seeded data.
pub type RefreshCallback = Arc<dyn Fn() + Send + Sync>;

/// Default number of pixels kept either side of the requested index.
pub const DEFAULT_HALF_SPAN: usize = 2000;

/// Source of detail data for virtual channels.
#[derive(Clone)]
pub struct DetailProvider {
    uri: DetailUriFn,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) decoder: Arc<dyn WaveformDecoder>,
    format: PayloadFormat,
    with_credentials: bool,
    half_span: usize,
    pub(crate) runtime: Handle,
}

impl DetailProvider {
    /// Create a provider that spawns its fetches on `runtime`.
    pub fn new(uri: DetailUriFn, transport: Arc<dyn Transport>, runtime: Handle) -> Self {
        Self {
            uri,
            transport,
            decoder: Arc::new(PeakDataDecoder),
            format: PayloadFormat::Json,
            with_credentials: false,
            half_span: DEFAULT_HALF_SPAN,
            runtime,
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn WaveformDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_format(mut self, format: PayloadFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }

    /// Pixels resident either side of the requested index. Clamped to
    /// `1..=1_000_000`.
    pub fn with_half_span(mut self, half_span: usize) -> Self {
        self.half_span = half_span.clamp(1, WINDOW_HALF_SPAN_RANGE.1);
        self
    }

    pub fn half_span(&self) -> usize {
        self.half_span
    }

    pub fn format(&self) -> PayloadFormat {
        self.format
    }

    /// Build the request for the given time range.
    pub(crate) fn request(&self, from_seconds: f64, to_seconds: f64) -> HttpRequest {
        HttpRequest::new((self.uri)(from_seconds, to_seconds), self.format)
            .with_credentials(self.with_credentials)
    }
}

impl fmt::Debug for DetailProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetailProvider")
            .field("format", &self.format)
            .field("with_credentials", &self.with_credentials)
            .field("half_span", &self.half_span)
            .finish_non_exhaustive()
    }
}
