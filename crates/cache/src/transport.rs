//! HTTP transport seam.
//!
//! The cache never talks to the network directly. Callers supply a
//! [`Transport`] that performs a single GET; cancellation happens by dropping
//! the returned future, so implementations should not rely on running to
//! completion.

use async_trait::async_trait;
use peakview_core::{PayloadFormat, WaveformData, WaveformDecoder, WaveformError};

/// A GET request for peak data or raw audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    /// Expected body encoding.
    pub response_type: PayloadFormat,
    pub with_credentials: bool,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>, response_type: PayloadFormat) -> Self {
        Self {
            url: url.into(),
            response_type,
            with_credentials: false,
        }
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }
}

/// Raw response. Only status 200 counts as success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok(body: Vec<u8>) -> Self {
        Self { status: 200, body }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET request.
    ///
    /// Errors are transport-level failures (DNS, connection reset, ...).
    /// Non-200 statuses are returned as responses.
    async fn get(&self, request: HttpRequest) -> anyhow::Result<HttpResponse>;
}

/// GET `request` and return the body of a 200 response.
pub async fn fetch_bytes(
    transport: &dyn Transport,
    request: HttpRequest,
) -> Result<Vec<u8>, WaveformError> {
    let url = request.url.clone();
    let response = transport
        .get(request)
        .await
        .map_err(|e| WaveformError::Transport(format!("{url}: {e:#}")))?;

    if response.status != 200 {
        return Err(WaveformError::HttpStatus(response.status));
    }

    Ok(response.body)
}

/// GET `request` and decode the body as peak data.
pub async fn fetch_waveform(
    transport: &dyn Transport,
    decoder: &dyn WaveformDecoder,
    request: HttpRequest,
) -> Result<WaveformData, WaveformError> {
    let format = request.response_type;
    let body = fetch_bytes(transport, request).await?;
    decoder.decode(format, &body)
}
