//! Waveform acquisition.
//!
//! [`WaveformBuilder::init`] loads a waveform from exactly one source:
//!
//! - `data_uri`: remote peak data, binary preferred when supported
//! - `waveform_data`: peak data supplied by the caller
//! - `web_audio`: peaks derived from audio by an [`AudioAnalyzer`]
//!
//! and validates it before wrapping it in a [`ResamplingWaveform`].

use std::sync::Arc;

use async_trait::async_trait;
use peakview_core::{
    PayloadFormat, PeakDataDecoder, ViewerConfig, WaveformData, WaveformDecoder, WaveformError,
};
use tokio::runtime::Handle;

use crate::detail::{DetailProvider, DetailUriFn, DEFAULT_HALF_SPAN};
use crate::resampling::ResamplingWaveform;
use crate::transport::{fetch_bytes, fetch_waveform, HttpRequest, Transport};

/// Scale used for audio analysis when neither options nor zoom levels give one.
pub const DEFAULT_ANALYSIS_SCALE: u32 = 512;

/// What the platform can receive, in place of runtime feature detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Transport can deliver raw binary bodies.
    pub binary_responses: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            binary_responses: true,
        }
    }
}

/// Remote peak data URLs, one per format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataUri {
    pub arraybuffer: Option<String>,
    pub json: Option<String>,
}

impl DataUri {
    /// Guess the format of a single URL from its extension.
    ///
    /// `.json` is treated as JSON, anything else as binary.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let path = url.split(['?', '#']).next().unwrap_or_default();
        if path.to_lowercase().ends_with(".json") {
            Self {
                arraybuffer: None,
                json: Some(url),
            }
        } else {
            Self {
                arraybuffer: Some(url),
                json: None,
            }
        }
    }

    /// Pick the URL and format to request.
    fn select(&self, capabilities: Capabilities) -> Option<(&str, PayloadFormat)> {
        match (&self.arraybuffer, &self.json) {
            (Some(url), _) if capabilities.binary_responses => {
                Some((url.as_str(), PayloadFormat::Binary))
            }
            (_, Some(url)) => Some((url.as_str(), PayloadFormat::Json)),
            _ => None,
        }
    }
}

/// Peak data supplied directly by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformDataSource {
    pub json: Option<serde_json::Value>,
    pub arraybuffer: Option<Vec<u8>>,
}

/// Decoded PCM audio, one `Vec` per channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

/// Parameters passed to an [`AudioAnalyzer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Audio samples per output pixel.
    pub scale: u32,
    /// Keep channels separate instead of mixing down to mono.
    pub multi_channel: bool,
}

/// Computes peaks from audio.
#[async_trait]
pub trait AudioAnalyzer: Send + Sync {
    async fn analyze_buffer(
        &self,
        buffer: &AudioBuffer,
        options: &AnalysisOptions,
    ) -> Result<WaveformData, WaveformError>;

    /// Decode encoded audio bytes and compute peaks.
    async fn analyze_bytes(
        &self,
        bytes: Vec<u8>,
        options: &AnalysisOptions,
    ) -> Result<WaveformData, WaveformError>;
}

/// The media being displayed, used when no decoded buffer is supplied.
#[async_trait]
pub trait MediaElement: Send + Sync {
    /// Resolve once enough of the media is available to play.
    async fn wait_until_playable(&self);

    /// URL of the current media source.
    fn source_url(&self) -> Option<String>;
}

/// Options for deriving peaks from audio.
#[derive(Clone, Default)]
pub struct WebAudioOptions {
    pub audio_context: Option<Arc<dyn AudioAnalyzer>>,
    /// Pre-decoded audio; when absent the media element's source is fetched.
    pub audio_buffer: Option<AudioBuffer>,
    pub multi_channel: bool,
    /// Samples per pixel, defaults to the first zoom level.
    pub scale: Option<u32>,
}

/// Acquisition options. Exactly one source must be set.
#[derive(Clone, Default)]
pub struct WaveformOptions {
    pub data_uri: Option<DataUri>,
    pub waveform_data: Option<WaveformDataSource>,
    pub web_audio: Option<WebAudioOptions>,
    /// Deprecated: use `web_audio.audio_context`.
    pub audio_context: Option<Arc<dyn AudioAnalyzer>>,
    pub with_credentials: bool,
    pub zoom_levels: Vec<u32>,
    pub detail_uri_provider: Option<DetailUriFn>,
}

impl WaveformOptions {
    /// Options with credentials and zoom levels taken from `config`.
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            with_credentials: config.with_credentials,
            zoom_levels: config.zoom_levels.clone(),
            ..Self::default()
        }
    }
}

enum Source {
    Remote(DataUri),
    Local(WaveformDataSource),
    Audio(WebAudioOptions),
}

/// Loads waveforms from the sources described by [`WaveformOptions`].
pub struct WaveformBuilder {
    transport: Arc<dyn Transport>,
    capabilities: Capabilities,
    decoder: Arc<dyn WaveformDecoder>,
    media: Option<Arc<dyn MediaElement>>,
    window_half_span: usize,
}

impl WaveformBuilder {
    pub fn new(transport: Arc<dyn Transport>, capabilities: Capabilities) -> Self {
        Self {
            transport,
            capabilities,
            decoder: Arc::new(PeakDataDecoder),
            media: None,
            window_half_span: DEFAULT_HALF_SPAN,
        }
    }

    /// Builder using `config` for window size and binary preference.
    pub fn with_config(mut self, config: &ViewerConfig) -> Self {
        self.window_half_span = config.window_half_span;
        self.capabilities.binary_responses &= config.prefer_binary;
        self
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn WaveformDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_media_element(mut self, media: Arc<dyn MediaElement>) -> Self {
        self.media = Some(media);
        self
    }

    /// Load and validate a waveform.
    ///
    /// Detail fetches of waveforms resampled beyond the loaded resolution are
    /// spawned on the runtime this is called from.
    pub async fn init(&self, options: WaveformOptions) -> Result<ResamplingWaveform, WaveformError> {
        let source = select_source(&options)?;

        let data = match source {
            Source::Remote(data_uri) => {
                self.fetch_remote(&data_uri, options.with_credentials)
                    .await?
            }
            Source::Local(local) => self.decode_local(&local)?,
            Source::Audio(web_audio) => self.analyze_audio(web_audio, &options).await?,
        };

        validate_channels(&data)?;

        log::info!(
            "Loaded waveform: {} channel(s), {} pixels at {} samples/pixel",
            data.channel_count(),
            data.length(),
            data.scale
        );

        let provider = options.detail_uri_provider.map(|uri| {
            DetailProvider::new(uri, Arc::clone(&self.transport), Handle::current())
                .with_decoder(Arc::clone(&self.decoder))
                .with_format(self.detail_format())
                .with_credentials(options.with_credentials)
                .with_half_span(self.window_half_span)
        });

        Ok(ResamplingWaveform::new(data, provider))
    }

    fn detail_format(&self) -> PayloadFormat {
        if self.capabilities.binary_responses {
            PayloadFormat::Binary
        } else {
            PayloadFormat::Json
        }
    }

    async fn fetch_remote(
        &self,
        data_uri: &DataUri,
        with_credentials: bool,
    ) -> Result<WaveformData, WaveformError> {
        let (url, format) = data_uri.select(self.capabilities).ok_or_else(|| {
            WaveformError::Configuration(
                "unable to determine a compatible dataUri format".to_string(),
            )
        })?;

        log::info!("Fetching {} waveform data from {}", format.as_str(), url);

        let request = HttpRequest::new(url, format).with_credentials(with_credentials);
        fetch_waveform(self.transport.as_ref(), self.decoder.as_ref(), request).await
    }

    fn decode_local(&self, local: &WaveformDataSource) -> Result<WaveformData, WaveformError> {
        if let Some(json) = &local.json {
            log::info!("Using supplied JSON waveform data");
            self.decoder.decode_json_value(json)
        } else if let Some(bytes) = &local.arraybuffer {
            log::info!("Using supplied binary waveform data");
            self.decoder.decode(PayloadFormat::Binary, bytes)
        } else {
            Err(WaveformError::Configuration(
                "unable to determine a compatible waveformData format".to_string(),
            ))
        }
    }

    async fn analyze_audio(
        &self,
        web_audio: WebAudioOptions,
        options: &WaveformOptions,
    ) -> Result<WaveformData, WaveformError> {
        let analyzer = web_audio.audio_context.ok_or_else(|| {
            WaveformError::Configuration("webAudio requires an audio context".to_string())
        })?;

        let analysis = AnalysisOptions {
            scale: web_audio
                .scale
                .or_else(|| options.zoom_levels.first().copied())
                .unwrap_or(DEFAULT_ANALYSIS_SCALE),
            multi_channel: web_audio.multi_channel,
        };

        if let Some(buffer) = &web_audio.audio_buffer {
            log::info!("Computing waveform from supplied audio buffer");
            return analyzer.analyze_buffer(buffer, &analysis).await;
        }

        let media = self.media.as_ref().ok_or_else(|| {
            WaveformError::Configuration(
                "webAudio without an audio buffer requires a media element".to_string(),
            )
        })?;

        media.wait_until_playable().await;

        let url = media.source_url().ok_or_else(|| {
            WaveformError::Configuration("media element has no source".to_string())
        })?;

        log::info!("Fetching audio from {} for analysis", url);

        let request =
            HttpRequest::new(url, PayloadFormat::Binary).with_credentials(options.with_credentials);
        let bytes = fetch_bytes(self.transport.as_ref(), request).await?;

        analyzer.analyze_bytes(bytes, &analysis).await
    }
}

fn select_source(options: &WaveformOptions) -> Result<Source, WaveformError> {
    let audio = options.web_audio.is_some() || options.audio_context.is_some();

    if (options.data_uri.is_some() && audio)
        || (options.waveform_data.is_some() && audio)
        || (options.data_uri.is_some() && options.waveform_data.is_some())
    {
        return Err(WaveformError::Configuration(
            "you may only pass one source (webAudio, dataUri, or waveformData) to render waveform data"
                .to_string(),
        ));
    }

    let mut web_audio = options.web_audio.clone();
    if let Some(context) = &options.audio_context {
        log::warn!("The audio_context option is deprecated, use web_audio.audio_context instead");

        if web_audio.is_some() {
            return Err(WaveformError::Configuration(
                "you may only pass one of audioContext or webAudio".to_string(),
            ));
        }

        web_audio = Some(WebAudioOptions {
            audio_context: Some(Arc::clone(context)),
            ..WebAudioOptions::default()
        });
    }

    if let Some(data_uri) = &options.data_uri {
        Ok(Source::Remote(data_uri.clone()))
    } else if let Some(local) = &options.waveform_data {
        Ok(Source::Local(local.clone()))
    } else if let Some(web_audio) = web_audio {
        Ok(Source::Audio(web_audio))
    } else {
        Err(WaveformError::Configuration(
            "you must pass an audioContext, or dataUri, or waveformData to render waveform data"
                .to_string(),
        ))
    }
}

fn validate_channels(data: &WaveformData) -> Result<(), WaveformError> {
    match data.channel_count() {
        1 | 2 => Ok(()),
        other => Err(WaveformError::UnsupportedChannelCount(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_from_url() {
        let uri = DataUri::from_url("https://example.com/track.json?v=2");
        assert_eq!(uri.json.as_deref(), Some("https://example.com/track.json?v=2"));
        assert!(uri.arraybuffer.is_none());

        let uri = DataUri::from_url("/peaks/track.dat");
        assert_eq!(uri.arraybuffer.as_deref(), Some("/peaks/track.dat"));
    }

    #[test]
    fn test_data_uri_select_prefers_binary() {
        let uri = DataUri {
            arraybuffer: Some("a.dat".to_string()),
            json: Some("a.json".to_string()),
        };

        let binary = Capabilities {
            binary_responses: true,
        };
        let json_only = Capabilities {
            binary_responses: false,
        };

        assert_eq!(uri.select(binary), Some(("a.dat", PayloadFormat::Binary)));
        assert_eq!(uri.select(json_only), Some(("a.json", PayloadFormat::Json)));

        let binary_only = DataUri {
            arraybuffer: Some("a.dat".to_string()),
            json: None,
        };
        assert_eq!(binary_only.select(json_only), None);
    }

    #[test]
    fn test_select_source_conflicts() {
        let options = WaveformOptions {
            data_uri: Some(DataUri::from_url("a.dat")),
            waveform_data: Some(WaveformDataSource::default()),
            ..WaveformOptions::default()
        };
        assert!(matches!(
            select_source(&options),
            Err(WaveformError::Configuration(_))
        ));

        let options = WaveformOptions {
            waveform_data: Some(WaveformDataSource::default()),
            web_audio: Some(WebAudioOptions::default()),
            ..WaveformOptions::default()
        };
        assert!(select_source(&options).is_err());

        assert!(select_source(&WaveformOptions::default()).is_err());
    }

    #[test]
    fn test_options_from_config() {
        let config = ViewerConfig {
            with_credentials: true,
            ..ViewerConfig::default()
        };
        let options = WaveformOptions::from_config(&config);

        assert!(options.with_credentials);
        assert_eq!(options.zoom_levels, vec![512, 1024, 2048, 4096]);
        assert!(options.data_uri.is_none());
    }
}
