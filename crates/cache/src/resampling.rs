use std::sync::Arc;

use peakview_core::{PeakChannel, ResampleArgs, WaveformData, WaveformError};

use crate::detail::{DetailProvider, RefreshCallback};
use crate::virtual_waveform::VirtualWaveform;
use crate::waveform::Waveform;

/// Waveform handed to the caller after acquisition.
///
/// Decides per resample request whether loaded data is enough (local
/// downsampling) or finer detail must be streamed (a [`VirtualWaveform`]).
#[derive(Debug)]
pub struct ResamplingWaveform {
    base: Arc<WaveformData>,
    provider: Option<DetailProvider>,
}

impl ResamplingWaveform {
    pub fn new(base: WaveformData, provider: Option<DetailProvider>) -> Self {
        Self {
            base: Arc::new(base),
            provider,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.base.sample_rate
    }

    pub fn length(&self) -> usize {
        self.base.length()
    }

    pub fn scale(&self) -> f64 {
        self.base.scale
    }

    pub fn channel_count(&self) -> usize {
        self.base.channel_count()
    }

    pub fn duration(&self) -> f64 {
        self.base.duration()
    }

    pub fn channel(&self, index: usize) -> Option<&PeakChannel> {
        self.base.channel(index)
    }

    /// The loaded base waveform.
    pub fn data(&self) -> &WaveformData {
        &self.base
    }

    pub fn detail_provider(&self) -> Option<&DetailProvider> {
        self.provider.as_ref()
    }

    /// View this waveform at another resolution.
    ///
    /// Requests needing more pixels than are loaded return
    /// [`Waveform::Virtual`], which fetches detail on demand and calls
    /// `on_refresh` whenever new data lands. Everything else is downsampled
    /// locally and `on_refresh` is unused.
    pub fn resample(
        &self,
        args: ResampleArgs,
        on_refresh: Option<RefreshCallback>,
    ) -> Result<Waveform, WaveformError> {
        let length = self.base.target_length(args)?;

        if length > self.base.length() {
            let provider = self
                .provider
                .clone()
                .ok_or(WaveformError::NoDetailProvider)?;

            return VirtualWaveform::new(Arc::clone(&self.base), length, provider, on_refresh)
                .map(Waveform::Virtual);
        }

        self.base.resample(args).map(Waveform::Plain)
    }
}
