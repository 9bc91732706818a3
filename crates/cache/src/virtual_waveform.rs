use std::sync::{Arc, OnceLock};

use peakview_core::{ResampleArgs, WaveformData, WaveformError};

use crate::detail::{DetailProvider, RefreshCallback};
use crate::virtual_channel::VirtualWindowChannel;
use crate::waveform::Waveform;

/// A mono waveform presenting more pixels than are loaded.
///
/// Reads go through a [`VirtualWindowChannel`] which streams detail from the
/// [`DetailProvider`] as the viewed region moves. Virtual waveforms cannot be
/// resampled again; resample the original instead.
pub struct VirtualWaveform {
    backing: Arc<WaveformData>,
    length: usize,
    samples_per_pixel: f64,
    provider: DetailProvider,
    on_refresh: Option<RefreshCallback>,
    channel: OnceLock<VirtualWindowChannel>,
}

impl VirtualWaveform {
    pub fn new(
        backing: Arc<WaveformData>,
        length: usize,
        provider: DetailProvider,
        on_refresh: Option<RefreshCallback>,
    ) -> Result<Self, WaveformError> {
        if backing.channel_count() != 1 {
            return Err(WaveformError::UnsupportedVirtualChannels(
                backing.channel_count(),
            ));
        }
        if length == 0 || length <= backing.length() {
            return Err(WaveformError::InvalidVirtualLength {
                virtual_length: length,
                backing_length: backing.length(),
            });
        }

        let samples_per_pixel = backing.scale * backing.length() as f64 / length as f64;

        log::debug!(
            "Virtual waveform: {} -> {} pixels at {:.3} samples/pixel",
            backing.length(),
            length,
            samples_per_pixel
        );

        Ok(Self {
            backing,
            length,
            samples_per_pixel,
            provider,
            on_refresh,
            channel: OnceLock::new(),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.backing.sample_rate
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Audio samples per virtual pixel.
    pub fn scale(&self) -> f64 {
        self.samples_per_pixel
    }

    pub fn channel_count(&self) -> usize {
        1
    }

    pub fn duration(&self) -> f64 {
        self.backing.duration()
    }

    /// The original waveform seeding this view.
    pub fn backing(&self) -> &WaveformData {
        &self.backing
    }

    /// The only channel. Any index other than 0 is a usage error.
    pub fn channel(&self, index: usize) -> Result<&VirtualWindowChannel, WaveformError> {
        if index != 0 {
            return Err(WaveformError::ChannelIndex { index, channels: 1 });
        }

        Ok(self.channel.get_or_init(|| {
            VirtualWindowChannel::new(
                Arc::clone(&self.backing),
                self.length,
                self.samples_per_pixel,
                self.provider.clone(),
                self.on_refresh.clone(),
            )
        }))
    }

    /// Always fails with [`WaveformError::ResampleVirtual`].
    pub fn resample(&self, _args: ResampleArgs) -> Result<Waveform, WaveformError> {
        Err(WaveformError::ResampleVirtual)
    }
}
