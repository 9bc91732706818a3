//! Closed set of waveform variants exposed to the rendering layer.

use peakview_core::{PeakChannel, ResampleArgs, WaveformData, WaveformError};

use crate::detail::RefreshCallback;
use crate::resampling::ResamplingWaveform;
use crate::virtual_channel::VirtualWindowChannel;
use crate::virtual_waveform::VirtualWaveform;

/// Any waveform a caller can render.
///
/// The variant is fixed at construction; resampling produces a new value
/// rather than changing an existing one.
pub enum Waveform {
    /// Fully loaded peaks, typically the result of local downsampling.
    Plain(WaveformData),
    /// Streams detail beyond the loaded resolution.
    Virtual(VirtualWaveform),
    /// Acquired waveform that picks between the other two on resample.
    Resampling(ResamplingWaveform),
}

impl Waveform {
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::Plain(data) => data.sample_rate,
            Self::Virtual(virt) => virt.sample_rate(),
            Self::Resampling(res) => res.sample_rate(),
        }
    }

    /// Length in pixels.
    pub fn length(&self) -> usize {
        match self {
            Self::Plain(data) => data.length(),
            Self::Virtual(virt) => virt.length(),
            Self::Resampling(res) => res.length(),
        }
    }

    /// Audio samples per pixel.
    pub fn scale(&self) -> f64 {
        match self {
            Self::Plain(data) => data.scale,
            Self::Virtual(virt) => virt.scale(),
            Self::Resampling(res) => res.scale(),
        }
    }

    pub fn channel_count(&self) -> usize {
        match self {
            Self::Plain(data) => data.channel_count(),
            Self::Virtual(virt) => virt.channel_count(),
            Self::Resampling(res) => res.channel_count(),
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            Self::Plain(data) => data.duration(),
            Self::Virtual(virt) => virt.duration(),
            Self::Resampling(res) => res.duration(),
        }
    }

    pub fn channel(&self, index: usize) -> Result<Channel<'_>, WaveformError> {
        let out_of_range = || WaveformError::ChannelIndex {
            index,
            channels: self.channel_count(),
        };

        match self {
            Self::Plain(data) => data.channel(index).map(Channel::Peak).ok_or_else(out_of_range),
            Self::Virtual(virt) => virt.channel(index).map(Channel::Virtual),
            Self::Resampling(res) => res.channel(index).map(Channel::Peak).ok_or_else(out_of_range),
        }
    }

    /// Resample this waveform. See [`ResamplingWaveform::resample`].
    ///
    /// Plain waveforms can only be downsampled and virtual waveforms cannot
    /// be resampled at all.
    pub fn resample(
        &self,
        args: ResampleArgs,
        on_refresh: Option<RefreshCallback>,
    ) -> Result<Waveform, WaveformError> {
        match self {
            Self::Plain(data) => data.resample(args).map(Self::Plain),
            Self::Virtual(virt) => virt.resample(args),
            Self::Resampling(res) => res.resample(args, on_refresh),
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual(_))
    }

    pub fn as_virtual(&self) -> Option<&VirtualWaveform> {
        match self {
            Self::Virtual(virt) => Some(virt),
            _ => None,
        }
    }
}

impl From<ResamplingWaveform> for Waveform {
    fn from(waveform: ResamplingWaveform) -> Self {
        Self::Resampling(waveform)
    }
}

/// Per-pixel peak access for one channel of any [`Waveform`].
#[derive(Clone, Copy)]
pub enum Channel<'a> {
    Peak(&'a PeakChannel),
    Virtual(&'a VirtualWindowChannel),
}

impl Channel<'_> {
    /// Minimum sample at `index`, `0` where there is no data.
    pub fn min_sample(&self, index: usize) -> i16 {
        match self {
            Self::Peak(channel) => channel.min_sample(index).unwrap_or(0),
            Self::Virtual(channel) => channel.min_sample(index),
        }
    }

    /// Maximum sample at `index`, `0` where there is no data.
    pub fn max_sample(&self, index: usize) -> i16 {
        match self {
            Self::Peak(channel) => channel.max_sample(index).unwrap_or(0),
            Self::Virtual(channel) => channel.max_sample(index),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Peak(channel) => channel.len(),
            Self::Virtual(channel) => channel.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
