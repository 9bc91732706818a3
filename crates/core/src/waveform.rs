//! Loaded waveform data and local resampling.

use serde::{Deserialize, Serialize};

use crate::channel::PeakChannel;
use crate::error::WaveformError;

/// Target resolution for a resample request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleArgs {
    /// Audio samples per pixel.
    Scale(f64),
    /// Output width in pixels.
    Width(usize),
}

impl ResampleArgs {
    /// Number of output pixels this request asks for, given the waveform's
    /// total audio sample count (`duration * sample_rate`).
    pub fn target_length(&self, total_samples: f64) -> Result<usize, WaveformError> {
        match *self {
            ResampleArgs::Scale(scale) => {
                if !scale.is_finite() || scale <= 0.0 {
                    return Err(WaveformError::InvalidResampleArgs(format!(
                        "scale must be positive, got {scale}"
                    )));
                }
                let exact = total_samples / scale;
                let nearest = exact.round();
                // absorb float error so an exact ratio never gains a pixel
                if (exact - nearest).abs() < 1e-6 {
                    Ok(nearest as usize)
                } else {
                    Ok(exact.ceil() as usize)
                }
            }
            ResampleArgs::Width(0) => Err(WaveformError::InvalidResampleArgs(
                "width must be positive".to_string(),
            )),
            ResampleArgs::Width(width) => Ok(width),
        }
    }
}

/// A fully loaded multi-channel peak waveform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWaveformData")]
pub struct WaveformData {
    /// Audio sample rate in Hz.
    pub sample_rate: u32,
    /// Audio samples per pixel.
    pub scale: f64,
    /// Sample resolution of the source data (8 or 16).
    pub bits: u8,
    channels: Vec<PeakChannel>,
}

/// Unvalidated serialized form, checked by [`WaveformData::new`].
#[derive(Deserialize)]
struct RawWaveformData {
    sample_rate: u32,
    scale: f64,
    bits: u8,
    channels: Vec<PeakChannel>,
}

impl TryFrom<RawWaveformData> for WaveformData {
    type Error = WaveformError;

    fn try_from(raw: RawWaveformData) -> Result<Self, Self::Error> {
        Self::new(raw.sample_rate, raw.scale, raw.bits, raw.channels)
    }
}

impl WaveformData {
    /// Build a waveform from per-channel peaks.
    ///
    /// All channels must have the same length and there must be at least one.
    pub fn new(
        sample_rate: u32,
        scale: f64,
        bits: u8,
        channels: Vec<PeakChannel>,
    ) -> Result<Self, WaveformError> {
        let Some(first) = channels.first() else {
            return Err(WaveformError::Decode("waveform has no channels".to_string()));
        };
        if channels.iter().any(|c| c.len() != first.len()) {
            return Err(WaveformError::Decode(
                "channels have differing lengths".to_string(),
            ));
        }
        if sample_rate == 0 || !scale.is_finite() || scale <= 0.0 {
            return Err(WaveformError::Decode(format!(
                "invalid sample rate {sample_rate} or scale {scale}"
            )));
        }

        Ok(Self {
            sample_rate,
            scale,
            bits,
            channels,
        })
    }

    /// Convenience constructor for a single channel waveform.
    pub fn mono(sample_rate: u32, scale: f64, channel: PeakChannel) -> Result<Self, WaveformError> {
        Self::new(sample_rate, scale, 16, vec![channel])
    }

    /// Number of pixels.
    pub fn length(&self) -> usize {
        self.channels[0].len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, index: usize) -> Option<&PeakChannel> {
        self.channels.get(index)
    }

    pub fn channels(&self) -> &[PeakChannel] {
        &self.channels
    }

    /// Total audio samples represented (`length * scale`).
    pub fn total_samples(&self) -> f64 {
        self.length() as f64 * self.scale
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.total_samples() / self.sample_rate as f64
    }

    /// Output length a resample request would produce.
    pub fn target_length(&self, args: ResampleArgs) -> Result<usize, WaveformError> {
        args.target_length(self.total_samples())
    }

    /// Downsample to a coarser resolution.
    ///
    /// Fails with [`WaveformError::ScaleTooLow`] when the request needs more
    /// pixels than are held locally.
    pub fn resample(&self, args: ResampleArgs) -> Result<WaveformData, WaveformError> {
        let target = self.target_length(args)?;
        self.resample_to_length(target)
    }

    /// Downsample so one pixel represents exactly `scale` audio samples.
    pub fn resample_to_scale(&self, scale: f64) -> Result<WaveformData, WaveformError> {
        let mut resampled = self.resample(ResampleArgs::Scale(scale))?;
        resampled.scale = scale;
        Ok(resampled)
    }

    fn resample_to_length(&self, target: usize) -> Result<WaveformData, WaveformError> {
        let available = self.length();
        if target > available {
            return Err(WaveformError::ScaleTooLow {
                requested: target,
                available,
            });
        }
        if target == 0 {
            return Err(WaveformError::InvalidResampleArgs(
                "resample would produce an empty waveform".to_string(),
            ));
        }

        log::debug!("Resampling {} pixels to {}", available, target);

        Ok(WaveformData {
            sample_rate: self.sample_rate,
            scale: self.total_samples() / target as f64,
            bits: self.bits,
            channels: self.channels.iter().map(|c| c.downsample(target)).collect(),
        })
    }
}
