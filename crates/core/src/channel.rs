//! Per-channel min/max peak storage.

use serde::{Deserialize, Serialize};

/// Minimum and maximum amplitude observed within one pixel.
///
/// The default value `(0, 0)` is what an unpopulated index reads as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Peak {
    pub min: i16,
    pub max: i16,
}

impl Peak {
    /// Create a new peak pair.
    pub fn new(min: i16, max: i16) -> Self {
        Self { min, max }
    }

    /// Widen this peak so it also covers `other`.
    pub fn merge(self, other: Peak) -> Peak {
        Peak {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Read-only view over one channel of loaded peak data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PeakChannel {
    peaks: Vec<Peak>,
}

impl PeakChannel {
    /// Create a channel from per-pixel peaks.
    pub fn new(peaks: Vec<Peak>) -> Self {
        Self { peaks }
    }

    /// Number of pixels in this channel.
    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// Peak pair at pixel `index`, or `None` past the end.
    pub fn peak(&self, index: usize) -> Option<Peak> {
        self.peaks.get(index).copied()
    }

    /// Minimum sample at pixel `index`.
    pub fn min_sample(&self, index: usize) -> Option<i16> {
        self.peak(index).map(|p| p.min)
    }

    /// Maximum sample at pixel `index`.
    pub fn max_sample(&self, index: usize) -> Option<i16> {
        self.peak(index).map(|p| p.max)
    }

    /// All peaks in pixel order.
    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    /// Downsample to `target_len` pixels, preserving extremes.
    ///
    /// Output pixel `j` covers source pixels `[floor(j*r), floor((j+1)*r))`
    /// where `r = len / target_len`, always including at least one source
    /// pixel. Callers must not request more pixels than are available.
    pub(crate) fn downsample(&self, target_len: usize) -> PeakChannel {
        let len = self.peaks.len();
        if target_len == 0 || len == 0 {
            return PeakChannel::default();
        }

        let ratio = len as f64 / target_len as f64;
        let peaks = (0..target_len)
            .map(|j| {
                let start = ((j as f64 * ratio).floor() as usize).min(len - 1);
                let end = (((j + 1) as f64 * ratio).floor() as usize).clamp(start + 1, len);

                self.peaks[start + 1..end]
                    .iter()
                    .fold(self.peaks[start], |acc, p| acc.merge(*p))
            })
            .collect();

        PeakChannel { peaks }
    }
}

impl From<Vec<(i16, i16)>> for PeakChannel {
    fn from(pairs: Vec<(i16, i16)>) -> Self {
        Self {
            peaks: pairs.into_iter().map(|(min, max)| Peak { min, max }).collect(),
        }
    }
}
