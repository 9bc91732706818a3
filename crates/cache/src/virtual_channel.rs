//! Virtual windowed channel.
//!
//! Presents per-pixel min/max access over a virtual length far larger than
//! the loaded data. Only a window of `2 * half_span` pixels is resident. When
//! a read falls outside it the window is rebuilt around the requested index:
//!
//! 1. pixels shared with the previous window are carried over
//! 2. the rest are seeded from the coarser backing channel
//! 3. a background fetch for the window's time range is spawned
//!
//! When the fetch lands its peaks replace the seeded ones and the refresh
//! callback fires. Each window install bumps a generation counter and a
//! completion only applies if its generation is still current, so a late
//! response can never overwrite a newer window even if aborting the old
//! request did not take effect in time.

use std::sync::Arc;

use parking_lot::Mutex;
use peakview_core::{Peak, PeakChannel, WaveformData, WaveformError};
use tokio::task::JoinHandle;

use crate::detail::{DetailProvider, RefreshCallback};
use crate::transport::fetch_waveform;

/// Resident span of real peak data.
#[derive(Debug, Clone)]
struct Window {
    offset: usize,
    peaks: Vec<Peak>,
}

impl Window {
    fn contains(&self, index: usize) -> bool {
        index >= self.offset && index - self.offset < self.peaks.len()
    }

    fn get(&self, index: usize) -> Option<Peak> {
        if self.contains(index) {
            Some(self.peaks[index - self.offset])
        } else {
            None
        }
    }
}

/// Fetch owed to a freshly installed window.
struct PendingFetch {
    generation: u64,
    offset: usize,
    end: usize,
}

#[derive(Default)]
struct WindowState {
    window: Option<Window>,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
}

/// Single channel of a [`VirtualWaveform`](crate::VirtualWaveform).
pub struct VirtualWindowChannel {
    backing: Arc<WaveformData>,
    length: usize,
    samples_per_pixel: f64,
    provider: DetailProvider,
    on_refresh: Option<RefreshCallback>,
    state: Arc<Mutex<WindowState>>,
}

impl VirtualWindowChannel {
    /// Create a channel of `length` virtual pixels at `samples_per_pixel`
    /// over the first channel of `backing`.
    pub(crate) fn new(
        backing: Arc<WaveformData>,
        length: usize,
        samples_per_pixel: f64,
        provider: DetailProvider,
        on_refresh: Option<RefreshCallback>,
    ) -> Self {
        Self {
            backing,
            length,
            samples_per_pixel,
            provider,
            on_refresh,
            state: Arc::new(Mutex::new(WindowState::default())),
        }
    }

    /// Virtual length in pixels.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Audio samples per virtual pixel.
    pub fn samples_per_pixel(&self) -> f64 {
        self.samples_per_pixel
    }

    /// Number of pixels resident after each refresh.
    pub fn window_size(&self) -> usize {
        self.provider.half_span() * 2
    }

    /// First pixel of the resident window, if one has been installed.
    pub fn window_offset(&self) -> Option<usize> {
        self.state.lock().window.as_ref().map(|w| w.offset)
    }

    /// Number of windows installed so far.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Whether a background fetch is still running.
    pub fn is_fetching(&self) -> bool {
        self.state
            .lock()
            .in_flight
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn min_sample(&self, index: usize) -> i16 {
        self.peak(index).min
    }

    pub fn max_sample(&self, index: usize) -> i16 {
        self.peak(index).max
    }

    /// Peak pair at `index`, refreshing the window first if needed.
    ///
    /// Returns `(0, 0)` beyond the virtual length and for pixels with no
    /// seeded or fetched data.
    pub fn peak(&self, index: usize) -> Peak {
        if index >= self.length {
            return Peak::default();
        }

        let (peak, pending) = {
            let mut state = self.state.lock();
            let pending = self.install_window(&mut state, index);
            let peak = state
                .window
                .as_ref()
                .and_then(|w| w.get(index))
                .unwrap_or_default();
            (peak, pending)
        };

        if let Some(fetch) = pending {
            self.spawn_fetch(fetch);
        }
        peak
    }

    /// Make sure `index` lies inside the resident window.
    pub fn ensure_index_available(&self, index: usize) {
        if index >= self.length {
            return;
        }

        let pending = self.install_window(&mut self.state.lock(), index);
        if let Some(fetch) = pending {
            self.spawn_fetch(fetch);
        }
    }

    /// Rebuild the window around `index` unless it is already resident.
    ///
    /// Returns the fetch to issue once the lock is released.
    fn install_window(&self, state: &mut WindowState, index: usize) -> Option<PendingFetch> {
        if state.window.as_ref().is_some_and(|w| w.contains(index)) {
            return None;
        }

        let half_span = self.provider.half_span();
        let offset = index.saturating_sub(half_span);
        let end = offset.saturating_add(half_span * 2);

        // the constructor guarantees a mono backing waveform
        let backing = &self.backing.channels()[0];
        let previous = state.window.take();
        let peaks = (offset..end)
            .map(|i| {
                previous
                    .as_ref()
                    .and_then(|w| w.get(i))
                    .unwrap_or_else(|| self.seed(backing, i))
            })
            .collect();

        state.window = Some(Window { offset, peaks });
        state.generation += 1;

        log::debug!(
            "Installed window [{}, {}) generation {}",
            offset,
            end,
            state.generation
        );

        if let Some(handle) = state.in_flight.take() {
            if !handle.is_finished() {
                log::debug!("Aborting superseded detail fetch");
            }
            handle.abort();
        }

        Some(PendingFetch {
            generation: state.generation,
            offset,
            end,
        })
    }

    /// Spawn the detail fetch for an installed window. Must be called
    /// without the window lock held, as it runs the caller's URI function.
    fn spawn_fetch(&self, fetch: PendingFetch) {
        let sample_rate = self.backing.sample_rate as f64;
        let from_seconds = fetch.offset as f64 * self.samples_per_pixel / sample_rate;
        let to_seconds = fetch.end as f64 * self.samples_per_pixel / sample_rate;
        let request = self.provider.request(from_seconds, to_seconds);

        log::debug!(
            "Fetching detail {:.3}s-{:.3}s from {}",
            from_seconds,
            to_seconds,
            request.url
        );

        let shared = Arc::clone(&self.state);
        let transport = Arc::clone(&self.provider.transport);
        let decoder = Arc::clone(&self.provider.decoder);
        let on_refresh = self.on_refresh.clone();
        let samples_per_pixel = self.samples_per_pixel;
        let generation = fetch.generation;

        let handle = self.provider.runtime.spawn(async move {
            let result = fetch_waveform(transport.as_ref(), decoder.as_ref(), request).await;
            let applied = apply_refresh(&shared, generation, samples_per_pixel, result);

            if applied {
                if let Some(callback) = on_refresh {
                    callback();
                }
            }
        });

        let mut state = self.state.lock();
        if state.generation == generation {
            if let Some(previous) = state.in_flight.replace(handle) {
                previous.abort();
            }
        } else {
            // a newer window was installed while the request was built
            handle.abort();
        }
    }

    /// Coarse stand-in value taken from the backing channel.
    fn seed(&self, backing: &PeakChannel, index: usize) -> Peak {
        let mapped = (0.5 + index as f64 * self.samples_per_pixel / self.backing.scale).round();
        backing.peak(mapped as usize).unwrap_or_default()
    }
}

impl Drop for VirtualWindowChannel {
    fn drop(&mut self) {
        if let Some(handle) = self.state.lock().in_flight.take() {
            handle.abort();
        }
    }
}

/// Install a fetched detail waveform into the window it was requested for.
///
/// Returns `true` if peaks were copied, in which case the caller should
/// notify the rendering layer.
fn apply_refresh(
    state: &Mutex<WindowState>,
    generation: u64,
    samples_per_pixel: f64,
    result: Result<WaveformData, WaveformError>,
) -> bool {
    let detail = match result {
        Ok(detail) => detail,
        Err(e) => {
            log::warn!("Detail fetch failed, keeping seeded data: {}", e);
            return false;
        }
    };

    if detail.channel_count() != 1 {
        log::warn!("{}", WaveformError::DetailChannelCount(detail.channel_count()));
        return false;
    }

    let resampled = match detail.resample_to_scale(samples_per_pixel) {
        Ok(resampled) => resampled,
        Err(e) => {
            log::warn!("Unable to resample detail response: {}", e);
            return false;
        }
    };

    let mut state = state.lock();
    if state.generation != generation {
        log::debug!(
            "Discarding stale detail response for generation {} (current {})",
            generation,
            state.generation
        );
        return false;
    }
    let Some(window) = state.window.as_mut() else {
        return false;
    };

    let source = resampled.channels()[0].peaks();
    let count = window.peaks.len().min(source.len());
    window.peaks[..count].copy_from_slice(&source[..count]);

    log::debug!(
        "Applied {} detail peaks at offset {} generation {}",
        count,
        window.offset,
        generation
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono(scale: f64, peaks: Vec<(i16, i16)>) -> WaveformData {
        WaveformData::mono(48000, scale, PeakChannel::from(peaks)).unwrap()
    }

    fn state_with_window(offset: usize, size: usize, generation: u64) -> Mutex<WindowState> {
        Mutex::new(WindowState {
            window: Some(Window {
                offset,
                peaks: vec![Peak::new(-1, 1); size],
            }),
            generation,
            in_flight: None,
        })
    }

    #[test]
    fn test_window_bounds() {
        let window = Window {
            offset: 10,
            peaks: vec![Peak::new(-1, 1); 5],
        };

        assert!(!window.contains(9));
        assert!(window.contains(10));
        assert!(window.contains(14));
        assert!(!window.contains(15));
        assert_eq!(window.get(15), None);
    }

    #[test]
    fn test_window_bounds_at_end_of_index_range() {
        let window = Window {
            offset: usize::MAX - 3,
            peaks: vec![Peak::new(-1, 1); 3],
        };

        assert!(window.contains(usize::MAX - 1));
        assert!(!window.contains(usize::MAX));
        assert!(!window.contains(0));
    }

    #[test]
    fn test_apply_refresh_copies_into_window() {
        let state = state_with_window(100, 4, 3);
        let detail = mono(64.0, vec![(-5, 5), (-6, 6)]);

        assert!(apply_refresh(&state, 3, 64.0, Ok(detail)));

        let state = state.lock();
        let window = state.window.as_ref().unwrap();
        assert_eq!(window.get(100), Some(Peak::new(-5, 5)));
        assert_eq!(window.get(101), Some(Peak::new(-6, 6)));
        // beyond the response length the seeded values remain
        assert_eq!(window.get(102), Some(Peak::new(-1, 1)));
    }

    #[test]
    fn test_apply_refresh_truncates_to_window_size() {
        let state = state_with_window(0, 2, 1);
        let detail = mono(64.0, vec![(-5, 5), (-6, 6), (-7, 7)]);

        assert!(apply_refresh(&state, 1, 64.0, Ok(detail)));
        assert_eq!(state.lock().window.as_ref().unwrap().peaks.len(), 2);
    }

    #[test]
    fn test_apply_refresh_resamples_to_view_scale() {
        let state = state_with_window(0, 4, 1);
        let detail = mono(32.0, vec![(-1, 1), (-9, 2), (-3, 3), (-4, 8)]);

        assert!(apply_refresh(&state, 1, 64.0, Ok(detail)));

        let state = state.lock();
        let window = state.window.as_ref().unwrap();
        assert_eq!(window.get(0), Some(Peak::new(-9, 2)));
        assert_eq!(window.get(1), Some(Peak::new(-4, 8)));
        assert_eq!(window.get(2), Some(Peak::new(-1, 1)));
    }

    #[test]
    fn test_apply_refresh_ignores_stale_generation() {
        let state = state_with_window(0, 4, 5);
        let detail = mono(64.0, vec![(-9, 9); 4]);

        assert!(!apply_refresh(&state, 4, 64.0, Ok(detail)));
        assert_eq!(
            state.lock().window.as_ref().unwrap().get(0),
            Some(Peak::new(-1, 1))
        );
    }

    #[test]
    fn test_apply_refresh_rejects_stereo_detail() {
        let state = state_with_window(0, 2, 1);
        let stereo = WaveformData::new(
            48000,
            64.0,
            16,
            vec![
                PeakChannel::from(vec![(-9, 9); 2]),
                PeakChannel::from(vec![(-9, 9); 2]),
            ],
        )
        .unwrap();

        assert!(!apply_refresh(&state, 1, 64.0, Ok(stereo)));
        assert_eq!(
            state.lock().window.as_ref().unwrap().get(0),
            Some(Peak::new(-1, 1))
        );
    }

    #[test]
    fn test_apply_refresh_keeps_seed_on_error() {
        let state = state_with_window(0, 2, 1);

        assert!(!apply_refresh(
            &state,
            1,
            64.0,
            Err(WaveformError::HttpStatus(404))
        ));
        assert_eq!(
            state.lock().window.as_ref().unwrap().get(1),
            Some(Peak::new(-1, 1))
        );
    }
}
