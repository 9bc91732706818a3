//! Shared helpers for the cache integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use peakview_cache::{HttpRequest, HttpResponse, Transport};
use peakview_core::{Peak, PeakChannel, WaveformData};
use tokio::sync::oneshot;

type Responder = Box<dyn Fn(&HttpRequest) -> anyhow::Result<HttpResponse> + Send + Sync>;

enum Mode {
    /// Answer every request immediately.
    Immediate(Responder),
    /// Hold every request until the test calls [`MockTransport::complete`].
    Gated,
}

/// In-memory transport recording every request.
pub struct MockTransport {
    mode: Mode,
    requests: Mutex<Vec<HttpRequest>>,
    gates: Mutex<Vec<Option<oneshot::Sender<HttpResponse>>>>,
    cancelled: AtomicUsize,
}

struct CancelGuard<'a> {
    counter: &'a AtomicUsize,
    armed: bool,
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl MockTransport {
    pub fn immediate<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> anyhow::Result<HttpResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            mode: Mode::Immediate(Box::new(responder)),
            requests: Mutex::new(Vec::new()),
            gates: Mutex::new(Vec::new()),
            cancelled: AtomicUsize::new(0),
        })
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            mode: Mode::Gated,
            requests: Mutex::new(Vec::new()),
            gates: Mutex::new(Vec::new()),
            cancelled: AtomicUsize::new(0),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of requests whose future was dropped before completing.
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Release the gated request at `index`. Returns `false` if it was
    /// already cancelled.
    pub fn complete(&self, index: usize, response: HttpResponse) -> bool {
        let sender = self.gates.lock().get_mut(index).and_then(Option::take);
        match sender {
            Some(sender) => sender.send(response).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        self.requests.lock().push(request.clone());

        match &self.mode {
            Mode::Immediate(responder) => responder(&request),
            Mode::Gated => {
                let (tx, rx) = oneshot::channel();
                self.gates.lock().push(Some(tx));

                let mut guard = CancelGuard {
                    counter: &self.cancelled,
                    armed: true,
                };
                let response = rx.await;
                guard.armed = false;

                response.map_err(|_| anyhow::anyhow!("gate dropped"))
            }
        }
    }
}

/// Transport that blocks its worker thread until released.
///
/// A request in progress cannot be aborted: once released it runs to
/// completion in the same poll, so only the generation check can stop a
/// superseded response.
pub struct BlockingTransport {
    requests: Mutex<Vec<HttpRequest>>,
    gates: Mutex<Vec<Option<mpsc::Sender<HttpResponse>>>>,
}

impl BlockingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            gates: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn complete(&self, index: usize, response: HttpResponse) -> bool {
        let sender = self.gates.lock().get_mut(index).and_then(Option::take);
        match sender {
            Some(sender) => sender.send(response).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl Transport for BlockingTransport {
    async fn get(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        let (tx, rx) = mpsc::channel();
        self.gates.lock().push(Some(tx));
        self.requests.lock().push(request);

        rx.recv().map_err(|_| anyhow::anyhow!("gate dropped"))
    }
}

/// Mono waveform where pixel `i` holds `(-(i % 100) - 1, i % 100 + 1)`.
pub fn backing_waveform(length: usize, scale: f64, sample_rate: u32) -> WaveformData {
    let peaks = (0..length)
        .map(|i| {
            let v = (i % 100) as i16;
            Peak::new(-v - 1, v + 1)
        })
        .collect();
    WaveformData::mono(sample_rate, scale, PeakChannel::new(peaks)).unwrap()
}

/// JSON peak payload, interleaving `channels` copies of `peaks`.
pub fn json_payload(sample_rate: u32, scale: f64, channels: usize, peaks: &[Peak]) -> Vec<u8> {
    let data: Vec<i16> = peaks
        .iter()
        .flat_map(|p| std::iter::repeat([p.min, p.max]).take(channels).flatten())
        .collect();

    serde_json::to_vec(&serde_json::json!({
        "version": 2,
        "channels": channels,
        "sample_rate": sample_rate,
        "samples_per_pixel": scale,
        "bits": 16,
        "length": peaks.len(),
        "data": data,
    }))
    .unwrap()
}

/// Version 2 binary peak payload, interleaving `channels` copies of `peaks`.
pub fn binary_payload(sample_rate: u32, scale: i32, channels: usize, peaks: &[Peak]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&2i32.to_le_bytes());
    body.extend_from_slice(&0u32.to_le_bytes());
    body.extend_from_slice(&(sample_rate as i32).to_le_bytes());
    body.extend_from_slice(&scale.to_le_bytes());
    body.extend_from_slice(&(peaks.len() as u32).to_le_bytes());
    body.extend_from_slice(&(channels as i32).to_le_bytes());
    for peak in peaks {
        for _ in 0..channels {
            body.extend_from_slice(&peak.min.to_le_bytes());
            body.extend_from_slice(&peak.max.to_le_bytes());
        }
    }
    body
}

/// Distinct detail peaks: `(-(k % 50) - 200, k % 50 + 200)`.
pub fn detail_peaks(count: usize) -> Vec<Peak> {
    (0..count)
        .map(|k| {
            let v = (k % 50) as i16;
            Peak::new(-v - 200, v + 200)
        })
        .collect()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Yield until spawned fetch tasks have had a chance to run.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Poll `condition` until it holds, failing after five seconds.
///
/// Sleeps the calling thread rather than a runtime timer, so it keeps
/// working while every worker is blocked.
pub fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("condition not met within 5s");
}
