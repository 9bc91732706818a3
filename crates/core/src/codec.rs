//! Decoding of JSON and binary peak-data payloads.
//!
//! Both formats carry a header (version, sample rate, samples per pixel,
//! bit depth, length, channel count) followed by interleaved `(min, max)`
//! pairs, one pair per channel per pixel.
//!
//! Binary layout (little-endian):
//!
//! | field               | type |
//! |---------------------|------|
//! | version             | i32  |
//! | flags (bit 0: 8bit) | u32  |
//! | sample_rate         | i32  |
//! | samples_per_pixel   | i32  |
//! | length              | u32  |
//! | channels (v2 only)  | i32  |
//! | data                | i8 or i16 pairs |

use serde::{Deserialize, Serialize};

use crate::channel::{Peak, PeakChannel};
use crate::error::WaveformError;
use crate::waveform::WaveformData;

/// Encoding of a peak-data payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    Binary,
    Json,
}

impl PayloadFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Binary => "arraybuffer",
            Self::Json => "json",
        }
    }
}

/// Turns a raw payload into [`WaveformData`].
pub trait WaveformDecoder: Send + Sync {
    fn decode(&self, format: PayloadFormat, body: &[u8]) -> Result<WaveformData, WaveformError>;

    /// Decode an already parsed JSON document.
    fn decode_json_value(&self, value: &serde_json::Value) -> Result<WaveformData, WaveformError>;
}

/// Default decoder for the JSON and binary peak-data formats.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeakDataDecoder;

const BINARY_HEADER_V1: usize = 20;
const BINARY_HEADER_V2: usize = 24;
const FLAG_8_BIT: u32 = 0x1;

/// Largest channel count a payload may declare.
pub const MAX_CHANNELS: usize = 32;

#[derive(Debug, Deserialize)]
struct JsonPeakData {
    version: u32,
    #[serde(default = "default_channels")]
    channels: usize,
    sample_rate: u32,
    samples_per_pixel: f64,
    bits: u8,
    length: usize,
    data: Vec<i32>,
}

fn default_channels() -> usize {
    1
}

impl WaveformDecoder for PeakDataDecoder {
    fn decode(&self, format: PayloadFormat, body: &[u8]) -> Result<WaveformData, WaveformError> {
        match format {
            PayloadFormat::Json => {
                let parsed: JsonPeakData = serde_json::from_slice(body)
                    .map_err(|e| WaveformError::Decode(format!("invalid JSON: {e}")))?;
                from_json(parsed)
            }
            PayloadFormat::Binary => decode_binary(body),
        }
    }

    fn decode_json_value(&self, value: &serde_json::Value) -> Result<WaveformData, WaveformError> {
        let parsed = JsonPeakData::deserialize(value)
            .map_err(|e| WaveformError::Decode(format!("invalid JSON: {e}")))?;
        from_json(parsed)
    }
}

fn check_version(version: u32) -> Result<(), WaveformError> {
    match version {
        1 | 2 => Ok(()),
        other => Err(WaveformError::Decode(format!(
            "unsupported data format version: {other}"
        ))),
    }
}

fn from_json(parsed: JsonPeakData) -> Result<WaveformData, WaveformError> {
    check_version(parsed.version)?;

    let samples = parsed
        .data
        .iter()
        .map(|&v| {
            i16::try_from(v)
                .map_err(|_| WaveformError::Decode(format!("sample {v} out of 16-bit range")))
        })
        .collect::<Result<Vec<i16>, _>>()?;

    build(
        parsed.sample_rate,
        parsed.samples_per_pixel,
        parsed.bits,
        parsed.length,
        parsed.channels,
        &samples,
    )
}

fn read_i32(body: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        body[offset],
        body[offset + 1],
        body[offset + 2],
        body[offset + 3],
    ])
}

fn read_u32(body: &[u8], offset: usize) -> u32 {
    read_i32(body, offset) as u32
}

fn decode_binary(body: &[u8]) -> Result<WaveformData, WaveformError> {
    if body.len() < BINARY_HEADER_V1 {
        return Err(WaveformError::Decode(format!(
            "payload too short for header: {} bytes",
            body.len()
        )));
    }

    let version = read_i32(body, 0);
    let version = u32::try_from(version)
        .map_err(|_| WaveformError::Decode(format!("unsupported data format version: {version}")))?;
    check_version(version)?;

    let flags = read_u32(body, 4);
    let sample_rate = read_i32(body, 8);
    let samples_per_pixel = read_i32(body, 12);
    let length = read_u32(body, 16) as usize;

    let (channels, header_size) = if version == 2 {
        if body.len() < BINARY_HEADER_V2 {
            return Err(WaveformError::Decode(
                "payload too short for version 2 header".to_string(),
            ));
        }
        (read_i32(body, 20), BINARY_HEADER_V2)
    } else {
        (1, BINARY_HEADER_V1)
    };

    let channels = usize::try_from(channels)
        .map_err(|_| WaveformError::Decode(format!("invalid channel count: {channels}")))?;
    let sample_rate = u32::try_from(sample_rate)
        .map_err(|_| WaveformError::Decode(format!("invalid sample rate: {sample_rate}")))?;

    let data = &body[header_size..];
    let (bits, samples): (u8, Vec<i16>) = if flags & FLAG_8_BIT != 0 {
        (8, data.iter().map(|&b| b as i8 as i16).collect())
    } else {
        (
            16,
            data.chunks_exact(2)
                .map(|c| i16::from_le_bytes([c[0], c[1]]))
                .collect(),
        )
    };

    build(
        sample_rate,
        samples_per_pixel as f64,
        bits,
        length,
        channels,
        &samples,
    )
}

fn build(
    sample_rate: u32,
    samples_per_pixel: f64,
    bits: u8,
    length: usize,
    channels: usize,
    samples: &[i16],
) -> Result<WaveformData, WaveformError> {
    if channels == 0 {
        return Err(WaveformError::Decode("channel count must be at least 1".to_string()));
    }
    if channels > MAX_CHANNELS {
        return Err(WaveformError::Decode(format!(
            "channel count {channels} exceeds {MAX_CHANNELS}"
        )));
    }
    if bits != 8 && bits != 16 {
        return Err(WaveformError::Decode(format!("unsupported bit depth: {bits}")));
    }

    let expected = length
        .checked_mul(channels * 2)
        .ok_or_else(|| WaveformError::Decode(format!("length {length} is too large")))?;
    if samples.len() < expected {
        return Err(WaveformError::Decode(format!(
            "expected {} samples, payload has {}",
            expected,
            samples.len()
        )));
    }

    let mut peaks: Vec<Vec<Peak>> = vec![Vec::with_capacity(length); channels];
    for pixel in samples[..expected].chunks_exact(channels * 2) {
        for (channel, pair) in pixel.chunks_exact(2).enumerate() {
            peaks[channel].push(Peak::new(pair[0], pair[1]));
        }
    }

    WaveformData::new(
        sample_rate,
        samples_per_pixel,
        bits,
        peaks.into_iter().map(PeakChannel::new).collect(),
    )
}
