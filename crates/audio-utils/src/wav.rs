use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::io::{Cursor, Read};

use crate::audio::downmix;

/// Mono samples in [-1, 1] with their sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

/// Decodes a RIFF/WAVE byte buffer into mono f32 samples.
///
/// Streamed WAV (as returned by speech endpoints) is accepted too: its
/// placeholder RIFF and `data` sizes are rewritten to the buffer length.
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedAudio> {
    match WavReader::new(Cursor::new(bytes)) {
        Ok(reader) => read_samples(reader),
        Err(e) => match fix_streamed_sizes(bytes) {
            Some(fixed) => {
                tracing::debug!("wav header rejected ({}), retrying with patched sizes", e);
                let reader = WavReader::new(Cursor::new(fixed))
                    .context("Failed to parse WAV header")?;
                read_samples(reader)
            }
            None => Err(e).context("Failed to parse WAV header"),
        },
    }
}

fn read_samples<R: Read>(mut reader: WavReader<R>) -> Result<DecodedAudio> {
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read float WAV samples")?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v as f32 / scale).clamp(-1.0, 1.0)))
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read integer WAV samples")?
        }
    };

    tracing::debug!(
        "decoded wav: {}ch {}hz {} bits, {} frames",
        spec.channels,
        spec.sample_rate,
        spec.bits_per_sample,
        interleaved.len() / channels
    );

    Ok(DecodedAudio {
        samples: downmix(&interleaved, channels),
        sample_rate: spec.sample_rate,
    })
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Rewrites the RIFF size and the `data` chunk size to what the buffer
/// actually holds, cut down to whole frames. `None` when there is no RIFF/WAVE
/// header or no `data` chunk.
fn fix_streamed_sizes(bytes: &[u8]) -> Option<Vec<u8>> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return None;
    }
    let mut block_align = 1;
    let mut pos = 12;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = read_u32(bytes, pos + 4) as usize;
        let body = pos + 8;
        if id == b"fmt " && body + 14 <= bytes.len() {
            block_align = u16::from_le_bytes([bytes[body + 12], bytes[body + 13]]).max(1) as usize;
        }
        if id == b"data" {
            let available = size.min(bytes.len() - body);
            let len = available - available % block_align;
            let mut fixed = bytes[..body + len].to_vec();
            fixed[pos + 4..pos + 8].copy_from_slice(&(len as u32).to_le_bytes());
            let riff = (fixed.len() - 8) as u32;
            fixed[4..8].copy_from_slice(&riff.to_le_bytes());
            return Some(fixed);
        }
        pos = body.saturating_add(size).saturating_add(size & 1);
    }
    None
}
