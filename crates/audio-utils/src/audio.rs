use base64::Engine;
use ringbuf::HeapRb;
use rubato::{FastFixedIn, PolynomialDegree};

pub use base64::DecodeError as Base64DecodeError;

/// Sample rate of the raw `pcm` format returned by the speech endpoint.
pub const SPEECH_PCM_SAMPLE_RATE: f64 = 24000.0;

/// Creates a resampler to convert between audio sample rates.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

/// Splits a slice of audio samples into a vector of vectors, where each inner vector has a fixed chunk size.
/// If a chunk is smaller than the `chunk_size`, it is padded with zeros.
pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    samples
        .chunks(chunk_size.max(1))
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.resize(chunk_size.max(1), 0.0);
            chunk
        })
        .collect()
}

/// Creates a new ring buffer on the heap for shared audio data.
pub fn shared_buffer(size: usize) -> HeapRb<f32> {
    HeapRb::new(size.max(1))
}

/// Root-mean-square amplitude of a window of samples normalized to [-1, 1].
/// An empty window is silence.
pub fn rms(window: &[f32]) -> f32 {
    if window.is_empty() {
        return 0.0;
    }
    let sum: f32 = window.iter().map(|v| v * v).sum();
    (sum / window.len() as f32).sqrt()
}

/// Interprets raw bytes as little-endian PCM16 and normalizes to f32.
/// A trailing odd byte is dropped.
pub fn pcm16_bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|chunk| {
            let v = i16::from_le_bytes([chunk[0], chunk[1]]);
            (v as f32 / 32768.0).clamp(-1.0, 1.0)
        })
        .collect()
}

/// Encodes arbitrary bytes as standard base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decodes standard base64, ignoring surrounding whitespace.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, Base64DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(text.trim())
}

/// Averages interleaved frames down to one channel.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|c| c.iter().sum::<f32>() / c.len() as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_silence_and_full_scale() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(rms(&[0.0; 256]), 0.0);
        let square: Vec<f32> = (0..256).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!((rms(&square) - 1.0).abs() < 1e-6);
        let half = [0.5_f32; 64];
        assert!((rms(&half) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn pcm16_is_little_endian_and_drops_odd_byte() {
        let bytes = [0x00, 0x40, 0x00, 0xC0, 0x7F];
        assert_eq!(pcm16_bytes_to_f32(&bytes), vec![0.5, -0.5]);
    }

    #[test]
    fn base64_trims_and_rejects_garbage() {
        assert_eq!(decode_base64(&format!(" {} ", encode_base64(b"RIFF"))).unwrap(), b"RIFF");
        assert!(decode_base64("@@").is_err());
    }

    #[test]
    fn split_pads_last_chunk() {
        let chunks = split_for_chunks(&[1.0, 2.0, 3.0], 2);
        assert_eq!(chunks, vec![vec![1.0, 2.0], vec![3.0, 0.0]]);
    }

    #[test]
    fn downmix_averages_frames() {
        assert_eq!(downmix(&[1.0, 0.0, 0.5, 0.5], 2), vec![0.5, 0.5]);
        assert_eq!(downmix(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }
}
