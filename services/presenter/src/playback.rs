//! Local audio output for synthesized speech.
//!
//! The cpal stream lives on its own thread because streams are not `Send` on
//! every host; the player only keeps the producer side of the ring buffer.

use crate::config::{MAX_CLIP_SECONDS, OUTPUT_CHUNK_SIZE};
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FrameCount, StreamConfig};
use deck_live_audio::audio::{create_resampler, shared_buffer, split_for_chunks};
use deck_live_core::remote::SpeechAudio;
use deck_live_core::scheduler::Millis;
use deck_live_core::voice::{AmplitudeSource, AudioPlayer, PcmClip, decode_speech};
use ringbuf::HeapProd;
use ringbuf::traits::{Consumer, Producer, Split};
use rubato::Resampler;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const FLUSH_WAIT: Duration = Duration::from_millis(100);

/// Plays WAV or raw PCM speech on the default (or a named) output device.
pub struct CpalPlayer {
    producer: HeapProd<f32>,
    flush: Arc<AtomicBool>,
    sample_rate: f64,
    shutdown: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl CpalPlayer {
    pub fn open(device_name: Option<String>) -> Result<Self> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(HeapProd<f32>, f64)>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let flush = Arc::new(AtomicBool::new(false));
        let stream_flush = flush.clone();

        let worker = std::thread::spawn(move || {
            let stream = match build_output_stream(device_name, stream_flush) {
                Ok((stream, producer, rate)) => {
                    if ready_tx.send(Ok((producer, rate))).is_err() {
                        return;
                    }
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            // Keep the stream alive until the player is dropped.
            let _ = shutdown_rx.recv();
            drop(stream);
        });

        let (producer, sample_rate) = ready_rx
            .recv()
            .context("Audio output thread exited before reporting")??;
        Ok(Self {
            producer,
            flush,
            sample_rate,
            shutdown: Some(shutdown_tx),
            worker: Some(worker),
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Gives the output callback a chance to drop what a previous `stop` left
    /// behind, so the new clip is not cleared with it.
    fn wait_for_flush(&self) {
        let deadline = Instant::now() + FLUSH_WAIT;
        while self.flush.load(Ordering::SeqCst) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        self.flush.store(false, Ordering::SeqCst);
    }

    fn enqueue(&mut self, samples: &[f32], source_rate: f64) -> Result<()> {
        let mut resampler = create_resampler(source_rate, self.sample_rate, OUTPUT_CHUNK_SIZE)?;
        let chunk_size = resampler.input_frames_next();
        let mut dropped = 0usize;

        for chunk in split_for_chunks(samples, chunk_size) {
            let resampled = resampler
                .process(&[chunk.as_slice()], None)
                .context("Failed to resample speech")?;
            if let Some(channel) = resampled.first() {
                dropped += channel.len() - self.producer.push_slice(channel);
            }
        }
        if dropped > 0 {
            tracing::warn!("Output buffer full, dropped {} samples", dropped);
        }
        Ok(())
    }
}

impl AudioPlayer for CpalPlayer {
    fn play(&mut self, audio: &SpeechAudio, now: Millis) -> Result<Box<dyn AmplitudeSource>> {
        let clip = decode_speech(audio)?;
        self.wait_for_flush();
        self.enqueue(&clip.samples, clip.sample_rate as f64)?;
        tracing::info!(
            "Playing {} ms of speech at {} Hz",
            clip.duration_ms(),
            clip.sample_rate
        );
        Ok(Box::new(PcmClip::new(clip.samples, clip.sample_rate, now)))
    }

    fn stop(&mut self) {
        self.flush.store(true, Ordering::SeqCst);
    }
}

impl Drop for CpalPlayer {
    fn drop(&mut self) {
        self.shutdown.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn build_output_stream(
    device_name: Option<String>,
    flush: Arc<AtomicBool>,
) -> Result<(cpal::Stream, HeapProd<f32>, f64)> {
    let output = deck_live_audio::device::get_or_default_output(device_name)
        .context("Failed to get default audio output device")?;
    tracing::info!("Using output device: {:?}", output.name()?);

    let default_config = output
        .default_output_config()
        .context("Failed to get default output config")?;
    let output_config = StreamConfig {
        channels: default_config.channels(),
        sample_rate: default_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(FrameCount::from(OUTPUT_CHUNK_SIZE as u32)),
    };
    let channel_count = output_config.channels as usize;
    let sample_rate = output_config.sample_rate.0 as f64;
    tracing::debug!("Output stream config: {:?}", &output_config);

    let buffer = shared_buffer(sample_rate as usize * MAX_CLIP_SECONDS);
    let (producer, mut consumer) = buffer.split();

    let output_data_fn = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        if flush.swap(false, Ordering::SeqCst) {
            consumer.clear();
        }
        // Mono speech goes to every channel of the frame.
        for frame in data.chunks_mut(channel_count.max(1)) {
            let sample = consumer.try_pop().unwrap_or(0.0);
            frame.fill(sample);
        }
    };

    let stream = output.build_output_stream(
        &output_config,
        output_data_fn,
        move |err| tracing::error!("An error occurred on output stream: {}", err),
        None,
    )?;
    stream.play()?;
    Ok((stream, producer, sample_rate))
}
