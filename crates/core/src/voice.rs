use crate::remote::SpeechAudio;
use crate::scheduler::Millis;
use anyhow::{Result, bail};
use deck_live_audio::audio::pcm16_bytes_to_f32;
use deck_live_audio::{DecodedAudio, SPEECH_PCM_SAMPLE_RATE, decode_wav};
use deck_live_openai::types::AudioFormat;

/// Size of the analysis window handed to the lip-sync per frame.
pub const ANALYSIS_WINDOW: usize = 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VoiceMode {
    /// Platform speech engine with word-boundary events.
    #[default]
    System,
    /// Remote synthesis played back locally with signal analysis.
    Ai,
}

impl VoiceMode {
    pub fn label(&self) -> &'static str {
        match self {
            VoiceMode::System => "SYSTEM",
            VoiceMode::Ai => "AI",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            VoiceMode::System => VoiceMode::Ai,
            VoiceMode::Ai => VoiceMode::System,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl UtteranceId {
    pub fn next(&self) -> Self {
        UtteranceId(self.0 + 1)
    }
}

/// Progress reports from a `SpeechEngine`, tagged with the utterance they
/// belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEvent {
    Start(UtteranceId),
    Boundary(UtteranceId),
    End(UtteranceId),
    Error(UtteranceId),
}

impl SpeechEvent {
    pub fn utterance(&self) -> UtteranceId {
        match self {
            SpeechEvent::Start(id)
            | SpeechEvent::Boundary(id)
            | SpeechEvent::End(id)
            | SpeechEvent::Error(id) => *id,
        }
    }
}

/// Platform text-to-speech. Implementations report progress back through
/// `SpeechEvent`s.
pub trait SpeechEngine: Send {
    fn is_available(&self) -> bool;
    fn speak(&mut self, id: UtteranceId, text: &str) -> Result<()>;
    fn cancel(&mut self);
}

/// Something that yields the sample window currently audible.
pub trait AmplitudeSource: Send {
    /// `None` once playback has finished.
    fn window(&mut self, now: Millis) -> Option<Vec<f32>>;
}

/// Plays synthesized audio on the single output.
pub trait AudioPlayer: Send {
    fn play(&mut self, audio: &SpeechAudio, now: Millis) -> Result<Box<dyn AmplitudeSource>>;
    fn stop(&mut self);
}

/// Decodes speech that can be played without a codec: WAV, or the raw
/// 24 kHz PCM16 the provider returns for `pcm`.
pub fn decode_speech(audio: &SpeechAudio) -> Result<DecodedAudio> {
    match audio.format {
        AudioFormat::Wav => decode_wav(&audio.bytes),
        AudioFormat::Pcm => Ok(DecodedAudio {
            samples: pcm16_bytes_to_f32(&audio.bytes),
            sample_rate: SPEECH_PCM_SAMPLE_RATE as u32,
        }),
        _ => bail!("Cannot decode {} for playback", audio.content_type()),
    }
}

/// Decoded mono samples positioned by elapsed time since `started_at`.
#[derive(Debug, Clone)]
pub struct PcmClip {
    samples: Vec<f32>,
    sample_rate: u32,
    started_at: Millis,
}

impl PcmClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32, started_at: Millis) -> Self {
        Self {
            samples,
            sample_rate: sample_rate.max(1),
            started_at,
        }
    }

    pub fn from_wav(bytes: &[u8], started_at: Millis) -> Result<Self> {
        let decoded = decode_wav(bytes)?;
        Ok(Self::new(decoded.samples, decoded.sample_rate, started_at))
    }

    pub fn duration_ms(&self) -> Millis {
        self.samples.len() as Millis * 1_000 / self.sample_rate as Millis
    }

    fn position(&self, now: Millis) -> usize {
        let elapsed = now.saturating_sub(self.started_at);
        (elapsed * self.sample_rate as Millis / 1_000) as usize
    }
}

impl AmplitudeSource for PcmClip {
    fn window(&mut self, now: Millis) -> Option<Vec<f32>> {
        let pos = self.position(now);
        if pos >= self.samples.len() {
            return None;
        }
        let end = (pos + ANALYSIS_WINDOW).min(self.samples.len());
        Some(self.samples[pos..end].to_vec())
    }
}
