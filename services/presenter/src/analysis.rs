use anyhow::{Context, Result};
use deck_live_core::lipsync::LipSync;
use deck_live_core::scheduler::Millis;
use deck_live_core::voice::{PcmClip, UtteranceId};
use std::path::Path;

/// Mouth levels of an offline run over a clip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LipSyncReport {
    pub duration_ms: Millis,
    pub frames: Vec<(Millis, f32)>,
}

impl LipSyncReport {
    pub fn peak(&self) -> f32 {
        self.frames.iter().map(|(_, m)| *m).fold(0.0, f32::max)
    }

    pub fn mean(&self) -> f32 {
        if self.frames.is_empty() {
            return 0.0;
        }
        self.frames.iter().map(|(_, m)| *m).sum::<f32>() / self.frames.len() as f32
    }
}

/// Steps a signal-driven `LipSync` over `clip` at a fixed frame interval.
pub fn analyze_clip(clip: PcmClip, frame_ms: Millis) -> LipSyncReport {
    let duration_ms = clip.duration_ms();
    let step = frame_ms.max(1);
    let mut lipsync = LipSync::new();
    lipsync.begin_signal(UtteranceId(1), Box::new(clip));

    let mut frames = Vec::new();
    let mut now: Millis = 0;
    loop {
        let mouth = lipsync.sample(now);
        if !lipsync.is_signal() {
            break;
        }
        frames.push((now, mouth));
        now += step;
    }
    LipSyncReport {
        duration_ms,
        frames,
    }
}

pub fn analyze_wav_file(path: &Path, frame_ms: Millis) -> Result<LipSyncReport> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let clip = PcmClip::from_wav(&bytes, 0)?;
    Ok(analyze_clip(clip, frame_ms))
}
