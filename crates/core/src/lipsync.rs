use crate::scheduler::{Millis, Scheduler};
use crate::voice::{AmplitudeSource, UtteranceId};
use deck_live_audio::rms;

/// RMS to mouth openness gain.
pub const RMS_GAIN: f32 = 6.5;

/// Mouth levels after a word boundary: fully open, then these steps.
pub const BOUNDARY_STEPS: [(Millis, f32); 2] = [(60, 0.25), (130, 0.0)];

/// Delayed mouth level for a boundary pulse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouthStep {
    pub utterance: UtteranceId,
    pub level: f32,
}

enum Drive {
    Idle,
    Boundary(UtteranceId),
    Signal(UtteranceId, Box<dyn AmplitudeSource>),
}

/// Mouth openness for the avatar, driven either by speech-engine boundary
/// events or by the amplitude of the audio being played.
pub struct LipSync {
    mouth: f32,
    talking: bool,
    drive: Drive,
}

impl Default for LipSync {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LipSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LipSync")
            .field("mouth", &self.mouth)
            .field("talking", &self.talking)
            .field("active", &self.active())
            .finish()
    }
}

impl LipSync {
    pub fn new() -> Self {
        Self {
            mouth: 0.0,
            talking: false,
            drive: Drive::Idle,
        }
    }

    pub fn mouth(&self) -> f32 {
        self.mouth
    }

    pub fn is_talking(&self) -> bool {
        self.talking
    }

    pub fn active(&self) -> Option<UtteranceId> {
        match &self.drive {
            Drive::Idle => None,
            Drive::Boundary(id) | Drive::Signal(id, _) => Some(*id),
        }
    }

    pub fn is_signal(&self) -> bool {
        matches!(self.drive, Drive::Signal(..))
    }

    pub fn begin_boundary(&mut self, id: UtteranceId) {
        self.stop();
        self.drive = Drive::Boundary(id);
    }

    pub fn on_start(&mut self, id: UtteranceId) {
        if self.is_boundary(id) {
            self.talking = true;
        }
    }

    /// Opens the mouth and schedules the closing steps.
    pub fn on_boundary<E: Clone + From<MouthStep>>(
        &mut self,
        id: UtteranceId,
        scheduler: &mut Scheduler<E>,
    ) {
        if !self.is_boundary(id) {
            return;
        }
        self.mouth = 1.0;
        for (delay, level) in BOUNDARY_STEPS {
            scheduler.set_timeout(
                delay,
                MouthStep {
                    utterance: id,
                    level,
                }
                .into(),
            );
        }
    }

    /// Applies a scheduled step unless its utterance has been replaced.
    pub fn apply_step(&mut self, step: MouthStep) {
        if self.is_boundary(step.utterance) {
            self.mouth = step.level;
        }
    }

    pub fn on_end(&mut self, id: UtteranceId) {
        if self.is_boundary(id) {
            self.stop();
        }
    }

    pub fn on_error(&mut self, id: UtteranceId) {
        self.on_end(id);
    }

    pub fn begin_signal(&mut self, id: UtteranceId, source: Box<dyn AmplitudeSource>) {
        self.stop();
        self.drive = Drive::Signal(id, source);
        self.talking = true;
    }

    /// Per-frame update. In signal mode the mouth follows the window RMS; a
    /// drained source returns the animator to idle.
    pub fn sample(&mut self, now: Millis) -> f32 {
        if let Drive::Signal(_, source) = &mut self.drive {
            match source.window(now) {
                Some(window) => self.mouth = (rms(&window) * RMS_GAIN).clamp(0.0, 1.0),
                None => self.stop(),
            }
        }
        self.mouth
    }

    pub fn stop(&mut self) {
        self.drive = Drive::Idle;
        self.mouth = 0.0;
        self.talking = false;
    }

    fn is_boundary(&self, id: UtteranceId) -> bool {
        matches!(self.drive, Drive::Boundary(active) if active == id)
    }
}
