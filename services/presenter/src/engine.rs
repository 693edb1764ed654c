use anyhow::{Result, bail};
use deck_live_core::scheduler::Millis;
use deck_live_core::voice::{SpeechEngine, SpeechEvent, UtteranceId};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Time one spoken word takes at the paced rate.
pub const WORD_MS: Millis = 320;
/// Delay between `speak` and the first word.
pub const LEAD_IN_MS: Millis = 80;

/// Handles the driver keeps after the engine is boxed into a session: the
/// clock it advances and the queue of timed events.
#[derive(Clone, Default)]
pub struct PacedTimeline {
    clock: Arc<AtomicU64>,
    queue: Arc<Mutex<VecDeque<(Millis, SpeechEvent)>>>,
}

impl PacedTimeline {
    pub fn set_now(&self, now: Millis) {
        self.clock.store(now, Ordering::SeqCst);
    }

    /// Events due at or before `now`, in order.
    pub fn due(&self, now: Millis) -> Vec<SpeechEvent> {
        let Ok(mut queue) = self.queue.lock() else {
            return Vec::new();
        };
        let mut due = Vec::new();
        while queue.front().is_some_and(|(at, _)| *at <= now) {
            if let Some((_, event)) = queue.pop_front() {
                due.push(event);
            }
        }
        due
    }

    pub fn is_idle(&self) -> bool {
        self.queue.lock().map(|q| q.is_empty()).unwrap_or(true)
    }
}

/// Terminal stand-in for a platform voice: it "speaks" at a fixed pace and
/// reports start, one boundary per word and end.
pub struct PacedEngine {
    timeline: PacedTimeline,
}

impl PacedEngine {
    pub fn new(timeline: PacedTimeline) -> Self {
        Self { timeline }
    }
}

impl SpeechEngine for PacedEngine {
    fn is_available(&self) -> bool {
        true
    }

    fn speak(&mut self, id: UtteranceId, text: &str) -> Result<()> {
        let words = text.split_whitespace().count() as Millis;
        if words == 0 {
            bail!("Nothing to speak");
        }
        let start = self.timeline.clock.load(Ordering::SeqCst) + LEAD_IN_MS;
        let Ok(mut queue) = self.timeline.queue.lock() else {
            bail!("Speech queue poisoned");
        };
        queue.clear();
        queue.push_back((start, SpeechEvent::Start(id)));
        for word in 0..words {
            queue.push_back((start + word * WORD_MS, SpeechEvent::Boundary(id)));
        }
        queue.push_back((start + words * WORD_MS, SpeechEvent::End(id)));
        println!("🔊 {text}");
        Ok(())
    }

    fn cancel(&mut self) {
        if let Ok(mut queue) = self.timeline.queue.lock() {
            queue.clear();
        }
    }
}
