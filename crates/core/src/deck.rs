use crate::slides::SlideFact;
use std::sync::{Arc, Mutex};

/// What observers learn when the deck moves to a slide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlideChange {
    pub index: usize,
    pub key: String,
    pub name: String,
    pub script: String,
    /// Short excerpt of the slide body.
    pub hint: String,
}

pub const HINT_CHARS: usize = 2000;

impl SlideChange {
    pub fn from_slide(index: usize, slide: &SlideFact) -> Self {
        Self {
            index,
            key: slide.key.clone(),
            name: slide.name.clone(),
            script: slide.script.clone(),
            hint: crate::context::truncate_chars(&slide.text, HINT_CHARS).to_string(),
        }
    }
}

pub trait SlideObserver {
    fn on_slide_changed(&mut self, change: &SlideChange);
}

pub type SharedObserver = Arc<Mutex<dyn SlideObserver + Send>>;

/// Minimal slide deck: an ordered slide list, the current index and the
/// observers notified on navigation.
#[derive(Default)]
pub struct DeckHost {
    slides: Vec<SlideFact>,
    current: usize,
    observers: Vec<SharedObserver>,
}

impl DeckHost {
    pub fn new(slides: Vec<SlideFact>) -> Self {
        Self {
            slides,
            current: 0,
            observers: Vec::new(),
        }
    }

    pub fn register(&mut self, observer: SharedObserver) {
        self.observers.push(observer);
    }

    pub fn slides(&self) -> &[SlideFact] {
        &self.slides
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&SlideFact> {
        self.slides.get(self.current)
    }

    /// Moves to `index` and notifies every observer. Out of range indices are
    /// ignored and return `None`.
    pub fn play_slide(&mut self, index: usize) -> Option<SlideChange> {
        let slide = self.slides.get(index)?;
        self.current = index;
        let change = SlideChange::from_slide(index, slide);
        tracing::debug!("Slide {} ({})", index, change.key);

        for observer in &self.observers {
            match observer.lock() {
                Ok(mut guard) => guard.on_slide_changed(&change),
                Err(_) => tracing::warn!("Skipping poisoned slide observer"),
            }
        }
        Some(change)
    }

    pub fn next(&mut self) -> Option<SlideChange> {
        self.play_slide(self.current + 1)
    }

    pub fn previous(&mut self) -> Option<SlideChange> {
        self.current.checked_sub(1).and_then(|i| self.play_slide(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<String>,
    }

    impl SlideObserver for Recorder {
        fn on_slide_changed(&mut self, change: &SlideChange) {
            self.seen.push(change.key.clone());
        }
    }

    fn deck() -> DeckHost {
        DeckHost::new(vec![
            SlideFact::new("intro", "Intro", "", ""),
            SlideFact::new("baseline_2025", "Baseline", "", ""),
            SlideFact::new("year_2026", "2026", "", &"x".repeat(3_000)),
        ])
    }

    #[test]
    fn observers_see_every_navigation() {
        // Arrange
        let mut host = deck();
        let recorder = Arc::new(Mutex::new(Recorder::default()));
        host.register(recorder.clone());

        // Act
        host.play_slide(1);
        host.next();
        host.previous();

        // Assert
        assert_eq!(
            recorder.lock().unwrap().seen,
            vec!["baseline_2025", "year_2026", "baseline_2025"]
        );
        assert_eq!(host.current_index(), 1);
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut host = deck();
        let recorder = Arc::new(Mutex::new(Recorder::default()));
        host.register(recorder.clone());

        assert!(host.play_slide(9).is_none());
        assert!(host.previous().is_none());
        assert!(recorder.lock().unwrap().seen.is_empty());
        assert_eq!(host.current_index(), 0);
    }

    #[test]
    fn hint_is_bounded() {
        let mut host = deck();
        let change = host.play_slide(2).unwrap();
        assert_eq!(change.hint.chars().count(), HINT_CHARS);
    }
}
