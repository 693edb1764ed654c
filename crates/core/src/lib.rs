pub mod answer;
pub mod avatar;
pub mod chat;
pub mod context;
pub mod deck;
pub mod kpi;
pub mod lipsync;
pub mod pulse;
pub mod remote;
pub mod scheduler;
pub mod scorer;
pub mod session;
pub mod slides;
pub mod voice;

/// User commands the presenter surface sends to a `DeckSession`.
///
/// Toolbar buttons, keyboard shortcuts and the CLI all end up here, which keeps
/// the session independent of whatever drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Show or hide the KPI HUD and pulse ticker.
    ToggleLive,
    /// Show or hide the avatar. Hiding it also silences it.
    ToggleAvatar,
    ToggleChat,
    /// Switch between the platform voice and the synthesized voice.
    CycleVoiceMode,
    SpeakCurrentSlide,
    StopSpeaking,
    ClearChat,
}

impl Command {
    /// Keyboard shortcut for a command, ignoring case.
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'l' => Some(Command::ToggleLive),
            'c' => Some(Command::ToggleChat),
            'v' => Some(Command::ToggleAvatar),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortcuts_ignore_case() {
        assert_eq!(Command::from_key('l'), Some(Command::ToggleLive));
        assert_eq!(Command::from_key('C'), Some(Command::ToggleChat));
        assert_eq!(Command::from_key('V'), Some(Command::ToggleAvatar));
        assert_eq!(Command::from_key('q'), None);
    }
}
