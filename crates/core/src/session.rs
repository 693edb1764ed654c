use crate::Command;
use crate::avatar::{AvatarCanvas, AvatarLayout, Blink, FrameState};
use crate::chat::{
    ChatBackend, ChatLog, ChatRequest, ChatRole, NO_ANSWER, OFFLINE_MESSAGE, SlideContext,
    WELCOME_MESSAGE,
};
use crate::deck::{SlideChange, SlideObserver};
use crate::kpi::{KpiAnimator, KpiDisplay, KpiTimeline, background_cue, slide_year};
use crate::lipsync::{LipSync, MouthStep};
use crate::pulse::PulseAnimator;
use crate::remote::{SpeechRequest, SpeechService};
use crate::scheduler::{Millis, Scheduler, TimerId};
use crate::voice::{AudioPlayer, SpeechEngine, SpeechEvent, UtteranceId, VoiceMode};
use deck_live_openai::types::{AudioFormat, Voice};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

pub const STATUS_READY: &str = "Ready • Holo-voice";
pub const STATUS_AI_READY: &str = "AI voice ready (requires OPENAI_API_KEY)";
pub const STATUS_SPEAKING_SYSTEM: &str = "Speaking (system)…";
pub const STATUS_SPEAKING_AI: &str = "Speaking (AI)…";
pub const STATUS_SYNTHESIZING: &str = "Synthesizing voice (AI)…";
pub const STATUS_ENGINE_UNAVAILABLE: &str = "Speech engine unavailable";
pub const STATUS_VOICE_ERROR: &str = "Voice error";
pub const STATUS_STOPPED: &str = "Stopped";
pub const STOPPED_RESET_MS: Millis = 500;

pub const CHAT_IDLE: &str = "Ready";
pub const CHAT_THINKING: &str = "Thinking…";
pub const CHAT_ONLINE: &str = "Online";
pub const CHAT_OFFLINE: &str = "Offline";

pub const FALLBACK_NARRATION: &str = "Strategy journey.";
pub const AI_VOICE_INSTRUCTIONS: &str = "Warm, confident Nordic business presenter. Clear articulation. Subtle enthusiasm. No dramatic acting.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    PulseTick,
    MouthStep(MouthStep),
    StatusReset,
}

impl From<MouthStep> for SessionEvent {
    fn from(step: MouthStep) -> Self {
        SessionEvent::MouthStep(step)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub live: String,
    pub avatar: String,
    pub chat: String,
    pub voice_mode: String,
}

fn on_off(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}

/// Result of a chat submission.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    Answered(String),
    /// The backend could not be reached; the question is handed back so the
    /// caller can retry it.
    Offline { question: String },
    /// Blank input, nothing was sent.
    Ignored,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionFrame {
    pub now: Millis,
    pub kpi: KpiDisplay,
    pub live_visible: bool,
    pub osa: String,
    pub osa_sub: String,
    pub ticker: Option<String>,
    pub avatar_visible: bool,
    pub avatar: FrameState,
    pub avatar_status: String,
    pub chat_visible: bool,
    pub chat_status: String,
}

/// One presenter's live layer over the deck: toggles, HUD animators, avatar
/// voice and chat.
///
/// Driven from the outside: `advance` fires due timers, `frame` renders, the
/// async methods suspend only on the network.
pub struct DeckSession {
    live: bool,
    avatar: bool,
    chat: bool,
    voice_mode: VoiceMode,

    kpi: KpiAnimator,
    pulse: PulseAnimator,
    blink: Blink,
    lipsync: LipSync,
    chat_log: ChatLog,
    chat_status: String,
    avatar_status: String,
    background_cue: Option<f64>,
    current_slide: Option<SlideChange>,

    scheduler: Scheduler<SessionEvent>,
    rng: StdRng,
    last_utterance: UtteranceId,
    status_reset: Option<TimerId>,

    engine: Option<Box<dyn SpeechEngine>>,
    player: Option<Box<dyn AudioPlayer>>,
    speech: Option<Arc<dyn SpeechService>>,
}

impl DeckSession {
    pub fn new(seed: u64) -> Self {
        Self::with_timeline(KpiTimeline::default(), seed)
    }

    pub fn with_timeline(timeline: KpiTimeline, seed: u64) -> Self {
        let mut session = Self {
            live: true,
            avatar: true,
            chat: false,
            voice_mode: VoiceMode::default(),
            kpi: KpiAnimator::new(timeline),
            pulse: PulseAnimator::new(),
            blink: Blink::new(),
            lipsync: LipSync::new(),
            chat_log: ChatLog::with_greeting(WELCOME_MESSAGE),
            chat_status: CHAT_IDLE.to_string(),
            avatar_status: STATUS_READY.to_string(),
            background_cue: None,
            current_slide: None,
            scheduler: Scheduler::new(),
            rng: StdRng::seed_from_u64(seed),
            last_utterance: UtteranceId::default(),
            status_reset: None,
            engine: None,
            player: None,
            speech: None,
        };
        session.apply_toggles();
        session
    }

    pub fn with_speech_engine(mut self, engine: Box<dyn SpeechEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_audio_player(mut self, player: Box<dyn AudioPlayer>) -> Self {
        self.player = Some(player);
        self
    }

    pub fn with_speech_service(mut self, speech: Arc<dyn SpeechService>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn now(&self) -> Millis {
        self.scheduler.now()
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn is_avatar_on(&self) -> bool {
        self.avatar
    }

    pub fn is_chat_on(&self) -> bool {
        self.chat
    }

    pub fn voice_mode(&self) -> VoiceMode {
        self.voice_mode
    }

    pub fn kpi(&self) -> &KpiAnimator {
        &self.kpi
    }

    pub fn pulse(&self) -> &PulseAnimator {
        &self.pulse
    }

    pub fn lipsync(&self) -> &LipSync {
        &self.lipsync
    }

    pub fn chat_log(&self) -> &ChatLog {
        &self.chat_log
    }

    pub fn chat_status(&self) -> &str {
        &self.chat_status
    }

    pub fn avatar_status(&self) -> &str {
        &self.avatar_status
    }

    pub fn background_cue(&self) -> Option<f64> {
        self.background_cue
    }

    pub fn current_slide(&self) -> Option<&SlideChange> {
        self.current_slide.as_ref()
    }

    pub fn labels(&self) -> Labels {
        Labels {
            live: format!("LIVE: {}", on_off(self.live)),
            avatar: format!("AVATAR: {}", on_off(self.avatar)),
            chat: format!("CHAT: {}", on_off(self.chat)),
            voice_mode: format!("VOICE MODE: {}", self.voice_mode.label()),
        }
    }

    /// Fires every timer due at `now`.
    pub fn advance(&mut self, now: Millis) {
        for event in self.scheduler.advance_to(now) {
            match event {
                SessionEvent::PulseTick => self.pulse.tick(&mut self.rng),
                SessionEvent::MouthStep(step) => self.lipsync.apply_step(step),
                SessionEvent::StatusReset => {
                    self.status_reset = None;
                    self.avatar_status = STATUS_READY.to_string();
                }
            }
        }
    }

    /// Advances to `now` and computes one frame.
    pub fn frame(&mut self, now: Millis) -> SessionFrame {
        self.advance(now);

        let was_signal = self.lipsync.is_signal();
        let mouth = self.lipsync.sample(now);
        if was_signal && !self.lipsync.is_signal() {
            tracing::debug!("AI voice playback finished");
            self.avatar_status = STATUS_READY.to_string();
        }
        let blink = self.blink.step(&mut self.rng);
        let sample = self.pulse.sample();

        SessionFrame {
            now,
            kpi: self.kpi.display(now),
            live_visible: self.live,
            osa: sample.headline(),
            osa_sub: sample.detail(),
            ticker: self.pulse.ticker().map(str::to_string),
            avatar_visible: self.avatar,
            avatar: FrameState { mouth, blink },
            avatar_status: self.avatar_status.clone(),
            chat_visible: self.chat,
            chat_status: self.chat_status.clone(),
        }
    }

    /// Draws the avatar of `frame` when it is visible.
    pub fn draw_avatar(frame: &SessionFrame, canvas: &mut dyn AvatarCanvas) {
        if !frame.avatar_visible {
            return;
        }
        let (width, height) = canvas.size();
        let layout = AvatarLayout::compute(width, height, &frame.avatar);
        canvas.draw(&layout, &frame.avatar);
    }

    pub async fn apply(&mut self, command: Command) {
        match command {
            Command::ToggleLive => self.toggle_live(),
            Command::ToggleAvatar => self.toggle_avatar(),
            Command::ToggleChat => self.toggle_chat(),
            Command::CycleVoiceMode => self.cycle_voice_mode(),
            Command::SpeakCurrentSlide => self.speak_current_slide().await,
            Command::StopSpeaking => self.stop_speaking(),
            Command::ClearChat => self.clear_chat(),
        }
    }

    /// Keyboard shortcuts. Returns the command that was applied.
    pub fn handle_key(&mut self, key: char) -> Option<Command> {
        let command = Command::from_key(key)?;
        match command {
            Command::ToggleLive => self.toggle_live(),
            Command::ToggleAvatar => self.toggle_avatar(),
            Command::ToggleChat => self.toggle_chat(),
            _ => return None,
        }
        Some(command)
    }

    pub fn toggle_live(&mut self) {
        self.live = !self.live;
        self.apply_toggles();
    }

    pub fn toggle_avatar(&mut self) {
        self.avatar = !self.avatar;
        if !self.avatar {
            self.stop_voice();
        }
        self.apply_toggles();
    }

    pub fn toggle_chat(&mut self) {
        self.chat = !self.chat;
        self.apply_toggles();
    }

    pub fn cycle_voice_mode(&mut self) {
        self.voice_mode = self.voice_mode.next();
        self.stop_voice();
        self.apply_toggles();
        self.avatar_status = match self.voice_mode {
            VoiceMode::Ai => STATUS_AI_READY,
            VoiceMode::System => STATUS_READY,
        }
        .to_string();
    }

    pub fn stop_speaking(&mut self) {
        self.stop_voice();
        self.avatar_status = STATUS_STOPPED.to_string();
        if let Some(id) = self.status_reset.take() {
            self.scheduler.cancel(id);
        }
        self.status_reset = Some(
            self.scheduler
                .set_timeout(STOPPED_RESET_MS, SessionEvent::StatusReset),
        );
    }

    pub fn clear_chat(&mut self) {
        self.chat_log.clear();
    }

    pub async fn speak_current_slide(&mut self) {
        let text = self
            .current_slide
            .as_ref()
            .map(|s| {
                if !s.script.trim().is_empty() {
                    s.script.clone()
                } else {
                    s.name.clone()
                }
            })
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_NARRATION.to_string());
        self.speak(&text).await;
    }

    /// Speaks `text` in the current voice mode. Whatever was speaking before
    /// is stopped first.
    pub async fn speak(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.stop_voice();
        match self.voice_mode {
            VoiceMode::System => self.speak_system(text),
            VoiceMode::Ai => self.speak_ai(text).await,
        }
    }

    fn speak_system(&mut self, text: &str) {
        let id = self.next_utterance();
        let Some(engine) = self.engine.as_mut().filter(|e| e.is_available()) else {
            self.avatar_status = STATUS_ENGINE_UNAVAILABLE.to_string();
            return;
        };
        self.lipsync.begin_boundary(id);
        if let Err(err) = engine.speak(id, text) {
            tracing::warn!("Speech engine failed: {err:#}");
            self.lipsync.stop();
            self.avatar_status = STATUS_VOICE_ERROR.to_string();
        }
    }

    async fn speak_ai(&mut self, text: &str) {
        self.avatar_status = STATUS_SYNTHESIZING.to_string();
        let Some(speech) = self.speech.clone() else {
            self.avatar_status = "AI voice offline. Set OPENAI_API_KEY.".to_string();
            return;
        };

        let request = SpeechRequest::new(text)
            .with_voice(Voice::Marin)
            .with_format(AudioFormat::Wav)
            .with_instructions(AI_VOICE_INSTRUCTIONS);
        let audio = match speech.synthesize(&request).await {
            Ok(audio) => audio,
            Err(err) => {
                tracing::warn!("Speech synthesis failed: {err}");
                self.avatar_status =
                    format!("AI voice offline ({}). Set OPENAI_API_KEY.", err.status());
                return;
            }
        };

        let now = self.now();
        let Some(player) = self.player.as_mut() else {
            self.avatar_status = STATUS_ENGINE_UNAVAILABLE.to_string();
            return;
        };
        match player.play(&audio, now) {
            Ok(source) => {
                let id = self.next_utterance();
                self.lipsync.begin_signal(id, source);
                self.avatar_status = STATUS_SPEAKING_AI.to_string();
                tracing::debug!("AI voice started ({} bytes)", audio.bytes.len());
            }
            Err(err) => {
                tracing::warn!("Audio playback failed: {err:#}");
                self.lipsync.stop();
                self.avatar_status = STATUS_VOICE_ERROR.to_string();
            }
        }
    }

    /// Progress from the platform speech engine.
    pub fn on_speech_event(&mut self, event: SpeechEvent) {
        if self.lipsync.active() != Some(event.utterance()) {
            return;
        }
        match event {
            SpeechEvent::Start(id) => {
                self.lipsync.on_start(id);
                self.avatar_status = STATUS_SPEAKING_SYSTEM.to_string();
            }
            SpeechEvent::Boundary(id) => self.lipsync.on_boundary(id, &mut self.scheduler),
            SpeechEvent::End(id) => {
                self.lipsync.on_end(id);
                self.avatar_status = STATUS_READY.to_string();
            }
            SpeechEvent::Error(id) => {
                self.lipsync.on_error(id);
                self.avatar_status = STATUS_VOICE_ERROR.to_string();
            }
        }
    }

    /// Sends a question with the current slide as context. The user turn is
    /// logged before the call and the reply after it.
    pub async fn submit_question(&mut self, text: &str, backend: &dyn ChatBackend) -> ChatOutcome {
        let question = text.trim();
        if question.is_empty() {
            return ChatOutcome::Ignored;
        }
        self.chat_log.push(ChatRole::User, question);
        self.chat_status = CHAT_THINKING.to_string();

        let request = ChatRequest::new(question).with_context(self.slide_context());
        match backend.ask(&request).await {
            Ok(answer) => {
                let answer = if answer.trim().is_empty() {
                    NO_ANSWER.to_string()
                } else {
                    answer
                };
                self.chat_log.push(ChatRole::Assistant, &answer);
                self.chat_status = CHAT_ONLINE.to_string();
                if self.avatar {
                    self.speak(&answer).await;
                }
                ChatOutcome::Answered(answer)
            }
            Err(err) => {
                tracing::warn!("Chat request failed: {err}");
                self.chat_log.push(ChatRole::Assistant, OFFLINE_MESSAGE);
                self.chat_status = CHAT_OFFLINE.to_string();
                ChatOutcome::Offline {
                    question: question.to_string(),
                }
            }
        }
    }

    fn slide_context(&self) -> SlideContext {
        let slide = self.current_slide.as_ref();
        SlideContext {
            slide_key: slide.map(|s| s.key.clone()),
            slide_name: slide.map(|s| s.name.clone()),
            year: Some(self.kpi.year()),
            slide_script: slide.map(|s| s.script.clone()).unwrap_or_default(),
            slide_hint: slide.map(|s| s.hint.clone()).unwrap_or_default(),
        }
    }

    fn apply_toggles(&mut self) {
        if self.live {
            self.pulse.start(&mut self.scheduler, SessionEvent::PulseTick);
        } else {
            self.pulse.stop(&mut self.scheduler);
        }
    }

    /// Silences both voice paths and closes the mouth.
    fn stop_voice(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.cancel();
        }
        if let Some(player) = self.player.as_mut() {
            player.stop();
        }
        self.lipsync.stop();
    }

    fn next_utterance(&mut self) -> UtteranceId {
        self.last_utterance = self.last_utterance.next();
        self.last_utterance
    }
}

impl SlideObserver for DeckSession {
    fn on_slide_changed(&mut self, change: &SlideChange) {
        self.current_slide = Some(change.clone());
        if let Some(year) = slide_year(&change.key) {
            let now = self.now();
            self.kpi.update_for_year(year, now, self.live);
            self.background_cue = Some(background_cue(year));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatError, MockChatBackend};
    use crate::deck::DeckHost;
    use crate::remote::{MockSpeechService, RemoteError, SpeechAudio};
    use crate::slides::SlideFact;
    use crate::voice::{AmplitudeSource, PcmClip};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Speak(UtteranceId, String),
        Cancel,
        Play,
        Stop,
    }

    type Calls = Arc<Mutex<Vec<Call>>>;

    struct FakeEngine {
        available: bool,
        calls: Calls,
    }

    impl SpeechEngine for FakeEngine {
        fn is_available(&self) -> bool {
            self.available
        }

        fn speak(&mut self, id: UtteranceId, text: &str) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(Call::Speak(id, text.to_string()));
            Ok(())
        }

        fn cancel(&mut self) {
            self.calls.lock().unwrap().push(Call::Cancel);
        }
    }

    /// Plays a loud clip lasting one second.
    struct FakePlayer {
        calls: Calls,
    }

    impl AudioPlayer for FakePlayer {
        fn play(&mut self, _audio: &SpeechAudio, now: Millis) -> anyhow::Result<Box<dyn AmplitudeSource>> {
            self.calls.lock().unwrap().push(Call::Play);
            Ok(Box::new(PcmClip::new(vec![0.8; 8_000], 8_000, now)))
        }

        fn stop(&mut self) {
            self.calls.lock().unwrap().push(Call::Stop);
        }
    }

    fn wav_service() -> MockSpeechService {
        let mut speech = MockSpeechService::new();
        speech
            .expect_synthesize()
            .returning(|req| Ok(SpeechAudio::new(req.format, vec![0u8; 4])));
        speech
    }

    fn session(calls: &Calls) -> DeckSession {
        DeckSession::new(11)
            .with_speech_engine(Box::new(FakeEngine {
                available: true,
                calls: calls.clone(),
            }))
            .with_audio_player(Box::new(FakePlayer { calls: calls.clone() }))
            .with_speech_service(Arc::new(wav_service()))
    }

    fn last_speak_id(calls: &Calls) -> UtteranceId {
        calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|c| match c {
                Call::Speak(id, _) => Some(*id),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn initial_labels_and_state() {
        let session = DeckSession::new(0);
        let labels = session.labels();
        assert_eq!(labels.live, "LIVE: ON");
        assert_eq!(labels.avatar, "AVATAR: ON");
        assert_eq!(labels.chat, "CHAT: OFF");
        assert_eq!(labels.voice_mode, "VOICE MODE: SYSTEM");
        assert_eq!(session.chat_log().len(), 1);
        assert!(session.pulse().is_running());
    }

    #[test]
    fn keys_toggle_case_insensitively() {
        let mut session = DeckSession::new(0);
        assert_eq!(session.handle_key('L'), Some(Command::ToggleLive));
        assert!(!session.is_live());
        assert!(!session.pulse().is_running());
        session.handle_key('c');
        session.handle_key('V');
        assert_eq!(session.labels().chat, "CHAT: ON");
        assert_eq!(session.labels().avatar, "AVATAR: OFF");
        assert_eq!(session.handle_key('x'), None);
    }

    #[test]
    fn pulse_follows_live_toggle() {
        let mut session = DeckSession::new(5);
        session.advance(2_200);
        let ticked = *session.pulse().sample();
        assert!(session.pulse().ticker().is_some());

        session.toggle_live();
        session.advance(50_000);
        assert_eq!(*session.pulse().sample(), ticked);
    }

    #[test]
    fn year_slides_drive_kpis() {
        // Arrange
        let session = Arc::new(Mutex::new(DeckSession::new(0)));
        let mut host = DeckHost::new(vec![
            SlideFact::new("baseline_2025", "Baseline", "", ""),
            SlideFact::new("year_2026", "2026", "", ""),
            SlideFact::new("gates_2027", "Gates", "", ""),
        ]);
        host.register(session.clone());

        // Act
        host.play_slide(1);

        // Assert
        let mut s = session.lock().unwrap();
        assert_eq!(s.kpi().year(), 2026);
        assert_eq!(s.frame(0).kpi.sales, "63.1M€");
        assert_eq!(s.frame(900).kpi.sales, "71M€");
        assert!((s.background_cue().unwrap() - 0.275).abs() < 1e-9);
        drop(s);

        host.play_slide(2);
        let s = session.lock().unwrap();
        assert_eq!(s.kpi().year(), 2026);
        assert_eq!(s.current_slide().unwrap().key, "gates_2027");
    }

    #[tokio::test]
    async fn system_voice_pulses_mouth_on_boundaries() {
        let calls = Calls::default();
        let mut session = session(&calls);

        session.speak("Hello deck").await;
        let id = last_speak_id(&calls);
        session.on_speech_event(SpeechEvent::Start(id));
        assert_eq!(session.avatar_status(), STATUS_SPEAKING_SYSTEM);

        session.on_speech_event(SpeechEvent::Boundary(id));
        assert_eq!(session.frame(0).avatar.mouth, 1.0);
        assert_eq!(session.frame(60).avatar.mouth, 0.25);
        assert_eq!(session.frame(130).avatar.mouth, 0.0);

        session.on_speech_event(SpeechEvent::End(id));
        assert_eq!(session.avatar_status(), STATUS_READY);
        assert!(!session.lipsync().is_talking());
    }

    #[tokio::test]
    async fn unavailable_engine_reports_status() {
        let mut session = DeckSession::new(0).with_speech_engine(Box::new(FakeEngine {
            available: false,
            calls: Calls::default(),
        }));
        session.speak("anything").await;
        assert_eq!(session.avatar_status(), STATUS_ENGINE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn voice_modes_are_mutually_exclusive() {
        // Arrange
        let calls = Calls::default();
        let mut session = session(&calls);
        session.speak("first").await;
        let old = last_speak_id(&calls);
        session.on_speech_event(SpeechEvent::Start(old));
        session.on_speech_event(SpeechEvent::Boundary(old));
        assert_eq!(session.frame(10).avatar.mouth, 1.0);

        // Act
        session.cycle_voice_mode();
        session.speak("second").await;

        // Assert
        assert_eq!(session.avatar_status(), STATUS_SPEAKING_AI);
        assert!(calls.lock().unwrap().contains(&Call::Cancel));
        assert!(session.lipsync().is_signal());
        // Late events and steps of the old utterance change nothing.
        session.on_speech_event(SpeechEvent::End(old));
        let mouth = session.frame(70).avatar.mouth;
        assert_eq!(mouth, 1.0);
        assert_eq!(session.avatar_status(), STATUS_SPEAKING_AI);

        session.cycle_voice_mode();
        assert_eq!(session.frame(80).avatar.mouth, 0.0);
        assert!(calls.lock().unwrap().contains(&Call::Stop));
        assert_eq!(session.avatar_status(), STATUS_READY);
    }

    #[tokio::test]
    async fn ai_voice_returns_to_ready_when_clip_ends() {
        let calls = Calls::default();
        let mut session = session(&calls);
        session.cycle_voice_mode();

        session.speak("A short line").await;
        assert_eq!(session.frame(500).avatar.mouth, 1.0);
        assert_eq!(session.frame(1_000).avatar.mouth, 0.0);
        assert_eq!(session.avatar_status(), STATUS_READY);
    }

    #[tokio::test]
    async fn ai_voice_offline_reports_status() {
        let mut speech = MockSpeechService::new();
        speech.expect_synthesize().returning(|_| {
            Err(RemoteError::Api {
                status: 401,
                message: "bad key".to_string(),
                raw: None,
            })
        });
        let mut session = DeckSession::new(0).with_speech_service(Arc::new(speech));
        session.cycle_voice_mode();

        session.speak("hello").await;

        assert_eq!(session.avatar_status(), "AI voice offline (401). Set OPENAI_API_KEY.");
        assert!(!session.lipsync().is_talking());
    }

    #[test]
    fn stop_resets_status_after_delay() {
        let mut session = DeckSession::new(0);
        session.stop_speaking();
        session.stop_speaking();
        assert_eq!(session.avatar_status(), STATUS_STOPPED);
        session.advance(499);
        assert_eq!(session.avatar_status(), STATUS_STOPPED);
        session.advance(500);
        assert_eq!(session.avatar_status(), STATUS_READY);
    }

    #[tokio::test]
    async fn speak_current_slide_prefers_script() {
        let calls = Calls::default();
        let mut session = session(&calls);

        session.speak_current_slide().await;
        session.on_slide_changed(&SlideChange {
            key: "intro".to_string(),
            name: "Intro".to_string(),
            ..Default::default()
        });
        session.speak_current_slide().await;
        session.on_slide_changed(&SlideChange {
            key: "intro".to_string(),
            name: "Intro".to_string(),
            script: "Welcome aboard.".to_string(),
            ..Default::default()
        });
        session.apply(Command::SpeakCurrentSlide).await;

        let spoken: Vec<String> = calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::Speak(_, text) => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(spoken, vec![FALLBACK_NARRATION, "Intro", "Welcome aboard."]);
    }

    #[tokio::test]
    async fn answered_question_is_logged_and_spoken() {
        // Arrange
        let calls = Calls::default();
        let mut session = session(&calls);
        session.on_slide_changed(&SlideChange {
            key: "year_2027".to_string(),
            name: "2027".to_string(),
            ..Default::default()
        });
        let mut backend = MockChatBackend::new();
        backend
            .expect_ask()
            .withf(|req| {
                let ctx = req.context.as_ref().unwrap();
                req.question_text() == "What are the hard gates?"
                    && ctx.slide_key.as_deref() == Some("year_2027")
                    && ctx.year == Some(2027)
            })
            .times(1)
            .returning(|_| Ok("Gross margin never below 39.5%.".to_string()));

        // Act
        let outcome = session
            .submit_question("  What are the hard gates? ", &backend)
            .await;

        // Assert
        assert_eq!(
            outcome,
            ChatOutcome::Answered("Gross margin never below 39.5%.".to_string())
        );
        let turns = session.chat_log().turns();
        assert_eq!(turns[1].role, ChatRole::User);
        assert_eq!(turns[1].text, "What are the hard gates?");
        assert_eq!(turns[2].role, ChatRole::Assistant);
        assert_eq!(session.chat_status(), CHAT_ONLINE);
        assert_eq!(last_speak_id(&calls), UtteranceId(1));
    }

    #[tokio::test]
    async fn offline_backend_returns_question_for_retry() {
        let mut session = DeckSession::new(0);
        let mut backend = MockChatBackend::new();
        backend
            .expect_ask()
            .returning(|_| Err(ChatError::Offline("OPENAI_API_KEY not set".to_string())));

        let outcome = session.submit_question("How do we reach 100M€?", &backend).await;

        assert_eq!(
            outcome,
            ChatOutcome::Offline {
                question: "How do we reach 100M€?".to_string()
            }
        );
        assert_eq!(session.chat_log().last().unwrap().text, OFFLINE_MESSAGE);
        assert_eq!(session.chat_status(), CHAT_OFFLINE);
    }

    #[tokio::test]
    async fn blank_question_is_ignored() {
        let mut session = DeckSession::new(0);
        let backend = MockChatBackend::new();
        assert_eq!(session.submit_question("   ", &backend).await, ChatOutcome::Ignored);
        assert_eq!(session.chat_log().len(), 1);
    }

    #[tokio::test]
    async fn empty_answer_shows_placeholder_and_clear_resets_log() {
        let mut session = DeckSession::new(0);
        session.toggle_avatar();
        let mut backend = MockChatBackend::new();
        backend.expect_ask().returning(|_| Ok(String::new()));

        session.submit_question("q", &backend).await;
        assert_eq!(session.chat_log().last().unwrap().text, NO_ANSWER);

        session.apply(Command::ClearChat).await;
        assert_eq!(session.chat_log().len(), 1);
    }
}
