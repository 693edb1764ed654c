use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use deck_live_core::answer::LocalChatBackend;
use deck_live_core::chat::{ChatBackend, ChatRequest, OFFLINE_MESSAGE, SlideContext};
use deck_live_core::deck::{DeckHost, SlideChange, SlideObserver};
use deck_live_core::kpi::slide_year;
use deck_live_core::lipsync::LipSync;
use deck_live_core::remote::{AnswerService, SpeechRequest, SpeechService};
use deck_live_core::scheduler::Millis;
use deck_live_core::scorer::{DEFAULT_TOP_N, top_slides};
use deck_live_core::session::{AI_VOICE_INSTRUCTIONS, ChatOutcome, DeckSession, SessionFrame};
use deck_live_core::slides::{DeckFacts, SlideFact, load_deck_facts};
use deck_live_core::voice::{AudioPlayer, UtteranceId};
use deck_live_openai::types::{AudioFormat, Voice};
use deck_live_presenter::analysis::analyze_wav_file;
use deck_live_presenter::canvas::TerminalCanvas;
use deck_live_presenter::config::{Config, DEFAULT_FPS};
use deck_live_presenter::engine::{PacedEngine, PacedTimeline};
use deck_live_presenter::playback::CpalPlayer;
use deck_live_presenter::remote::{HttpChatBackend, HttpSpeechService};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Live presenter tools for the strategy deck")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the deck's slides against a question
    Rank {
        question: String,
        #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_N)]
        n: usize,
        #[arg(long)]
        facts: Option<PathBuf>,
    },
    /// Ask the deck guide a question
    Ask {
        question: String,
        /// Key of the slide on screen
        #[arg(long)]
        slide: Option<String>,
        /// Base URL of a running deck-live API; answers locally when omitted
        #[arg(long)]
        endpoint: Option<String>,
        /// Speak the answer with lip-sync
        #[arg(long)]
        speak: bool,
        /// Output device name, see `devices`
        #[arg(long)]
        device: Option<String>,
        #[arg(long)]
        facts: Option<PathBuf>,
    },
    /// Synthesize speech, then write it to a file or play it
    Speak {
        text: String,
        #[arg(long)]
        voice: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long)]
        device: Option<String>,
    },
    /// List audio output devices
    Devices,
    /// Print the mouth levels of a WAV file
    Lipsync {
        file: PathBuf,
        #[arg(long, default_value_t = DEFAULT_FPS)]
        fps: u32,
    },
    /// Step through the year slides with a simulated clock
    Demo {
        #[arg(long, default_value_t = 7)]
        seed: u64,
        #[arg(long, default_value_t = 12)]
        seconds: u64,
        #[arg(long)]
        facts: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    // --- 3. Dispatch ---
    match Cli::parse().command {
        Commands::Rank { question, n, facts } => {
            rank(&config, &question, n, facts);
            Ok(())
        }
        Commands::Ask {
            question,
            slide,
            endpoint,
            speak,
            device,
            facts,
        } => {
            let options = AskOptions {
                slide,
                endpoint,
                speak,
                device,
                facts,
            };
            ask(&config, &question, options).await
        }
        Commands::Speak {
            text,
            voice,
            out,
            endpoint,
            device,
        } => speak(&config, &text, voice, out, endpoint, device).await,
        Commands::Devices => {
            println!("{}", deck_live_audio::device::get_available_outputs()?);
            Ok(())
        }
        Commands::Lipsync { file, fps } => lipsync(&file, fps),
        Commands::Demo {
            seed,
            seconds,
            facts,
        } => demo(&config, seed, seconds, facts).await,
    }
}

fn frame_ms(fps: u32) -> Millis {
    (1_000 / fps.max(1) as Millis).max(1)
}

fn mouth_bar(level: f32) -> String {
    let width = (level.clamp(0.0, 1.0) * 30.0).round() as usize;
    format!("{:<30}", "█".repeat(width))
}

fn rank(config: &Config, question: &str, n: usize, facts: Option<PathBuf>) {
    let deck = load_deck_facts(&config.facts_candidates(facts));
    let ranked = top_slides(question, &deck.slides, n);
    if ranked.is_empty() {
        println!("No matching slides.");
        return;
    }
    for scored in ranked {
        println!("{:>3}  {:<20} {}", scored.score, scored.slide.key, scored.slide.name);
    }
}

fn speech_service(config: &Config, endpoint: Option<&str>) -> Option<Arc<dyn SpeechService>> {
    match endpoint {
        Some(endpoint) => Some(Arc::new(HttpSpeechService::new(endpoint))),
        None => config
            .openai_client()
            .map(|client| Arc::new(client) as Arc<dyn SpeechService>),
    }
}

fn slide_change(deck: &DeckFacts, key: &str) -> Option<SlideChange> {
    deck.slides
        .iter()
        .position(|s| s.key == key)
        .map(|index| SlideChange::from_slide(index, &deck.slides[index]))
}

struct AskOptions {
    slide: Option<String>,
    endpoint: Option<String>,
    speak: bool,
    device: Option<String>,
    facts: Option<PathBuf>,
}

async fn ask(config: &Config, question: &str, options: AskOptions) -> Result<()> {
    let AskOptions {
        slide,
        endpoint,
        speak,
        device,
        facts,
    } = options;
    let candidates = config.facts_candidates(facts);
    let deck = load_deck_facts(&candidates);
    let change = slide.as_deref().and_then(|key| slide_change(&deck, key));
    if slide.is_some() && change.is_none() {
        tracing::warn!("Slide {:?} is not in the deck facts", slide);
    }

    let client = config.openai_client().map(Arc::new);
    let backend: Box<dyn ChatBackend> = match endpoint.as_deref() {
        Some(endpoint) => Box::new(HttpChatBackend::new(endpoint)),
        None => {
            let service = client.clone().map(|c| c as Arc<dyn AnswerService>);
            Box::new(
                LocalChatBackend::new(service, candidates)
                    .with_deck_title(config.deck_title.clone()),
            )
        }
    };
    let log_usage = || {
        if let (None, Some(client)) = (&endpoint, &client) {
            let stats = client.stats();
            tracing::info!(
                "Usage: {} requests, {} tokens ({} in, {} out)",
                stats.requests(),
                stats.total_tokens(),
                stats.input_tokens(),
                stats.output_tokens()
            );
        }
    };

    if !speak {
        let mut request = ChatRequest::new(question);
        if let Some(change) = &change {
            request = request.with_context(SlideContext {
                slide_key: Some(change.key.clone()),
                slide_name: Some(change.name.clone()),
                year: slide_year(&change.key),
                slide_script: change.script.clone(),
                slide_hint: change.hint.clone(),
            });
        }
        match backend.ask(&request).await {
            Ok(answer) => println!("{answer}"),
            Err(e) => {
                println!("{OFFLINE_MESSAGE}");
                tracing::warn!("{}", e);
            }
        }
        log_usage();
        return Ok(());
    }

    let mut session = DeckSession::new(0).with_audio_player(Box::new(CpalPlayer::open(device)?));
    if let Some(service) = speech_service(config, endpoint.as_deref()) {
        session = session.with_speech_service(service);
    }
    session.cycle_voice_mode();
    if let Some(change) = &change {
        session.on_slide_changed(change);
    }

    match session.submit_question(question, backend.as_ref()).await {
        ChatOutcome::Answered(answer) => {
            println!("{answer}");
            log_usage();
        }
        ChatOutcome::Offline { .. } => {
            println!("{OFFLINE_MESSAGE}");
            return Ok(());
        }
        ChatOutcome::Ignored => bail!("Empty question"),
    }
    play_session(&mut session).await;
    Ok(())
}

/// Renders the avatar mouth in real time until the AI voice finishes.
async fn play_session(session: &mut DeckSession) {
    let start = Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_millis(frame_ms(DEFAULT_FPS)));
    loop {
        ticker.tick().await;
        let now = start.elapsed().as_millis() as Millis;
        let frame = session.frame(now);
        print!(
            "\r{} {:.2} {}",
            mouth_bar(frame.avatar.mouth),
            frame.avatar.mouth,
            frame.avatar_status
        );
        let _ = std::io::stdout().flush();
        if !session.lipsync().is_talking() {
            println!();
            break;
        }
    }
}

async fn speak(
    config: &Config,
    text: &str,
    voice: Option<String>,
    out: Option<PathBuf>,
    endpoint: Option<String>,
    device: Option<String>,
) -> Result<()> {
    let Some(service) = speech_service(config, endpoint.as_deref()) else {
        bail!("OPENAI_API_KEY not set and no --endpoint given");
    };
    let voice = voice
        .map(|v| v.parse::<Voice>().unwrap_or_else(|never| match never {}))
        .unwrap_or_else(|| config.speech_voice.clone());
    let request = SpeechRequest::new(text)
        .with_voice(voice)
        .with_format(AudioFormat::Wav)
        .with_instructions(AI_VOICE_INSTRUCTIONS);

    let audio = service
        .synthesize(&request)
        .await
        .context("Speech synthesis failed")?;

    if let Some(path) = out {
        std::fs::write(&path, &audio.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {} bytes to {}", audio.bytes.len(), path.display());
        return Ok(());
    }

    let mut player = CpalPlayer::open(device)?;
    let mut lipsync = LipSync::new();
    lipsync.begin_signal(UtteranceId(1), player.play(&audio, 0)?);

    let start = Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_millis(frame_ms(DEFAULT_FPS)));
    while lipsync.is_signal() {
        ticker.tick().await;
        let mouth = lipsync.sample(start.elapsed().as_millis() as Millis);
        print!("\r{} {:.2}", mouth_bar(mouth), mouth);
        let _ = std::io::stdout().flush();
    }
    println!();
    player.stop();
    Ok(())
}

fn lipsync(file: &Path, fps: u32) -> Result<()> {
    let report = analyze_wav_file(file, frame_ms(fps))?;
    for (at, mouth) in &report.frames {
        println!("{:>6} ms  {:.3}  {}", at, mouth, mouth_bar(*mouth));
    }
    println!(
        "{} frames over {} ms, peak {:.3}, mean {:.3}",
        report.frames.len(),
        report.duration_ms,
        report.peak(),
        report.mean()
    );
    Ok(())
}

fn demo_slides(deck: DeckFacts) -> Vec<SlideFact> {
    let years: Vec<SlideFact> = deck
        .slides
        .into_iter()
        .filter(|s| slide_year(&s.key).is_some())
        .collect();
    if !years.is_empty() {
        return years;
    }
    (2025..=2029)
        .map(|year| {
            let key = if year == 2025 {
                "baseline_2025".to_string()
            } else {
                format!("year_{year}")
            };
            SlideFact::new(&key, &year.to_string(), &format!("Where we stand in {year}."), "")
        })
        .collect()
}

fn print_frame(frame: &SessionFrame) {
    println!(
        "{:>6} ms | {} ({}) | EBIT {} | GM {} | {} | mouth {:.2} | {}",
        frame.now,
        frame.kpi.sales,
        frame.kpi.sales_sub,
        frame.kpi.ebit,
        frame.kpi.gross_margin,
        frame.osa,
        frame.avatar.mouth,
        frame.avatar_status
    );
    if let Some(ticker) = &frame.ticker {
        println!("         ticker: {ticker}");
    }
}

async fn demo(config: &Config, seed: u64, seconds: u64, facts: Option<PathBuf>) -> Result<()> {
    let deck = load_deck_facts(&config.facts_candidates(facts));
    let mut host = DeckHost::new(demo_slides(deck));
    let timeline = PacedTimeline::default();
    let mut session =
        DeckSession::new(seed).with_speech_engine(Box::new(PacedEngine::new(timeline.clone())));

    let slide_ms = (seconds * 1_000 / host.slides().len().max(1) as u64).max(1);
    let step = frame_ms(DEFAULT_FPS);
    let mut now: Millis = 0;

    for index in 0..host.slides().len() {
        let Some(change) = host.play_slide(index) else {
            continue;
        };
        println!("== {} ({}) ==", change.name, change.key);
        session.on_slide_changed(&change);
        timeline.set_now(now);
        session.speak_current_slide().await;

        let until = now + slide_ms;
        let mut last_print: Option<Millis> = None;
        let mut last_frame = None;
        while now < until {
            now += step;
            timeline.set_now(now);
            for event in timeline.due(now) {
                session.on_speech_event(event);
            }
            let frame = session.frame(now);
            if last_print.is_none_or(|t| now - t >= 250) {
                print_frame(&frame);
                last_print = Some(now);
            }
            last_frame = Some(frame);
        }

        if let Some(frame) = last_frame {
            let mut canvas = TerminalCanvas::new(32, 12);
            DeckSession::draw_avatar(&frame, &mut canvas);
            for line in canvas.lines() {
                println!("  {line}");
            }
        }
    }
    session.stop_speaking();
    Ok(())
}
