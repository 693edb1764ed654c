use deck_live_api::config::Config;
use deck_live_api::{AppState, router};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_target(true)
        .init();

    let state = AppState::from_config(&config);
    if !state.is_configured() {
        warn!("OPENAI_API_KEY not set; chat and tts will answer ok: false");
    }
    info!(
        "Models: chat={}, speech={}, voice={}",
        config.chat_model,
        config.speech_model,
        config.speech_voice.as_str()
    );

    let app = router(Arc::new(state));

    info!("Starting deck-live API, listening on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
