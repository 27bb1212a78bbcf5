use capvox::{config, model, server, tts};
use std::fs;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,capvox=debug")),
        )
        .init();

    // 2. Load config
    let config: config::AppConfig = match fs::read_to_string("config.yaml") {
        Ok(raw) => serde_yaml::from_str(&raw)?,
        Err(_) => {
            tracing::warn!("config.yaml not found, using built-in defaults");
            config::AppConfig::default()
        }
    };

    // 3. Init ONNX Runtime and pick a device
    model::loader::init_ort()?;
    let device = model::device::ComputeDevice::detect();
    tracing::info!(model = %config.model.repo_id, device = %device, "loading captioning model");

    // 4. Load the model, tokenizer and synthesizer
    let captioner =
        model::captioner::BlipCaptioner::load(&config.model, (&config.generation).into(), device)?;
    let synthesizer = tts::GoogleTranslateTts::new(&config.tts)?;
    tracing::info!("model loaded");

    let state = server::types::AppState {
        captioner: Arc::new(captioner),
        synthesizer: Arc::new(synthesizer),
    };

    // 5. Create router, bind & serve
    let app = server::routes::create_router(state);
    let listener =
        TcpListener::bind(format!("{}:{}", config.server.host, config.server.port)).await?;
    tracing::info!(
        "server listening on http://{}:{}",
        config.server.host,
        config.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}
