use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use base64::{engine::general_purpose, Engine as _};

use crate::error::CaptionError;
use crate::server::types::*;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        device: state.captioner.device().to_string(),
        model: state.captioner.model_id().to_string(),
    })
}

pub async fn generate_caption(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<CaptionResponse>, CaptionError> {
    // 1. Pull the uploaded file out of the multipart body
    let mut file_data = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            file_data = Some(field.bytes().await?);
            break;
        }
    }
    let data = file_data.ok_or(CaptionError::MissingFile)?;

    // 2. Decode image bytes (format sniffed from the data)
    let image = image::load_from_memory(&data)?;

    // 3. Preprocess + inference + token decode, on the blocking pool
    let captioner = state.captioner.clone();
    let caption = tokio::task::spawn_blocking(move || captioner.caption(&image))
        .await
        .map_err(|e| CaptionError::Inference(e.to_string()))??;

    tracing::debug!(caption = %caption, "caption generated");

    // 4. Synthesize speech for the caption
    let audio = state.synthesizer.synthesize(&caption).await?;

    // 5. Base64-encode audio for transport
    let audio_base64 = general_purpose::STANDARD.encode(&audio);

    Ok(Json(CaptionResponse {
        caption,
        audio: audio_base64,
        success: true,
    }))
}
