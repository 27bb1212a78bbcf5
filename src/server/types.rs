use std::sync::Arc;

use serde::Serialize;

use crate::model::ImageCaptioner;
use crate::tts::SpeechSynthesizer;

/// Shared Application State
///
/// Built once at startup and never mutated; handlers only read through it.
#[derive(Clone)]
pub struct AppState {
    pub captioner: Arc<dyn ImageCaptioner>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

// --- DTOs (Data Transfer Objects) ---

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub device: String,
    pub model: String,
}

#[derive(Serialize)]
pub struct CaptionResponse {
    pub caption: String,
    /// Base64-encoded MP3 audio of the spoken caption
    pub audio: String,
    pub success: bool,
}
