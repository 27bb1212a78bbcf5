use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ndarray::ShapeError;
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong in the caption pipeline. The variants exist
/// for logging and tests; the HTTP contract collapses all of them to a single
/// 500 shape (see `IntoResponse` below).
#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("upload error: {0}")]
    Upload(#[from] MultipartError),

    #[error("missing multipart field `file`")]
    MissingFile,

    #[error("model not found at path: {0}")]
    ModelNotFound(String),

    #[error("model download failed: {0}")]
    Hub(#[from] hf_hub::api::sync::ApiError),

    #[error("ONNX Runtime error: {0}")]
    Ort(#[from] ort::Error),

    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("inference error: {0}")]
    Inference(String),

    #[error("speech synthesis error: {0}")]
    Synthesis(#[from] reqwest::Error),
}

impl IntoResponse for CaptionError {
    fn into_response(self) -> Response {
        // Flat contract: clients see one error shape regardless of which
        // pipeline step failed, carrying the error's own message.
        tracing::error!(error = %self, "caption request failed");

        let body = Json(json!({
            "detail": self.to_string()
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
