use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tower::ServiceExt; // for `app.oneshot()`

use crate::error::CaptionError;
use crate::model::device::ComputeDevice;
use crate::model::ImageCaptioner;
use crate::server::routes::create_router;
use crate::server::types::AppState;
use crate::tts::SpeechSynthesizer;

const FAKE_CAPTION: &str = "a red apple on a wooden table";
const FAKE_AUDIO: &[u8] = b"fake-mp3-bytes";

struct FakeCaptioner {
    fail: bool,
}

impl ImageCaptioner for FakeCaptioner {
    fn model_id(&self) -> &str {
        "test/blip-base"
    }

    fn device(&self) -> ComputeDevice {
        ComputeDevice::Cpu
    }

    fn caption(&self, _image: &DynamicImage) -> Result<String, CaptionError> {
        if self.fail {
            Err(CaptionError::Inference("model exploded".to_string()))
        } else {
            Ok(FAKE_CAPTION.to_string())
        }
    }
}

struct FakeSynthesizer {
    fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, CaptionError> {
        if self.fail {
            Err(CaptionError::Inference("speech backend unreachable".to_string()))
        } else {
            Ok(FAKE_AUDIO.to_vec())
        }
    }
}

fn test_app(captioner_fails: bool, synthesizer_fails: bool) -> Router {
    create_router(AppState {
        captioner: Arc::new(FakeCaptioner {
            fail: captioner_fails,
        }),
        synthesizer: Arc::new(FakeSynthesizer {
            fail: synthesizer_fails,
        }),
    })
}

fn red_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([255, 0, 0]));
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
        .unwrap();
    buffer
}

fn multipart_request(field_name: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "capvox-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field_name}\"; \
             filename=\"upload.jpg\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/caption")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app(false, false);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["device"], "cpu");
    assert_eq!(body["model"], "test/blip-base");
}

#[tokio::test]
async fn test_caption_success() {
    let app = test_app(false, false);

    let response = app
        .oneshot(multipart_request("file", &red_jpeg(100, 100)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["caption"], FAKE_CAPTION);

    // Audio round-trips through base64 to non-empty bytes
    let audio = general_purpose::STANDARD
        .decode(body["audio"].as_str().unwrap())
        .unwrap();
    assert_eq!(audio, FAKE_AUDIO);
}

#[tokio::test]
async fn test_caption_is_deterministic_for_identical_uploads() {
    let app = test_app(false, false);
    let jpeg = red_jpeg(100, 100);

    let first = json_body(
        app.clone()
            .oneshot(multipart_request("file", &jpeg))
            .await
            .unwrap(),
    )
    .await;
    let second = json_body(app.oneshot(multipart_request("file", &jpeg)).await.unwrap()).await;

    assert_eq!(first["caption"], second["caption"]);
}

#[tokio::test]
async fn test_caption_malformed_image_is_500() {
    let app = test_app(false, false);

    let response = app
        .oneshot(multipart_request("file", b"this is not an image"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("image decode error"), "detail: {detail}");
}

#[tokio::test]
async fn test_caption_empty_file_is_500() {
    let app = test_app(false, false);

    let response = app.oneshot(multipart_request("file", b"")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(!body["detail"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_caption_missing_file_field_is_500() {
    let app = test_app(false, false);

    let response = app
        .oneshot(multipart_request("picture", &red_jpeg(10, 10)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["detail"], "missing multipart field `file`");
}

#[tokio::test]
async fn test_caption_inference_failure_is_500() {
    let app = test_app(true, false);

    let response = app
        .oneshot(multipart_request("file", &red_jpeg(10, 10)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["detail"], "inference error: model exploded");
}

#[tokio::test]
async fn test_caption_synthesis_failure_is_500() {
    let app = test_app(false, true);

    let response = app
        .oneshot(multipart_request("file", &red_jpeg(10, 10)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(!body["detail"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = test_app(false, false);

    let response = app
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
