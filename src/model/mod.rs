pub mod captioner;
pub mod device;
pub mod generation;
pub mod loader;

use image::DynamicImage;

use crate::error::CaptionError;
use device::ComputeDevice;

/// The caption model as the server sees it: preprocessor, inference and token
/// decoding behind one call. Object-safe so handlers can be exercised with an
/// in-memory fake.
pub trait ImageCaptioner: Send + Sync {
    /// Identifier of the loaded model, reported by `/health`.
    fn model_id(&self) -> &str;

    /// Device the model runs on, reported by `/health`.
    fn device(&self) -> ComputeDevice;

    /// Produce a caption for an already-decoded image.
    ///
    /// Synchronous and potentially slow; callers run it on the blocking pool.
    fn caption(&self, image: &DynamicImage) -> Result<String, CaptionError>;
}
