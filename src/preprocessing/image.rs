use crate::error::CaptionError;
use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::{Array, Array4, Axis};

// BLIP preprocessor constants (CLIP normalization)
const IMAGE_SIZE: u32 = 384;
const MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
const STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

/// Preprocesses a decoded image into the captioning model's input tensor.
/// Returns a tensor of shape [1, 3, 384, 384].
pub fn process(img: &DynamicImage) -> Result<Array4<f32>, CaptionError> {
    // 1. Resize to the model's fixed input size
    let resized = img.resize_exact(IMAGE_SIZE, IMAGE_SIZE, FilterType::CatmullRom);

    // 2. Convert to RGB, scale to [0, 1] and normalize per channel
    let size = IMAGE_SIZE as usize;
    let mut normalized_data = Vec::with_capacity(3 * size * size);

    for pixel in resized.to_rgb8().pixels() {
        let (r, g, b) = (pixel[0], pixel[1], pixel[2]);

        normalized_data.push(((r as f32 / 255.0) - MEAN[0]) / STD[0]);
        normalized_data.push(((g as f32 / 255.0) - MEAN[1]) / STD[1]);
        normalized_data.push(((b as f32 / 255.0) - MEAN[2]) / STD[2]);
    }

    // Shape: [H, W, C] -> Permute to [C, H, W] -> Add Batch [1, C, H, W]
    let array = Array::from_shape_vec((size, size, 3), normalized_data)?;

    let array = array.permuted_axes([2, 0, 1]);
    let array = array.insert_axis(Axis(0));

    // Ensure standard layout (contiguous)
    Ok(array.as_standard_layout().to_owned())
}
