use std::sync::Mutex;

use image::DynamicImage;
use ndarray::{Array2, Array3, Array4, Axis, Ix3};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use crate::config::ModelConfig;
use crate::error::CaptionError;
use crate::model::device::ComputeDevice;
use crate::model::generation::{beam_search, DecoderStep, GenerationParams};
use crate::model::{loader, ImageCaptioner};
use crate::preprocessing;

// BLIP's decoder-start and end-of-sequence tokens. The ids published for the
// base checkpoint serve as fallback if the tokenizer file omits the entries.
const DECODER_START_TOKEN: &str = "[DEC]";
const END_TOKEN: &str = "[SEP]";
const DEFAULT_BOS_ID: i64 = 30522;
const DEFAULT_EOS_ID: i64 = 102;

/// BLIP image captioner backed by two ONNX sessions: a vision encoder and an
/// autoregressive text decoder. Loaded once at startup, shared read-only by
/// every request; the sessions themselves are mutex-serialized because
/// running them requires `&mut`.
pub struct BlipCaptioner {
    vision: Mutex<Session>,
    decoder: Mutex<Session>,
    tokenizer: Tokenizer,
    model_id: String,
    device: ComputeDevice,
    params: GenerationParams,
    bos_id: i64,
    eos_id: i64,
}

impl BlipCaptioner {
    pub fn load(
        config: &ModelConfig,
        params: GenerationParams,
        device: ComputeDevice,
    ) -> Result<Self, CaptionError> {
        let files = loader::fetch_model_files(config)?;
        let vision = loader::load_session(&files.vision, device)?;
        let decoder = loader::load_session(&files.decoder, device)?;
        let tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| CaptionError::Tokenizer(e.to_string()))?;

        let bos_id = tokenizer
            .token_to_id(DECODER_START_TOKEN)
            .map(i64::from)
            .unwrap_or(DEFAULT_BOS_ID);
        let eos_id = tokenizer
            .token_to_id(END_TOKEN)
            .map(i64::from)
            .unwrap_or(DEFAULT_EOS_ID);

        Ok(Self {
            vision: Mutex::new(vision),
            decoder: Mutex::new(decoder),
            tokenizer,
            model_id: config.repo_id.clone(),
            device,
            params,
            bos_id,
            eos_id,
        })
    }

    /// Run the vision encoder once, yielding the image embedding the decoder
    /// cross-attends to. Shape `[1, seq, hidden]`.
    fn encode_image(&self, pixel_values: Array4<f32>) -> Result<Array3<f32>, CaptionError> {
        let mut session = self.vision.lock().unwrap();

        let input_name = session.inputs[0].name.clone();
        let shape = pixel_values.shape().to_vec();
        let (data, _) = pixel_values.into_raw_vec_and_offset();
        let input_value = Tensor::from_array((shape, data.into_boxed_slice()))?;
        let outputs = session.run(ort::inputs![input_name => input_value])?;

        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
        let states = ndarray::ArrayViewD::from_shape(dims.as_slice(), data)?
            .into_dimensionality::<Ix3>()?
            .to_owned();

        Ok(states)
    }
}

impl ImageCaptioner for BlipCaptioner {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn device(&self) -> ComputeDevice {
        self.device
    }

    fn caption(&self, image: &DynamicImage) -> Result<String, CaptionError> {
        // 1. Preprocess into the model's pixel grid
        let pixel_values = preprocessing::image::process(image)?;

        // 2. Vision encoder
        let encoder_states = self.encode_image(pixel_values)?;

        // 3. Beam-search decode against the text decoder
        let token_ids = {
            let mut session = self.decoder.lock().unwrap();
            let mut step = OnnxDecoder {
                session: &mut *session,
                encoder_states: &encoder_states,
            };
            beam_search(&mut step, self.bos_id, self.eos_id, &self.params)?
        };

        // 4. Tokens to text, stripping special tokens
        let ids: Vec<u32> = token_ids.iter().map(|&t| t as u32).collect();
        let text = self
            .tokenizer
            .decode(&ids, true)
            .map_err(|e| CaptionError::Tokenizer(e.to_string()))?;

        Ok(text.trim().to_string())
    }
}

/// One forward pass of the ONNX text decoder over the full prefix of every
/// live beam. No KV cache: prefixes stay short (max length 50), so the
/// decoder re-attends from scratch each step.
struct OnnxDecoder<'a> {
    session: &'a mut Session,
    encoder_states: &'a Array3<f32>,
}

impl DecoderStep for OnnxDecoder<'_> {
    fn next_logits(&mut self, input_ids: &Array2<i64>) -> Result<Array2<f32>, CaptionError> {
        let (beams, len) = input_ids.dim();
        let (_, enc_len, hidden) = self.encoder_states.dim();

        let ids_data: Vec<i64> = input_ids.iter().copied().collect();
        let ids_value = Tensor::from_array((vec![beams, len], ids_data.into_boxed_slice()))?;
        let mask_value =
            Tensor::from_array((vec![beams, len], vec![1i64; beams * len].into_boxed_slice()))?;

        // The image embedding is shared: tile it across the beam batch.
        let states = self
            .encoder_states
            .broadcast((beams, enc_len, hidden))
            .ok_or_else(|| CaptionError::Inference("failed to tile encoder states".to_string()))?;
        let states_data: Vec<f32> = states.iter().copied().collect();
        let states_value =
            Tensor::from_array((vec![beams, enc_len, hidden], states_data.into_boxed_slice()))?;
        let enc_mask_value = Tensor::from_array((
            vec![beams, enc_len],
            vec![1i64; beams * enc_len].into_boxed_slice(),
        ))?;

        let outputs = self.session.run(ort::inputs![
            "input_ids" => ids_value,
            "attention_mask" => mask_value,
            "encoder_hidden_states" => states_value,
            "encoder_attention_mask" => enc_mask_value
        ])?;

        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
        let logits = ndarray::ArrayViewD::from_shape(dims.as_slice(), data)?
            .into_dimensionality::<Ix3>()?;

        // Only the last position feeds the next step: [beams, vocab]
        Ok(logits.index_axis(Axis(1), len - 1).to_owned())
    }
}
