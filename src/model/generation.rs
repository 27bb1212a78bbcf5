use ndarray::{Array2, ArrayView1};

use crate::config::GenerationConfig;
use crate::error::CaptionError;

/// Decoding settings. Defaults are the service's fixed values: 5 beams, at
/// most 50 tokens, stop once every beam has finished.
#[derive(Debug, Clone, Copy)]
pub struct GenerationParams {
    pub num_beams: usize,
    pub max_length: usize,
    pub length_penalty: f32,
    pub early_stopping: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            num_beams: 5,
            max_length: 50,
            length_penalty: 1.0,
            early_stopping: true,
        }
    }
}

impl From<&GenerationConfig> for GenerationParams {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            num_beams: config.num_beams,
            max_length: config.max_length,
            ..Self::default()
        }
    }
}

/// One forward step of an autoregressive decoder.
///
/// `input_ids` is the current prefix of every live beam, shape
/// `[beams, len]`; the implementation returns next-token logits per beam,
/// shape `[beams, vocab]`. `&mut` because ONNX sessions run mutably.
pub trait DecoderStep {
    fn next_logits(&mut self, input_ids: &Array2<i64>) -> Result<Array2<f32>, CaptionError>;
}

struct Beam {
    tokens: Vec<i64>,
    score: f32,
}

impl Beam {
    fn normalized(self, length_penalty: f32) -> Beam {
        let norm = self.score / (self.tokens.len() as f32).powf(length_penalty);
        Beam {
            tokens: self.tokens,
            score: norm,
        }
    }
}

/// Beam-search decoding. Deterministic: no sampling, ties resolved by token
/// order. A beam that emits `eos_id` is moved to the finished pool; with
/// early stopping the search ends as soon as the pool holds `num_beams`
/// sequences. Returns the highest length-normalized-score sequence,
/// including its leading `bos_id` and trailing `eos_id`.
pub fn beam_search(
    decoder: &mut dyn DecoderStep,
    bos_id: i64,
    eos_id: i64,
    params: &GenerationParams,
) -> Result<Vec<i64>, CaptionError> {
    let num_beams = params.num_beams.max(1);

    let mut beams = vec![Beam {
        tokens: vec![bos_id],
        score: 0.0,
    }];
    // Scores in `finished` are already length-normalized.
    let mut finished: Vec<Beam> = Vec::new();

    while beams[0].tokens.len() < params.max_length {
        if params.early_stopping && finished.len() >= num_beams {
            break;
        }

        // Batch all live prefixes: [beams, len]
        let len = beams[0].tokens.len();
        let mut input_ids = Array2::<i64>::zeros((beams.len(), len));
        for (b, beam) in beams.iter().enumerate() {
            for (t, &token) in beam.tokens.iter().enumerate() {
                input_ids[[b, t]] = token;
            }
        }

        let logits = decoder.next_logits(&input_ids)?;
        if logits.nrows() != beams.len() {
            return Err(CaptionError::Inference(format!(
                "decoder returned logits for {} beams, expected {}",
                logits.nrows(),
                beams.len()
            )));
        }

        // Score every continuation of every beam
        let mut candidates: Vec<(usize, i64, f32)> = Vec::with_capacity(beams.len() * logits.ncols());
        for (b, beam) in beams.iter().enumerate() {
            let log_probs = log_softmax(logits.row(b));
            for (token, lp) in log_probs.into_iter().enumerate() {
                candidates.push((b, token as i64, beam.score + lp));
            }
        }
        candidates.sort_by(|a, b| b.2.total_cmp(&a.2));

        // Keep the best `num_beams` continuations that are still open;
        // continuations hitting eos retire to the finished pool. Taking
        // twice the beam count guarantees enough open candidates remain.
        let mut next_beams: Vec<Beam> = Vec::with_capacity(num_beams);
        for &(src, token, score) in candidates.iter().take(2 * num_beams) {
            let mut tokens = beams[src].tokens.clone();
            tokens.push(token);
            let beam = Beam { tokens, score };
            if token == eos_id {
                finished.push(beam.normalized(params.length_penalty));
            } else {
                next_beams.push(beam);
            }
            if next_beams.len() == num_beams {
                break;
            }
        }

        if next_beams.is_empty() {
            // Every surviving continuation ended the sequence.
            break;
        }
        beams = next_beams;
    }

    // Fill up with still-open beams when the pool is short (length bound hit
    // before enough sequences finished).
    if finished.len() < num_beams {
        for beam in beams {
            finished.push(beam.normalized(params.length_penalty));
        }
    }

    finished
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .map(|beam| beam.tokens)
        .ok_or_else(|| CaptionError::Inference("beam search produced no sequences".to_string()))
}

fn log_softmax(row: ArrayView1<f32>) -> Vec<f32> {
    let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    let log_sum: f32 = row.iter().map(|&v| (v - max).exp()).sum::<f32>().ln();
    row.iter().map(|&v| v - max - log_sum).collect()
}
