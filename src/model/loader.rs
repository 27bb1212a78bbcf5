use std::path::{Path, PathBuf};

use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::{builder::GraphOptimizationLevel, Session};

use crate::config::ModelConfig;
use crate::error::CaptionError;
use crate::model::device::ComputeDevice;

// Initialize the global environment for ORT (only needed once)
pub fn init_ort() -> Result<(), CaptionError> {
    ort::init().with_name("capvox").commit()?;
    Ok(())
}

/// Local paths of the model artifacts after hub resolution.
pub struct ModelFiles {
    pub vision: PathBuf,
    pub decoder: PathBuf,
    pub tokenizer: PathBuf,
}

/// Resolve the configured artifacts from the Hugging Face Hub. Downloads go
/// to the hub cache, so a warm start reads from disk.
pub fn fetch_model_files(config: &ModelConfig) -> Result<ModelFiles, CaptionError> {
    let api = Api::new()?;
    let repo = api.repo(Repo::new(config.repo_id.clone(), RepoType::Model));

    Ok(ModelFiles {
        vision: repo.get(&config.vision_file)?,
        decoder: repo.get(&config.decoder_file)?,
        tokenizer: repo.get(&config.tokenizer_file)?,
    })
}

/// Loads an ONNX graph from disk and creates an inference session on the
/// selected device.
pub fn load_session(
    model_path: impl AsRef<Path>,
    device: ComputeDevice,
) -> Result<Session, CaptionError> {
    let path = model_path.as_ref();
    if !path.exists() {
        return Err(CaptionError::ModelNotFound(path.display().to_string()));
    }

    // Configure Session
    let mut builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(4)?; // Parallelism within an op

    if device.is_cuda() {
        builder = builder.with_execution_providers([CUDAExecutionProvider::default().build()])?;
    }

    let session = builder.commit_from_file(path)?;

    tracing::debug!(path = %path.display(), "loaded ONNX session");
    for (i, input) in session.inputs.iter().enumerate() {
        tracing::debug!("  input {}: {} ({:?})", i, input.name, input.input_type);
    }

    Ok(session)
}
