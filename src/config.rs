use serde::Deserialize;

#[derive(Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub generation: GenerationConfig,
    pub tts: TtsConfig,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Where the model artifacts live on the Hugging Face Hub.
#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    pub repo_id: String,
    pub vision_file: String,
    pub decoder_file: String,
    pub tokenizer_file: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            repo_id: "Xenova/blip-image-captioning-base".to_string(),
            vision_file: "onnx/vision_model.onnx".to_string(),
            decoder_file: "onnx/text_decoder_model.onnx".to_string(),
            tokenizer_file: "tokenizer.json".to_string(),
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub num_beams: usize,
    pub max_length: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            num_beams: 5,
            max_length: 50,
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct TtsConfig {
    pub endpoint: String,
    pub lang: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://translate.google.com/translate_tts".to_string(),
            lang: "en".to_string(),
        }
    }
}
