use async_trait::async_trait;

use crate::config::TtsConfig;
use crate::error::CaptionError;

// The public Translate endpoint rejects requests past ~100 characters, so
// longer text is synthesized in word-boundary chunks.
const MAX_CHUNK_CHARS: usize = 100;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Text-to-speech behind a port so the HTTP surface can be tested without
/// network access.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize spoken audio (MP3 bytes) for the given text.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, CaptionError>;
}

/// Synthesizer backed by the Google Translate TTS endpoint, the same backend
/// the service has always spoken through. Requires network access at request
/// time; failures surface as synthesis errors.
pub struct GoogleTranslateTts {
    client: reqwest::Client,
    endpoint: String,
    lang: String,
}

impl GoogleTranslateTts {
    pub fn new(config: &TtsConfig) -> Result<Self, CaptionError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            lang: config.lang.clone(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, CaptionError> {
        let mut audio = Vec::new();

        // MP3 frames are self-contained, so chunk responses concatenate
        // into one playable stream.
        for chunk in chunk_text(text, MAX_CHUNK_CHARS) {
            let bytes = self
                .client
                .get(&self.endpoint)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", self.lang.as_str()),
                    ("q", chunk),
                ])
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;

            audio.extend_from_slice(&bytes);
        }

        Ok(audio)
    }
}

/// Split text into chunks of at most `max_chars` characters, cutting on
/// whitespace wherever possible. Words longer than the bound are hard-cut at
/// a char boundary.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    let text = text.trim();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let rest = &text[start..];
        if rest.chars().count() <= max_chars {
            chunks.push(rest);
            break;
        }

        // Last whitespace inside the window, else hard cut
        let mut cut = 0;
        for (count, (idx, ch)) in rest.char_indices().enumerate() {
            if count >= max_chars {
                break;
            }
            if ch.is_whitespace() {
                cut = idx;
            }
        }
        if cut == 0 {
            cut = rest
                .char_indices()
                .nth(max_chars)
                .map(|(idx, _)| idx)
                .unwrap_or(rest.len());
        }

        chunks.push(rest[..cut].trim_end());
        start += cut;

        // Skip the whitespace the cut landed on
        let skipped = text[start..].len() - text[start..].trim_start().len();
        start += skipped;
    }

    chunks.retain(|chunk| !chunk.is_empty());
    chunks
}
