//! Photo scoring.
//!
//! A [`Judge`] rates how well an image matches a prompt on a 1-10 scale and
//! never fails: the remote judge asks a vision model and falls back to the
//! local heuristic whenever the model is unreachable, slow, or talks
//! nonsense. Which judge is used is decided once, from configuration.

mod gemini;
mod heuristic;
mod image;
mod ollama;
mod openai;

use crate::config::env_var;
use crate::sources::Dice;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use gemini::GeminiProvider;
pub use heuristic::{heuristic_score, HeuristicJudge};
pub use image::ImagePayload;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 10.0;

/// Result type for vision provider calls
pub type JudgeResult<T> = Result<T, JudgeError>;

/// Errors from the remote scoring path. These never leave this module.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Response parsing failed: {0}")]
    ParseError(String),

    #[error("Image data is not usable: {0}")]
    InvalidImage(String),
}

/// Scores a submission against its prompt
#[async_trait]
pub trait Judge: Send + Sync {
    /// Relevance score in `[1, 10]`. Never fails.
    async fn score(&self, prompt: &str, image_data: &str) -> f64;

    fn name(&self) -> &str;
}

/// Request to a vision-capable model
#[derive(Debug, Clone)]
pub struct VisionRequest {
    /// Instruction text sent alongside the image
    pub instruction: String,
    pub image: ImagePayload,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

/// Raw reply from a vision model
#[derive(Debug, Clone)]
pub struct VisionResponse {
    pub text: String,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone)]
pub struct ResponseMetadata {
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
}

/// A multimodal model that can look at an image and answer in text
#[async_trait]
pub trait VisionProvider: Send + Sync {
    async fn generate(&self, request: VisionRequest) -> JudgeResult<VisionResponse>;

    fn name(&self) -> &str;
}

/// Instruction asking the model for a bare 1-10 rating
pub fn rating_instruction(prompt: &str) -> String {
    format!(
        "Rate how well this image matches the prompt \"{}\" on a scale of 1-10. \
         Consider how clearly the image shows what was requested and how well it \
         fulfills the prompt. Reply with ONLY a single integer from 1 to 10. \
         No words, no punctuation, just the number.",
        prompt
    )
}

/// Extract a score from a free-form model reply.
///
/// Takes the first standalone token `1`..`10`; failing that, a leading
/// decimal number rounded and clamped into range.
pub fn parse_score(reply: &str) -> Option<f64> {
    let reply = reply.trim();

    let token = reply
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|tok| !tok.starts_with('0'))
        .find_map(|tok| tok.parse::<u8>().ok().filter(|n| (1..=10).contains(n)));
    if let Some(n) = token {
        return Some(f64::from(n));
    }

    leading_float(reply)
        .filter(|f| f.is_finite())
        .map(|f| f.round().clamp(MIN_SCORE, MAX_SCORE))
}

/// Parse the longest numeric prefix (`-12.5abc` -> `-12.5`)
fn leading_float(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let mut seen_dot = false;
    let mut seen_digit = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return None;
    }
    s[..end].trim_end_matches('.').parse().ok()
}

/// Judge backed by a remote vision model, with the heuristic as safety net
pub struct RemoteJudge {
    provider: Box<dyn VisionProvider>,
    fallback: HeuristicJudge,
    timeout: Duration,
    max_tokens: Option<u32>,
}

impl RemoteJudge {
    pub fn new(provider: Box<dyn VisionProvider>, fallback: HeuristicJudge, timeout: Duration) -> Self {
        Self {
            provider,
            fallback,
            timeout,
            max_tokens: Some(2000),
        }
    }

    async fn try_score(&self, prompt: &str, image_data: &str) -> JudgeResult<f64> {
        let image = ImagePayload::parse(image_data)?;
        tracing::debug!(
            "Asking {} to score {} byte {} image",
            self.provider.name(),
            image.byte_len,
            image.mime_type
        );

        let request = VisionRequest {
            instruction: rating_instruction(prompt),
            image,
            max_tokens: self.max_tokens,
            timeout: self.timeout,
        };

        // Covers the whole exchange, including a reply body that never finishes
        let response = tokio::time::timeout(self.timeout, self.provider.generate(request))
            .await
            .map_err(|_| JudgeError::Timeout(self.timeout))??;
        tracing::debug!(
            "Raw score text from {} ({}, {}ms): {:?}",
            response.metadata.provider,
            response.metadata.model,
            response.metadata.latency_ms,
            response.text
        );

        parse_score(&response.text).ok_or_else(|| {
            JudgeError::ParseError(format!("no score in reply {:?}", response.text))
        })
    }
}

#[async_trait]
impl Judge for RemoteJudge {
    async fn score(&self, prompt: &str, image_data: &str) -> f64 {
        match self.try_score(prompt, image_data).await {
            Ok(score) => {
                tracing::info!("{} scored \"{}\": {}", self.provider.name(), prompt, score);
                score
            }
            Err(e) => {
                tracing::warn!(
                    "Remote scoring via {} failed: {}. Using heuristic score",
                    self.provider.name(),
                    e
                );
                self.fallback.score(prompt, image_data).await
            }
        }
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}

/// Configuration for the scoring judge
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    /// Ollama is only used when explicitly configured
    pub ollama_base_url: Option<String>,
    pub ollama_model: String,
    /// Upper bound for one remote scoring call
    pub timeout: Duration,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            ollama_base_url: None,
            ollama_model: "llava".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl JudgeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            gemini_api_key: env_var("GEMINI_API_KEY"),
            gemini_model: env_var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            openai_api_key: env_var("OPENAI_API_KEY"),
            openai_model: env_var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            ollama_base_url: env_var("OLLAMA_BASE_URL"),
            ollama_model: env_var("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            timeout: env_var("JUDGE_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// First configured vision provider, in order Gemini, OpenAI, Ollama
    pub fn build_provider(&self) -> Option<Box<dyn VisionProvider>> {
        if let Some(api_key) = &self.gemini_api_key {
            return Some(Box::new(GeminiProvider::new(
                api_key.clone(),
                self.gemini_model.clone(),
            )));
        }

        if let Some(api_key) = &self.openai_api_key {
            return Some(Box::new(OpenAiProvider::new(
                api_key.clone(),
                self.openai_model.clone(),
            )));
        }

        if let Some(base_url) = &self.ollama_base_url {
            return Some(Box::new(OllamaProvider::new(
                base_url.clone(),
                self.ollama_model.clone(),
            )));
        }

        None
    }

    /// Build the judge used by the engine
    pub fn build_judge(&self, dice: Arc<Dice>) -> Arc<dyn Judge> {
        let heuristic = HeuristicJudge::new(dice);
        match self.build_provider() {
            Some(provider) => {
                tracing::info!("Scoring photos with {}", provider.name());
                Arc::new(RemoteJudge::new(provider, heuristic, self.timeout))
            }
            None => {
                tracing::warn!(
                    "No vision model configured (set GEMINI_API_KEY, OPENAI_API_KEY or OLLAMA_BASE_URL). Using heuristic scoring"
                );
                Arc::new(heuristic)
            }
        }
    }
}
