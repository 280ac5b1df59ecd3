use super::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Ollama provider implementation (local vision models such as llava)
pub struct OllamaProvider {
    base_url: String,
    model: String,
    client: reqwest::Client,
    /// Whether this model supports vision (e.g., llava, bakllava, moondream)
    supports_vision: bool,
}

impl OllamaProvider {
    /// Create a new Ollama provider with the given base URL and model
    pub fn new(base_url: String, model: String) -> Self {
        let supports_vision = Self::is_vision_model(&model);
        if !supports_vision {
            tracing::warn!(
                "Ollama model {} is not a known vision model; scoring will fall back to the heuristic",
                model
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client,
            supports_vision,
        }
    }

    /// Check if a model name indicates vision support
    fn is_vision_model(model: &str) -> bool {
        let model_lower = model.to_lowercase();
        ["llava", "bakllava", "moondream", "minicpm-v", "qwen2-vl", "qwen2.5-vl"]
            .iter()
            .any(|known| model_lower.contains(known))
    }
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
    images: Vec<String>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[async_trait]
impl VisionProvider for OllamaProvider {
    async fn generate(&self, request: VisionRequest) -> JudgeResult<VisionResponse> {
        let start = Instant::now();

        if !self.supports_vision {
            return Err(JudgeError::ConfigError(format!(
                "Model {} does not support vision. Use a vision model like llava or moondream.",
                self.model
            )));
        }

        // Ollama takes raw base64 without the data URL header
        let ollama_request = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: request.instruction,
            stream: false,
            options: OllamaOptions {
                temperature: 0.1,
                num_predict: request.max_tokens,
            },
            images: vec![request.image.base64],
        };

        let url = format!("{}/api/generate", self.base_url);

        // Execute with timeout
        let response = tokio::time::timeout(
            request.timeout,
            self.client.post(&url).json(&ollama_request).send(),
        )
        .await
        .map_err(|_| JudgeError::Timeout(request.timeout))?
        .map_err(|e| JudgeError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JudgeError::ApiError(format!(
                "Ollama API returned status: {}",
                response.status()
            )));
        }

        let ollama_response: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| JudgeError::ParseError(e.to_string()))?;

        Ok(VisionResponse {
            text: ollama_response.response.trim().to_string(),
            metadata: ResponseMetadata {
                provider: "ollama".to_string(),
                model: self.model.clone(),
                latency_ms: start.elapsed().as_millis() as u64,
            },
        })
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
