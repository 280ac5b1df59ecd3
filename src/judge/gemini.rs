use super::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini provider (`generateContent` with inline image data)
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, GEMINI_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_key,
            model,
            base_url,
            client,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiReplyContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiReplyContent {
    #[serde(default)]
    parts: Vec<GeminiReplyPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiReplyPart {
    text: Option<String>,
}

impl GeminiResponse {
    /// Text of the first part of the first candidate
    fn first_text(self) -> JudgeResult<String> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| JudgeError::ParseError("No candidates in response".to_string()))?;
        let content = candidate
            .content
            .ok_or_else(|| JudgeError::ParseError("No content in candidate".to_string()))?;
        content
            .parts
            .into_iter()
            .next()
            .and_then(|p| p.text)
            .ok_or_else(|| JudgeError::ParseError("No parts in content".to_string()))
    }
}

#[async_trait]
impl VisionProvider for GeminiProvider {
    async fn generate(&self, request: VisionRequest) -> JudgeResult<VisionResponse> {
        let start = Instant::now();

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart::Text {
                        text: request.instruction,
                    },
                    GeminiPart::InlineData {
                        inline_data: InlineData {
                            mime_type: request.image.mime_type,
                            data: request.image.base64,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                max_output_tokens: request.max_tokens,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        // Execute with timeout
        let response = tokio::time::timeout(
            request.timeout,
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send(),
        )
        .await
        .map_err(|_| JudgeError::Timeout(request.timeout))?
        .map_err(|e| JudgeError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(JudgeError::ApiError(format!(
                "Gemini API returned status {}: {}",
                status, detail
            )));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| JudgeError::ParseError(e.to_string()))?;
        let text = parsed.first_text()?;

        Ok(VisionResponse {
            text: text.trim().to_string(),
            metadata: ResponseMetadata {
                provider: "gemini".to_string(),
                model: self.model.clone(),
                latency_ms: start.elapsed().as_millis() as u64,
            },
        })
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
