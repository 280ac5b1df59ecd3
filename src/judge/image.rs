use super::{JudgeError, JudgeResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Base64 image split out of a data URL (or bare base64)
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub mime_type: String,
    /// Base64 payload without the `data:` header
    pub base64: String,
    /// Decoded size in bytes
    pub byte_len: usize,
}

impl ImagePayload {
    /// Accepts `data:<mime>;base64,<payload>`, `<anything>,<payload>`, or a
    /// bare base64 payload. The payload has to decode.
    pub fn parse(image_data: &str) -> JudgeResult<Self> {
        let image_data = image_data.trim();

        let (mime_type, payload) = match image_data.split_once(',') {
            Some((header, payload)) => {
                let mime = header
                    .strip_prefix("data:")
                    .and_then(|h| h.split(';').next())
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_MIME_TYPE);
                (mime.to_string(), payload)
            }
            None => (DEFAULT_MIME_TYPE.to_string(), image_data),
        };

        let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        if payload.is_empty() {
            return Err(JudgeError::InvalidImage("empty payload".to_string()));
        }

        let bytes = STANDARD
            .decode(&payload)
            .map_err(|e| JudgeError::InvalidImage(e.to_string()))?;

        Ok(Self {
            mime_type,
            base64: payload,
            byte_len: bytes.len(),
        })
    }

    /// Re-encode as a data URL
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}
