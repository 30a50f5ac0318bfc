use crate::error::ProviderError;
use crate::models::{
    AudioRequest, AudioResponse, ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse,
    ImageRequest, ImageResponse, SpeechRequest, SpeechResponse,
};
use crate::providers::{HealthStatus, Provider, ProviderConfig, ProviderHealth, StreamResult};

use super::http_client::{AuthStrategy, HttpProviderClient};

use std::collections::HashMap;
use std::time::Instant;

/// Ultravox is primarily a real-time voice session provider (see
/// `conduit-core::realtime`). This adapter only covers the request/response
/// surface every `Provider` exposes; text ops fail with `FeatureNotSupported`.
pub struct UltravoxProvider {
    http: HttpProviderClient,
    #[allow(dead_code)]
    config: ProviderConfig,
}

impl UltravoxProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let http = HttpProviderClient::new(
            config.timeout,
            config.base_url.clone(),
            "https://api.ultravox.ai/api",
            &config.headers,
            AuthStrategy::Header {
                name: "X-API-Key".to_string(),
                value: config.api_key.clone(),
            },
        )?;

        Ok(Self { http, config })
    }

    fn unsupported(op: &str) -> ProviderError {
        ProviderError::FeatureNotSupported {
            feature: format!("{op} is not supported by Ultravox (real-time-only provider)"),
        }
    }
}

#[async_trait::async_trait]
impl Provider for UltravoxProvider {
    fn name(&self) -> &str {
        "ultravox"
    }

    fn supports_streaming(&self) -> bool {
        false
    }

    fn supports_function_calling(&self) -> bool {
        false
    }

    fn supported_models(&self) -> Vec<String> {
        vec!["fixie-ai/ultravox".to_string()]
    }

    async fn chat_completion(&self, _request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        Err(Self::unsupported("chat completion"))
    }

    async fn stream_chat_completion(&self, _request: ChatRequest) -> Result<StreamResult, ProviderError> {
        Err(Self::unsupported("streaming chat completion"))
    }

    async fn embedding(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Err(Self::unsupported("embeddings"))
    }

    async fn image_generation(&self, _request: ImageRequest) -> Result<ImageResponse, ProviderError> {
        Err(Self::unsupported("image generation"))
    }

    async fn audio_transcription(&self, _request: AudioRequest) -> Result<AudioResponse, ProviderError> {
        Err(Self::unsupported("audio transcription"))
    }

    async fn text_to_speech(&self, _request: SpeechRequest) -> Result<SpeechResponse, ProviderError> {
        Err(Self::unsupported("text-to-speech"))
    }

    async fn health_check(&self) -> Result<ProviderHealth, ProviderError> {
        let start = Instant::now();
        let response = self.http.get_json::<serde_json::Value>("/accounts/me").await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match response {
            Ok(_) => Ok(ProviderHealth {
                status: HealthStatus::Healthy,
                latency_ms: Some(latency_ms),
                error_rate: 0.0,
                last_check: chrono::Utc::now(),
                details: HashMap::new(),
            }),
            Err(e) => {
                let mut details = HashMap::new();
                details.insert("error".to_string(), e.to_string());
                Ok(ProviderHealth {
                    status: HealthStatus::Degraded,
                    latency_ms: Some(latency_ms),
                    error_rate: 1.0,
                    last_check: chrono::Utc::now(),
                    details,
                })
            }
        }
    }
}
