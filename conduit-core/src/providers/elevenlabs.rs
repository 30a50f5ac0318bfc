use crate::error::ProviderError;
use crate::models::{
    AudioRequest, AudioResponse, ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse,
    ImageRequest, ImageResponse, SpeechRequest, SpeechResponse,
};
use crate::providers::{HealthStatus, Provider, ProviderConfig, ProviderHealth, StreamResult};

use super::http_client::{map_error_response, AuthStrategy, HttpProviderClient};

use std::collections::HashMap;
use std::time::Instant;

/// ElevenLabs is primarily a real-time voice session provider (see
/// `conduit-core::realtime`), but its request/response text-to-speech
/// endpoint is also exposed here since it is the provider's core product.
pub struct ElevenLabsProvider {
    http: HttpProviderClient,
    #[allow(dead_code)]
    config: ProviderConfig,
}

impl ElevenLabsProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let http = HttpProviderClient::new(
            config.timeout,
            config.base_url.clone(),
            "https://api.elevenlabs.io/v1",
            &config.headers,
            AuthStrategy::Header {
                name: "xi-api-key".to_string(),
                value: config.api_key.clone(),
            },
        )?;

        Ok(Self { http, config })
    }

    fn unsupported(op: &str) -> ProviderError {
        ProviderError::FeatureNotSupported {
            feature: format!("{op} is not supported by ElevenLabs (real-time-audio provider)"),
        }
    }
}

#[async_trait::async_trait]
impl Provider for ElevenLabsProvider {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    fn supports_streaming(&self) -> bool {
        false
    }

    fn supports_function_calling(&self) -> bool {
        false
    }

    fn supported_models(&self) -> Vec<String> {
        vec![
            "eleven_multilingual_v2".to_string(),
            "eleven_turbo_v2_5".to_string(),
        ]
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

    async fn text_to_speech(&self, request: SpeechRequest) -> Result<SpeechResponse, ProviderError> {
        let path = format!("/text-to-speech/{}", request.voice);
        let body = serde_json::json!({
            "text": request.input,
            "model_id": request.model,
        });

        let response = self.http.post_json_raw(&path, &body).await?;

        if !response.status().is_success() {
            return Err(map_error_response(response).await);
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();

        let audio = response.bytes().await?.to_vec();

        Ok(SpeechResponse { audio, content_type })
    }

    async fn health_check(&self) -> Result<ProviderHealth, ProviderError> {
        let start = Instant::now();
        let response = self.http.get_json::<serde_json::Value>("/voices").await;
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
