use crate::error::ProviderError;
use crate::models::{
    AudioRequest, AudioResponse, ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse,
    ImageRequest, ImageResponse, SpeechRequest, SpeechResponse,
};
use crate::providers::{HealthStatus, Provider, ProviderConfig, ProviderHealth, StreamResult};

use super::http_client::{map_error_response, AuthStrategy, HttpProviderClient};
use base64::Engine;

use std::collections::HashMap;
use std::time::Instant;

/// Google Cloud Text-to-Speech / Speech-to-Text over REST.
///
/// Authentication follows the same convention as `GoogleVertexAIProvider`:
/// `config.api_key` is an already-minted OAuth2 access token (the factory
/// refreshes it from the service-account JSON before constructing this
/// adapter; this adapter itself does no token minting).
pub struct GoogleCloudAudioProvider {
    tts: HttpProviderClient,
    stt: HttpProviderClient,
    #[allow(dead_code)]
    config: ProviderConfig,
}

impl GoogleCloudAudioProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let tts = HttpProviderClient::new(
            config.timeout,
            config.base_url.clone(),
            "https://texttospeech.googleapis.com/v1",
            &config.headers,
            AuthStrategy::Bearer {
                token: config.api_key.clone(),
            },
        )?;

        let stt = HttpProviderClient::new(
            config.timeout,
            None,
            "https://speech.googleapis.com/v1",
            &config.headers,
            AuthStrategy::Bearer {
                token: config.api_key.clone(),
            },
        )?;

        Ok(Self { tts, stt, config })
    }
}

#[async_trait::async_trait]
impl Provider for GoogleCloudAudioProvider {
    fn name(&self) -> &str {
        "googlecloud"
    }

    fn supports_streaming(&self) -> bool {
        false
    }

    fn supports_function_calling(&self) -> bool {
        false
    }

    fn supported_models(&self) -> Vec<String> {
        vec!["standard".to_string(), "neural2".to_string(), "studio".to_string()]
    }

    async fn chat_completion(&self, _request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        Err(ProviderError::Configuration {
            message: "Chat completion not supported by Google Cloud audio adapter".to_string(),
        })
    }

    async fn stream_chat_completion(&self, _request: ChatRequest) -> Result<StreamResult, ProviderError> {
        Err(ProviderError::Configuration {
            message: "Streaming chat completion not supported by Google Cloud audio adapter".to_string(),
        })
    }

    async fn embedding(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Err(ProviderError::Configuration {
            message: "Embeddings not supported by Google Cloud audio adapter".to_string(),
        })
    }

    async fn image_generation(&self, _request: ImageRequest) -> Result<ImageResponse, ProviderError> {
        Err(ProviderError::Configuration {
            message: "Image generation not supported by Google Cloud audio adapter".to_string(),
        })
    }

    async fn audio_transcription(&self, request: AudioRequest) -> Result<AudioResponse, ProviderError> {
        let audio_base64 = base64::engine::general_purpose::STANDARD.encode(&request.file);

        let body = serde_json::json!({
            "config": {
                "languageCode": request.language.clone().unwrap_or_else(|| "en-US".to_string()),
                "model": request.model,
            },
            "audio": { "content": audio_base64 },
        });

        let response: serde_json::Value = self.stt.post_json("/speech:recognize", &body).await?;

        let text = response["results"][0]["alternatives"][0]["transcript"]
            .as_str()
            .unwrap_or("")
            .to_string();

        Ok(AudioResponse {
            text,
            language: request.language,
            duration: None,
            words: None,
            segments: None,
        })
    }

    async fn text_to_speech(&self, request: SpeechRequest) -> Result<SpeechResponse, ProviderError> {
        let body = serde_json::json!({
            "input": { "text": request.input },
            "voice": { "languageCode": "en-US", "name": request.voice },
            "audioConfig": { "audioEncoding": "MP3" },
        });

        let response = self.tts.post_json_raw("/text:synthesize", &body).await?;

        if !response.status().is_success() {
            return Err(map_error_response(response).await);
        }

        let parsed: serde_json::Value = response.json().await?;
        let audio_content = parsed["audioContent"].as_str().unwrap_or("");
        let audio = base64::engine::general_purpose::STANDARD
            .decode(audio_content)
            .unwrap_or_default();

        Ok(SpeechResponse {
            audio,
            content_type: "audio/mpeg".to_string(),
        })
    }

    async fn health_check(&self) -> Result<ProviderHealth, ProviderError> {
        let start = Instant::now();
        let response = self.tts.get_json::<serde_json::Value>("/voices").await;
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
