use crate::error::ProviderError;
use crate::models::{
    AudioRequest, AudioResponse, ChatRequest, ChatResponse, Choice, EmbeddingRequest,
    EmbeddingResponse, ImageRequest, ImageResponse, Message, SpeechRequest, SpeechResponse, Usage,
};
use crate::providers::{HealthStatus, Provider, ProviderConfig, ProviderHealth, StreamResult};

use super::http_client::{map_error_response, AuthStrategy, HttpProviderClient};

use std::collections::HashMap;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const MAX_POLLS: u32 = 120;

#[derive(Debug, serde::Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    urls: Option<PredictionUrls>,
}

#[derive(Debug, serde::Deserialize)]
struct PredictionUrls {
    #[serde(default)]
    stream: Option<String>,
}

/// Replicate runs every model as an asynchronous prediction: create a
/// prediction, poll it until `status` leaves `starting`/`processing`, then
/// read `output`. Predictions that expose a `urls.stream` SSE endpoint are
/// used for streaming instead of polling.
pub struct ReplicateProvider {
    http: HttpProviderClient,
    raw: reqwest::Client,
    config: ProviderConfig,
}

impl ReplicateProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let http = HttpProviderClient::new(
            config.timeout,
            config.base_url.clone(),
            "https://api.replicate.com/v1",
            &config.headers,
            AuthStrategy::Header {
                name: "Authorization".to_string(),
                value: format!("Token {}", config.api_key),
            },
        )?;
        let raw = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Configuration {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self { http, raw, config })
    }

    fn map_model(&self, model: &str) -> String {
        self.config
            .model_mapping
            .get(model)
            .cloned()
            .unwrap_or_else(|| model.to_string())
    }

    async fn create_prediction(
        &self,
        model: &str,
        input: serde_json::Value,
    ) -> Result<Prediction, ProviderError> {
        let body = serde_json::json!({ "version": model, "input": input });
        self.http.post_json("/predictions", &body).await
    }

    async fn poll_until_complete(&self, mut prediction: Prediction) -> Result<Prediction, ProviderError> {
        for _ in 0..MAX_POLLS {
            match prediction.status.as_str() {
                "succeeded" => return Ok(prediction),
                "failed" | "canceled" => {
                    let message = prediction
                        .error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| format!("prediction {}", prediction.status));
                    return Err(ProviderError::Api { code: 500, message });
                }
                _ => {
                    tokio::time::sleep(POLL_INTERVAL).await;
                    let path = format!("/predictions/{}", prediction.id);
                    prediction = self.http.get_json(&path).await?;
                }
            }
        }

        Err(ProviderError::Timeout)
    }

    fn output_text(prediction: &Prediction) -> String {
        match &prediction.output {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Array(parts)) => parts
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(""),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

#[async_trait::async_trait]
impl Provider for ReplicateProvider {
    fn name(&self) -> &str {
        "replicate"
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn supports_function_calling(&self) -> bool {
        false
    }

    fn supported_models(&self) -> Vec<String> {
        self.config.model_mapping.keys().cloned().collect()
    }

    async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let model = self.map_model(&request.model);
        let prompt = request
            .messages
            .iter()
            .map(|m| m.content.as_text())
            .collect::<Vec<_>>()
            .join("\n");

        let input = serde_json::json!({
            "prompt": prompt,
            "max_new_tokens": request.max_tokens.unwrap_or(512),
            "temperature": request.temperature.unwrap_or(0.75),
            "top_p": request.top_p.unwrap_or(0.9),
        });

        let prediction = self.create_prediction(&model, input).await?;
        let completed = self.poll_until_complete(prediction).await?;
        let text = Self::output_text(&completed);

        Ok(ChatResponse {
            id: completed.id,
            object: "chat.completion".to_string(),
            created: chrono::Utc::now().timestamp() as u64,
            model,
            choices: vec![Choice {
                index: 0,
                message: Message::assistant(text),
                finish_reason: Some("stop".to_string()),
                logprobs: None,
            }],
            usage: Some(Usage {
                prompt_tokens: 0,
                completion_tokens: 0,
                total_tokens: 0,
                cached_tokens: None,
            }),
            system_fingerprint: None,
        })
    }

    async fn stream_chat_completion(&self, request: ChatRequest) -> Result<StreamResult, ProviderError> {
        let model = self.map_model(&request.model);
        let prompt = request
            .messages
            .iter()
            .map(|m| m.content.as_text())
            .collect::<Vec<_>>()
            .join("\n");

        let input = serde_json::json!({
            "prompt": prompt,
            "max_new_tokens": request.max_tokens.unwrap_or(512),
            "temperature": request.temperature.unwrap_or(0.75),
            "top_p": request.top_p.unwrap_or(0.9),
            "stream": true,
        });

        let prediction = self.create_prediction(&model, input).await?;
        let stream_url = prediction
            .urls
            .as_ref()
            .and_then(|u| u.stream.clone())
            .ok_or_else(|| ProviderError::FeatureNotSupported {
                feature: "this Replicate model did not return a streaming URL".to_string(),
            })?;

        let response = self
            .raw
            .get(&stream_url)
            .header("Accept", "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(map_error_response(response).await);
        }

        let model_for_stream = model.clone();
        let prediction_id = prediction.id.clone();
        let stream = Box::pin(async_stream::stream! {
            let mut bytes_stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut event_name = String::new();

            while let Some(chunk_result) = futures::StreamExt::next(&mut bytes_stream).await {
                match chunk_result {
                    Ok(chunk) => {
                        buffer.push_str(&String::from_utf8_lossy(&chunk));

                        while let Some(line_end) = buffer.find('\n') {
                            let line = buffer[..line_end].trim_end_matches('\r').to_string();
                            buffer = buffer[line_end + 1..].to_string();

                            if let Some(name) = line.strip_prefix("event: ") {
                                event_name = name.to_string();
                                continue;
                            }

                            if let Some(data) = line.strip_prefix("data: ") {
                                if event_name == "done" {
                                    return;
                                }

                                yield Ok(crate::models::StreamChunk {
                                    id: prediction_id.clone(),
                                    object: "chat.completion.chunk".to_string(),
                                    created: chrono::Utc::now().timestamp() as u64,
                                    model: model_for_stream.clone(),
                                    choices: vec![crate::models::StreamChoice {
                                        index: 0,
                                        delta: crate::models::Delta {
                                            role: None,
                                            content: Some(data.to_string()),
                                            tool_calls: None,
                                        },
                                        finish_reason: None,
                                    }],
                                });
                            }
                        }
                    }
                    Err(e) => yield Err(ProviderError::Http(e)),
                }
            }
        });

        Ok(stream)
    }

    async fn embedding(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Err(ProviderError::Configuration {
            message: "Embeddings not supported by the Replicate adapter".to_string(),
        })
    }

    async fn image_generation(&self, request: ImageRequest) -> Result<ImageResponse, ProviderError> {
        let model = request
            .model
            .as_deref()
            .map(|m| self.map_model(m))
            .ok_or_else(|| ProviderError::ValidationError {
                field: "model".to_string(),
                message: "Replicate image generation requires a model version id".to_string(),
            })?;

        let input = serde_json::json!({
            "prompt": request.prompt,
            "num_outputs": request.n.unwrap_or(1),
        });

        let prediction = self.create_prediction(&model, input).await?;
        let completed = self.poll_until_complete(prediction).await?;

        let urls: Vec<String> = match completed.output {
            Some(serde_json::Value::Array(parts)) => {
                parts.iter().filter_map(|v| v.as_str().map(String::from)).collect()
            }
            Some(serde_json::Value::String(s)) => vec![s],
            _ => Vec::new(),
        };

        Ok(ImageResponse {
            created: chrono::Utc::now().timestamp() as u64,
            data: urls
                .into_iter()
                .map(|url| crate::models::ImageData {
                    url: Some(url),
                    b64_json: None,
                    revised_prompt: None,
                })
                .collect(),
        })
    }

    async fn audio_transcription(&self, _request: AudioRequest) -> Result<AudioResponse, ProviderError> {
        Err(ProviderError::Configuration {
            message: "Audio transcription not supported by the Replicate adapter".to_string(),
        })
    }

    async fn text_to_speech(&self, _request: SpeechRequest) -> Result<SpeechResponse, ProviderError> {
        Err(ProviderError::Configuration {
            message: "Text-to-speech not supported by the Replicate adapter".to_string(),
        })
    }

    async fn health_check(&self) -> Result<ProviderHealth, ProviderError> {
        let start = Instant::now();
        let response = self.http.get_json::<serde_json::Value>("/account").await;
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
