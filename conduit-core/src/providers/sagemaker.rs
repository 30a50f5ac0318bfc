use crate::error::ProviderError;
use crate::models::{
    AudioRequest, AudioResponse, ChatRequest, ChatResponse, Choice, EmbeddingRequest,
    EmbeddingResponse, ImageRequest, ImageResponse, Message, SpeechRequest, SpeechResponse, Usage,
};
use crate::net::sigv4::{self, AwsCredentials};
use crate::providers::{HealthStatus, Provider, ProviderConfig, ProviderHealth, StreamResult};

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// A SageMaker real-time inference endpoint, invoked via the generic
/// `InvokeEndpoint` API. Unlike Bedrock there is no shared request dialect
/// across model families: the endpoint's own container defines the payload
/// shape, so this adapter passes the chat request straight through as JSON
/// and expects the same shape back. Deployments fronting an OpenAI-dialect
/// container (the common case for HuggingFace TGI/DJL-serving deployments)
/// work unmodified; others need a translating container in front of them.
pub struct SageMakerProvider {
    http: reqwest::Client,
    config: ProviderConfig,
    region: String,
    credentials: AwsCredentials,
}

impl SageMakerProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let region = config
            .aws_region
            .clone()
            .ok_or_else(|| ProviderError::Configuration {
                message: "SageMaker provider requires aws_region".to_string(),
            })?;
        let access_key_id =
            config
                .aws_access_key_id
                .clone()
                .ok_or_else(|| ProviderError::Configuration {
                    message: "SageMaker provider requires aws_access_key_id".to_string(),
                })?;
        let secret_access_key = config.aws_secret_access_key.clone().ok_or_else(|| {
            ProviderError::Configuration {
                message: "SageMaker provider requires aws_secret_access_key".to_string(),
            }
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Configuration {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            credentials: AwsCredentials {
                access_key_id,
                secret_access_key,
                session_token: config.aws_session_token.clone(),
            },
            region,
            config,
        })
    }

    fn host(&self) -> String {
        format!("runtime.sagemaker.{}.amazonaws.com", self.region)
    }

    /// SageMaker has no concept of a "model name" in the request path; the
    /// endpoint name itself selects the model, so `model_mapping` maps a
    /// caller-facing model id to the deployed endpoint name.
    fn endpoint_name(&self, model: &str) -> String {
        self.config
            .model_mapping
            .get(model)
            .cloned()
            .unwrap_or_else(|| model.to_string())
    }

    async fn invoke(&self, endpoint_name: &str, body: Vec<u8>) -> Result<serde_json::Value, ProviderError> {
        let path = format!("/endpoints/{endpoint_name}/invocations");
        let host = self.host();
        let url = format!("https://{host}{path}");

        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        let signed = sigv4::sign(
            &self.credentials,
            "POST",
            &host,
            &path,
            "",
            &headers,
            &body,
            &self.region,
            "sagemaker",
            chrono::Utc::now(),
        );

        let mut request = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .body(body);
        for (name, value) in &signed.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                code: status.as_u16(),
                message: text,
            });
        }

        Ok(response.json::<serde_json::Value>().await?)
    }
}

#[async_trait::async_trait]
impl Provider for SageMakerProvider {
    fn name(&self) -> &str {
        "sagemaker"
    }

    fn supports_streaming(&self) -> bool {
        false
    }

    fn supports_function_calling(&self) -> bool {
        false
    }

    fn supported_models(&self) -> Vec<String> {
        self.config.model_mapping.keys().cloned().collect()
    }

    async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let endpoint = self.endpoint_name(&request.model);
        let body = serde_json::to_vec(&request).map_err(ProviderError::Serialization)?;
        let response = self.invoke(&endpoint, body).await?;

        if let Ok(chat_response) = serde_json::from_value::<ChatResponse>(response.clone()) {
            return Ok(chat_response);
        }

        let text = response["generated_text"]
            .as_str()
            .or_else(|| response["text"].as_str())
            .or_else(|| response[0]["generated_text"].as_str())
            .unwrap_or_default()
            .to_string();

        Ok(ChatResponse {
            id: format!("sagemaker-{endpoint}"),
            object: "chat.completion".to_string(),
            created: chrono::Utc::now().timestamp() as u64,
            model: request.model,
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

    async fn stream_chat_completion(&self, _request: ChatRequest) -> Result<StreamResult, ProviderError> {
        Err(ProviderError::FeatureNotSupported {
            feature: "streaming is not supported by the generic SageMaker invoke-endpoint adapter".to_string(),
        })
    }

    async fn embedding(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let endpoint = self.endpoint_name(&request.model);
        let body = serde_json::to_vec(&request).map_err(ProviderError::Serialization)?;
        let response = self.invoke(&endpoint, body).await?;
        serde_json::from_value(response).map_err(ProviderError::Serialization)
    }

    async fn image_generation(&self, _request: ImageRequest) -> Result<ImageResponse, ProviderError> {
        Err(ProviderError::Configuration {
            message: "Image generation not supported by the generic SageMaker adapter".to_string(),
        })
    }

    async fn audio_transcription(&self, _request: AudioRequest) -> Result<AudioResponse, ProviderError> {
        Err(ProviderError::Configuration {
            message: "Audio transcription not supported by the generic SageMaker adapter".to_string(),
        })
    }

    async fn text_to_speech(&self, _request: SpeechRequest) -> Result<SpeechResponse, ProviderError> {
        Err(ProviderError::Configuration {
            message: "Text-to-speech not supported by the generic SageMaker adapter".to_string(),
        })
    }

    async fn health_check(&self) -> Result<ProviderHealth, ProviderError> {
        let start = Instant::now();
        let mut details = HashMap::new();
        details.insert("region".to_string(), self.region.clone());

        // There is no generic health endpoint for an arbitrary SageMaker
        // deployment; report configured rather than probing a real endpoint.
        Ok(ProviderHealth {
            status: HealthStatus::Healthy,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error_rate: 0.0,
            last_check: chrono::Utc::now(),
            details,
        })
    }
}
