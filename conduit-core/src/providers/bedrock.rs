use crate::error::ProviderError;
use crate::models::{
    AudioRequest, AudioResponse, ChatRequest, ChatResponse, Choice, Delta, EmbeddingRequest,
    EmbeddingResponse, ImageRequest, ImageResponse, Message, Role, SpeechRequest, SpeechResponse,
    StreamChoice, StreamChunk, Usage,
};
use crate::net::sigv4::{self, AwsCredentials};
use crate::providers::{HealthStatus, Provider, ProviderConfig, ProviderHealth, StreamResult};
use async_stream::stream;

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// Model family, inferred from the Bedrock model id's prefix
/// (`anthropic.claude-*`, `amazon.titan-*`, `meta.llama*`, `cohere.*`,
/// `ai21.*`). Each family has its own request/response JSON shape; Bedrock
/// itself is just a signed transport, not a shared dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelFamily {
    Claude,
    Titan,
    Llama,
    Cohere,
    Ai21,
}

impl ModelFamily {
    fn from_model_id(model_id: &str) -> Result<Self, ProviderError> {
        if model_id.starts_with("anthropic.") {
            Ok(ModelFamily::Claude)
        } else if model_id.starts_with("amazon.titan") {
            Ok(ModelFamily::Titan)
        } else if model_id.starts_with("meta.llama") {
            Ok(ModelFamily::Llama)
        } else if model_id.starts_with("cohere.") {
            Ok(ModelFamily::Cohere)
        } else if model_id.starts_with("ai21.") {
            Ok(ModelFamily::Ai21)
        } else {
            Err(ProviderError::ModelNotFound {
                model: model_id.to_string(),
            })
        }
    }
}

/// Bedrock's `anthropic_version` field is fixed per Bedrock's API contract,
/// independent of the Claude model's own version.
const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

pub struct BedrockProvider {
    http: reqwest::Client,
    config: ProviderConfig,
    region: String,
    credentials: AwsCredentials,
}

impl BedrockProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let region = config
            .aws_region
            .clone()
            .ok_or_else(|| ProviderError::Configuration {
                message: "Bedrock provider requires aws_region".to_string(),
            })?;
        let access_key_id =
            config
                .aws_access_key_id
                .clone()
                .ok_or_else(|| ProviderError::Configuration {
                    message: "Bedrock provider requires aws_access_key_id".to_string(),
                })?;
        let secret_access_key = config.aws_secret_access_key.clone().ok_or_else(|| {
            ProviderError::Configuration {
                message: "Bedrock provider requires aws_secret_access_key".to_string(),
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
        format!("bedrock-runtime.{}.amazonaws.com", self.region)
    }

    fn map_model(&self, model: &str) -> String {
        self.config
            .model_mapping
            .get(model)
            .cloned()
            .unwrap_or_else(|| model.to_string())
    }

    fn sign_and_build(
        &self,
        method: &str,
        path: &str,
        body: &[u8],
    ) -> (String, sigv4::SignedRequest) {
        let host = self.host();
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        let signed = sigv4::sign(
            &self.credentials,
            method,
            &host,
            path,
            "",
            &headers,
            body,
            &self.region,
            "bedrock",
            chrono::Utc::now(),
        );

        (format!("https://{host}{path}"), signed)
    }

    fn build_request_body(family: ModelFamily, request: &ChatRequest) -> serde_json::Value {
        match family {
            ModelFamily::Claude => {
                let messages: Vec<serde_json::Value> = request
                    .messages
                    .iter()
                    .filter(|m| m.role != Role::System)
                    .map(|m| {
                        serde_json::json!({
                            "role": match m.role {
                                Role::Assistant => "assistant",
                                _ => "user",
                            },
                            "content": m.content.as_text(),
                        })
                    })
                    .collect();
                let system: Option<String> = request
                    .messages
                    .iter()
                    .find(|m| m.role == Role::System)
                    .map(|m| m.content.as_text());

                let mut body = serde_json::json!({
                    "anthropic_version": BEDROCK_ANTHROPIC_VERSION,
                    "messages": messages,
                    "max_tokens": request.max_tokens.unwrap_or(1024),
                });
                if let Some(system) = system {
                    body["system"] = serde_json::Value::String(system);
                }
                if let Some(temperature) = request.temperature {
                    body["temperature"] = serde_json::json!(temperature);
                }
                if let Some(top_p) = request.top_p {
                    body["top_p"] = serde_json::json!(top_p);
                }
                body
            }
            ModelFamily::Titan => {
                let input_text = request
                    .messages
                    .iter()
                    .map(|m| format!("{:?}: {}", m.role, m.content.as_text()))
                    .collect::<Vec<_>>()
                    .join("\n");
                serde_json::json!({
                    "inputText": input_text,
                    "textGenerationConfig": {
                        "maxTokenCount": request.max_tokens.unwrap_or(1024),
                        "temperature": request.temperature.unwrap_or(1.0),
                        "topP": request.top_p.unwrap_or(1.0),
                    }
                })
            }
            ModelFamily::Llama => {
                let prompt = request
                    .messages
                    .iter()
                    .map(|m| m.content.as_text())
                    .collect::<Vec<_>>()
                    .join("\n");
                serde_json::json!({
                    "prompt": prompt,
                    "max_gen_len": request.max_tokens.unwrap_or(512),
                    "temperature": request.temperature.unwrap_or(0.6),
                    "top_p": request.top_p.unwrap_or(0.9),
                })
            }
            ModelFamily::Cohere => {
                let message = request
                    .messages
                    .last()
                    .map(|m| m.content.as_text())
                    .unwrap_or_default();
                serde_json::json!({
                    "message": message,
                    "max_tokens": request.max_tokens.unwrap_or(1024),
                    "temperature": request.temperature.unwrap_or(0.3),
                })
            }
            ModelFamily::Ai21 => {
                let prompt = request
                    .messages
                    .iter()
                    .map(|m| m.content.as_text())
                    .collect::<Vec<_>>()
                    .join("\n");
                serde_json::json!({
                    "prompt": prompt,
                    "maxTokens": request.max_tokens.unwrap_or(1024),
                    "temperature": request.temperature.unwrap_or(0.7),
                    "topP": request.top_p.unwrap_or(1.0),
                })
            }
        }
    }

    fn extract_text(family: ModelFamily, response: &serde_json::Value) -> String {
        match family {
            ModelFamily::Claude => response["content"][0]["text"].as_str().unwrap_or("").to_string(),
            ModelFamily::Titan => response["results"][0]["outputText"].as_str().unwrap_or("").to_string(),
            ModelFamily::Llama => response["generation"].as_str().unwrap_or("").to_string(),
            ModelFamily::Cohere => response["text"].as_str().unwrap_or("").to_string(),
            ModelFamily::Ai21 => response["completions"][0]["data"]["text"]
                .as_str()
                .unwrap_or("")
                .to_string(),
        }
    }

    /// Decodes the minimal subset of the AWS event-stream binary framing
    /// needed to pull each chunk's payload bytes out of a
    /// `invoke-with-response-stream` body: 4-byte total length, 4-byte
    /// headers length, 4-byte prelude CRC (unchecked), headers, payload,
    /// 4-byte message CRC (unchecked). Returns the remaining unconsumed tail
    /// alongside each decoded payload so the caller can feed it more bytes.
    fn decode_event_stream_messages(buffer: &[u8]) -> (Vec<Vec<u8>>, usize) {
        let mut messages = Vec::new();
        let mut offset = 0;

        loop {
            if buffer.len() < offset + 12 {
                break;
            }
            let total_len = u32::from_be_bytes(buffer[offset..offset + 4].try_into().unwrap()) as usize;
            if buffer.len() < offset + total_len {
                break;
            }
            let headers_len =
                u32::from_be_bytes(buffer[offset + 4..offset + 8].try_into().unwrap()) as usize;

            let payload_start = offset + 12 + headers_len;
            let payload_end = offset + total_len - 4;
            if payload_end >= payload_start && payload_end <= buffer.len() {
                messages.push(buffer[payload_start..payload_end].to_vec());
            }

            offset += total_len;
        }

        (messages, offset)
    }
}

#[async_trait::async_trait]
impl Provider for BedrockProvider {
    fn name(&self) -> &str {
        "bedrock"
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn supports_function_calling(&self) -> bool {
        false
    }

    fn supported_models(&self) -> Vec<String> {
        vec![
            "anthropic.claude-3-5-sonnet-20241022-v2:0".to_string(),
            "amazon.titan-text-express-v1".to_string(),
            "meta.llama3-1-70b-instruct-v1:0".to_string(),
            "cohere.command-r-plus-v1:0".to_string(),
            "ai21.jamba-1-5-large-v1:0".to_string(),
        ]
    }

    async fn chat_completion(&self, mut request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        request.model = self.map_model(&request.model);
        let family = ModelFamily::from_model_id(&request.model)?;
        let body = Self::build_request_body(family, &request);
        let body_bytes = serde_json::to_vec(&body).map_err(ProviderError::Serialization)?;

        let path = format!("/model/{}/invoke", request.model);
        let (url, signed) = self.sign_and_build("POST", &path, &body_bytes);

        let mut http_request = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .body(body_bytes);
        for (name, value) in &signed.headers {
            http_request = http_request.header(name.as_str(), value.as_str());
        }

        let response = http_request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                code: status.as_u16(),
                message: text,
            });
        }

        let parsed: serde_json::Value = response.json().await?;
        let text = Self::extract_text(family, &parsed);

        Ok(ChatResponse {
            id: format!("bedrock-{}", uuid::Uuid::new_v4()),
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

    async fn stream_chat_completion(&self, mut request: ChatRequest) -> Result<StreamResult, ProviderError> {
        request.model = self.map_model(&request.model);
        let family = ModelFamily::from_model_id(&request.model)?;
        let body = Self::build_request_body(family, &request);
        let body_bytes = serde_json::to_vec(&body).map_err(ProviderError::Serialization)?;

        let path = format!("/model/{}/invoke-with-response-stream", request.model);
        let (url, signed) = self.sign_and_build("POST", &path, &body_bytes);

        let mut http_request = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .body(body_bytes);
        for (name, value) in &signed.headers {
            http_request = http_request.header(name.as_str(), value.as_str());
        }

        let response = http_request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                code: status.as_u16(),
                message: text,
            });
        }

        let model = request.model.clone();
        let stream = Box::pin(stream! {
            let mut bytes_stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk_result) = futures::StreamExt::next(&mut bytes_stream).await {
                match chunk_result {
                    Ok(chunk) => {
                        buffer.extend_from_slice(&chunk);
                        let (messages, consumed) = BedrockProvider::decode_event_stream_messages(&buffer);
                        buffer.drain(..consumed);

                        for payload in messages {
                            let envelope: serde_json::Value = match serde_json::from_slice(&payload) {
                                Ok(v) => v,
                                Err(e) => {
                                    yield Err(ProviderError::Serialization(e));
                                    continue;
                                }
                            };

                            let decoded_bytes = envelope["bytes"]
                                .as_str()
                                .and_then(|b64| {
                                    use base64::Engine;
                                    base64::engine::general_purpose::STANDARD.decode(b64).ok()
                                });

                            let Some(decoded_bytes) = decoded_bytes else { continue };
                            let Ok(inner) = serde_json::from_slice::<serde_json::Value>(&decoded_bytes) else {
                                continue;
                            };

                            let text = Self::extract_text(family, &inner);
                            let finish_reason = inner["stop_reason"].as_str().map(|s| s.to_string());

                            if text.is_empty() && finish_reason.is_none() {
                                continue;
                            }

                            yield Ok(StreamChunk {
                                id: format!("bedrock-{}", uuid::Uuid::new_v4()),
                                object: "chat.completion.chunk".to_string(),
                                created: chrono::Utc::now().timestamp() as u64,
                                model: model.clone(),
                                choices: vec![StreamChoice {
                                    index: 0,
                                    delta: Delta {
                                        role: None,
                                        content: if text.is_empty() { None } else { Some(text) },
                                        tool_calls: None,
                                    },
                                    finish_reason,
                                }],
                            });
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
            message: "Embeddings are not implemented for this Bedrock adapter".to_string(),
        })
    }

    async fn image_generation(&self, _request: ImageRequest) -> Result<ImageResponse, ProviderError> {
        Err(ProviderError::Configuration {
            message: "Image generation is not implemented for this Bedrock adapter".to_string(),
        })
    }

    async fn audio_transcription(&self, _request: AudioRequest) -> Result<AudioResponse, ProviderError> {
        Err(ProviderError::Configuration {
            message: "Audio transcription not supported by Bedrock".to_string(),
        })
    }

    async fn text_to_speech(&self, _request: SpeechRequest) -> Result<SpeechResponse, ProviderError> {
        Err(ProviderError::Configuration {
            message: "Text-to-speech not supported by Bedrock".to_string(),
        })
    }

    async fn health_check(&self) -> Result<ProviderHealth, ProviderError> {
        let start = Instant::now();
        let mut details = HashMap::new();
        details.insert("region".to_string(), self.region.clone());

        Ok(ProviderHealth {
            status: HealthStatus::Healthy,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error_rate: 0.0,
            last_check: chrono::Utc::now(),
            details,
        })
    }
}
