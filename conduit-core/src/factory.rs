//! Client factory: resolves a model alias (or a provider id/type directly)
//! down to a concrete, ready-to-call [`Provider`] instance.
//!
//! The resolution chain is: model alias → [`ModelMapping`] → [`ProviderRecord`]
//! → primary-enabled [`ProviderKeyCredential`] → adapter, built by
//! [`crate::providers::create_provider`] keyed off [`ProviderType`]. Storage
//! of providers/credentials/mappings is an external collaborator (the admin
//! CRUD plane is out of scope here), so this module only depends on the
//! [`ProviderRegistry`] trait — callers plug in their own backing store.
//!
//! Fully async end-to-end: nothing here blocks a worker thread waiting on
//! credential resolution the way a synchronous lookup would.

use crate::error::ProviderError;
use crate::providers::{self, Provider, ProviderConfig, ProviderHealth, StreamResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// The closed set of adapters the factory knows how to construct. Maps
/// 1:1 onto the string keys [`providers::create_provider`] dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    OpenAI,
    AzureOpenAI,
    Anthropic,
    Mistral,
    Groq,
    Cohere,
    Gemini,
    VertexAI,
    Ollama,
    Bedrock,
    HuggingFace,
    Replicate,
    Fireworks,
    SageMaker,
    OpenRouter,
    OpenAICompatible,
    MiniMax,
    Ultravox,
    ElevenLabs,
    GoogleCloud,
    Cerebras,
    DeepInfra,
    SambaNova,
}

impl ProviderType {
    /// The dispatch key `create_provider` matches on.
    fn dispatch_key(self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::AzureOpenAI => "azure",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Mistral => "mistral",
            ProviderType::Groq => "groq",
            ProviderType::Cohere => "cohere",
            ProviderType::Gemini => "gemini",
            ProviderType::VertexAI => "google",
            ProviderType::Ollama => "ollama",
            ProviderType::Bedrock => "bedrock",
            ProviderType::HuggingFace => "huggingface",
            ProviderType::Replicate => "replicate",
            ProviderType::Fireworks => "fireworks",
            ProviderType::SageMaker => "sagemaker",
            ProviderType::OpenRouter => "openrouter",
            ProviderType::OpenAICompatible => "openai_compatible",
            ProviderType::MiniMax => "minimax",
            ProviderType::Ultravox => "ultravox",
            ProviderType::ElevenLabs => "elevenlabs",
            ProviderType::GoogleCloud => "googlecloud",
            ProviderType::Cerebras => "cerebras",
            ProviderType::DeepInfra => "deepinfra",
            ProviderType::SambaNova => "sambanova",
        }
    }
}

/// Identity + discriminator + optional base-url override for one configured
/// provider. Named `ProviderRecord` (not `Provider`) to avoid colliding with
/// the [`Provider`] trait every adapter implements.
#[derive(Debug, Clone)]
pub struct ProviderRecord {
    pub id: String,
    pub provider_type: ProviderType,
    pub base_url: Option<String>,
    pub enabled: bool,
}

/// One credential belonging to a [`ProviderRecord`]. At most one credential
/// per provider should have `is_primary` set; the resolver picks the
/// primary-and-enabled credential, falling back to the first enabled one.
#[derive(Debug, Clone)]
pub struct ProviderKeyCredential {
    pub provider_id: String,
    pub api_key: String,
    pub secondary_secret: Option<String>,
    pub api_version: Option<String>,
    pub is_primary: bool,
    pub is_enabled: bool,
}

/// `(model-alias -> provider-id, provider-model-id)`, unique by alias.
#[derive(Debug, Clone)]
pub struct ModelMapping {
    pub alias: String,
    pub provider_id: String,
    pub provider_model_id: String,
}

/// Backing store for providers/credentials/mappings. Implemented by callers
/// (an admin-plane database in production, an in-memory map in tests) —
/// this module only ever reads through the trait.
#[async_trait]
pub trait ProviderRegistry: Send + Sync {
    async fn find_model_mapping(&self, alias: &str) -> Option<ModelMapping>;
    async fn find_provider(&self, provider_id: &str) -> Option<ProviderRecord>;
    async fn find_credentials(&self, provider_id: &str) -> Vec<ProviderKeyCredential>;
}

/// In-memory [`ProviderRegistry`], useful for tests and for embedding a
/// small static configuration directly in process.
#[derive(Default)]
pub struct InMemoryRegistry {
    pub mappings: HashMap<String, ModelMapping>,
    pub providers: HashMap<String, ProviderRecord>,
    pub credentials: HashMap<String, Vec<ProviderKeyCredential>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mapping(mut self, mapping: ModelMapping) -> Self {
        self.mappings.insert(mapping.alias.clone(), mapping);
        self
    }

    pub fn with_provider(mut self, provider: ProviderRecord) -> Self {
        self.providers.insert(provider.id.clone(), provider);
        self
    }

    pub fn with_credential(mut self, credential: ProviderKeyCredential) -> Self {
        self.credentials
            .entry(credential.provider_id.clone())
            .or_default()
            .push(credential);
        self
    }
}

#[async_trait]
impl ProviderRegistry for InMemoryRegistry {
    async fn find_model_mapping(&self, alias: &str) -> Option<ModelMapping> {
        self.mappings.get(alias).cloned()
    }

    async fn find_provider(&self, provider_id: &str) -> Option<ProviderRecord> {
        self.providers.get(provider_id).cloned()
    }

    async fn find_credentials(&self, provider_id: &str) -> Vec<ProviderKeyCredential> {
        self.credentials.get(provider_id).cloned().unwrap_or_default()
    }
}

/// Picks the primary-and-enabled credential, else the first enabled one.
fn select_credential(mut credentials: Vec<ProviderKeyCredential>) -> Option<ProviderKeyCredential> {
    if let Some(primary) = credentials.iter().position(|c| c.is_primary && c.is_enabled) {
        return Some(credentials.swap_remove(primary));
    }
    credentials.into_iter().find(|c| c.is_enabled)
}

fn build_config(
    record: &ProviderRecord,
    credential: &ProviderKeyCredential,
    provider_model_id: &str,
    model_alias: &str,
) -> ProviderConfig {
    let mut config = ProviderConfig::new(record.provider_type.dispatch_key(), credential.api_key.clone());
    if let Some(base_url) = &record.base_url {
        config = config.with_base_url(base_url.clone());
    }
    config.model_mapping.insert(model_alias.to_string(), provider_model_id.to_string());

    if let Some(secondary) = &credential.secondary_secret {
        // AWS-signed adapters split region/access-key/secret across three
        // fields; secondary_secret carries the secret access key, region
        // lives in api_version as a pragmatic reuse of an otherwise-unused
        // field for non-AWS providers.
        if matches!(record.provider_type, ProviderType::Bedrock | ProviderType::SageMaker) {
            config.aws_access_key_id = Some(credential.api_key.clone());
            config.aws_secret_access_key = Some(secondary.clone());
            config.aws_region = credential.api_version.clone();
        }
    }

    config
}

/// Resolves `model_alias` to a concrete adapter: mapping → provider →
/// credential → adapter construction, per the factory algorithm. Returns
/// `ModelNotFound`/`Configuration` errors for each failed step so callers
/// can distinguish "no such alias" from "provider disabled" from "no
/// enabled credential".
pub async fn get_client(
    registry: &dyn ProviderRegistry,
    model_alias: &str,
    metrics: Option<Arc<dyn PerformanceSink>>,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let mapping = registry
        .find_model_mapping(model_alias)
        .await
        .ok_or_else(|| ProviderError::ModelNotFound {
            model: model_alias.to_string(),
        })?;

    let client = get_client_by_provider_id(registry, &mapping.provider_id, &mapping.provider_model_id, model_alias, metrics).await?;
    Ok(client)
}

/// Model-agnostic variant: resolves a provider id straight to an adapter,
/// without going through a `ModelMapping`. Used for admin-plane credential
/// verification and for real-time sessions, which address a provider
/// directly rather than through a chat model alias.
pub async fn get_client_by_provider_id(
    registry: &dyn ProviderRegistry,
    provider_id: &str,
    provider_model_id: &str,
    model_alias: &str,
    metrics: Option<Arc<dyn PerformanceSink>>,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let record = registry
        .find_provider(provider_id)
        .await
        .filter(|p| p.enabled)
        .ok_or_else(|| ProviderError::Configuration {
            message: format!("provider '{provider_id}' is missing or disabled"),
        })?;

    let credential = select_credential(registry.find_credentials(provider_id).await).ok_or_else(|| {
        ProviderError::Configuration {
            message: format!("provider '{provider_id}' has no enabled credential"),
        }
    })?;

    get_client_by_provider_type(record.provider_type, &build_config(&record, &credential, provider_model_id, model_alias), metrics)
}

/// Constructs an adapter directly from a [`ProviderType`] and an already
/// assembled [`ProviderConfig`], skipping registry lookups entirely.
pub fn get_client_by_provider_type(
    provider_type: ProviderType,
    config: &ProviderConfig,
    metrics: Option<Arc<dyn PerformanceSink>>,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let mut config = config.clone();
    config.name = provider_type.dispatch_key().to_string();
    let base = providers::create_provider(config)?;
    let base: Arc<dyn Provider> = Arc::from(base);

    Ok(match metrics {
        Some(sink) => Arc::new(PerformanceTrackingProvider::new(base, sink)),
        None => base,
    })
}

/// Builds a throwaway client for credential verification only — a
/// placeholder model id (`"test-model"`) is wired into `model_mapping` so
/// adapters that need a mapped id don't choke on an empty one.
pub fn create_test_client(
    provider_type: ProviderType,
    credential: &ProviderKeyCredential,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let record = ProviderRecord {
        id: "test".to_string(),
        provider_type,
        base_url: None,
        enabled: true,
    };
    let config = build_config(&record, credential, "test-model", "test-model");
    get_client_by_provider_type(provider_type, &config, None)
}

/// Sink for the performance-tracking decorator: one call per completed
/// request (or completed stream), carrying wall-clock latency, optional
/// first-token latency (streaming only), token counts, and success/failure,
/// tagged by provider name.
#[async_trait]
pub trait PerformanceSink: Send + Sync {
    async fn record(&self, sample: PerformanceSample);
}

#[derive(Debug, Clone)]
pub struct PerformanceSample {
    pub provider: String,
    pub operation: &'static str,
    pub success: bool,
    pub latency_ms: u64,
    pub first_token_latency_ms: Option<u64>,
}

/// Wraps any [`Provider`] to report [`PerformanceSample`]s to a
/// [`PerformanceSink`] after every call, mirroring the delegation shape of
/// [`crate::providers::circuit_breaker_provider::CircuitBreakerProvider`]
/// but measuring instead of breaking the circuit.
struct PerformanceTrackingProvider {
    inner: Arc<dyn Provider>,
    sink: Arc<dyn PerformanceSink>,
}

impl PerformanceTrackingProvider {
    fn new(inner: Arc<dyn Provider>, sink: Arc<dyn PerformanceSink>) -> Self {
        Self { inner, sink }
    }

    async fn record(&self, operation: &'static str, success: bool, started: Instant, first_token_latency_ms: Option<u64>) {
        self.sink
            .record(PerformanceSample {
                provider: self.inner.name().to_string(),
                operation,
                success,
                latency_ms: started.elapsed().as_millis() as u64,
                first_token_latency_ms,
            })
            .await;
    }
}

#[async_trait]
impl Provider for PerformanceTrackingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn supports_streaming(&self) -> bool {
        self.inner.supports_streaming()
    }

    fn supports_function_calling(&self) -> bool {
        self.inner.supports_function_calling()
    }

    fn supported_models(&self) -> Vec<String> {
        self.inner.supported_models()
    }

    async fn chat_completion(&self, request: crate::models::ChatRequest) -> Result<crate::models::ChatResponse, ProviderError> {
        let started = Instant::now();
        let result = self.inner.chat_completion(request).await;
        self.record("chat_completion", result.is_ok(), started, None).await;
        result
    }

    async fn stream_chat_completion(&self, request: crate::models::ChatRequest) -> Result<StreamResult, ProviderError> {
        let started = Instant::now();
        let result = self.inner.stream_chat_completion(request).await;
        match result {
            Ok(stream) => {
                self.record("stream_chat_completion", true, started, None).await;
                let sink = self.sink.clone();
                let provider = self.inner.name().to_string();
                let mut first_token_recorded = false;
                let wrapped = Box::pin(async_stream::stream! {
                    let mut stream = stream;
                    while let Some(item) = futures::StreamExt::next(&mut stream).await {
                        if !first_token_recorded {
                            first_token_recorded = true;
                            sink.record(PerformanceSample {
                                provider: provider.clone(),
                                operation: "stream_chat_completion_first_token",
                                success: item.is_ok(),
                                latency_ms: started.elapsed().as_millis() as u64,
                                first_token_latency_ms: Some(started.elapsed().as_millis() as u64),
                            })
                            .await;
                        }
                        yield item;
                    }
                });
                Ok(wrapped)
            }
            Err(e) => {
                self.record("stream_chat_completion", false, started, None).await;
                Err(e)
            }
        }
    }

    async fn embedding(&self, request: crate::models::EmbeddingRequest) -> Result<crate::models::EmbeddingResponse, ProviderError> {
        let started = Instant::now();
        let result = self.inner.embedding(request).await;
        self.record("embedding", result.is_ok(), started, None).await;
        result
    }

    async fn image_generation(&self, request: crate::models::ImageRequest) -> Result<crate::models::ImageResponse, ProviderError> {
        let started = Instant::now();
        let result = self.inner.image_generation(request).await;
        self.record("image_generation", result.is_ok(), started, None).await;
        result
    }

    async fn audio_transcription(&self, request: crate::models::AudioRequest) -> Result<crate::models::AudioResponse, ProviderError> {
        let started = Instant::now();
        let result = self.inner.audio_transcription(request).await;
        self.record("audio_transcription", result.is_ok(), started, None).await;
        result
    }

    async fn text_to_speech(&self, request: crate::models::SpeechRequest) -> Result<crate::models::SpeechResponse, ProviderError> {
        let started = Instant::now();
        let result = self.inner.text_to_speech(request).await;
        self.record("text_to_speech", result.is_ok(), started, None).await;
        result
    }

    async fn health_check(&self) -> Result<ProviderHealth, ProviderError> {
        self.inner.health_check().await
    }
}
