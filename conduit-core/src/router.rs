//! Fallback-capable dispatcher: picks a [`ModelDeployment`] from a candidate
//! set using a pluggable named strategy, retries with backoff, and walks a
//! per-model fallback chain once a deployment's own retry budget is spent.
//!
//! This generalizes [`crate::routing::Router`] (which picks among bare
//! provider name strings) to route among deployment *records* carrying
//! health, cost, and rolling latency — the shape `ModelMapping`/provider
//! resolution in [`crate::factory`] actually needs. Hot counters
//! (`request_count`, `healthy`) are plain atomics so recording an outcome
//! never blocks a concurrent dispatch; `average_latency_ms` and `last_used`
//! sit behind a small `RwLock` since they're read-modify-write together.

use crate::error::ProviderError;
use crate::net::retry::{backoff_delay, RetryConfig};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Smoothing factor for the rolling average latency EWMA. Spec calls out
/// 0.2 specifically (the teacher's bare `routing::Router` uses 0.1).
const LATENCY_EWMA_ALPHA: f64 = 0.2;

/// A routable deployment of one model on one provider. Created from
/// `RouterConfig` at startup and held behind `Arc` so the router and any
/// in-flight requests share the same mutable health/usage state.
#[derive(Debug)]
pub struct ModelDeployment {
    pub id: String,
    pub model_name: String,
    pub provider_name: String,
    pub weight: f32,
    pub rpm_cap: Option<u32>,
    pub tpm_cap: Option<u32>,
    pub input_cost_per_1k: Option<Decimal>,
    pub output_cost_per_1k: Option<Decimal>,
    /// Lower sorts first under the `priority` strategy.
    pub priority: u32,
    pub supports_embeddings: bool,

    healthy: AtomicBool,
    request_count: AtomicU64,
    last_used_unix_ms: AtomicU64,
    average_latency_ms: RwLock<f64>,
}

impl ModelDeployment {
    pub fn new(id: impl Into<String>, model_name: impl Into<String>, provider_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model_name: model_name.into(),
            provider_name: provider_name.into(),
            weight: 1.0,
            rpm_cap: None,
            tpm_cap: None,
            input_cost_per_1k: None,
            output_cost_per_1k: None,
            priority: 100,
            supports_embeddings: false,
            healthy: AtomicBool::new(true),
            request_count: AtomicU64::new(0),
            last_used_unix_ms: AtomicU64::new(0),
            average_latency_ms: RwLock::new(0.0),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn average_latency_ms(&self) -> f64 {
        *self.average_latency_ms.read().expect("average_latency_ms lock poisoned")
    }

    pub fn last_used_unix_ms(&self) -> u64 {
        self.last_used_unix_ms.load(Ordering::Relaxed)
    }

    /// Records a completed call: bumps the usage counter, stamps `last_used`,
    /// and folds `latency_ms` into the rolling EWMA (α = 0.2).
    pub fn record_outcome(&self, latency_ms: u64) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.last_used_unix_ms
            .store(chrono::Utc::now().timestamp_millis() as u64, Ordering::Relaxed);

        let mut avg = self.average_latency_ms.write().expect("average_latency_ms lock poisoned");
        *avg = LATENCY_EWMA_ALPHA * latency_ms as f64 + (1.0 - LATENCY_EWMA_ALPHA) * *avg;
    }
}

/// Router-wide configuration: the deployment pool, the default strategy
/// name, the fallback map, and the retry/backoff budget applied per
/// deployment before the router advances to its fallback chain.
#[derive(Clone)]
pub struct RouterConfig {
    pub deployments: Vec<Arc<ModelDeployment>>,
    pub default_strategy: String,
    pub fallbacks: HashMap<String, Vec<String>>,
    pub retry: RetryConfig,
    pub fallback_enabled: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            deployments: Vec::new(),
            default_strategy: "simple".to_string(),
            fallbacks: HashMap::new(),
            retry: RetryConfig::default(),
            fallback_enabled: true,
        }
    }
}

/// A named candidate-selection algorithm. Implementations never mutate
/// state; all state used for ordering lives on `ModelDeployment` itself.
trait SelectionStrategy: Send + Sync {
    fn select<'a>(&self, candidates: &'a [Arc<ModelDeployment>]) -> Option<&'a Arc<ModelDeployment>>;
}

struct Simple;
impl SelectionStrategy for Simple {
    fn select<'a>(&self, candidates: &'a [Arc<ModelDeployment>]) -> Option<&'a Arc<ModelDeployment>> {
        candidates.first()
    }
}

struct RoundRobinOrLeastUsed;
impl SelectionStrategy for RoundRobinOrLeastUsed {
    fn select<'a>(&self, candidates: &'a [Arc<ModelDeployment>]) -> Option<&'a Arc<ModelDeployment>> {
        candidates.iter().min_by_key(|d| d.request_count())
    }
}

struct LeastCost;
impl SelectionStrategy for LeastCost {
    fn select<'a>(&self, candidates: &'a [Arc<ModelDeployment>]) -> Option<&'a Arc<ModelDeployment>> {
        candidates.iter().min_by(|a, b| {
            let key = |d: &Arc<ModelDeployment>| (d.input_cost_per_1k, d.output_cost_per_1k);
            key(a).cmp(&key(b))
        })
    }
}

struct LeastLatency;
impl SelectionStrategy for LeastLatency {
    fn select<'a>(&self, candidates: &'a [Arc<ModelDeployment>]) -> Option<&'a Arc<ModelDeployment>> {
        candidates
            .iter()
            .min_by(|a, b| a.average_latency_ms().total_cmp(&b.average_latency_ms()))
    }
}

struct Priority;
impl SelectionStrategy for Priority {
    fn select<'a>(&self, candidates: &'a [Arc<ModelDeployment>]) -> Option<&'a Arc<ModelDeployment>> {
        candidates.iter().min_by_key(|d| d.priority)
    }
}

/// Resolves a strategy name to an implementation. Never returns `None`:
/// an unrecognized name falls through to `simple`, matching the teacher's
/// routing module's permissive "unknown strategy" handling for conditions.
fn strategy_for_name(name: &str) -> Arc<dyn SelectionStrategy> {
    match name {
        "roundrobin" | "leastused" => Arc::new(RoundRobinOrLeastUsed),
        "leastcost" => Arc::new(LeastCost),
        "leastlatency" => Arc::new(LeastLatency),
        "priority" => Arc::new(Priority),
        _ => Arc::new(Simple),
    }
}

/// Fallback-capable dispatcher. Owns its own strategy cache rather than a
/// module-level singleton so multiple routers (e.g. in tests) never share
/// cached strategy instances.
pub struct Router {
    config: RouterConfig,
    strategy_cache: RwLock<HashMap<String, Arc<dyn SelectionStrategy>>>,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            strategy_cache: RwLock::new(HashMap::new()),
        }
    }

    fn strategy(&self, name: &str) -> Arc<dyn SelectionStrategy> {
        if let Some(cached) = self.strategy_cache.read().expect("strategy cache lock poisoned").get(name) {
            return cached.clone();
        }
        let strategy = strategy_for_name(name);
        self.strategy_cache
            .write()
            .expect("strategy cache lock poisoned")
            .insert(name.to_string(), strategy.clone());
        strategy
    }

    /// Deployments serving `model`, healthy, and under their rpm/tpm caps
    /// (caps aren't load-metered here — a deployment with a cap configured
    /// is trusted to report its own health as unhealthy once it's saturated).
    fn candidates_for(&self, model: &str) -> Vec<Arc<ModelDeployment>> {
        self.config
            .deployments
            .iter()
            .filter(|d| d.model_name == model && d.is_healthy())
            .cloned()
            .collect()
    }

    /// Runs `call` against the best-ranked healthy deployment for `model`,
    /// retrying other ranked candidates with exponential backoff, then
    /// walking `model`'s fallback chain (same retry policy) if the primary
    /// model's candidate pool is exhausted. Matches `client.rs`'s existing
    /// `execute_with_enhanced_retry` → fallback sequencing: fallback is
    /// consulted only after the primary model's own retry budget runs out.
    pub async fn dispatch<F, Fut, T>(&self, model: &str, strategy_name: &str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut(Arc<ModelDeployment>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        match self.try_model(model, strategy_name, &mut call).await {
            Ok(value) => Ok(value),
            Err(last_err) => {
                if !self.config.fallback_enabled {
                    return Err(last_err);
                }
                let chain = self.config.fallbacks.get(model).cloned().unwrap_or_default();
                let mut last_err = last_err;
                for fallback_model in chain {
                    match self.try_model(&fallback_model, strategy_name, &mut call).await {
                        Ok(value) => return Ok(value),
                        Err(e) => last_err = e,
                    }
                }
                Err(last_err)
            }
        }
    }

    /// Tries every candidate for one model name, ranked by `strategy_name`,
    /// retrying each with exponential backoff up to `retry.max_attempts`.
    async fn try_model<F, Fut, T>(&self, model: &str, strategy_name: &str, call: &mut F) -> Result<T, ProviderError>
    where
        F: FnMut(Arc<ModelDeployment>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut candidates = self.candidates_for(model);
        if candidates.is_empty() {
            return Err(ProviderError::ModelNotFound {
                model: model.to_string(),
            });
        }

        let strategy = self.strategy(strategy_name);
        let mut last_err = ProviderError::ModelNotFound {
            model: model.to_string(),
        };

        while !candidates.is_empty() {
            let chosen_index = {
                let chosen = strategy.select(&candidates).expect("candidates is non-empty");
                candidates.iter().position(|d| Arc::ptr_eq(d, chosen)).unwrap()
            };
            let deployment = candidates.remove(chosen_index);

            let mut attempt = 0;
            loop {
                let started = std::time::Instant::now();
                match call(deployment.clone()).await {
                    Ok(value) => {
                        deployment.record_outcome(started.elapsed().as_millis() as u64);
                        return Ok(value);
                    }
                    Err(err) => {
                        deployment.record_outcome(started.elapsed().as_millis() as u64);
                        last_err = err;
                        if attempt + 1 >= self.config.retry.max_attempts || !is_retryable(&last_err) {
                            break;
                        }
                        tokio::time::sleep(backoff_delay(&self.config.retry, attempt)).await;
                        attempt += 1;
                    }
                }
            }
        }

        Err(last_err)
    }
}

fn is_retryable(err: &ProviderError) -> bool {
    matches!(
        err,
        ProviderError::RateLimit
            | ProviderError::ServiceUnavailable
            | ProviderError::Timeout
            | ProviderError::RetryableError { .. }
            | ProviderError::Http(_)
    )
}
