//! Tariff & cost engine: turns a completed request's usage counters into a
//! monetary cost, using a per-model pricing record (`ModelCost`).
//!
//! Money is always `rust_decimal::Decimal` — never `f64` — so rounding never
//! silently drifts a customer's bill.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// The request modality a tariff record prices. Chosen by the caller from
/// the kind of request that was actually served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Chat,
    Embedding,
    Image,
    Video,
    Rerank,
}

/// One context-length pricing tier. `max_context: None` means unbounded;
/// tiers are sorted ascending by `max_context` (`None` sorts last) at
/// construction time so lookup is a linear scan for the first tier whose
/// `max_context >= total_tokens`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextTier {
    pub max_context: Option<u64>,
    pub input_per_million: Decimal,
    pub output_per_million: Decimal,
}

/// Per-video flat-rate entry, keyed by (resolution, duration) outside this
/// struct (see `ModelCost::video_flat_rates`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoFlatRate {
    pub resolution: String,
    pub duration_seconds: u64,
    pub price: Decimal,
}

/// Tariff record for one model. Construction normalizes `context_tiers` into
/// ascending order (unbounded tier last) so `tier_for` is a simple scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCost {
    pub input_per_million: Option<Decimal>,
    pub output_per_million: Option<Decimal>,
    pub cached_input_per_million: Option<Decimal>,
    pub cached_input_write_per_million: Option<Decimal>,
    pub embedding_per_million: Option<Decimal>,

    pub image_per_image: Option<Decimal>,
    pub image_quality_multipliers: BTreeMap<String, Decimal>,
    pub image_resolution_multipliers: BTreeMap<String, Decimal>,

    pub video_per_second: Option<Decimal>,
    pub video_resolution_multipliers: BTreeMap<String, Decimal>,
    pub video_flat_rates: Vec<VideoFlatRate>,

    pub cost_per_search_unit: Option<Decimal>,

    pub cost_per_inference_step: Option<Decimal>,
    pub default_inference_steps: Option<u32>,

    pub batch_processing_multiplier: Option<Decimal>,
    pub supports_batch_processing: bool,

    #[serde(default)]
    pub context_tiers: Vec<ContextTier>,
}

impl ModelCost {
    /// Normalizes `context_tiers` into ascending order with the unbounded
    /// tier (`max_context: None`) last, as construction-time prep for
    /// `tier_for`'s linear scan.
    pub fn normalize(mut self) -> Self {
        self.context_tiers.sort_by_key(|t| t.max_context.unwrap_or(u64::MAX));
        self
    }

    fn tier_for(&self, total_tokens: u64) -> Option<&ContextTier> {
        self.context_tiers
            .iter()
            .find(|t| t.max_context.map(|max| total_tokens <= max).unwrap_or(true))
    }
}

/// All the usage counters the cost engine may need, depending on modality.
/// Only the fields relevant to the request's modality need be populated.
#[derive(Debug, Clone, Default)]
pub struct BillableUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cached_read_tokens: u64,
    pub cached_write_tokens: u64,
    pub embedding_tokens: u64,
    pub image_count: u32,
    pub image_quality: Option<String>,
    pub image_resolution: Option<String>,
    pub video_duration_seconds: Option<u64>,
    pub video_resolution: Option<String>,
    pub inference_steps: Option<u32>,
    pub documents_in_query: Option<u32>,
    pub batch: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("no pricing rate available for modality {modality:?} on this model")]
    Unavailable { modality: Modality },
}

/// Computes the total cost in USD for `usage` under `modality`, per the
/// six-step algorithm: branch by modality, apply resolution/quality/batch
/// multipliers, resolve context-length tiers, split cached-vs-standard
/// input tokens, apply inference-step pricing, and rerank search-unit
/// pricing. Never returns zero on a missing rate — always an error.
pub fn compute_cost(cost: &ModelCost, modality: Modality, usage: &BillableUsage) -> Result<Decimal, PricingError> {
    match modality {
        Modality::Chat => compute_chat_cost(cost, usage),
        Modality::Embedding => compute_embedding_cost(cost, usage),
        Modality::Image => compute_image_cost(cost, usage),
        Modality::Video => compute_video_cost(cost, usage),
        Modality::Rerank => compute_rerank_cost(cost, usage),
    }
}

fn batch_multiplier(cost: &ModelCost, usage: &BillableUsage) -> Decimal {
    if usage.batch && cost.supports_batch_processing {
        cost.batch_processing_multiplier.unwrap_or(Decimal::ONE)
    } else {
        Decimal::ONE
    }
}

fn compute_chat_cost(cost: &ModelCost, usage: &BillableUsage) -> Result<Decimal, PricingError> {
    let total_tokens = usage.prompt_tokens + usage.completion_tokens;

    let (input_rate, output_rate) = if let Some(tier) = cost.tier_for(total_tokens) {
        (tier.input_per_million, tier.output_per_million)
    } else {
        let input = cost.input_per_million.ok_or(PricingError::Unavailable { modality: Modality::Chat })?;
        let output = cost.output_per_million.ok_or(PricingError::Unavailable { modality: Modality::Chat })?;
        (input, output)
    };

    let standard_input_tokens = usage
        .prompt_tokens
        .saturating_sub(usage.cached_read_tokens)
        .saturating_sub(usage.cached_write_tokens);

    let cached_read_rate = cost.cached_input_per_million.unwrap_or(input_rate);
    let cached_write_rate = cost.cached_input_write_per_million.unwrap_or(input_rate);

    let mut total = per_million(standard_input_tokens, input_rate)
        + per_million(usage.cached_read_tokens, cached_read_rate)
        + per_million(usage.cached_write_tokens, cached_write_rate)
        + per_million(usage.completion_tokens, output_rate);

    total *= batch_multiplier(cost, usage);
    Ok(total)
}

fn compute_embedding_cost(cost: &ModelCost, usage: &BillableUsage) -> Result<Decimal, PricingError> {
    let rate = cost.embedding_per_million.ok_or(PricingError::Unavailable { modality: Modality::Embedding })?;
    Ok(per_million(usage.embedding_tokens, rate) * batch_multiplier(cost, usage))
}

fn compute_image_cost(cost: &ModelCost, usage: &BillableUsage) -> Result<Decimal, PricingError> {
    if let Some(steps_rate) = cost.cost_per_inference_step {
        let steps = usage
            .inference_steps
            .or(cost.default_inference_steps)
            .ok_or(PricingError::Unavailable { modality: Modality::Image })?;
        let per_image = steps_rate * Decimal::from(steps);
        let total = per_image * Decimal::from(usage.image_count.max(1));
        return Ok(total * batch_multiplier(cost, usage));
    }

    let base = cost.image_per_image.ok_or(PricingError::Unavailable { modality: Modality::Image })?;

    let resolution_mult = usage
        .image_resolution
        .as_ref()
        .and_then(|r| cost.image_resolution_multipliers.get(r))
        .copied()
        .unwrap_or(Decimal::ONE);
    let quality_mult = usage
        .image_quality
        .as_ref()
        .and_then(|q| cost.image_quality_multipliers.get(q))
        .copied()
        .unwrap_or(Decimal::ONE);

    let per_image = base * resolution_mult * quality_mult * batch_multiplier(cost, usage);
    Ok(per_image * Decimal::from(usage.image_count.max(1)))
}

fn compute_video_cost(cost: &ModelCost, usage: &BillableUsage) -> Result<Decimal, PricingError> {
    let duration = usage.video_duration_seconds.ok_or(PricingError::Unavailable { modality: Modality::Video })?;

    if !cost.video_flat_rates.is_empty() {
        let resolution = usage.video_resolution.as_deref().unwrap_or("");
        let rate = cost
            .video_flat_rates
            .iter()
            .find(|r| r.resolution == resolution && r.duration_seconds == duration)
            .map(|r| r.price)
            .ok_or(PricingError::Unavailable { modality: Modality::Video })?;
        return Ok(rate * batch_multiplier(cost, usage));
    }

    let base = cost.video_per_second.ok_or(PricingError::Unavailable { modality: Modality::Video })?;
    let resolution_mult = usage
        .video_resolution
        .as_ref()
        .and_then(|r| cost.video_resolution_multipliers.get(r))
        .copied()
        .unwrap_or(Decimal::ONE);

    let total = base * Decimal::from(duration) * resolution_mult;
    Ok(total * batch_multiplier(cost, usage))
}

fn compute_rerank_cost(cost: &ModelCost, usage: &BillableUsage) -> Result<Decimal, PricingError> {
    let rate = cost.cost_per_search_unit.ok_or(PricingError::Unavailable { modality: Modality::Rerank })?;
    let documents = usage.documents_in_query.unwrap_or(0) as u64;
    let units = documents.div_ceil(100).max(1);
    Ok(Decimal::from(units) * rate / dec!(1000) * batch_multiplier(cost, usage))
}

fn per_million(tokens: u64, rate_per_million: Decimal) -> Decimal {
    Decimal::from(tokens) * rate_per_million / dec!(1_000_000)
}
