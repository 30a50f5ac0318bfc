//! Cache statistics and alerting data model, consumed (not produced) by this
//! crate: cache *policy* lives with whatever operates [`crate::cache`]'s
//! `InMemoryCache`/`DistributedCache`, but the counters those operators
//! report and the alert thresholds they evaluate against are modeled here
//! so adapters and the gateway can surface them consistently.

use std::collections::HashMap;
use std::time::Duration;

/// A logical partition of the cache (e.g. one per deployment region, or one
/// per tenant) that `CacheStatistics` counters are scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CacheRegion(pub String);

impl CacheRegion {
    pub fn global() -> Self {
        Self("global".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheOperationType {
    Hit,
    Miss,
    Set,
    Remove,
    Eviction,
    Error,
}

/// Response-latency percentiles for one region's cache operations.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct LatencyPercentiles {
    pub avg_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

/// Per-region counters plus derived rates, over a reporting time window.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheStatistics {
    pub region: CacheRegion,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub removes: u64,
    pub evictions: u64,
    pub errors: u64,
    pub size_entries: u64,
    pub memory_usage_bytes: u64,
    pub latency: LatencyPercentiles,
    pub operation_breakdown: HashMap<CacheOperationType, u64>,
    pub window: Duration,
}

impl CacheStatistics {
    pub fn new(region: CacheRegion, window: Duration) -> Self {
        Self {
            region,
            hits: 0,
            misses: 0,
            sets: 0,
            removes: 0,
            evictions: 0,
            errors: 0,
            size_entries: 0,
            memory_usage_bytes: 0,
            latency: LatencyPercentiles::default(),
            operation_breakdown: HashMap::new(),
            window,
        }
    }

    /// `hits / (hits + misses)`, `0.0` when no lookups have happened yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record(&mut self, operation: CacheOperationType) {
        *self.operation_breakdown.entry(operation).or_insert(0) += 1;
        match operation {
            CacheOperationType::Hit => self.hits += 1,
            CacheOperationType::Miss => self.misses += 1,
            CacheOperationType::Set => self.sets += 1,
            CacheOperationType::Remove => self.removes += 1,
            CacheOperationType::Eviction => self.evictions += 1,
            CacheOperationType::Error => self.errors += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheAlertType {
    LowHitRate,
    HighMemoryUsage,
    HighEvictionRate,
    HighResponseTime,
    CacheUnhealthy,
    RedisConnectionLost,
    RegionFailure,
}

/// A fired (or fireable) alert for one `(region, alert_type)` pair. The
/// invariant that a given pair may re-fire only after `cooldown` elapses is
/// enforced by `AlertThrottle`, not by this struct itself.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheAlert {
    pub id: String,
    pub region: CacheRegion,
    pub alert_type: CacheAlertType,
    pub severity: AlertSeverity,
    pub current_value: f64,
    pub threshold: f64,
    pub triggered_at: chrono::DateTime<chrono::Utc>,
    pub cooldown: Duration,
}

/// Tracks the last time each `(region, alert_type)` pair fired so callers
/// can enforce the cooldown invariant before emitting a new `CacheAlert`.
#[derive(Debug, Default)]
pub struct AlertThrottle {
    last_fired: HashMap<(CacheRegion, CacheAlertType), chrono::DateTime<chrono::Utc>>,
}

impl AlertThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `(region, alert_type)` is allowed to fire again right now,
    /// given `cooldown` and the last time it fired (if ever).
    pub fn may_fire(&self, region: &CacheRegion, alert_type: &CacheAlertType, cooldown: Duration, now: chrono::DateTime<chrono::Utc>) -> bool {
        match self.last_fired.get(&(region.clone(), alert_type.clone())) {
            Some(last) => now.signed_duration_since(*last).to_std().map(|elapsed| elapsed >= cooldown).unwrap_or(true),
            None => true,
        }
    }

    /// Records that `(region, alert_type)` fired at `now`, starting its
    /// cooldown window.
    pub fn record_fired(&mut self, region: CacheRegion, alert_type: CacheAlertType, now: chrono::DateTime<chrono::Utc>) {
        self.last_fired.insert((region, alert_type), now);
    }
}
