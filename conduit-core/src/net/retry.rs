//! Bounded exponential backoff shared by provider adapters and the router's
//! fallback-chain walker.

use std::time::Duration;

/// Configuration for [`backoff_delay`]. Defaults match spec: 3 attempts,
/// 1s initial delay, 30s cap.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// `min(max_delay, initial * 2^attempt)`, `attempt` zero-indexed.
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    let scaled = config.initial_delay.saturating_mul(factor);
    std::cmp::min(scaled, config.max_delay)
}

/// Whether an HTTP status code should trigger a retry: 408, 429, and 5xx
/// except 501 and 505.
pub fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status) && status != 501 && status != 505
}

/// Parses a `Retry-After` header value, accepting either delta-seconds
/// (`"120"`) or an HTTP-date (RFC 1123, e.g. `"Wed, 21 Oct 2026 07:28:00 GMT"`).
/// Returns `None` for unparseable input.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let trimmed = value.trim();

    if let Ok(secs) = trimmed.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    if let Ok(when) = chrono::DateTime::parse_from_rfc2822(trimmed) {
        let now = chrono::Utc::now();
        let delta = when.with_timezone(&chrono::Utc) - now;
        return delta.to_std().ok();
    }

    None
}
