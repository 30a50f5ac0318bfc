//! Shared networking utilities: URL joining, retry/backoff, and AWS SigV4 signing.
//!
//! Used by provider adapters that need more than the generic `HttpProviderClient`
//! (Bedrock and SageMaker sign every request; the router's health probes and retry
//! loop share the same backoff schedule as the circuit breaker).

pub mod retry;
pub mod sigv4;
pub mod url;
