//! Small utilities shared across provider adapters, the router, and the cost engine.

pub mod duration_serde;
