//! External Reputation Service Integration
//!
//! - `types` - normalized verdicts + vendor API response parsing
//! - `quota` - minute/day/month call budget with persisted month counter
//! - `client` - the HTTP client (quota-gated, fail-open)

pub mod client;
pub mod quota;
pub mod types;
