//! Threat Analysis
//!
//! - `types` - scan results and the threat taxonomy
//! - `rules` - thresholds and signal weights (no logic)
//! - `lists` - trusted / known-malicious domain lists and the brand map
//! - `heuristics` - pure URL-shape and page-content checks
//! - `classifier` - the tiered scanning pipeline

pub mod classifier;
pub mod heuristics;
pub mod lists;
pub mod rules;
pub mod types;
