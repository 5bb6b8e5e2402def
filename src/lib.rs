//! Zarla Security Core - Threat Classification Pipeline
//!
//! Classifies a URL (and, at the highest sensitivity tier, page content or a
//! downloaded file) as safe or dangerous before a browsing session proceeds.
//! Combines fast local heuristics with a quota-governed external reputation
//! service and an optional AI tie-breaker. Every failure mode fails open: a
//! degraded dependency never blocks legitimate browsing.

pub mod api;
pub mod constants;
pub mod logic;

pub use api::{
    add_to_blocklist, add_to_trusted_list, is_reputation_configured, quota_snapshot,
    scan_file, scan_file_hash, scan_page_content, scan_url, set_ai_api_key,
    set_reputation_api_key,
};
pub use logic::reputation::types::ReputationVerdict;
pub use logic::threat::types::{ScanResult, SensitivityTier, ThreatType};
