//! Scan Rules & Thresholds
//!
//! Thresholds and signal weights for the classification pipeline.
//! NO classification logic here - only constants and config.
//!
//! The numeric values are product-tuned; change them through
//! `ScanThresholds`, do not re-derive them in code.

use serde::{Deserialize, Serialize};

// ============================================================================
// THRESHOLDS (Constants)
// ============================================================================

/// Minimum normalized edit-distance similarity between a host and a brand's
/// canonical domain before the impersonation rule can fire
pub const BRAND_SIMILARITY_THRESHOLD: f64 = 0.75;

/// Pattern-stage aggregate score at or above which the scan turns unsafe.
/// Below this, issues are recorded but the page stays provisionally safe
/// so accumulated low-confidence noise never blocks navigation.
pub const PATTERN_BLOCK_THRESHOLD: u8 = 85;

/// Content-stage score when two or more distinct scam phrases co-occur
pub const CONTENT_ESCALATION_SCORE: u8 = 50;

/// Content-stage score when scam phrases co-occur with a password field;
/// at this level the content scan turns unsafe
pub const CONTENT_BLOCK_SCORE: u8 = 70;

/// Minimum distinct scam phrases before the content stage escalates at all
pub const CONTENT_MIN_PHRASES: usize = 2;

// ============================================================================
// SIGNAL WEIGHTS (combined via max, never sum)
// ============================================================================

/// Brand impersonation (typosquat) match
pub const WEIGHT_TYPOSQUAT: u8 = 90;

/// High-specificity phishing URL-shape pattern
pub const WEIGHT_PHISHING_SHAPE: u8 = 70;

/// IP-literal host instead of a domain name (waived for private ranges)
pub const WEIGHT_IP_HOST: u8 = 30;

/// More than `MAX_SUBDOMAIN_LABELS` host labels
pub const WEIGHT_DEEP_SUBDOMAIN: u8 = 15;

/// Plain HTTP scheme
pub const WEIGHT_PLAIN_HTTP: u8 = 10;

/// Score assigned when the AI judge returns an unsafe verdict
pub const WEIGHT_AI_UNSAFE: u8 = 90;

/// Host label count above which the deep-subdomain signal fires
pub const MAX_SUBDOMAIN_LABELS: usize = 5;

// ============================================================================
// REPUTATION TOLERANCES
// ============================================================================

/// A URL verdict stays safe with at most this many suspicious engine flags
/// (any malicious flag is disqualifying)
pub const URL_SUSPICIOUS_TOLERANCE: u32 = 1;

/// Files have a different false-positive profile than URLs
pub const FILE_SUSPICIOUS_TOLERANCE: u32 = 2;

// ============================================================================
// CONFIGURABLE THRESHOLDS (for runtime adjustment)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanThresholds {
    pub brand_similarity: f64,
    pub pattern_block: u8,
    pub content_escalation: u8,
    pub content_block: u8,
    pub content_min_phrases: usize,
    pub url_suspicious_tolerance: u32,
    pub file_suspicious_tolerance: u32,
}

impl Default for ScanThresholds {
    fn default() -> Self {
        Self {
            brand_similarity: BRAND_SIMILARITY_THRESHOLD,
            pattern_block: PATTERN_BLOCK_THRESHOLD,
            content_escalation: CONTENT_ESCALATION_SCORE,
            content_block: CONTENT_BLOCK_SCORE,
            content_min_phrases: CONTENT_MIN_PHRASES,
            url_suspicious_tolerance: URL_SUSPICIOUS_TOLERANCE,
            file_suspicious_tolerance: FILE_SUSPICIOUS_TOLERANCE,
        }
    }
}
