//! Reputation Types
//!
//! Normalized verdicts plus the serde types for parsing the vendor API.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// NORMALIZED VERDICT
// ============================================================================

/// Normalized result of one reputation lookup.
///
/// `pending` (just submitted, no analysis yet) and `unknown` (absent from the
/// reputation database) are distinct from `safe`: both are non-blocking, but
/// neither is the "actively verified clean" guarantee.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReputationVerdict {
    /// False when the lookup itself failed (quota, network, parse)
    pub success: bool,
    pub safe: bool,
    pub pending: bool,
    pub unknown: bool,
    /// 0-100 detection score
    pub score: u8,
    pub malicious_count: u32,
    pub suspicious_count: u32,
    pub harmless_count: u32,
    pub total_engines: u32,
    /// Vendor-suggested threat label (files only)
    pub threat_label: Option<String>,
    /// Evidence strings for the scan result
    pub evidence: Vec<String>,
    /// Failure reason when `success` is false
    pub error: Option<String>,
}

impl ReputationVerdict {
    /// Non-throwing failure verdict. Distinguishable from "checked and found
    /// safe": `success` is false and no counts are populated.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            safe: true,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// URL just submitted for analysis - unverified, non-blocking
    pub fn pending_submission(url: &str) -> Self {
        Self {
            success: true,
            safe: true,
            pending: true,
            evidence: vec![format!("URL submitted for analysis, no verdict yet: {}", url)],
            ..Default::default()
        }
    }

    /// Hash absent from the reputation database - unverified, proceed with a
    /// warning
    pub fn unknown_hash(hash: &str) -> Self {
        Self {
            success: true,
            safe: true,
            unknown: true,
            evidence: vec![format!("File hash not present in reputation database: {}", hash)],
            ..Default::default()
        }
    }

    /// Did the service positively flag the subject?
    pub fn flagged(&self) -> bool {
        self.success && !self.safe
    }
}

// ============================================================================
// SCORING
// ============================================================================

/// `(malicious*100 + suspicious*50) / total_engines`, clamped to 0-100
pub fn detection_score(malicious: u32, suspicious: u32, total_engines: u32) -> u8 {
    if total_engines == 0 {
        return 0;
    }
    let raw = (malicious as u64 * 100 + suspicious as u64 * 50) / total_engines as u64;
    raw.min(100) as u8
}

// ============================================================================
// API RESPONSE TYPES (for parsing the vendor JSON)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub data: ApiData,
}

#[derive(Debug, Deserialize)]
pub struct ApiData {
    pub id: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub attributes: ApiAttributes,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiAttributes {
    pub last_analysis_stats: Option<ApiStats>,
    pub last_analysis_results: Option<HashMap<String, ApiEngineResult>>,
    // File analyses additionally carry these
    pub meaningful_name: Option<String>,
    pub type_description: Option<String>,
    pub size: Option<u64>,
    pub popular_threat_classification: Option<ApiThreatClassification>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ApiStats {
    #[serde(default)]
    pub malicious: u32,
    #[serde(default)]
    pub suspicious: u32,
    #[serde(default)]
    pub harmless: u32,
    #[serde(default)]
    pub undetected: u32,
}

impl ApiStats {
    pub fn total_engines(&self) -> u32 {
        self.malicious + self.suspicious + self.harmless + self.undetected
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiEngineResult {
    pub category: String,
    pub result: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiThreatClassification {
    pub suggested_threat_label: Option<String>,
}

// ============================================================================
// RESPONSE -> VERDICT
// ============================================================================

/// Parse an existing analysis into a normalized verdict.
///
/// The safe decision is intentionally asymmetric: any confirmed-malicious
/// detection is disqualifying, while up to `suspicious_tolerance` suspicious
/// flags are tolerated to absorb minor/aggressive vendors.
pub fn parse_analysis(resp: ApiResponse, suspicious_tolerance: u32) -> ReputationVerdict {
    let attrs = resp.data.attributes;
    let stats = attrs.last_analysis_stats.unwrap_or_default();
    let total = stats.total_engines();

    let score = detection_score(stats.malicious, stats.suspicious, total);
    let safe = stats.malicious == 0 && stats.suspicious <= suspicious_tolerance;

    let mut evidence = Vec::new();
    if stats.malicious > 0 || stats.suspicious > 0 {
        evidence.push(format!(
            "{} of {} engines flagged malicious, {} suspicious",
            stats.malicious, total, stats.suspicious
        ));
    }

    // Pull a few concrete detection names for the warning UI
    if let Some(results) = attrs.last_analysis_results {
        let mut names: Vec<String> = results
            .into_values()
            .filter(|r| r.category == "malicious" || r.category == "suspicious")
            .filter_map(|r| r.result)
            .collect();
        names.sort();
        names.dedup();
        for name in names.into_iter().take(3) {
            evidence.push(format!("Detection: {}", name));
        }
    }

    let threat_label = attrs
        .popular_threat_classification
        .and_then(|c| c.suggested_threat_label);

    if let Some(name) = attrs.meaningful_name {
        evidence.push(format!("Known as: {}", name));
    }
    if let (Some(desc), Some(size)) = (attrs.type_description, attrs.size) {
        evidence.push(format!("{}, {} bytes", desc, size));
    }

    ReputationVerdict {
        success: true,
        safe,
        pending: false,
        unknown: false,
        score,
        malicious_count: stats.malicious,
        suspicious_count: stats.suspicious,
        harmless_count: stats.harmless,
        total_engines: total,
        threat_label,
        evidence,
        error: None,
    }
}

// ============================================================================
// TESTS
// ============================================================================
