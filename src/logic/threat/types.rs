//! Threat Types & Scan Results
//!
//! Data model only - no classification logic here.

use serde::{Deserialize, Serialize};

use crate::logic::reputation::types::ReputationVerdict;

// ============================================================================
// SENSITIVITY TIER
// ============================================================================

/// Scanning aggressiveness. Controls which pipeline stages run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SensitivityTier {
    /// Block/trust-list checks only
    Low,
    /// Adds URL-shape heuristics
    Medium,
    /// Adds the reputation service and the AI judge
    High,
}

impl SensitivityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensitivityTier::Low => "low",
            SensitivityTier::Medium => "medium",
            SensitivityTier::High => "high",
        }
    }
}

// ============================================================================
// THREAT TAXONOMY
// ============================================================================

/// Closed threat taxonomy. External free-text labels are mapped into this
/// enum in exactly one place (`ai_judge::map_threat_label`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ThreatType {
    #[default]
    None,
    /// Typosquatted brand impersonation
    MirrorSite,
    Phishing,
    Malware,
    Scam,
    SuspiciousContent,
    /// Flagged by the external reputation service
    ReputationDetection,
}

impl ThreatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatType::None => "None",
            ThreatType::MirrorSite => "Mirror Site",
            ThreatType::Phishing => "Phishing",
            ThreatType::Malware => "Malware",
            ThreatType::Scam => "Scam",
            ThreatType::SuspiciousContent => "Suspicious Content",
            ThreatType::ReputationDetection => "Reputation Detection",
        }
    }
}

// ============================================================================
// SCAN RESULT
// ============================================================================

/// Output of one scan. Built incrementally by the classifier; risk only ever
/// goes up as stages add evidence, and a terminal unsafe verdict is never
/// reversed by a later stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub safe: bool,
    /// 0-100, monotonic max of all contributing signals
    pub risk_score: u8,
    pub threat_type: ThreatType,
    /// Short evidence strings, insertion order = detection order
    pub issues: Vec<String>,
    pub warning_code: Option<String>,
    pub warning_title: Option<String>,
    pub warning_message: Option<String>,
    pub reputation: Option<ReputationVerdict>,
}

impl ScanResult {
    /// Provisionally-safe starting point for the pipeline
    pub fn safe_default() -> Self {
        Self {
            safe: true,
            risk_score: 0,
            threat_type: ThreatType::None,
            issues: Vec::new(),
            warning_code: None,
            warning_title: None,
            warning_message: None,
            reputation: None,
        }
    }

    /// Record an evidence string
    pub fn note_issue(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
    }

    /// Raise risk via max-combine; never lowers the score
    pub fn raise_risk(&mut self, score: u8) {
        self.risk_score = self.risk_score.max(score.min(100));
    }

    /// Terminal unsafe verdict with a user-facing warning
    pub fn mark_unsafe(
        &mut self,
        threat_type: ThreatType,
        score: u8,
        code: &str,
        title: &str,
        message: impl Into<String>,
    ) {
        self.safe = false;
        self.threat_type = threat_type;
        self.raise_risk(score);
        self.warning_code = Some(code.to_string());
        self.warning_title = Some(title.to_string());
        self.warning_message = Some(message.into());
    }
}

// ============================================================================
// SCAN TARGET
// ============================================================================

/// Parsed subject of a scan
#[derive(Debug, Clone)]
pub struct ScanTarget {
    pub raw_url: String,
    pub scheme: String,
    pub host: String,
}

impl ScanTarget {
    /// Parse a URL into the pieces the pipeline needs. `None` means the URL
    /// is unparseable - the classifier treats that as "cannot classify,
    /// default to safe".
    pub fn parse(raw: &str) -> Option<Self> {
        let parsed = url::Url::parse(raw).ok()?;
        Some(Self {
            raw_url: raw.to_string(),
            scheme: parsed.scheme().to_ascii_lowercase(),
            host: parsed
                .host_str()
                .map(|h| h.to_ascii_lowercase())
                .unwrap_or_default(),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_risk_is_monotonic() {
        let mut result = ScanResult::safe_default();
        result.raise_risk(40);
        assert_eq!(result.risk_score, 40);
        result.raise_risk(15);
        assert_eq!(result.risk_score, 40);
        result.raise_risk(90);
        assert_eq!(result.risk_score, 90);
        result.raise_risk(200);
        assert_eq!(result.risk_score, 100);
    }

    #[test]
    fn test_mark_unsafe_sets_warning() {
        let mut result = ScanResult::safe_default();
        result.mark_unsafe(ThreatType::Malware, 100, "known-malicious", "Dangerous Site", "msg");
        assert!(!result.safe);
        assert_eq!(result.risk_score, 100);
        assert_eq!(result.threat_type, ThreatType::Malware);
        assert_eq!(result.warning_code.as_deref(), Some("known-malicious"));
    }

    #[test]
    fn test_issue_order_preserved() {
        let mut result = ScanResult::safe_default();
        result.note_issue("first");
        result.note_issue("second");
        assert_eq!(result.issues, vec!["first", "second"]);
    }

    #[test]
    fn test_parse_target() {
        let target = ScanTarget::parse("HTTPS://Example.COM/path?q=1").unwrap();
        assert_eq!(target.scheme, "https");
        assert_eq!(target.host, "example.com");

        assert!(ScanTarget::parse("not a url at all").is_none());
    }
}
