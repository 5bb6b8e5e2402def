//! Caller-Facing Scan API
//!
//! The surface the rest of the browser talks to. Owns one process-wide
//! classifier and the shared quota tracker; tabs call these functions
//! concurrently and only the quota tracker serializes anything.

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::constants;
use crate::logic::ai_judge::{AiJudge, AiJudgeConfig};
use crate::logic::reputation::client::{ReputationClient, ReputationConfig};
use crate::logic::reputation::quota::{default_store_path, QuotaLimits, QuotaSnapshot, QuotaTracker};
use crate::logic::threat::classifier::ThreatClassifier;
use crate::logic::threat::lists;
use crate::logic::threat::rules::ScanThresholds;
use crate::logic::threat::types::{ScanResult, SensitivityTier};

// ============================================================================
// STATE
// ============================================================================

/// One quota tracker for the whole process; survives classifier rebuilds so
/// a key change never resets usage accounting
static QUOTA: Lazy<Arc<QuotaTracker>> =
    Lazy::new(|| Arc::new(QuotaTracker::new(QuotaLimits::default(), Some(default_store_path()))));

/// Current API keys (reputation, AI); seeded from the environment
static API_KEYS: Lazy<RwLock<(String, String)>> = Lazy::new(|| {
    RwLock::new((
        constants::get_reputation_api_key(),
        constants::get_ai_api_key(),
    ))
});

static CLASSIFIER: Lazy<RwLock<Arc<ThreatClassifier>>> =
    Lazy::new(|| RwLock::new(Arc::new(build_classifier())));

fn build_classifier() -> ThreatClassifier {
    let (reputation_key, ai_key) = API_KEYS.read().clone();

    let reputation = ReputationClient::new(
        ReputationConfig {
            api_key: reputation_key,
            ..Default::default()
        },
        QUOTA.clone(),
    );
    let ai_judge = AiJudge::new(AiJudgeConfig {
        api_key: ai_key,
        ..Default::default()
    });

    ThreatClassifier::new(ScanThresholds::default(), Some(reputation), Some(ai_judge))
}

/// Grab the current classifier without holding any lock across an await
fn classifier() -> Arc<ThreatClassifier> {
    CLASSIFIER.read().clone()
}

// ============================================================================
// SCANS
// ============================================================================

/// Classify a URL before navigation proceeds
pub async fn scan_url(url: &str, tier: SensitivityTier) -> ScanResult {
    classifier().scan_url(url, tier).await
}

/// Classify loaded page content (High tier only)
pub async fn scan_page_content(
    url: &str,
    title: &str,
    content: &str,
    tier: SensitivityTier,
) -> ScanResult {
    classifier().scan_page_content(url, title, content, tier).await
}

/// Classify a downloaded file by hashing it first
pub async fn scan_file(path: &Path, tier: SensitivityTier) -> ScanResult {
    classifier().scan_file(path, tier).await
}

/// Classify a file by its SHA-256
pub async fn scan_file_hash(sha256: &str, tier: SensitivityTier) -> ScanResult {
    classifier().scan_file_hash(sha256, tier).await
}

// ============================================================================
// SETTINGS
// ============================================================================

/// Set (or clear, with an empty string) the reputation-service API key
pub fn set_reputation_api_key(key: &str) {
    API_KEYS.write().0 = key.trim().to_string();
    *CLASSIFIER.write() = Arc::new(build_classifier());
    log::info!("Reputation API key updated");
}

/// Set (or clear) the AI judge API key
pub fn set_ai_api_key(key: &str) {
    API_KEYS.write().1 = key.trim().to_string();
    *CLASSIFIER.write() = Arc::new(build_classifier());
    log::info!("AI judge API key updated");
}

pub fn is_reputation_configured() -> bool {
    classifier().has_reputation()
}

/// Usage counters for the settings page
pub fn quota_snapshot() -> QuotaSnapshot {
    QUOTA.snapshot()
}

pub fn add_to_blocklist(domain: &str) {
    lists::add_to_blocklist(domain);
}

pub fn add_to_trusted_list(domain: &str) {
    lists::add_to_trusted_list(domain);
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::threat::types::ThreatType;

    #[tokio::test]
    async fn test_facade_scan_trusted_uses_no_quota() {
        let before = quota_snapshot().minute_used;
        let result = scan_url("https://wikipedia.org/wiki/Rust", SensitivityTier::High).await;
        assert!(result.safe);
        assert!(result.issues.is_empty());
        assert_eq!(quota_snapshot().minute_used, before);
    }

    #[tokio::test]
    async fn test_facade_blocklist_mutator_takes_effect() {
        add_to_blocklist("facade-test-bad.example");
        let result = scan_url("https://facade-test-bad.example/", SensitivityTier::Low).await;
        assert!(!result.safe);
        assert_eq!(result.threat_type, ThreatType::Malware);

        add_to_trusted_list("facade-test-bad.example");
        let result = scan_url("https://facade-test-bad.example/", SensitivityTier::Low).await;
        assert!(result.safe);
    }

    #[test]
    fn test_quota_snapshot_exposes_limits() {
        let snapshot = quota_snapshot();
        assert!(snapshot.limits.per_minute > 0);
        assert!(snapshot.limits.per_month >= snapshot.limits.per_day);
    }
}
