//! Threat Classifier
//!
//! The tiered scanning pipeline. Stages run in a fixed order chosen by the
//! sensitivity tier and short-circuit on the first terminal verdict. Later
//! stages can only add risk; no stage reverses an earlier unsafe verdict.
//!
//! Every dependency failure fails open: an unreachable reputation service or
//! AI endpoint degrades the scan, it never blocks the tab.

use crate::logic::ai_judge::AiJudge;
use crate::logic::reputation::client::ReputationClient;

use super::heuristics::{check_page_content, check_url_patterns};
use super::lists::{classify_by_trust, TrustVerdict};
use super::rules::{ScanThresholds, WEIGHT_AI_UNSAFE};
use super::types::{ScanResult, ScanTarget, SensitivityTier, ThreatType};

/// Longest content slice forwarded to the AI judge
const AI_CONTENT_SNIPPET: usize = 1_500;

// ============================================================================
// PIPELINE STAGES
// ============================================================================

/// The pipeline as a reviewable data structure: the tier picks a stage list,
/// each stage either continues or terminates the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    TrustCheck,
    PatternCheck,
    ReputationCheck,
    AiCheck,
}

impl SensitivityTier {
    /// Stage list for a URL scan at this tier
    pub fn stages(&self) -> &'static [ScanStage] {
        match self {
            SensitivityTier::Low => &[ScanStage::TrustCheck],
            SensitivityTier::Medium => &[ScanStage::TrustCheck, ScanStage::PatternCheck],
            SensitivityTier::High => &[
                ScanStage::TrustCheck,
                ScanStage::PatternCheck,
                ScanStage::ReputationCheck,
                ScanStage::AiCheck,
            ],
        }
    }
}

enum StageOutcome {
    Continue,
    Terminal,
}

// ============================================================================
// CLASSIFIER
// ============================================================================

pub struct ThreatClassifier {
    thresholds: ScanThresholds,
    reputation: Option<ReputationClient>,
    ai_judge: Option<AiJudge>,
}

impl ThreatClassifier {
    pub fn new(
        thresholds: ScanThresholds,
        reputation: Option<ReputationClient>,
        ai_judge: Option<AiJudge>,
    ) -> Self {
        Self {
            thresholds,
            reputation,
            ai_judge,
        }
    }

    /// Heuristics-only classifier (no external capabilities)
    pub fn offline(thresholds: ScanThresholds) -> Self {
        Self::new(thresholds, None, None)
    }

    pub fn has_reputation(&self) -> bool {
        self.reputation.as_ref().map(|r| r.is_configured()).unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // URL SCAN
    // ------------------------------------------------------------------

    pub async fn scan_url(&self, url: &str, tier: SensitivityTier) -> ScanResult {
        let mut result = ScanResult::safe_default();

        let Some(target) = ScanTarget::parse(url) else {
            // Unparseable input is an engine limitation, not a threat
            log::debug!("Unparseable URL, defaulting to safe: {}", url);
            return result;
        };

        // Only http(s) URLs with a real host enter the pipeline.
        // Browser-internal pages (zarla://, about:), non-navigational links
        // (mailto:, javascript:, tel:) and local resources (file:, blob:,
        // data:) are structurally safe and never cost a quota slot.
        if !is_network_target(&target) {
            return result;
        }

        log::debug!("Scanning {} at {} sensitivity", target.host, tier.as_str());

        for stage in tier.stages() {
            let outcome = match stage {
                ScanStage::TrustCheck => self.run_trust_stage(&target, &mut result),
                ScanStage::PatternCheck => self.run_pattern_stage(&target, &mut result),
                ScanStage::ReputationCheck => self.run_reputation_stage(&target, &mut result).await,
                ScanStage::AiCheck => self.run_ai_stage(&target, &mut result).await,
            };
            if let StageOutcome::Terminal = outcome {
                break;
            }
        }

        if !result.safe {
            log::info!(
                "Blocked {} - {} (risk {})",
                target.host,
                result.threat_type.as_str(),
                result.risk_score
            );
        }
        result
    }

    fn run_trust_stage(&self, target: &ScanTarget, result: &mut ScanResult) -> StageOutcome {
        match classify_by_trust(&target.host) {
            TrustVerdict::Trusted => StageOutcome::Terminal,
            TrustVerdict::Malicious => {
                result.note_issue(format!("Domain is on the known-malicious list: {}", target.host));
                result.mark_unsafe(
                    ThreatType::Malware,
                    100,
                    "known-malicious-site",
                    "Dangerous Site Blocked",
                    format!("{} is a known malicious site.", target.host),
                );
                StageOutcome::Terminal
            }
            TrustVerdict::Unknown => StageOutcome::Continue,
        }
    }

    fn run_pattern_stage(&self, target: &ScanTarget, result: &mut ScanResult) -> StageOutcome {
        let analysis = check_url_patterns(&target.raw_url, &target.host, &self.thresholds);

        for issue in &analysis.issues {
            result.note_issue(issue.clone());
        }
        result.raise_risk(analysis.score);

        // Only a high-confidence aggregate blocks; weaker findings ride along
        // as recorded issues
        if analysis.score >= self.thresholds.pattern_block {
            let threat_type = match analysis.threat_type {
                ThreatType::None => ThreatType::Phishing,
                other => other,
            };
            result.mark_unsafe(
                threat_type,
                analysis.score,
                "suspicious-url",
                "Suspicious Site Blocked",
                format!(
                    "{} looks like a {} attempt.",
                    target.host,
                    threat_type.as_str().to_ascii_lowercase()
                ),
            );
            return StageOutcome::Terminal;
        }
        StageOutcome::Continue
    }

    async fn run_reputation_stage(
        &self,
        target: &ScanTarget,
        result: &mut ScanResult,
    ) -> StageOutcome {
        let Some(client) = self.reputation.as_ref().filter(|c| c.is_configured()) else {
            return StageOutcome::Continue;
        };

        let verdict = client.lookup_url(&target.raw_url).await;

        for evidence in &verdict.evidence {
            result.note_issue(evidence.clone());
        }

        let outcome = if verdict.flagged() {
            result.raise_risk(verdict.score);
            result.mark_unsafe(
                ThreatType::ReputationDetection,
                verdict.score,
                "reputation-flagged",
                "Dangerous Site Blocked",
                format!(
                    "{} was flagged by {} security vendors.",
                    target.host, verdict.malicious_count
                ),
            );
            StageOutcome::Terminal
        } else {
            if verdict.success {
                result.raise_risk(verdict.score);
            }
            // Quota denials and network failures land here too: unknown,
            // proceed
            StageOutcome::Continue
        };

        result.reputation = Some(verdict);
        outcome
    }

    async fn run_ai_stage(&self, target: &ScanTarget, result: &mut ScanResult) -> StageOutcome {
        let Some(judge) = self.ai_judge.as_ref().filter(|j| j.is_configured()) else {
            return StageOutcome::Continue;
        };

        let prompt = url_prompt(&target.raw_url, &result.issues);
        match judge.judge(&prompt).await {
            Some(verdict) if !verdict.safe => {
                let threat_type = match verdict.threat_type {
                    ThreatType::None => ThreatType::SuspiciousContent,
                    other => other,
                };
                result.note_issue(format!("AI analysis: {}", verdict.reason));
                result.mark_unsafe(
                    threat_type,
                    WEIGHT_AI_UNSAFE,
                    "ai-flagged",
                    "Suspicious Site Blocked",
                    verdict.reason,
                );
                StageOutcome::Terminal
            }
            // A safe verdict or a failed call both add nothing
            _ => StageOutcome::Continue,
        }
    }

    // ------------------------------------------------------------------
    // PAGE CONTENT SCAN (separate entry point, High tier only)
    // ------------------------------------------------------------------

    /// Invoked after a page finishes loading. Independent of the URL scan.
    pub async fn scan_page_content(
        &self,
        url: &str,
        title: &str,
        content: &str,
        tier: SensitivityTier,
    ) -> ScanResult {
        let mut result = ScanResult::safe_default();

        if tier < SensitivityTier::High {
            return result;
        }

        let analysis = check_page_content(content, &self.thresholds);
        for issue in &analysis.issues {
            result.note_issue(issue.clone());
        }
        result.raise_risk(analysis.score);

        if analysis.score >= self.thresholds.content_block {
            result.mark_unsafe(
                ThreatType::Scam,
                analysis.score,
                "scam-content",
                "Scam Page Blocked",
                "This page shows scam warning signs and asks for a password.",
            );
            return result;
        }

        // Borderline pages (some scam signal, not enough to block) get the
        // AI tie-breaker
        if analysis.phrase_hits > 0 {
            if let Some(judge) = self.ai_judge.as_ref().filter(|j| j.is_configured()) {
                let prompt = content_prompt(url, title, content);
                if let Some(verdict) = judge.judge(&prompt).await {
                    if !verdict.safe {
                        let threat_type = match verdict.threat_type {
                            ThreatType::None => ThreatType::SuspiciousContent,
                            other => other,
                        };
                        result.note_issue(format!("AI analysis: {}", verdict.reason));
                        result.mark_unsafe(
                            threat_type,
                            WEIGHT_AI_UNSAFE,
                            "ai-flagged",
                            "Suspicious Page Blocked",
                            verdict.reason,
                        );
                    }
                }
            }
        }

        result
    }

    // ------------------------------------------------------------------
    // FILE SCANS (High tier only; lower tiers fail open)
    // ------------------------------------------------------------------

    pub async fn scan_file_hash(&self, sha256: &str, tier: SensitivityTier) -> ScanResult {
        let mut result = ScanResult::safe_default();

        if tier < SensitivityTier::High {
            log::debug!("File scan skipped below high sensitivity");
            return result;
        }
        let Some(client) = self.reputation.as_ref().filter(|c| c.is_configured()) else {
            return result;
        };

        let verdict = client.lookup_file_hash(sha256).await;

        for evidence in &verdict.evidence {
            result.note_issue(evidence.clone());
        }

        if verdict.flagged() {
            result.raise_risk(verdict.score);
            let message = match &verdict.threat_label {
                Some(label) => format!("Download identified as {}.", label),
                None => format!(
                    "Download flagged by {} security vendors.",
                    verdict.malicious_count
                ),
            };
            result.mark_unsafe(
                ThreatType::Malware,
                verdict.score,
                "malicious-download",
                "Dangerous Download Blocked",
                message,
            );
        } else if verdict.success {
            result.raise_risk(verdict.score);
        }

        result.reputation = Some(verdict);
        result
    }

    pub async fn scan_file(&self, path: &std::path::Path, tier: SensitivityTier) -> ScanResult {
        if tier < SensitivityTier::High {
            return ScanResult::safe_default();
        }

        let path_owned = path.to_path_buf();
        let hash = tokio::task::spawn_blocking(move || sha256_file(&path_owned)).await;

        match hash {
            Ok(Ok(hash)) => self.scan_file_hash(&hash, tier).await,
            Ok(Err(e)) => {
                // Unreadable file is an engine limitation, not a threat
                log::warn!("Cannot hash {}: {}", path.display(), e);
                ScanResult::safe_default()
            }
            Err(e) => {
                log::warn!("File hashing task failed: {}", e);
                ScanResult::safe_default()
            }
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn is_network_target(target: &ScanTarget) -> bool {
    matches!(target.scheme.as_str(), "http" | "https") && !target.host.is_empty()
}

fn url_prompt(url: &str, issues: &[String]) -> String {
    let findings = if issues.is_empty() {
        "none".to_string()
    } else {
        issues.join("; ")
    };
    format!(
        "Assess whether visiting this URL is safe.\nURL: {}\nHeuristic findings: {}",
        url, findings
    )
}

fn content_prompt(url: &str, title: &str, content: &str) -> String {
    let snippet: String = content.chars().take(AI_CONTENT_SNIPPET).collect();
    format!(
        "Assess whether this page is a scam or phishing page.\nURL: {}\nTitle: {}\nPage text: {}",
        url, title, snippet
    )
}

/// Streaming SHA-256 of a file
fn sha256_file(path: &std::path::Path) -> std::io::Result<String> {
    use sha2::{Digest, Sha256};
    use std::io::Read;

    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn offline() -> ThreatClassifier {
        ThreatClassifier::offline(ScanThresholds::default())
    }

    #[tokio::test]
    async fn test_trusted_host_short_circuits_safe() {
        let classifier = offline();
        for url in [
            "https://google.com/",
            "https://accounts.google.com/signin",
            "https://github.com/zarla/browser",
        ] {
            let result = classifier.scan_url(url, SensitivityTier::High).await;
            assert!(result.safe, "{} should be safe", url);
            assert!(result.issues.is_empty());
            assert_eq!(result.risk_score, 0);
        }
    }

    #[tokio::test]
    async fn test_malicious_host_blocked_at_every_tier() {
        let classifier = offline();
        for tier in [SensitivityTier::Low, SensitivityTier::Medium, SensitivityTier::High] {
            let result = classifier.scan_url("https://gumblar.cn/x", tier).await;
            assert!(!result.safe);
            assert_eq!(result.risk_score, 100);
            assert_eq!(result.threat_type, ThreatType::Malware);
            assert!(result.warning_code.is_some());
        }
    }

    #[tokio::test]
    async fn test_non_network_schemes_bypass_list_checks() {
        let classifier = offline();
        // Even a blocklisted host is safe under an internal scheme
        for url in [
            "zarla://gumblar.cn/settings",
            "about:blank",
            "zarla://newtab",
            "mailto:alice@example.com",
            "javascript:void(0)",
            "tel:+15551234567",
        ] {
            let result = classifier.scan_url(url, SensitivityTier::High).await;
            assert!(result.safe, "{} should short-circuit safe", url);
            assert!(result.issues.is_empty());
        }
    }

    #[tokio::test]
    async fn test_non_network_schemes_never_reach_the_reputation_stage() {
        use crate::logic::reputation::client::{ReputationClient, ReputationConfig};
        use crate::logic::reputation::quota::{QuotaLimits, QuotaTracker};
        use std::sync::Arc;

        let quota = Arc::new(QuotaTracker::new(QuotaLimits::default(), None));
        let client = ReputationClient::new(
            ReputationConfig {
                api_key: "test-key".to_string(),
                ..Default::default()
            },
            quota.clone(),
        );
        let classifier = ThreatClassifier::new(ScanThresholds::default(), Some(client), None);

        let result = classifier
            .scan_url("mailto:alice@example.com", SensitivityTier::High)
            .await;
        assert!(result.safe);
        assert!(result.reputation.is_none());
        assert_eq!(quota.snapshot().minute_used, 0);
    }

    #[tokio::test]
    async fn test_typosquat_blocked_at_medium() {
        let classifier = offline();
        let result = classifier
            .scan_url("https://accounts-google-secure-login.tld/", SensitivityTier::Medium)
            .await;

        assert!(!result.safe);
        assert_eq!(result.threat_type, ThreatType::MirrorSite);
        assert!(result.issues.iter().any(|i| i.contains("typosquatting")));
        assert_eq!(result.warning_code.as_deref(), Some("suspicious-url"));
    }

    #[tokio::test]
    async fn test_low_tier_skips_pattern_stage() {
        let classifier = offline();
        let result = classifier
            .scan_url("https://accounts-google-secure-login.tld/", SensitivityTier::Low)
            .await;
        assert!(result.safe);
        assert!(result.issues.is_empty());
    }

    #[tokio::test]
    async fn test_sub_threshold_signals_stay_safe() {
        let classifier = offline();
        // Phishing shape (70) + http (10) -> max 70, below the 85 block line
        let result = classifier
            .scan_url("http://8.8.8.8/account/login", SensitivityTier::Medium)
            .await;
        assert!(result.safe);
        assert_eq!(result.risk_score, 70);
        assert!(!result.issues.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_url_defaults_safe() {
        let classifier = offline();
        let result = classifier.scan_url(":::not a url:::", SensitivityTier::High).await;
        assert!(result.safe);
        assert_eq!(result.risk_score, 0);
    }

    #[tokio::test]
    async fn test_fail_open_with_no_external_capabilities() {
        // High tier, no reputation client, no AI judge: clean URL stays safe
        let classifier = offline();
        let result = classifier
            .scan_url("https://some-ordinary-site.org/", SensitivityTier::High)
            .await;
        assert!(result.safe);
        assert_eq!(result.threat_type, ThreatType::None);
    }

    #[tokio::test]
    async fn test_content_scan_requires_high_tier() {
        let classifier = offline();
        let page = "Your computer has been locked! Call this number immediately.";
        let result = classifier
            .scan_page_content("https://x.tld/", "Alert", page, SensitivityTier::Medium)
            .await;
        assert!(result.safe);
        assert_eq!(result.risk_score, 0);
        assert!(result.issues.is_empty());
    }

    #[tokio::test]
    async fn test_content_scan_escalates_but_only_blocks_with_password() {
        let classifier = offline();

        let phrases_only = "Your computer has been locked! Call this number immediately.";
        let result = classifier
            .scan_page_content("https://x.tld/", "Alert", phrases_only, SensitivityTier::High)
            .await;
        assert!(result.safe);
        assert_eq!(result.risk_score, 50);
        assert_eq!(result.issues.len(), 2);

        let with_password = format!("{} <input type=\"password\">", phrases_only);
        let result = classifier
            .scan_page_content("https://x.tld/", "Alert", &with_password, SensitivityTier::High)
            .await;
        assert!(!result.safe);
        assert_eq!(result.threat_type, ThreatType::Scam);
        assert_eq!(result.risk_score, 70);
    }

    #[tokio::test]
    async fn test_file_scans_fail_open_without_reputation() {
        let classifier = offline();
        let result = classifier
            .scan_file_hash(&"a".repeat(64), SensitivityTier::High)
            .await;
        assert!(result.safe);
        assert!(result.reputation.is_none());

        let result = classifier
            .scan_file_hash(&"a".repeat(64), SensitivityTier::Low)
            .await;
        assert!(result.safe);
    }

    #[tokio::test]
    async fn test_scan_file_hashes_and_stays_safe_offline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("download.bin");
        std::fs::write(&path, b"hello").unwrap();

        let classifier = offline();
        let result = classifier.scan_file(&path, SensitivityTier::High).await;
        assert!(result.safe);

        // Missing file is an engine limitation, still fail-open
        let result = classifier
            .scan_file(&dir.path().join("missing.bin"), SensitivityTier::High)
            .await;
        assert!(result.safe);
    }

    #[test]
    fn test_tier_stage_lists() {
        assert_eq!(SensitivityTier::Low.stages(), &[ScanStage::TrustCheck]);
        assert_eq!(
            SensitivityTier::Medium.stages(),
            &[ScanStage::TrustCheck, ScanStage::PatternCheck]
        );
        assert_eq!(SensitivityTier::High.stages().len(), 4);
    }
}
