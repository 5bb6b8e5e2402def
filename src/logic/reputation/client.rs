//! Reputation Service Client
//!
//! Quota-gated HTTP client for the external reputation service. Every
//! failure mode (quota denial, network error, timeout, malformed response)
//! is converted into a non-throwing failure verdict; this component never
//! propagates an error to the classifier.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::constants::{self, REPUTATION_TIMEOUT_SECS};
use crate::logic::threat::rules::{FILE_SUSPICIOUS_TOLERANCE, URL_SUSPICIOUS_TOLERANCE};

use super::quota::{QuotaDecision, QuotaTracker};
use super::types::{parse_analysis, ApiResponse, ReputationVerdict};

/// Longest a scan will sleep on a minute-window wait before giving up.
/// Anything longer and the tab should just proceed unverified.
const MAX_QUOTA_WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct ReputationConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
    pub url_suspicious_tolerance: u32,
    pub file_suspicious_tolerance: u32,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            base_url: constants::get_reputation_api_base(),
            api_key: constants::get_reputation_api_key(),
            timeout_seconds: REPUTATION_TIMEOUT_SECS,
            url_suspicious_tolerance: URL_SUSPICIOUS_TOLERANCE,
            file_suspicious_tolerance: FILE_SUSPICIOUS_TOLERANCE,
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct ReputationClient {
    config: ReputationConfig,
    quota: Arc<QuotaTracker>,
    http_client: reqwest::Client,
}

impl ReputationClient {
    pub fn new(config: ReputationConfig, quota: Arc<QuotaTracker>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            quota,
            http_client,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    /// Stable URL identifier: base64url of the URL bytes, no padding
    pub fn url_identifier(url: &str) -> String {
        URL_SAFE_NO_PAD.encode(url.as_bytes())
    }

    /// Look up a URL. "Not found" submits the URL for analysis and returns a
    /// pending verdict (non-blocking, flagged in evidence as unverified).
    pub async fn lookup_url(&self, url: &str) -> ReputationVerdict {
        if !self.is_configured() {
            return ReputationVerdict::failure("reputation service not configured");
        }
        if let Some(denied) = self.acquire_quota().await {
            return denied;
        }

        let id = Self::url_identifier(url);
        let endpoint = format!("{}/urls/{}", self.config.base_url, id);

        let response = self
            .http_client
            .get(&endpoint)
            .header("x-apikey", &self.config.api_key)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().as_u16() == 404 => self.submit_url(url).await,
            Ok(resp) if resp.status().is_success() => match resp.json::<ApiResponse>().await {
                Ok(body) => parse_analysis(body, self.config.url_suspicious_tolerance),
                Err(e) => {
                    log::warn!("Reputation response unparseable: {}", e);
                    ReputationVerdict::failure(format!("parse error: {}", e))
                }
            },
            Ok(resp) => {
                log::warn!("Reputation lookup failed with status {}", resp.status());
                ReputationVerdict::failure(format!("server error: {}", resp.status()))
            }
            Err(e) => {
                log::warn!("Reputation lookup network error: {}", e);
                ReputationVerdict::failure(format!("network error: {}", e))
            }
        }
    }

    /// Submit an unknown URL for analysis. Best-effort: a quota denial here
    /// just skips the submission, the verdict stays pending either way.
    async fn submit_url(&self, url: &str) -> ReputationVerdict {
        let mut verdict = ReputationVerdict::pending_submission(url);

        match self.quota.try_acquire() {
            QuotaDecision::Granted => {}
            _ => {
                log::debug!("Submission skipped for {}: quota unavailable", url);
                verdict
                    .evidence
                    .push("Submission deferred: rate limit reached".to_string());
                return verdict;
            }
        }

        let endpoint = format!("{}/urls", self.config.base_url);
        let result = self
            .http_client
            .post(&endpoint)
            .header("x-apikey", &self.config.api_key)
            .form(&[("url", url)])
            .send()
            .await;

        if let Err(e) = result {
            log::debug!("URL submission failed: {}", e);
        }
        verdict
    }

    /// Look up a file by SHA-256. "Not found" is a distinct unknown verdict:
    /// unverified, proceed with a warning, neither safe nor unsafe.
    pub async fn lookup_file_hash(&self, sha256: &str) -> ReputationVerdict {
        if !self.is_configured() {
            return ReputationVerdict::failure("reputation service not configured");
        }
        if let Some(denied) = self.acquire_quota().await {
            return denied;
        }

        let endpoint = format!("{}/files/{}", self.config.base_url, sha256.to_lowercase());

        let response = self
            .http_client
            .get(&endpoint)
            .header("x-apikey", &self.config.api_key)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().as_u16() == 404 => ReputationVerdict::unknown_hash(sha256),
            Ok(resp) if resp.status().is_success() => match resp.json::<ApiResponse>().await {
                Ok(body) => parse_analysis(body, self.config.file_suspicious_tolerance),
                Err(e) => {
                    log::warn!("File reputation response unparseable: {}", e);
                    ReputationVerdict::failure(format!("parse error: {}", e))
                }
            },
            Ok(resp) => ReputationVerdict::failure(format!("server error: {}", resp.status())),
            Err(e) => {
                log::warn!("File reputation network error: {}", e);
                ReputationVerdict::failure(format!("network error: {}", e))
            }
        }
    }

    /// Gate one call on the quota tracker. A grant already charged the slot
    /// (the request that never comes back still counted against the
    /// service). Short minute-window waits are slept through; everything
    /// else becomes a failure verdict the caller treats as "unknown,
    /// proceed".
    async fn acquire_quota(&self) -> Option<ReputationVerdict> {
        loop {
            match self.quota.try_acquire() {
                QuotaDecision::Granted => return None,
                QuotaDecision::Denied(reason) => {
                    log::info!("Reputation scan skipped: {}", reason);
                    return Some(ReputationVerdict::failure(format!(
                        "rate limit exceeded: {}",
                        reason
                    )));
                }
                QuotaDecision::MustWait(wait) if wait <= MAX_QUOTA_WAIT => {
                    tokio::time::sleep(wait).await;
                }
                QuotaDecision::MustWait(wait) => {
                    log::info!(
                        "Reputation scan skipped: minute window full for {:?} more",
                        wait
                    );
                    return Some(ReputationVerdict::failure("rate limit exceeded"));
                }
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
