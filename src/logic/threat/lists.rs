//! Trust & Block Lists
//!
//! Static seed lists plus runtime additions from the browser settings UI.
//! Matching is suffix-based: a listed domain covers itself and every
//! subdomain.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

// ============================================================================
// SEED LISTS
// ============================================================================

/// Domains that always short-circuit the whole pipeline to safe
const TRUSTED_SEED: &[&str] = &[
    "google.com",
    "youtube.com",
    "gmail.com",
    "microsoft.com",
    "office.com",
    "live.com",
    "apple.com",
    "icloud.com",
    "amazon.com",
    "wikipedia.org",
    "github.com",
    "mozilla.org",
    "cloudflare.com",
    "paypal.com",
    "netflix.com",
    "linkedin.com",
    "facebook.com",
    "instagram.com",
    "x.com",
    "twitter.com",
    "reddit.com",
    "stackoverflow.com",
    "zarla.app",
];

/// Domains that always short-circuit to unsafe (score 100, Malware)
const MALICIOUS_SEED: &[&str] = &[
    "malware-test.example",
    "17ebook.com",
    "clicnews.com",
    "gumblar.cn",
    "martuz.cn",
    "beladen.net",
];

/// Brand token -> canonical domain, for impersonation scoring
pub const BRAND_DOMAINS: &[(&str, &str)] = &[
    ("google", "google.com"),
    ("youtube", "youtube.com"),
    ("microsoft", "microsoft.com"),
    ("apple", "apple.com"),
    ("amazon", "amazon.com"),
    ("paypal", "paypal.com"),
    ("netflix", "netflix.com"),
    ("facebook", "facebook.com"),
    ("instagram", "instagram.com"),
    ("whatsapp", "whatsapp.com"),
    ("linkedin", "linkedin.com"),
    ("github", "github.com"),
    ("dropbox", "dropbox.com"),
    ("coinbase", "coinbase.com"),
    ("binance", "binance.com"),
];

// ============================================================================
// STATE (runtime additions)
// ============================================================================

static TRUSTED: Lazy<RwLock<HashSet<String>>> = Lazy::new(|| {
    RwLock::new(TRUSTED_SEED.iter().map(|d| d.to_string()).collect())
});

static MALICIOUS: Lazy<RwLock<HashSet<String>>> = Lazy::new(|| {
    RwLock::new(MALICIOUS_SEED.iter().map(|d| d.to_string()).collect())
});

// ============================================================================
// TRUST CLASSIFICATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustVerdict {
    Trusted,
    Malicious,
    Unknown,
}

/// Suffix-based domain match: `host == d || host.ends_with(".d")`
fn matches_domain(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// List lookup, checked before anything else in the pipeline.
/// The malicious list wins over the trusted list on (misconfigured) overlap.
pub fn classify_by_trust(host: &str) -> TrustVerdict {
    let host = host.to_ascii_lowercase();

    if MALICIOUS.read().iter().any(|d| matches_domain(&host, d)) {
        return TrustVerdict::Malicious;
    }
    if TRUSTED.read().iter().any(|d| matches_domain(&host, d)) {
        return TrustVerdict::Trusted;
    }
    TrustVerdict::Unknown
}

// ============================================================================
// MUTATORS (from the browser settings UI)
// ============================================================================

/// Add a domain to the known-malicious list
pub fn add_to_blocklist(domain: &str) {
    let domain = domain.trim().to_ascii_lowercase();
    if domain.is_empty() {
        return;
    }
    TRUSTED.write().remove(&domain);
    MALICIOUS.write().insert(domain.clone());
    log::info!("Domain added to blocklist: {}", domain);
}

/// Add a domain to the trusted list
pub fn add_to_trusted_list(domain: &str) {
    let domain = domain.trim().to_ascii_lowercase();
    if domain.is_empty() {
        return;
    }
    MALICIOUS.write().remove(&domain);
    TRUSTED.write().insert(domain.clone());
    log::info!("Domain added to trusted list: {}", domain);
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trusted_suffix_match() {
        assert_eq!(classify_by_trust("google.com"), TrustVerdict::Trusted);
        assert_eq!(classify_by_trust("accounts.google.com"), TrustVerdict::Trusted);
        assert_eq!(classify_by_trust("GOOGLE.COM"), TrustVerdict::Trusted);
    }

    #[test]
    fn test_no_substring_false_positive() {
        // "notgoogle.com" ends with "google.com" as a substring but is not a
        // subdomain of it
        assert_eq!(classify_by_trust("notgoogle.com"), TrustVerdict::Unknown);
        assert_eq!(classify_by_trust("evilgoogle.com"), TrustVerdict::Unknown);
    }

    #[test]
    fn test_malicious_match() {
        assert_eq!(classify_by_trust("gumblar.cn"), TrustVerdict::Malicious);
        assert_eq!(classify_by_trust("cdn.gumblar.cn"), TrustVerdict::Malicious);
    }

    #[test]
    fn test_runtime_mutators_flip_lists() {
        add_to_blocklist("runtime-bad.example");
        assert_eq!(classify_by_trust("runtime-bad.example"), TrustVerdict::Malicious);

        // Trusting the same domain removes it from the blocklist
        add_to_trusted_list("runtime-bad.example");
        assert_eq!(classify_by_trust("runtime-bad.example"), TrustVerdict::Trusted);
    }

    #[test]
    fn test_unknown_host() {
        assert_eq!(classify_by_trust("example.org"), TrustVerdict::Unknown);
    }
}
