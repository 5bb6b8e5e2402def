//! URL & Content Heuristics
//!
//! Pure, synchronous checks - no I/O, no shared state. The pattern stage
//! combines its signals via `max`, never `sum`, so N weak signals never
//! automatically outweigh one strong signal.

use std::net::IpAddr;

use once_cell::sync::Lazy;
use regex::Regex;

use super::lists::BRAND_DOMAINS;
use super::rules::{
    ScanThresholds, MAX_SUBDOMAIN_LABELS, WEIGHT_DEEP_SUBDOMAIN, WEIGHT_IP_HOST,
    WEIGHT_PHISHING_SHAPE, WEIGHT_PLAIN_HTTP, WEIGHT_TYPOSQUAT,
};
use super::types::ThreatType;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Hyphenated credential-bait segments that mark an impersonation-style host.
/// High textual similarity alone is not enough to flag a brand: many
/// legitimate sites are textually close to a brand name.
const IMPERSONATION_MARKERS: &[&str] = &[
    "-login", "login-", "-secure", "secure-", "-verify", "verify-", "-account",
    "account-", "-signin", "signin-", "-update", "update-",
];

/// Unambiguous scam phrases for the content stage. Deliberately not general
/// scam vocabulary; a single hit is ignored, two or more distinct hits
/// escalate.
const SCAM_PHRASES: &[&str] = &[
    "your computer has been locked",
    "your account will be suspended",
    "call this number immediately",
    "you have won a prize",
    "verify your identity to claim",
    "unusual sign-in activity detected",
    "confirm your password to continue",
    "your payment method has expired",
    "send bitcoin to the address",
    "do not close this window",
];

/// High-specificity phishing URL shapes. Matched against the lowercased URL.
static PHISHING_URL_SHAPES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // credential-bait path on a secure/account-themed host
        r"^https?://[^/]*(?:secure|signin|account|webscr)[^/]*\.[a-z]{2,}/.*(?:confirm|update|verify|password)",
        // credential path served from a raw IP
        r"^https?://\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}(?::\d+)?/.*(?:login|signin|account|bank)",
        // credential path on a disposable free TLD
        r"\.(?:tk|ml|ga|cf|gq)/[^?#]*(?:login|verify|secure|account)",
        // embedded userinfo mimicking a trusted host
        r"^https?://[^/@]+@[^/]+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("phishing shape pattern"))
    .collect()
});

// ============================================================================
// EDIT DISTANCE
// ============================================================================

/// Classic two-row Levenshtein
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Normalized similarity: 1 - distance / max_len, in 0.0..=1.0
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

// ============================================================================
// URL PATTERN ANALYSIS
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PatternAnalysis {
    pub issues: Vec<String>,
    /// Max of all triggered signal weights
    pub score: u8,
    /// Threat type of the strongest triggered signal
    pub threat_type: ThreatType,
}

impl PatternAnalysis {
    fn add_signal(&mut self, weight: u8, threat_type: ThreatType, issue: String) {
        if weight > self.score {
            self.score = weight;
            self.threat_type = threat_type;
        }
        self.issues.push(issue);
    }
}

/// Suspicious-URL-shape analysis. Produces issues and a max-combined score;
/// the classifier only turns the result unsafe at `pattern_block` or above.
pub fn check_url_patterns(url: &str, host: &str, thresholds: &ScanThresholds) -> PatternAnalysis {
    let mut analysis = PatternAnalysis::default();
    let url_lower = url.to_ascii_lowercase();
    let host_lower = host.to_ascii_lowercase();

    // Brand impersonation (typosquatting)
    if let Some((brand, canonical)) = find_impersonated_brand(&host_lower, thresholds.brand_similarity) {
        analysis.add_signal(
            WEIGHT_TYPOSQUAT,
            ThreatType::MirrorSite,
            format!(
                "Possible typosquatting of {}: host '{}' imitates {}",
                brand, host_lower, canonical
            ),
        );
    }

    // IP-literal host (waived for private/loopback ranges)
    if let Some(ip) = parse_host_ip(&host_lower) {
        if !is_private_ip(&ip) {
            analysis.add_signal(
                WEIGHT_IP_HOST,
                ThreatType::Phishing,
                format!("Host is a raw IP address: {}", ip),
            );
        }
    }

    // Deep subdomain nesting
    let label_count = host_lower.split('.').filter(|l| !l.is_empty()).count();
    if label_count > MAX_SUBDOMAIN_LABELS {
        analysis.add_signal(
            WEIGHT_DEEP_SUBDOMAIN,
            ThreatType::Phishing,
            format!("Unusually deep subdomain nesting ({} labels)", label_count),
        );
    }

    // Unencrypted scheme
    if url_lower.starts_with("http://") {
        analysis.add_signal(
            WEIGHT_PLAIN_HTTP,
            ThreatType::SuspiciousContent,
            "Connection is not encrypted (plain HTTP)".to_string(),
        );
    }

    // Hard-coded phishing URL shapes
    for pattern in PHISHING_URL_SHAPES.iter() {
        if pattern.is_match(&url_lower) {
            analysis.add_signal(
                WEIGHT_PHISHING_SHAPE,
                ThreatType::Phishing,
                "URL matches a known phishing pattern".to_string(),
            );
            break;
        }
    }

    analysis
}

/// Impersonation requires co-occurrence of a near-brand token AND a
/// credential-bait marker. Either signal alone produces unacceptable false
/// positives (regional mirrors, legitimate "-login" paths).
fn find_impersonated_brand(host: &str, min_similarity: f64) -> Option<(&'static str, &'static str)> {
    if !host_has_impersonation_marker(host) {
        return None;
    }

    for &(brand, canonical) in BRAND_DOMAINS {
        // The real site and its subdomains are never impersonations of themselves
        if host == canonical || host.ends_with(&format!(".{}", canonical)) {
            continue;
        }

        // Compare each dot/hyphen token of the host against the brand token;
        // "accounts-google-secure-login.tld" must match on "google"
        let near_brand = host
            .split(['.', '-'])
            .filter(|t| !t.is_empty())
            .any(|token| similarity(token, brand) > min_similarity);

        if near_brand {
            return Some((brand, canonical));
        }
    }
    None
}

fn host_has_impersonation_marker(host: &str) -> bool {
    IMPERSONATION_MARKERS.iter().any(|m| host.contains(m))
}

fn parse_host_ip(host: &str) -> Option<IpAddr> {
    // url::Url keeps IPv6 hosts bracketed
    host.trim_start_matches('[').trim_end_matches(']').parse().ok()
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}

// ============================================================================
// PAGE CONTENT ANALYSIS (High tier only)
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ContentAnalysis {
    pub issues: Vec<String>,
    pub score: u8,
    /// Distinct scam phrases found
    pub phrase_hits: usize,
    pub has_password_field: bool,
}

/// Scan page text for co-occurring scam phrases. One phrase is noise; two or
/// more distinct phrases escalate, and a password input on the same page
/// escalates further.
pub fn check_page_content(content: &str, thresholds: &ScanThresholds) -> ContentAnalysis {
    let mut analysis = ContentAnalysis::default();
    let content_lower = content.to_ascii_lowercase();

    for phrase in SCAM_PHRASES {
        if content_lower.contains(phrase) {
            analysis.phrase_hits += 1;
            analysis.issues.push(format!("Scam phrase found: \"{}\"", phrase));
        }
    }

    analysis.has_password_field = content_lower.contains("type=\"password\"")
        || content_lower.contains("type='password'")
        || content_lower.contains("type=password");

    if analysis.phrase_hits >= thresholds.content_min_phrases {
        analysis.score = if analysis.has_password_field {
            analysis
                .issues
                .push("Page requests a password alongside scam content".to_string());
            thresholds.content_block
        } else {
            thresholds.content_escalation
        };
    }

    analysis
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_basics() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("google", "gooogle"), 1);
    }

    #[test]
    fn test_similarity_normalized() {
        assert!((similarity("google", "google") - 1.0).abs() < f64::EPSILON);
        assert!(similarity("gooogle", "google") > 0.85);
        assert!(similarity("paypalcommunity", "paypal") < 0.5);
    }

    #[test]
    fn test_impersonation_requires_marker_and_similarity() {
        let thresholds = ScanThresholds::default();

        // Similarity high + marker present -> flagged
        let flagged = check_url_patterns(
            "https://paypal-login-secure.example.com/",
            "paypal-login-secure.example.com",
            &thresholds,
        );
        assert!(flagged.score >= 90);
        assert_eq!(flagged.threat_type, ThreatType::MirrorSite);
        assert!(flagged.issues.iter().any(|i| i.contains("typosquatting")));

        // No marker -> not flagged by the impersonation rule alone
        let no_marker = check_url_patterns(
            "https://paypalcommunity.com/",
            "paypalcommunity.com",
            &thresholds,
        );
        assert!(no_marker.score < 90);

        // Marker but no registered brand match -> not flagged
        let no_brand = check_url_patterns(
            "https://mysecurebank-login.tld/",
            "mysecurebank-login.tld",
            &thresholds,
        );
        assert!(!no_brand.issues.iter().any(|i| i.contains("typosquatting")));
    }

    #[test]
    fn test_canonical_domain_never_self_flags() {
        let thresholds = ScanThresholds::default();
        let result = check_url_patterns(
            "https://secure-login.paypal.com/signin",
            "secure-login.paypal.com",
            &thresholds,
        );
        assert!(!result.issues.iter().any(|i| i.contains("typosquatting")));
    }

    #[test]
    fn test_typo_domain_flagged() {
        let thresholds = ScanThresholds::default();
        let result = check_url_patterns(
            "https://gooogle-login.com/",
            "gooogle-login.com",
            &thresholds,
        );
        assert_eq!(result.threat_type, ThreatType::MirrorSite);
        assert_eq!(result.score, 90);
    }

    #[test]
    fn test_ip_host_weight() {
        let thresholds = ScanThresholds::default();
        let public = check_url_patterns("https://8.8.8.8/", "8.8.8.8", &thresholds);
        assert_eq!(public.score, 30);

        // Private ranges are waived
        let private = check_url_patterns("https://192.168.1.10/", "192.168.1.10", &thresholds);
        assert_eq!(private.score, 0);
        let loopback = check_url_patterns("https://127.0.0.1/", "127.0.0.1", &thresholds);
        assert_eq!(loopback.score, 0);
    }

    #[test]
    fn test_weak_signals_max_combine() {
        let thresholds = ScanThresholds::default();
        // plain http (10) + deep subdomains (15) -> max 15, not 25
        let result = check_url_patterns(
            "http://a.b.c.d.e.f.example.com/",
            "a.b.c.d.e.f.example.com",
            &thresholds,
        );
        assert_eq!(result.score, 15);
        assert_eq!(result.issues.len(), 2);
    }

    #[test]
    fn test_score_monotonic_under_added_evidence() {
        let thresholds = ScanThresholds::default();
        // Subset of conditions
        let subset = check_url_patterns("http://example.com/", "example.com", &thresholds);
        // Superset: same condition plus IP host plus phishing shape
        let superset = check_url_patterns(
            "http://8.8.8.8/account/login",
            "8.8.8.8",
            &thresholds,
        );
        assert!(superset.score >= subset.score);
        assert!(superset.issues.len() >= subset.issues.len());
    }

    #[test]
    fn test_phishing_shape_patterns() {
        let thresholds = ScanThresholds::default();
        let shape = check_url_patterns(
            "https://secure-update.example.tk/verify",
            "secure-update.example.tk",
            &thresholds,
        );
        assert!(shape.issues.iter().any(|i| i.contains("phishing pattern")));

        let userinfo = check_url_patterns(
            "https://google.com@evil.example/",
            "evil.example",
            &thresholds,
        );
        assert!(userinfo.score >= 70);
    }

    #[test]
    fn test_content_single_phrase_ignored() {
        let thresholds = ScanThresholds::default();
        let result = check_page_content("your computer has been locked. goodbye.", &thresholds);
        assert_eq!(result.phrase_hits, 1);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_content_two_phrases_escalate() {
        let thresholds = ScanThresholds::default();
        let page = "Your computer has been locked! Call this number immediately.";
        let result = check_page_content(page, &thresholds);
        assert_eq!(result.phrase_hits, 2);
        assert_eq!(result.score, thresholds.content_escalation);
    }

    #[test]
    fn test_content_password_field_escalates_further() {
        let thresholds = ScanThresholds::default();
        let page = concat!(
            "your account will be suspended - confirm your password to continue ",
            "<input type=\"password\" name=\"pw\">"
        );
        let result = check_page_content(page, &thresholds);
        assert!(result.has_password_field);
        assert_eq!(result.score, thresholds.content_block);
    }
}
