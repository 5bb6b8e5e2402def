//! AI Judge
//!
//! Last-resort tie-breaker: sends a strictly-templated prompt to a
//! chat-completion endpoint and parses a constrained single-line JSON
//! verdict. Any network or parse failure yields `None`, which the classifier
//! treats as "no additional evidence" - never as a verdict.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::constants::{self, AI_TIMEOUT_SECS};
use crate::logic::threat::types::ThreatType;

const SYSTEM_PROMPT: &str = "You are a browser security analyst. Reply with exactly one line of JSON \
shaped as {\"safe\": bool, \"threat\": string, \"reason\": string} and nothing else. \
The threat field is one of: none, phishing, malware, scam, mirror-site, suspicious-content.";

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct AiJudgeConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AiJudgeConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::get_ai_api_base(),
            api_key: constants::get_ai_api_key(),
            model: constants::get_ai_model(),
            timeout_seconds: AI_TIMEOUT_SECS,
            max_tokens: 150,
            temperature: 0.0,
        }
    }
}

// ============================================================================
// VERDICT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AiVerdict {
    pub safe: bool,
    pub threat_type: ThreatType,
    pub reason: String,
}

/// Wire shape inside the model's reply
#[derive(Debug, Deserialize)]
struct RawVerdict {
    safe: bool,
    #[serde(default)]
    threat: String,
    #[serde(default)]
    reason: String,
}

/// Chat-completion response envelope
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

// ============================================================================
// JUDGE
// ============================================================================

pub struct AiJudge {
    config: AiJudgeConfig,
    http_client: reqwest::Client,
}

impl AiJudge {
    pub fn new(config: AiJudgeConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            http_client,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    /// Ask the model for a verdict. `None` on any failure (fail-open).
    pub async fn judge(&self, prompt: &str) -> Option<AiVerdict> {
        if !self.is_configured() {
            return None;
        }

        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await;

        let resp = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                log::warn!("AI judge returned status {}", r.status());
                return None;
            }
            Err(e) => {
                log::warn!("AI judge request failed: {}", e);
                return None;
            }
        };

        let chat: ChatResponse = match resp.json().await {
            Ok(c) => c,
            Err(e) => {
                log::warn!("AI judge response unparseable: {}", e);
                return None;
            }
        };

        let content = chat.choices.first().map(|c| c.message.content.as_str())?;
        parse_verdict_text(content)
    }
}

/// Parse the model's raw reply into a verdict. Tolerates chatty replies by
/// extracting the first balanced `{...}` substring.
pub fn parse_verdict_text(content: &str) -> Option<AiVerdict> {
    let object = extract_json_object(content)?;
    let raw: RawVerdict = match serde_json::from_str(object) {
        Ok(r) => r,
        Err(e) => {
            log::debug!("AI verdict JSON rejected: {}", e);
            return None;
        }
    };

    Some(AiVerdict {
        safe: raw.safe,
        threat_type: map_threat_label(&raw.threat),
        reason: raw.reason,
    })
}

/// First balanced `{...}` substring of the text
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Map a free-text threat label into the closed taxonomy. This is the one
/// place untrusted external text influences an internal type; unrecognized
/// labels collapse to `SuspiciousContent`.
pub fn map_threat_label(label: &str) -> ThreatType {
    let label = label.trim().to_ascii_lowercase();
    if label.is_empty() || label == "none" || label == "safe" || label == "clean" {
        return ThreatType::None;
    }
    if label.contains("phish") {
        return ThreatType::Phishing;
    }
    if label.contains("malware") || label.contains("trojan") || label.contains("virus") {
        return ThreatType::Malware;
    }
    if label.contains("scam") || label.contains("fraud") {
        return ThreatType::Scam;
    }
    if label.contains("mirror") || label.contains("typosquat") || label.contains("impersonat") {
        return ThreatType::MirrorSite;
    }
    ThreatType::SuspiciousContent
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_object() {
        let text = r#"{"safe": true, "threat": "none", "reason": "ok"}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_extract_from_chatty_reply() {
        let text = r#"Sure! Here's my analysis: {"safe": false, "threat": "phishing", "reason": "credential bait"} Hope that helps!"#;
        let object = extract_json_object(text).unwrap();
        assert!(object.starts_with('{') && object.ends_with('}'));

        let verdict = parse_verdict_text(text).unwrap();
        assert!(!verdict.safe);
        assert_eq!(verdict.threat_type, ThreatType::Phishing);
    }

    #[test]
    fn test_extract_handles_braces_inside_strings() {
        let text = r#"{"safe": true, "threat": "none", "reason": "page shows {curly} text"}"#;
        let object = extract_json_object(text).unwrap();
        assert_eq!(object, text);
        assert!(parse_verdict_text(text).is_some());
    }

    #[test]
    fn test_garbage_yields_none() {
        assert!(extract_json_object("no json here").is_none());
        assert!(parse_verdict_text("{broken json").is_none());
        assert!(parse_verdict_text(r#"{"threat": "phishing"}"#).is_none(), "safe field is required");
    }

    #[test]
    fn test_map_threat_label_table() {
        assert_eq!(map_threat_label("phishing"), ThreatType::Phishing);
        assert_eq!(map_threat_label("Phishing Attack"), ThreatType::Phishing);
        assert_eq!(map_threat_label("malware"), ThreatType::Malware);
        assert_eq!(map_threat_label("trojan.downloader"), ThreatType::Malware);
        assert_eq!(map_threat_label("scam"), ThreatType::Scam);
        assert_eq!(map_threat_label("advance-fee fraud"), ThreatType::Scam);
        assert_eq!(map_threat_label("mirror-site"), ThreatType::MirrorSite);
        assert_eq!(map_threat_label("typosquatting"), ThreatType::MirrorSite);
        assert_eq!(map_threat_label("none"), ThreatType::None);
        assert_eq!(map_threat_label(""), ThreatType::None);
        // Unrecognized labels never invent a stronger category
        assert_eq!(map_threat_label("weird new thing"), ThreatType::SuspiciousContent);
    }

    #[tokio::test]
    async fn test_unconfigured_judge_returns_none() {
        let judge = AiJudge::new(AiJudgeConfig {
            api_key: String::new(),
            ..Default::default()
        });
        assert!(judge.judge("is https://example.com safe?").await.is_none());
    }
}
