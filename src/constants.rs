//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults. To point the core
//! at a different reputation service or AI endpoint, only edit this file.

/// Default reputation service base URL
pub const DEFAULT_REPUTATION_API_BASE: &str = "https://www.virustotal.com/api/v3";

/// Default AI completion endpoint (chat-completion protocol)
pub const DEFAULT_AI_API_BASE: &str = "https://api.openai.com/v1/chat/completions";

/// Default model for AI verdicts
pub const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";

/// Reputation request timeout (seconds)
pub const REPUTATION_TIMEOUT_SECS: u64 = 8;

/// AI judge request timeout (seconds)
pub const AI_TIMEOUT_SECS: u64 = 10;

/// Reputation service free-tier caps
pub const QUOTA_PER_MINUTE: u32 = 4;
pub const QUOTA_PER_DAY: u32 = 500;
pub const QUOTA_PER_MONTH: u32 = 15_500;

/// Quota state file name (inside the app data dir)
pub const QUOTA_STATE_FILE: &str = "reputation_quota.json";

/// App data directory name
pub const APP_DATA_DIR: &str = "zarla";

/// Core version
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get reputation API base URL from environment or use default
pub fn get_reputation_api_base() -> String {
    std::env::var("ZARLA_REPUTATION_API_BASE")
        .unwrap_or_else(|_| DEFAULT_REPUTATION_API_BASE.to_string())
}

/// Get reputation API key from environment (empty = not configured)
pub fn get_reputation_api_key() -> String {
    std::env::var("ZARLA_REPUTATION_API_KEY").unwrap_or_default()
}

/// Get AI endpoint from environment or use default
pub fn get_ai_api_base() -> String {
    std::env::var("ZARLA_AI_API_BASE").unwrap_or_else(|_| DEFAULT_AI_API_BASE.to_string())
}

/// Get AI API key from environment (empty = not configured)
pub fn get_ai_api_key() -> String {
    std::env::var("ZARLA_AI_API_KEY").unwrap_or_default()
}

/// Get AI model name from environment or use default
pub fn get_ai_model() -> String {
    std::env::var("ZARLA_AI_MODEL").unwrap_or_else(|_| DEFAULT_AI_MODEL.to_string())
}
