//! Reputation Call Quota
//!
//! Tracks reputation-service usage against minute/day/month caps. The three
//! counters are the only mutable shared state in the core; a single mutex
//! owns them and every read-modify-write goes through `try_acquire`, which
//! commits the slot in the same locked section that grants it, so concurrent
//! scans can never be granted more slots than a window holds.
//!
//! The month counter is persisted to disk after every granted call so a
//! crash (or a grant whose request then fails) under-reports remaining
//! budget rather than silently exceeding the external service's tier cap.

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::constants::{
    APP_DATA_DIR, QUOTA_PER_DAY, QUOTA_PER_MINUTE, QUOTA_PER_MONTH, QUOTA_STATE_FILE,
};

const MINUTE_WINDOW: Duration = Duration::from_secs(60);
const DAY_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// LIMITS & DECISIONS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaLimits {
    pub per_minute: u32,
    pub per_day: u32,
    pub per_month: u32,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            per_minute: QUOTA_PER_MINUTE,
            per_day: QUOTA_PER_DAY,
            per_month: QUOTA_PER_MONTH,
        }
    }
}

/// Outcome of an acquisition attempt. Month/day exhaustion is an immediate
/// deny (the window is too long to be worth waiting out); minute exhaustion
/// reports how long until the oldest in-window call ages out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaDecision {
    Granted,
    Denied(String),
    MustWait(Duration),
}

/// Usage counters for the settings UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    pub minute_used: u32,
    pub day_used: u32,
    pub month_used: u32,
    pub limits: QuotaLimits,
}

// ============================================================================
// PERSISTED STATE
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct QuotaFile {
    month_start: String,
    monthly_count: u32,
}

fn current_month() -> String {
    chrono::Utc::now().format("%Y-%m").to_string()
}

/// Default location of the persisted month counter
pub fn default_store_path() -> PathBuf {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DATA_DIR);
    fs::create_dir_all(&dir).ok();
    dir.join(QUOTA_STATE_FILE)
}

// ============================================================================
// QUOTA TRACKER
// ============================================================================

struct QuotaState {
    minute_window: VecDeque<Instant>,
    day_window: VecDeque<Instant>,
    month_count: u32,
    month_start: String,
}

pub struct QuotaTracker {
    limits: QuotaLimits,
    state: Mutex<QuotaState>,
    /// None disables persistence (tests)
    store_path: Option<PathBuf>,
}

impl QuotaTracker {
    pub fn new(limits: QuotaLimits, store_path: Option<PathBuf>) -> Self {
        let month = current_month();
        let mut month_count = 0;

        // A stale month marker on disk means the counter restarts at zero
        if let Some(path) = &store_path {
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<QuotaFile>(&content) {
                    Ok(file) if file.month_start == month => {
                        month_count = file.monthly_count;
                        log::info!("Quota state loaded: {} calls used this month", month_count);
                    }
                    Ok(_) => log::info!("Quota month rolled over, counter reset"),
                    Err(e) => log::warn!("Quota state unreadable, starting fresh: {}", e),
                },
                Err(_) => log::debug!("No quota state file, starting fresh"),
            }
        }

        Self {
            limits,
            state: Mutex::new(QuotaState {
                minute_window: VecDeque::new(),
                day_window: VecDeque::new(),
                month_count,
                month_start: month,
            }),
            store_path,
        }
    }

    /// Ask for permission to make one reputation-service call. A grant
    /// commits the slot before the lock is released, so two callers racing
    /// for the last slot cannot both receive it.
    pub fn try_acquire(&self) -> QuotaDecision {
        self.try_acquire_at(Instant::now(), &current_month())
    }

    fn try_acquire_at(&self, now: Instant, month: &str) -> QuotaDecision {
        let mut state = self.state.lock();

        prune(&mut state.minute_window, now, MINUTE_WINDOW);
        prune(&mut state.day_window, now, DAY_WINDOW);

        if state.month_start != month {
            state.month_count = 0;
            state.month_start = month.to_string();
            self.persist(&state);
        }

        // Fail fast, longest window first
        if state.month_count >= self.limits.per_month {
            return QuotaDecision::Denied("monthly reputation quota exhausted".to_string());
        }
        if state.day_window.len() as u32 >= self.limits.per_day {
            return QuotaDecision::Denied("daily reputation quota exhausted".to_string());
        }
        if state.minute_window.len() as u32 >= self.limits.per_minute {
            // Wait until the oldest in-window call ages out, at most one window
            let wait = state
                .minute_window
                .front()
                .map(|oldest| MINUTE_WINDOW.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(MINUTE_WINDOW);
            return QuotaDecision::MustWait(wait.min(MINUTE_WINDOW));
        }

        state.minute_window.push_back(now);
        state.day_window.push_back(now);
        state.month_count += 1;
        self.persist(&state);

        QuotaDecision::Granted
    }

    /// Current usage counters (prunes stale window entries first)
    pub fn snapshot(&self) -> QuotaSnapshot {
        let now = Instant::now();
        let mut state = self.state.lock();
        prune(&mut state.minute_window, now, MINUTE_WINDOW);
        prune(&mut state.day_window, now, DAY_WINDOW);

        QuotaSnapshot {
            minute_used: state.minute_window.len() as u32,
            day_used: state.day_window.len() as u32,
            month_used: state.month_count,
            limits: self.limits.clone(),
        }
    }

    fn persist(&self, state: &QuotaState) {
        let Some(path) = &self.store_path else {
            return;
        };
        let file = QuotaFile {
            month_start: state.month_start.clone(),
            monthly_count: state.month_count,
        };
        match serde_json::to_string_pretty(&file) {
            Ok(content) => {
                if let Err(e) = fs::write(path, content) {
                    log::warn!("Failed to persist quota state: {}", e);
                }
            }
            Err(e) => log::warn!("Failed to serialize quota state: {}", e),
        }
    }
}

/// Drop every timestamp older than its window
fn prune(window: &mut VecDeque<Instant>, now: Instant, length: Duration) {
    while let Some(front) = window.front() {
        if now.duration_since(*front) >= length {
            window.pop_front();
        } else {
            break;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
