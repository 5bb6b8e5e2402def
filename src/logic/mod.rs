//! Logic Module - Scanning Engines
//!
//! Contains the engines behind the caller-facing scan API:
//! - `threat/` - trust lists, URL heuristics, the tiered classifier
//! - `reputation/` - quota tracking + external reputation client
//! - `ai_judge` - last-resort AI verdict over a chat-completion endpoint

pub mod ai_judge;
pub mod reputation;
pub mod threat;
