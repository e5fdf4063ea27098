//! Usage analytics for the chatbot
//!
//! Implements:
//! - Query, feedback and session records
//! - A JSON-file recorder with batched, atomic saves
//! - Dashboard statistics over a time window
//!
//! The recorder only consumes [`crate::chatbot::Response`] values; nothing
//! here feeds back into matching.

mod recorder;
mod stats;

pub use recorder::*;
pub use stats::*;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One classified user query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub timestamp: DateTime<Local>,
    pub session_id: String,
    pub user_input: String,
    pub category: Option<String>,
    pub confidence: f64,
    pub is_fallback: bool,
}

/// One rating left by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub timestamp: DateTime<Local>,
    pub session_id: String,
    pub rating: u8,
    pub comment: Option<String>,
}

/// Per-session counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub start_time: DateTime<Local>,
    pub query_count: u64,
    pub last_activity: DateTime<Local>,
    #[serde(default)]
    pub rated: bool,
    #[serde(default)]
    pub rating: Option<u8>,
}

/// Everything the recorder persists, oldest records first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsLog {
    #[serde(default)]
    pub queries: Vec<QueryRecord>,
    #[serde(default)]
    pub feedback: Vec<FeedbackRecord>,
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
}

impl AnalyticsLog {
    pub fn session(&self, session_id: &str) -> Option<&SessionRecord> {
        self.sessions.iter().find(|s| s.session_id == session_id)
    }

    fn session_mut(&mut self, session_id: &str) -> Option<&mut SessionRecord> {
        self.sessions.iter_mut().find(|s| s.session_id == session_id)
    }

    /// Drop the oldest records beyond the given caps
    pub fn apply_retention(&mut self, max_queries: usize, max_feedback: usize, max_sessions: usize) {
        fn keep_last<T>(items: &mut Vec<T>, max: usize) {
            if items.len() > max {
                items.drain(..items.len() - max);
            }
        }
        keep_last(&mut self.queries, max_queries);
        keep_last(&mut self.feedback, max_feedback);
        keep_last(&mut self.sessions, max_sessions);
    }
}

/// Round to two decimals for reporting
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
