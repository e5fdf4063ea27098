//! Interactive chat session state
//!
//! Holds what a chat front end needs between turns: a session id for the
//! usage log, a bounded message history and the inactivity clock that
//! decides when to ask for a rating. Matching itself stays stateless.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chatbot::{Response, Suggestion};
use crate::config::{SessionConfig, MAX_INACTIVITY_TIMEOUT_MINUTES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One line of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub confidence: Option<f64>,
    pub category: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    id: String,
    history: VecDeque<ChatMessage>,
    max_history: usize,
    inactivity_timeout: Duration,
    last_activity: DateTime<Local>,
    rated: bool,
    ended: bool,
}

impl ChatSession {
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), config)
    }

    pub fn with_id(id: impl Into<String>, config: &SessionConfig) -> Self {
        Self {
            id: id.into(),
            history: VecDeque::new(),
            max_history: config.max_chat_history.max(2),
            inactivity_timeout: Duration::minutes(
                config
                    .inactivity_timeout_minutes
                    .clamp(1, MAX_INACTIVITY_TIMEOUT_MINUTES),
            ),
            last_activity: Local::now(),
            rated: false,
            ended: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn history(&self) -> impl Iterator<Item = &ChatMessage> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Suggestions attached to the latest assistant message, if any
    pub fn last_suggestions(&self) -> &[Suggestion] {
        self.history
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.suggestions.as_slice())
            .unwrap_or(&[])
    }

    /// Record a user question and the response it got
    pub fn record_exchange(&mut self, user_input: &str, response: &Response, at: DateTime<Local>) {
        self.push(ChatMessage {
            role: Role::User,
            content: user_input.to_string(),
            confidence: None,
            category: None,
            suggestions: vec![],
        });
        self.push(ChatMessage {
            role: Role::Assistant,
            content: response.answer().to_string(),
            confidence: Some(response.confidence()),
            category: response.category().map(String::from),
            suggestions: response.suggestions().to_vec(),
        });
        self.last_activity = at;
    }

    fn push(&mut self, message: ChatMessage) {
        self.history.push_back(message);
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
    }

    pub fn mark_rated(&mut self) {
        self.rated = true;
    }

    pub fn is_rated(&self) -> bool {
        self.rated
    }

    pub fn end(&mut self) {
        self.ended = true;
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// True once the user has chatted, gone quiet past the timeout and not
    /// yet rated the session
    pub fn needs_rating_prompt(&self, now: DateTime<Local>) -> bool {
        !self.history.is_empty()
            && !self.rated
            && !self.ended
            && now - self.last_activity > self.inactivity_timeout
    }
}
