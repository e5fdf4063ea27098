//! Response composition on top of the matching engine
//!
//! [`Chatbot::classify`] is the single entry point callers use. It never
//! fails: unmatched or empty input becomes a [`Response::Fallback`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::Catalog;
use crate::config::{ChatbotConfig, ResponseConfig};
use crate::error::{HrBotError, Result};
use crate::search::{MatchIndex, MatchResult, MatchingEngine};

/// A suggested catalog phrase; the answer is intentionally withheld
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub question: String,
    pub score: f64,
}

/// Answer returned to the caller for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    Matched {
        answer: String,
        confidence: f64,
        category: String,
    },
    Fallback {
        /// Canned message with the human-escalation contact
        answer: String,
        /// Best (sub-threshold) score seen
        confidence: f64,
        suggestions: Vec<Suggestion>,
    },
}

impl Response {
    pub fn answer(&self) -> &str {
        match self {
            Response::Matched { answer, .. } | Response::Fallback { answer, .. } => answer,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            Response::Matched { confidence, .. } | Response::Fallback { confidence, .. } => {
                *confidence
            }
        }
    }

    /// Category of the matched entry; `None` for fallbacks
    pub fn category(&self) -> Option<&str> {
        match self {
            Response::Matched { category, .. } => Some(category),
            Response::Fallback { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Response::Fallback { .. })
    }

    /// Suggestions attached to a fallback; empty for matches
    pub fn suggestions(&self) -> &[Suggestion] {
        match self {
            Response::Matched { .. } => &[],
            Response::Fallback { suggestions, .. } => suggestions,
        }
    }
}

/// Fallback message shown when nothing clears the threshold
pub fn fallback_message(config: &ResponseConfig) -> String {
    let mut message = format!(
        "Maaf, saya belum bisa memahami pertanyaan Anda.\n\n\
         Silakan coba tanyakan dengan cara lain atau hubungi HR Hotline di {}.",
        config.hr_hotline
    );
    if !config.fallback_topics.is_empty() {
        message.push_str(&format!(
            "\n\nAnda juga bisa bertanya tentang: {}.",
            config.fallback_topics.join(", ")
        ));
    }
    message
}

/// HR FAQ assistant: matching engine plus fallback handling.
///
/// Immutable after construction and safe to share across threads.
#[derive(Debug, Clone)]
pub struct Chatbot {
    engine: MatchingEngine,
    response: ResponseConfig,
    fallback: String,
}

impl Chatbot {
    pub fn new(catalog: &Catalog, config: &ChatbotConfig) -> Result<Self> {
        config.matching.validate()?;
        config.response.validate()?;

        let index = MatchIndex::from_catalog(catalog);
        let engine = MatchingEngine::new(index, config.matching.clone())?;

        Ok(Self {
            engine,
            fallback: fallback_message(&config.response),
            response: config.response.clone(),
        })
    }

    /// Catalog-only constructor with default settings and a custom threshold
    pub fn with_threshold(catalog: &Catalog, threshold: f64) -> Result<Self> {
        let mut config = ChatbotConfig::default();
        config.matching.threshold = threshold;
        Self::new(catalog, &config)
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    pub fn fallback_message(&self) -> &str {
        &self.fallback
    }

    /// Answer a free-text question
    pub fn classify(&self, user_input: &str) -> Response {
        match self.engine.find_best_match(user_input) {
            MatchResult::Matched {
                answer,
                confidence,
                category,
            } => Response::Matched {
                answer,
                confidence,
                category,
            },
            MatchResult::NoMatch { confidence } => {
                let suggestions: Vec<Suggestion> = self
                    .engine
                    .find_top_matches(user_input, self.response.max_suggestions)
                    .into_iter()
                    .filter(|m| m.score >= self.response.suggestion_min_score)
                    .take(self.response.max_suggestions)
                    .map(|m| Suggestion {
                        question: m.question,
                        score: m.score,
                    })
                    .collect();

                debug!(
                    confidence,
                    suggestions = suggestions.len(),
                    "fallback response"
                );

                Response::Fallback {
                    answer: self.fallback.clone(),
                    confidence,
                    suggestions,
                }
            }
        }
    }

    /// Re-run an accepted suggestion through the matcher
    pub fn resolve_suggestion(&self, suggestion: &Suggestion) -> Response {
        self.classify(&suggestion.question)
    }

    /// Like [`Chatbot::classify`], but gives up after `timeout`.
    ///
    /// The whole classification runs on the blocking pool; on timeout the
    /// caller should show [`Chatbot::fallback_message`].
    pub async fn classify_with_timeout(
        self: Arc<Self>,
        user_input: String,
        timeout: Duration,
    ) -> Result<Response> {
        let task = tokio::task::spawn_blocking(move || self.classify(&user_input));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(HrBotError::Internal(format!("classification task failed: {}", e))),
            Err(_) => Err(HrBotError::Timeout(timeout.as_millis() as u64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;

    fn small_bot() -> Chatbot {
        let catalog = Catalog::new(vec![CatalogEntry::new(
            "cuti tahunan berapa hari",
            "12 hari",
            "cuti",
        )])
        .unwrap();
        Chatbot::with_threshold(&catalog, 65.0).unwrap()
    }

    #[test]
    fn test_matched_response() {
        let response = small_bot().classify("berapa hari cuti tahunan");
        assert!(!response.is_fallback());
        assert_eq!(response.answer(), "12 hari");
        assert_eq!(response.category(), Some("cuti"));
        assert!(response.confidence() >= 65.0);
        assert!(response.suggestions().is_empty());
    }

    #[test]
    fn test_nonsense_falls_back() {
        let bot = small_bot();
        let response = bot.classify("xyz123abc nonsense");
        assert!(response.is_fallback());
        assert_eq!(response.category(), None);
        assert!(!response.answer().is_empty());
        assert!(response.answer().contains("0812-1234-5678"));
        assert!(response.confidence() < 65.0);
        assert!(response.suggestions().iter().all(|s| s.score >= 40.0));
    }

    #[test]
    fn test_empty_input_falls_back_with_zero_confidence() {
        let response = small_bot().classify("");
        assert!(response.is_fallback());
        assert_eq!(response.confidence(), 0.0);
        assert!(response.suggestions().is_empty());
    }

    #[test]
    fn test_suggestions_capped_and_filtered() {
        let catalog = Catalog::builtin().unwrap();
        let mut config = ChatbotConfig::default();
        config.matching.threshold = 100.0;
        config.response.max_suggestions = 2;
        let bot = Chatbot::new(&catalog, &config).unwrap();

        let response = bot.classify("cuti melahirkan berapa lama ya");
        assert!(response.is_fallback());
        assert!(response.suggestions().len() <= 2);
        assert!(!response.suggestions().is_empty());
        assert!(response
            .suggestions()
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_resolve_suggestion() {
        let catalog = Catalog::builtin().unwrap();
        let bot = Chatbot::with_threshold(&catalog, 65.0).unwrap();
        let suggestion = Suggestion {
            question: "Berapa lama cuti melahirkan?".into(),
            score: 50.0,
        };
        let response = bot.resolve_suggestion(&suggestion);
        assert_eq!(response.category(), Some("cuti"));
        assert!(response.answer().contains("3 bulan"));
    }

    #[test]
    fn test_fallback_message_uses_config() {
        let config = ResponseConfig {
            hr_hotline: "021-555".into(),
            fallback_topics: vec![],
            ..ResponseConfig::default()
        };
        let message = fallback_message(&config);
        assert!(message.contains("021-555"));
        assert!(!message.contains("bertanya tentang"));
    }

    #[test]
    fn test_response_serialization() {
        let response = small_bot().classify("");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["kind"], "fallback");
        assert_eq!(json["confidence"], 0.0);
        assert!(json["suggestions"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let catalog = Catalog::builtin().unwrap();
        assert!(Chatbot::with_threshold(&catalog, -5.0).is_err());
    }

    #[tokio::test]
    async fn test_classify_with_timeout() {
        let bot = Arc::new(small_bot());
        let response = bot
            .classify_with_timeout("berapa hari cuti tahunan".into(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.answer(), "12 hari");
    }
}
