//! Configuration for the chatbot and its collaborators
//!
//! Every field has a default, so a config file only needs the values it
//! overrides. Invalid values are rejected by [`ChatbotConfig::validate`]
//! before an engine is built.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HrBotError, Result};

/// Tolerance used when checking that metric weights sum to 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Longest statistics window, in days
pub const MAX_WINDOW_DAYS: u32 = 3_650;

/// Longest inactivity timeout before the rating prompt, in minutes
pub const MAX_INACTIVITY_TIMEOUT_MINUTES: i64 = 24 * 60;

/// Weights for combining the four similarity metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricWeights {
    /// Full-string edit similarity
    pub exact: f64,
    /// Best-window substring similarity
    pub substring: f64,
    /// Word-order-insensitive similarity
    pub reordered: f64,
    /// Shared-token similarity
    pub token_overlap: f64,
}

impl MetricWeights {
    pub fn sum(&self) -> f64 {
        self.exact + self.substring + self.reordered + self.token_overlap
    }

    pub fn validate(&self) -> Result<()> {
        let all = [self.exact, self.substring, self.reordered, self.token_overlap];
        if all.iter().any(|w| !w.is_finite() || !(0.0..=1.0).contains(w)) {
            return Err(HrBotError::Config(format!(
                "metric weights must be within [0, 1], got {:?}",
                self
            )));
        }
        if (self.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(HrBotError::Config(format!(
                "metric weights must sum to 1.0, got {}",
                self.sum()
            )));
        }
        Ok(())
    }
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            exact: 0.15,
            substring: 0.25,
            reordered: 0.25,
            token_overlap: 0.35,
        }
    }
}

/// Settings for the matching engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum confidence (0-100) to accept a match
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub weights: MetricWeights,
}

fn default_threshold() -> f64 {
    65.0
}

impl MatchingConfig {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || !(0.0..=100.0).contains(&self.threshold) {
            return Err(HrBotError::Config(format!(
                "threshold must be within [0, 100], got {}",
                self.threshold
            )));
        }
        self.weights.validate()
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            weights: MetricWeights::default(),
        }
    }
}

/// Settings for fallback responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Maximum number of suggestions attached to a fallback
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    /// Minimum score for a catalog phrase to be suggested
    #[serde(default = "default_suggestion_min_score")]
    pub suggestion_min_score: f64,
    /// Human-escalation contact shown in the fallback message
    #[serde(default = "default_hotline")]
    pub hr_hotline: String,
    /// Topics listed in the fallback message
    #[serde(default = "default_topics")]
    pub fallback_topics: Vec<String>,
}

fn default_max_suggestions() -> usize {
    3
}

fn default_suggestion_min_score() -> f64 {
    40.0
}

fn default_hotline() -> String {
    "0812-1234-5678".to_string()
}

fn default_topics() -> Vec<String> {
    ["cuti", "gaji", "benefit", "lembur", "kebijakan kantor"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl ResponseConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.suggestion_min_score.is_finite()
            || !(0.0..=100.0).contains(&self.suggestion_min_score)
        {
            return Err(HrBotError::Config(format!(
                "suggestion_min_score must be within [0, 100], got {}",
                self.suggestion_min_score
            )));
        }
        if self.hr_hotline.trim().is_empty() {
            return Err(HrBotError::Config("hr_hotline must not be empty".into()));
        }
        Ok(())
    }
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            max_suggestions: default_max_suggestions(),
            suggestion_min_score: default_suggestion_min_score(),
            hr_hotline: default_hotline(),
            fallback_topics: default_topics(),
        }
    }
}

/// Settings for the usage recorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Path of the JSON analytics log (`~` is expanded)
    #[serde(default = "default_analytics_file")]
    pub data_file: String,
    #[serde(default = "default_max_queries")]
    pub max_queries_retained: usize,
    #[serde(default = "default_max_feedback")]
    pub max_feedback_retained: usize,
    #[serde(default = "default_max_sessions")]
    pub max_sessions_retained: usize,
    /// Save after this many unsaved changes
    #[serde(default = "default_save_batch_size")]
    pub save_batch_size: usize,
    /// Save when this many seconds passed since the last save
    #[serde(default = "default_save_interval")]
    pub save_interval_secs: u64,
    /// Default window for dashboard statistics
    #[serde(default = "default_analytics_days")]
    pub default_days: u32,
    /// Inputs longer than this are truncated before logging
    #[serde(default = "default_max_input_length")]
    pub max_user_input_length: usize,
    #[serde(default = "default_max_comment_length")]
    pub max_comment_length: usize,
    #[serde(default = "default_min_rating")]
    pub min_rating: u8,
    #[serde(default = "default_max_rating")]
    pub max_rating: u8,
}

fn default_analytics_file() -> String {
    "~/.local/share/hrbot/analytics.json".to_string()
}

fn default_max_queries() -> usize {
    10_000
}

fn default_max_feedback() -> usize {
    5_000
}

fn default_max_sessions() -> usize {
    1_000
}

fn default_save_batch_size() -> usize {
    10
}

fn default_save_interval() -> u64 {
    60
}

fn default_analytics_days() -> u32 {
    7
}

fn default_max_input_length() -> usize {
    500
}

fn default_max_comment_length() -> usize {
    1_000
}

fn default_min_rating() -> u8 {
    1
}

fn default_max_rating() -> u8 {
    5
}

impl AnalyticsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_rating > self.max_rating {
            return Err(HrBotError::Config(format!(
                "min_rating ({}) exceeds max_rating ({})",
                self.min_rating, self.max_rating
            )));
        }
        if self.save_batch_size == 0 {
            return Err(HrBotError::Config("save_batch_size must be > 0".into()));
        }
        if self.default_days == 0 || self.default_days > MAX_WINDOW_DAYS {
            return Err(HrBotError::Config(format!(
                "default_days must be within [1, {}], got {}",
                MAX_WINDOW_DAYS, self.default_days
            )));
        }
        Ok(())
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            data_file: default_analytics_file(),
            max_queries_retained: default_max_queries(),
            max_feedback_retained: default_max_feedback(),
            max_sessions_retained: default_max_sessions(),
            save_batch_size: default_save_batch_size(),
            save_interval_secs: default_save_interval(),
            default_days: default_analytics_days(),
            max_user_input_length: default_max_input_length(),
            max_comment_length: default_max_comment_length(),
            min_rating: default_min_rating(),
            max_rating: default_max_rating(),
        }
    }
}

/// Settings for interactive chat sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Minutes of inactivity before the rating prompt appears
    #[serde(default = "default_inactivity_minutes")]
    pub inactivity_timeout_minutes: i64,
    /// Messages kept in memory per session
    #[serde(default = "default_max_history")]
    pub max_chat_history: usize,
    /// Per-query classification deadline in milliseconds
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    /// Shortcuts shown at the start of a chat
    #[serde(default = "default_quick_questions")]
    pub quick_questions: Vec<String>,
}

fn default_inactivity_minutes() -> i64 {
    3
}

fn default_max_history() -> usize {
    100
}

fn default_query_timeout_ms() -> u64 {
    2_000
}

fn default_quick_questions() -> Vec<String> {
    [
        "cuti tahunan berapa?",
        "gimana cara ngajuin cuti ya",
        "gaji turun tanggal brp",
        "ada shuttle bus ga",
        "halo",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_INACTIVITY_TIMEOUT_MINUTES).contains(&self.inactivity_timeout_minutes) {
            return Err(HrBotError::Config(format!(
                "inactivity_timeout_minutes must be within [1, {}], got {}",
                MAX_INACTIVITY_TIMEOUT_MINUTES, self.inactivity_timeout_minutes
            )));
        }
        if self.max_chat_history == 0 {
            return Err(HrBotError::Config("max_chat_history must be > 0".into()));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_minutes: default_inactivity_minutes(),
            max_chat_history: default_max_history(),
            query_timeout_ms: default_query_timeout_ms(),
            quick_questions: default_quick_questions(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatbotConfig {
    /// Optional catalog JSON path; the built-in catalog is used when unset
    #[serde(default)]
    pub catalog_path: Option<String>,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub response: ResponseConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl ChatbotConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ChatbotConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&contents)?;
        tracing::info!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| HrBotError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.matching.validate()?;
        self.response.validate()?;
        self.analytics.validate()?;
        self.session.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = MetricWeights::default();
        assert_eq!(weights.sum(), 1.0);
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let weights = MetricWeights {
            exact: 0.5,
            substring: 0.5,
            reordered: 0.5,
            token_overlap: 0.5,
        };
        assert!(matches!(weights.validate(), Err(HrBotError::Config(_))));

        let negative = MetricWeights {
            exact: -0.25,
            substring: 0.5,
            reordered: 0.5,
            token_overlap: 0.25,
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_threshold_range() {
        assert!(MatchingConfig::with_threshold(0.0).validate().is_ok());
        assert!(MatchingConfig::with_threshold(100.0).validate().is_ok());
        assert!(MatchingConfig::with_threshold(100.5).validate().is_err());
        assert!(MatchingConfig::with_threshold(-1.0).validate().is_err());
        assert!(MatchingConfig::with_threshold(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ChatbotConfig::from_toml_str(
            r#"
            [matching]
            threshold = 70.0

            [response]
            hr_hotline = "021-555-0100"
            "#,
        )
        .unwrap();

        assert_eq!(config.matching.threshold, 70.0);
        assert_eq!(config.matching.weights, MetricWeights::default());
        assert_eq!(config.response.hr_hotline, "021-555-0100");
        assert_eq!(config.response.max_suggestions, 3);
        assert_eq!(config.analytics.save_batch_size, 10);
        assert_eq!(config.session.inactivity_timeout_minutes, 3);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ChatbotConfig::default();
        let text = config.to_toml_string().unwrap();
        let parsed = ChatbotConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_toml_values_rejected() {
        let result = ChatbotConfig::from_toml_str(
            r#"
            [matching.weights]
            exact = 0.4
            substring = 0.4
            reordered = 0.4
            token_overlap = 0.4
            "#,
        );
        assert!(matches!(result, Err(HrBotError::Config(_))));

        let result = ChatbotConfig::from_toml_str("[matching]\nthreshold = \"high\"");
        assert!(matches!(result, Err(HrBotError::ConfigParse(_))));
    }

    #[test]
    fn test_unbounded_windows_rejected() {
        let result = ChatbotConfig::from_toml_str("[analytics]\ndefault_days = 200000000");
        assert!(matches!(result, Err(HrBotError::Config(_))));

        let result = ChatbotConfig::from_toml_str("[analytics]\ndefault_days = 3650");
        assert!(result.is_ok());

        let result =
            ChatbotConfig::from_toml_str("[session]\ninactivity_timeout_minutes = 9223372036854775807");
        assert!(matches!(result, Err(HrBotError::Config(_))));

        let result = ChatbotConfig::from_toml_str("[session]\ninactivity_timeout_minutes = 0");
        assert!(matches!(result, Err(HrBotError::Config(_))));
    }
}
