//! JSON-file usage recorder with batched, atomic saves

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use parking_lot::Mutex;

use super::{AnalyticsLog, FeedbackRecord, QueryRecord, SessionRecord, SummaryStats};
use crate::chatbot::Response;
use crate::config::AnalyticsConfig;
use crate::error::{HrBotError, Result};

struct RecorderState {
    log: AnalyticsLog,
    unsaved_changes: usize,
    last_save: Instant,
}

/// Records queries and feedback to a JSON file.
///
/// Writes are batched: a save happens after `save_batch_size` changes, after
/// `save_interval_secs`, on feedback, on [`UsageRecorder::flush`] and on drop.
pub struct UsageRecorder {
    path: PathBuf,
    config: AnalyticsConfig,
    state: Mutex<RecorderState>,
}

impl UsageRecorder {
    /// Open a recorder, loading any existing log.
    ///
    /// A missing file starts an empty log; a malformed one is an error.
    pub fn open(path: impl Into<PathBuf>, config: AnalyticsConfig) -> Result<Self> {
        config.validate()?;
        let path = path.into();
        let log = load_log(&path)?;

        tracing::info!(
            "Opened analytics log {} ({} queries, {} feedback)",
            path.display(),
            log.queries.len(),
            log.feedback.len()
        );

        Ok(Self::with_log(path, config, log))
    }

    /// Like [`UsageRecorder::open`], but starts empty when the file is malformed
    pub fn open_or_default(path: impl Into<PathBuf>, config: AnalyticsConfig) -> Result<Self> {
        config.validate()?;
        let path = path.into();
        let log = match load_log(&path) {
            Ok(log) => log,
            Err(e @ HrBotError::Parse { .. }) => {
                tracing::warn!("{}. Starting with an empty analytics log.", e);
                AnalyticsLog::default()
            }
            Err(e) => return Err(e),
        };
        Ok(Self::with_log(path, config, log))
    }

    fn with_log(path: PathBuf, config: AnalyticsConfig, log: AnalyticsLog) -> Self {
        Self {
            path,
            config,
            state: Mutex::new(RecorderState {
                log,
                unsaved_changes: 0,
                last_save: Instant::now(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Number of changes not yet written to disk
    pub fn unsaved_changes(&self) -> usize {
        self.state.lock().unsaved_changes
    }

    /// Copy of the in-memory log
    pub fn snapshot(&self) -> AnalyticsLog {
        self.state.lock().log.clone()
    }

    /// Record one classified query.
    ///
    /// Returns `Ok(false)` without recording when the session id or input is
    /// blank.
    pub fn log_query(&self, session_id: &str, user_input: &str, response: &Response) -> Result<bool> {
        let user_input = user_input.trim();
        if session_id.trim().is_empty() || user_input.is_empty() {
            return Ok(false);
        }

        let now = Local::now();
        let record = QueryRecord {
            timestamp: now,
            session_id: session_id.to_string(),
            user_input: user_input
                .chars()
                .take(self.config.max_user_input_length)
                .collect(),
            category: response.category().map(String::from),
            confidence: super::round2(response.confidence()),
            is_fallback: response.is_fallback(),
        };

        let mut state = self.state.lock();
        state.log.queries.push(record);

        let existing = state
            .log
            .sessions
            .iter()
            .position(|s| s.session_id == session_id);

        match existing {
            Some(i) => {
                let session = &mut state.log.sessions[i];
                session.query_count += 1;
                session.last_activity = now;
            }
            None => state.log.sessions.push(SessionRecord {
                session_id: session_id.to_string(),
                start_time: now,
                query_count: 1,
                last_activity: now,
                rated: false,
                rating: None,
            }),
        }

        state.unsaved_changes += 1;
        self.save_locked(&mut state, false)?;
        Ok(true)
    }

    /// Record a rating; always saved immediately
    pub fn log_feedback(&self, session_id: &str, rating: u8, comment: Option<&str>) -> Result<()> {
        if !(self.config.min_rating..=self.config.max_rating).contains(&rating) {
            return Err(HrBotError::InvalidInput(format!(
                "rating {} must be between {} and {}",
                rating, self.config.min_rating, self.config.max_rating
            )));
        }

        let comment = comment
            .map(|c| {
                c.trim()
                    .chars()
                    .take(self.config.max_comment_length)
                    .collect::<String>()
            })
            .filter(|c| !c.is_empty());

        let mut state = self.state.lock();
        state.log.feedback.push(FeedbackRecord {
            timestamp: Local::now(),
            session_id: session_id.to_string(),
            rating,
            comment,
        });

        if let Some(session) = state.log.session_mut(session_id) {
            session.rated = true;
            session.rating = Some(rating);
        }

        state.unsaved_changes += 1;
        self.save_locked(&mut state, true)
    }

    /// Write pending changes now
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.save_locked(&mut state, true)
    }

    /// Dashboard summary over the last `days` days
    pub fn summary(&self, days: Option<u32>) -> SummaryStats {
        let days = days.unwrap_or(self.config.default_days);
        self.state.lock().log.summary(Local::now(), days)
    }

    fn save_locked(&self, state: &mut RecorderState, force: bool) -> Result<()> {
        let due = state.unsaved_changes >= self.config.save_batch_size
            || state.last_save.elapsed().as_secs() >= self.config.save_interval_secs;

        if !(force || due) {
            return Ok(());
        }

        state.log.apply_retention(
            self.config.max_queries_retained,
            self.config.max_feedback_retained,
            self.config.max_sessions_retained,
        );
        write_atomic(&self.path, &state.log)?;

        tracing::debug!(
            "Saved analytics log ({} pending changes) to {}",
            state.unsaved_changes,
            self.path.display()
        );
        state.unsaved_changes = 0;
        state.last_save = Instant::now();
        Ok(())
    }
}

impl Drop for UsageRecorder {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.unsaved_changes == 0 {
            return;
        }
        state.log.apply_retention(
            self.config.max_queries_retained,
            self.config.max_feedback_retained,
            self.config.max_sessions_retained,
        );
        if let Err(e) = write_atomic(&self.path, &state.log) {
            tracing::error!("Failed to save analytics log on shutdown: {}", e);
        }
    }
}

fn load_log(path: &Path) -> Result<AnalyticsLog> {
    if !path.exists() {
        return Ok(AnalyticsLog::default());
    }

    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| HrBotError::Parse {
        source_name: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Write to `<file>.tmp`, then rename over the target
fn write_atomic(path: &Path, log: &AnalyticsLog) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let result = serde_json::to_vec_pretty(log)
        .map_err(HrBotError::from)
        .and_then(|bytes| std::fs::write(&tmp, bytes).map_err(HrBotError::from))
        .and_then(|_| std::fs::rename(&tmp, path).map_err(HrBotError::from));

    if result.is_err() && tmp.exists() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::Suggestion;
    use tempfile::TempDir;

    fn matched() -> Response {
        Response::Matched {
            answer: "12 hari".into(),
            confidence: 81.234,
            category: "cuti".into(),
        }
    }

    fn fallback() -> Response {
        Response::Fallback {
            answer: "Maaf".into(),
            confidence: 20.0,
            suggestions: vec![Suggestion {
                question: "cuti".into(),
                score: 45.0,
            }],
        }
    }

    fn recorder(dir: &TempDir, config: AnalyticsConfig) -> UsageRecorder {
        UsageRecorder::open(dir.path().join("analytics.json"), config).unwrap()
    }

    #[test]
    fn test_log_query_records_response_fields() {
        let dir = TempDir::new().unwrap();
        let rec = recorder(&dir, AnalyticsConfig::default());

        assert!(rec.log_query("s1", "  cuti tahunan?  ", &matched()).unwrap());
        assert!(rec.log_query("s1", "xyz", &fallback()).unwrap());

        let log = rec.snapshot();
        assert_eq!(log.queries.len(), 2);
        assert_eq!(log.queries[0].user_input, "cuti tahunan?");
        assert_eq!(log.queries[0].category.as_deref(), Some("cuti"));
        assert_eq!(log.queries[0].confidence, 81.23);
        assert!(log.queries[1].is_fallback);
        assert_eq!(log.queries[1].category, None);
        assert_eq!(log.session("s1").unwrap().query_count, 2);
    }

    #[test]
    fn test_blank_inputs_ignored() {
        let dir = TempDir::new().unwrap();
        let rec = recorder(&dir, AnalyticsConfig::default());
        assert!(!rec.log_query("", "cuti", &matched()).unwrap());
        assert!(!rec.log_query("s1", "   ", &matched()).unwrap());
        assert!(rec.snapshot().queries.is_empty());
    }

    #[test]
    fn test_input_truncated() {
        let dir = TempDir::new().unwrap();
        let config = AnalyticsConfig {
            max_user_input_length: 5,
            ..AnalyticsConfig::default()
        };
        let rec = recorder(&dir, config);
        rec.log_query("s1", "abcdefghij", &matched()).unwrap();
        assert_eq!(rec.snapshot().queries[0].user_input, "abcde");
    }

    #[test]
    fn test_batched_saves() {
        let dir = TempDir::new().unwrap();
        let config = AnalyticsConfig {
            save_batch_size: 3,
            save_interval_secs: 3600,
            ..AnalyticsConfig::default()
        };
        let rec = recorder(&dir, config);

        rec.log_query("s1", "satu", &matched()).unwrap();
        rec.log_query("s1", "dua", &matched()).unwrap();
        assert!(!rec.path().exists());
        assert_eq!(rec.unsaved_changes(), 2);

        rec.log_query("s1", "tiga", &matched()).unwrap();
        assert!(rec.path().exists());
        assert_eq!(rec.unsaved_changes(), 0);
    }

    #[test]
    fn test_feedback_forces_save_and_marks_session() {
        let dir = TempDir::new().unwrap();
        let config = AnalyticsConfig {
            save_interval_secs: 3600,
            ..AnalyticsConfig::default()
        };
        let rec = recorder(&dir, config);
        rec.log_query("s1", "cuti", &matched()).unwrap();
        rec.log_feedback("s1", 4, Some("  membantu  ")).unwrap();

        assert!(rec.path().exists());
        let log = rec.snapshot();
        assert_eq!(log.feedback[0].comment.as_deref(), Some("membantu"));
        let session = log.session("s1").unwrap();
        assert!(session.rated);
        assert_eq!(session.rating, Some(4));
    }

    #[test]
    fn test_invalid_rating_rejected() {
        let dir = TempDir::new().unwrap();
        let rec = recorder(&dir, AnalyticsConfig::default());
        assert!(matches!(
            rec.log_feedback("s1", 0, None),
            Err(HrBotError::InvalidInput(_))
        ));
        assert!(rec.log_feedback("s1", 6, None).is_err());
        assert!(rec.snapshot().feedback.is_empty());
    }

    #[test]
    fn test_blank_comment_becomes_none() {
        let dir = TempDir::new().unwrap();
        let rec = recorder(&dir, AnalyticsConfig::default());
        rec.log_feedback("s1", 5, Some("   ")).unwrap();
        assert_eq!(rec.snapshot().feedback[0].comment, None);
    }

    #[test]
    fn test_reload_after_flush() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("analytics.json");
        {
            let rec = UsageRecorder::open(&path, AnalyticsConfig::default()).unwrap();
            rec.log_query("s1", "cuti", &matched()).unwrap();
            rec.flush().unwrap();
        }
        let rec = UsageRecorder::open(&path, AnalyticsConfig::default()).unwrap();
        assert_eq!(rec.snapshot().queries.len(), 1);
        assert!(!dir.path().join("analytics.json.tmp").exists());
    }

    #[test]
    fn test_drop_flushes_pending_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("analytics.json");
        {
            let rec = UsageRecorder::open(&path, AnalyticsConfig::default()).unwrap();
            rec.log_query("s1", "cuti", &matched()).unwrap();
            assert!(!path.exists());
        }
        assert!(path.exists());
    }

    #[test]
    fn test_retention_caps_applied_on_save() {
        let dir = TempDir::new().unwrap();
        let config = AnalyticsConfig {
            max_queries_retained: 2,
            max_sessions_retained: 1,
            ..AnalyticsConfig::default()
        };
        let rec = recorder(&dir, config);
        rec.log_query("s1", "satu", &matched()).unwrap();
        rec.log_query("s2", "dua", &matched()).unwrap();
        rec.log_query("s3", "tiga", &matched()).unwrap();
        rec.flush().unwrap();

        let log = rec.snapshot();
        let inputs: Vec<&str> = log.queries.iter().map(|q| q.user_input.as_str()).collect();
        assert_eq!(inputs, vec!["dua", "tiga"]);
        assert_eq!(log.sessions.len(), 1);
        assert_eq!(log.sessions[0].session_id, "s3");
    }

    #[test]
    fn test_retention_caps_applied_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("analytics.json");
        let config = AnalyticsConfig {
            max_queries_retained: 2,
            max_sessions_retained: 1,
            save_interval_secs: 3600,
            ..AnalyticsConfig::default()
        };
        {
            let rec = UsageRecorder::open(&path, config).unwrap();
            rec.log_query("s1", "satu", &matched()).unwrap();
            rec.log_query("s2", "dua", &matched()).unwrap();
            rec.log_query("s3", "tiga", &matched()).unwrap();
            assert!(!path.exists());
        }

        let log = UsageRecorder::open(&path, AnalyticsConfig::default())
            .unwrap()
            .snapshot();
        let inputs: Vec<&str> = log.queries.iter().map(|q| q.user_input.as_str()).collect();
        assert_eq!(inputs, vec!["dua", "tiga"]);
        assert_eq!(log.sessions.len(), 1);
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("analytics.json");
        std::fs::write(&path, "{\"queries\": 5}").unwrap();

        let result = UsageRecorder::open(&path, AnalyticsConfig::default());
        assert!(matches!(result, Err(HrBotError::Parse { .. })));

        let rec = UsageRecorder::open_or_default(&path, AnalyticsConfig::default()).unwrap();
        assert!(rec.snapshot().queries.is_empty());
    }

    #[test]
    fn test_summary_counts_recent_activity() {
        let dir = TempDir::new().unwrap();
        let rec = recorder(&dir, AnalyticsConfig::default());
        rec.log_query("s1", "cuti", &matched()).unwrap();
        rec.log_query("s2", "xyz", &fallback()).unwrap();

        let summary = rec.summary(None);
        assert_eq!(summary.total_queries, 2);
        assert_eq!(summary.total_sessions, 2);
        assert_eq!(summary.fallback_rate, 50.0);
    }
}
