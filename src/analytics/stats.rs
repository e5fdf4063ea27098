//! Dashboard statistics over the analytics log
//!
//! Every statistic covers records strictly newer than `now - days`. A window
//! reaching past the earliest representable time covers everything.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Local, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

use super::{round2, AnalyticsLog, FeedbackRecord, QueryRecord};
use crate::config::MAX_WINDOW_DAYS;

/// Category label used for fallback queries
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Comments returned in [`FeedbackStats::recent_comments`] come from this many
/// latest feedback entries
const RECENT_FEEDBACK_WINDOW: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCount {
    pub query: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub total: usize,
    pub categories: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub average_rating: f64,
    pub total_feedback: usize,
    pub rating_distribution: BTreeMap<u8, usize>,
    pub recent_comments: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_queries: usize,
    pub total_sessions: usize,
    pub fallback_rate: f64,
    pub avg_confidence: f64,
    pub feedback_stats: FeedbackStats,
    pub top_categories: BTreeMap<String, usize>,
}

/// Window start test; a window reaching past chrono's range has no lower bound
#[derive(Clone, Copy)]
struct Cutoff(Option<DateTime<Local>>);

impl Cutoff {
    fn new(now: DateTime<Local>, days: u32) -> Self {
        Self(now.checked_sub_signed(Duration::days(i64::from(days))))
    }

    fn admits(self, timestamp: DateTime<Local>) -> bool {
        self.0.map_or(true, |cutoff| timestamp > cutoff)
    }
}

impl AnalyticsLog {
    fn recent_queries(&self, now: DateTime<Local>, days: u32) -> impl Iterator<Item = &QueryRecord> {
        let cutoff = Cutoff::new(now, days);
        self.queries.iter().filter(move |q| cutoff.admits(q.timestamp))
    }

    fn recent_feedback(&self, now: DateTime<Local>, days: u32) -> Vec<&FeedbackRecord> {
        let cutoff = Cutoff::new(now, days);
        self.feedback.iter().filter(|f| cutoff.admits(f.timestamp)).collect()
    }

    /// Most frequent (lowercased) inputs; ties keep first-seen order
    pub fn top_queries(&self, now: DateTime<Local>, n: usize, days: u32) -> Vec<QueryCount> {
        let mut order: Vec<QueryCount> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for q in self.recent_queries(now, days) {
            let key = q.user_input.to_lowercase();
            match positions.get(&key) {
                Some(&i) => order[i].count += 1,
                None => {
                    positions.insert(key.clone(), order.len());
                    order.push(QueryCount { query: key, count: 1 });
                }
            }
        }

        order.sort_by(|a, b| b.count.cmp(&a.count));
        order.truncate(n);
        order
    }

    /// Query count per category; fallbacks count as [`UNKNOWN_CATEGORY`]
    pub fn category_distribution(&self, now: DateTime<Local>, days: u32) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for q in self.recent_queries(now, days) {
            let category = q.category.as_deref().unwrap_or(UNKNOWN_CATEGORY);
            *counts.entry(category.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// One row per calendar day, oldest first, including empty days.
    ///
    /// At most [`MAX_WINDOW_DAYS`] rows are produced.
    pub fn daily_trends(&self, now: DateTime<Local>, days: u32) -> Vec<DailyTrend> {
        let days = days.min(MAX_WINDOW_DAYS);
        let mut by_date: BTreeMap<NaiveDate, DailyTrend> = BTreeMap::new();

        for q in self.recent_queries(now, days) {
            let date = q.timestamp.date_naive();
            let trend = by_date.entry(date).or_insert_with(|| DailyTrend {
                date,
                total: 0,
                categories: BTreeMap::new(),
            });
            trend.total += 1;
            let category = q.category.as_deref().unwrap_or(UNKNOWN_CATEGORY);
            *trend.categories.entry(category.to_string()).or_insert(0) += 1;
        }

        (0..days)
            .filter_map(|i| now.checked_sub_signed(Duration::days(i64::from(days - 1 - i))))
            .map(|day| {
                let date = day.date_naive();
                by_date.remove(&date).unwrap_or(DailyTrend {
                    date,
                    total: 0,
                    categories: BTreeMap::new(),
                })
            })
            .collect()
    }

    /// Query count per hour of day (0-23)
    pub fn hourly_distribution(&self, now: DateTime<Local>, days: u32) -> BTreeMap<u32, usize> {
        let mut counts = BTreeMap::new();
        for q in self.recent_queries(now, days) {
            *counts.entry(q.timestamp.hour()).or_insert(0) += 1;
        }
        counts
    }

    pub fn feedback_stats(&self, now: DateTime<Local>, days: u32) -> FeedbackStats {
        let recent = self.recent_feedback(now, days);
        if recent.is_empty() {
            return FeedbackStats::default();
        }

        let total: u64 = recent.iter().map(|f| u64::from(f.rating)).sum();
        let mut distribution = BTreeMap::new();
        for f in &recent {
            *distribution.entry(f.rating).or_insert(0) += 1;
        }

        let recent_comments = recent
            .iter()
            .skip(recent.len().saturating_sub(RECENT_FEEDBACK_WINDOW))
            .filter_map(|f| f.comment.clone())
            .filter(|c| !c.is_empty())
            .collect();

        FeedbackStats {
            average_rating: round2(total as f64 / recent.len() as f64),
            total_feedback: recent.len(),
            rating_distribution: distribution,
            recent_comments,
        }
    }

    /// Percentage of queries answered with a fallback
    pub fn fallback_rate(&self, now: DateTime<Local>, days: u32) -> f64 {
        let (total, fallbacks) = self
            .recent_queries(now, days)
            .fold((0usize, 0usize), |(total, fallbacks), q| {
                (total + 1, fallbacks + usize::from(q.is_fallback))
            });

        if total == 0 {
            return 0.0;
        }
        round2(fallbacks as f64 / total as f64 * 100.0)
    }

    pub fn confidence_stats(&self, now: DateTime<Local>, days: u32) -> ConfidenceStats {
        let confidences: Vec<f64> = self.recent_queries(now, days).map(|q| q.confidence).collect();
        if confidences.is_empty() {
            return ConfidenceStats::default();
        }

        let sum: f64 = confidences.iter().sum();
        let min = confidences.iter().copied().fold(f64::INFINITY, f64::min);
        let max = confidences.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        ConfidenceStats {
            average: round2(sum / confidences.len() as f64),
            min: round2(min),
            max: round2(max),
        }
    }

    /// Everything the dashboard shows, in one call
    pub fn summary(&self, now: DateTime<Local>, days: u32) -> SummaryStats {
        let session_cutoff = Cutoff::new(now, days);

        SummaryStats {
            total_queries: self.recent_queries(now, days).count(),
            total_sessions: self
                .sessions
                .iter()
                .filter(|s| session_cutoff.admits(s.start_time))
                .count(),
            fallback_rate: self.fallback_rate(now, days),
            avg_confidence: self.confidence_stats(now, days).average,
            feedback_stats: self.feedback_stats(now, days),
            top_categories: self.category_distribution(now, days),
        }
    }
}
