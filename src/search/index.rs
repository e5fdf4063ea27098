//! Match index: one pre-normalized row per catalog phrasing

use std::sync::Arc;

use crate::catalog::{Catalog, CatalogEntry};

use super::normalize;

/// One searchable phrasing of a catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    /// Phrase as written in the catalog
    pub original: String,
    /// Phrase after [`normalize`]
    pub normalized: String,
    pub answer: Arc<str>,
    pub category: Arc<str>,
}

/// Immutable list of rows in catalog order (canonical question first, then
/// variants, entry by entry)
#[derive(Debug, Clone, Default)]
pub struct MatchIndex {
    rows: Vec<IndexRow>,
}

impl MatchIndex {
    pub fn build(entries: &[CatalogEntry]) -> Self {
        let mut rows = Vec::with_capacity(entries.iter().map(|e| 1 + e.variants.len()).sum());

        for entry in entries {
            let answer: Arc<str> = Arc::from(entry.answer.as_str());
            let category: Arc<str> = Arc::from(entry.category.as_str());

            for phrase in entry.phrases() {
                rows.push(IndexRow {
                    original: phrase.to_string(),
                    normalized: normalize(phrase),
                    answer: Arc::clone(&answer),
                    category: Arc::clone(&category),
                });
            }
        }

        let index = Self { rows };
        tracing::info!(
            "Built match index: {} rows from {} entries in {} categories",
            index.size(),
            entries.len(),
            index.categories().len()
        );

        index
    }

    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self::build(catalog.entries())
    }

    pub fn rows(&self) -> &[IndexRow] {
        &self.rows
    }

    pub fn get(&self, position: usize) -> Option<&IndexRow> {
        self.rows.get(position)
    }

    /// Total row count: sum of (1 + variants) over all entries
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct categories in first-seen order
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !seen.contains(&&*row.category) {
                seen.push(&row.category);
            }
        }
        seen
    }
}
