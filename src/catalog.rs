//! FAQ catalog: canonical questions, their variants and answers
//!
//! The catalog is static data loaded once at startup. A built-in Indonesian
//! HR catalog ships with the crate; deployments can point at their own JSON
//! file with the same shape:
//!
//! ```json
//! {"entries": [{"category": "cuti", "canonical_question": "...",
//!               "variants": ["..."], "answer": "..."}]}
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HrBotError, Result};
use crate::search::normalize;

const BUILTIN_CATALOG: &str = include_str!("../data/hr_catalog.json");

/// One knowledge unit: every phrasing resolves to the same answer and category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub category: String,
    pub canonical_question: String,
    #[serde(default)]
    pub variants: Vec<String>,
    pub answer: String,
}

impl CatalogEntry {
    pub fn new(
        canonical_question: impl Into<String>,
        answer: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            canonical_question: canonical_question.into(),
            variants: vec![],
            answer: answer.into(),
        }
    }

    /// Add alternate phrasings
    pub fn with_variants<I, S>(mut self, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variants.extend(variants.into_iter().map(Into::into));
        self
    }

    /// Canonical question followed by the variants, in order
    pub fn phrases(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical_question.as_str())
            .chain(self.variants.iter().map(String::as_str))
    }

    fn validate(&self, position: usize) -> Result<()> {
        let blank = |field: &str| {
            HrBotError::InvalidInput(format!("catalog entry {} has an empty {}", position, field))
        };
        if self.canonical_question.trim().is_empty() {
            return Err(blank("canonical_question"));
        }
        if self.answer.trim().is_empty() {
            return Err(blank("answer"));
        }
        if self.category.trim().is_empty() {
            return Err(blank("category"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    entries: Vec<CatalogEntry>,
}

/// Validated, ordered set of catalog entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Validate and wrap entries.
    ///
    /// Rejects blank fields, and phrasings that normalize to the same text in
    /// two different entries (the answer would depend on catalog order).
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self> {
        let mut owners: HashMap<String, usize> = HashMap::new();

        for (i, entry) in entries.iter().enumerate() {
            entry.validate(i)?;

            for phrase in entry.phrases() {
                let owner = *owners.entry(normalize(phrase)).or_insert(i);
                if owner != i {
                    return Err(HrBotError::InvalidInput(format!(
                        "catalog entry {} phrase {:?} duplicates a phrase of entry {}",
                        i, phrase, owner
                    )));
                }
            }
        }
        Ok(Self { entries })
    }

    /// The catalog bundled with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.entries)
    }

    /// Load a catalog JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json_str(&contents)?;
        tracing::info!(
            "Loaded {} catalog entries from {}",
            catalog.len(),
            path.as_ref().display()
        );
        Ok(catalog)
    }

    pub fn to_json_string(&self) -> Result<String> {
        let file = CatalogFile {
            entries: self.entries.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of phrasings (canonical questions plus variants)
    pub fn phrase_count(&self) -> usize {
        self.entries.iter().map(|e| 1 + e.variants.len()).sum()
    }

    /// Distinct categories in first-seen order
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&entry.category.as_str()) {
                seen.push(&entry.category);
            }
        }
        seen
    }

    /// Number of entries per category, in first-seen order
    pub fn category_counts(&self) -> Vec<(&str, usize)> {
        self.categories()
            .into_iter()
            .map(|category| {
                let count = self
                    .entries
                    .iter()
                    .filter(|e| e.category == category)
                    .count();
                (category, count)
            })
            .collect()
    }

    /// Filter entries for FAQ browsing.
    ///
    /// `search` matches case-insensitively against the canonical question and
    /// the answer.
    pub fn browse(&self, category: Option<&str>, search: Option<&str>) -> Vec<&CatalogEntry> {
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        self.entries
            .iter()
            .filter(|e| category.map_or(true, |c| e.category == c))
            .filter(|e| match &needle {
                Some(n) => {
                    e.canonical_question.to_lowercase().contains(n)
                        || e.answer.to_lowercase().contains(n)
                }
                None => true,
            })
            .collect()
    }
}
