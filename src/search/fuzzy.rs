//! Fuzzy similarity scoring
//!
//! Four metrics, each an integer percentage in [0, 100]:
//! - `ratio`: indel edit similarity over the full strings
//! - `partial_ratio`: best block-aligned window of the shorter string in the
//!   longer one
//! - `token_sort_ratio`: `ratio` after sorting the words
//! - `token_set_ratio`: shared words compared against each side's extra words
//!
//! Inputs are expected to be normalized already (see [`super::normalize`]).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::MetricWeights;

/// Scores for one (query, catalog phrase) comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub exact: f64,
    pub substring: f64,
    pub reordered: f64,
    pub token_overlap: f64,
}

impl ScoreSet {
    /// Compute all four metrics between two normalized strings
    pub fn compute(a: &str, b: &str) -> Self {
        Self {
            exact: ratio(a, b),
            substring: partial_ratio(a, b),
            reordered: token_sort_ratio(a, b),
            token_overlap: token_set_ratio(a, b),
        }
    }

    /// Combine the metrics into a single confidence in [0, 100]
    pub fn weighted(&self, weights: &MetricWeights) -> f64 {
        self.exact * weights.exact
            + self.substring * weights.substring
            + self.reordered * weights.reordered
            + self.token_overlap * weights.token_overlap
    }
}

/// Length of the longest common subsequence, two rows at a time
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev_row: Vec<usize> = vec![0; b.len() + 1];
    let mut curr_row: Vec<usize> = vec![0; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr_row[j + 1] = if ca == cb {
                prev_row[j] + 1
            } else {
                prev_row[j + 1].max(curr_row[j])
            };
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}

/// Insert/delete edit distance (substitution counts as delete + insert)
pub fn indel_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    a_chars.len() + b_chars.len() - 2 * lcs_len(&a_chars, &b_chars)
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let similarity = 2.0 * lcs_len(a, b) as f64 / total as f64;
    (100.0 * similarity).round_ties_even()
}

/// Full-string similarity; 0 when either side is empty
pub fn ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    ratio_chars(&a_chars, &b_chars)
}

/// Longest common run of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, len)`.
///
/// Ties go to the run starting earliest in `a`, then earliest in `b`.
fn longest_block(
    a: &[char],
    b: &[char],
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);

    // run length ending at b[j - 1], previous and current row of `a`
    let mut prev_row: Vec<usize> = vec![0; bhi - blo + 1];
    let mut curr_row: Vec<usize> = vec![0; bhi - blo + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let len = if a[i] == b[j] { prev_row[j - blo] + 1 } else { 0 };
            curr_row[j - blo + 1] = len;
            if len > best_len {
                best_i = i + 1 - len;
                best_j = j + 1 - len;
                best_len = len;
            }
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    (best_i, best_j, best_len)
}

/// Non-overlapping common runs `(i, j, len)` found by recursive longest-run
/// splitting, sorted, with a closing `(a.len(), b.len(), 0)` block
fn matching_blocks(a: &[char], b: &[char]) -> Vec<(usize, usize, usize)> {
    let mut blocks = Vec::new();
    let mut pending = vec![((0, a.len()), (0, b.len()))];

    while let Some(((alo, ahi), (blo, bhi))) = pending.pop() {
        let (i, j, len) = longest_block(a, b, (alo, ahi), (blo, bhi));
        if len == 0 {
            continue;
        }
        blocks.push((i, j, len));
        if alo < i && blo < j {
            pending.push(((alo, i), (blo, j)));
        }
        if i + len < ahi && j + len < bhi {
            pending.push(((i + len, ahi), (j + len, bhi)));
        }
    }

    blocks.sort_unstable();
    blocks.push((a.len(), b.len(), 0));
    blocks
}

/// Best `ratio` of the shorter string against windows of the longer string.
///
/// One window per matching block, aligned so the block lines up in both
/// strings. Windows are clamped to the longer string, so one running off its
/// end is shorter than the query.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let (shorter, longer) = if a_chars.len() <= b_chars.len() {
        (&a_chars, &b_chars)
    } else {
        (&b_chars, &a_chars)
    };

    if shorter.is_empty() {
        return 0.0;
    }

    let mut best = 0.0_f64;

    for (i, j, _) in matching_blocks(shorter, longer) {
        let start = j.saturating_sub(i);
        let end = (start + shorter.len()).min(longer.len());
        let score = ratio_chars(shorter, &longer[start..end]);
        if score > best {
            best = score;
            if best >= 100.0 {
                break;
            }
        }
    }

    best
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// `ratio` over alphabetically sorted words
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn join_tokens<'a>(tokens: impl Iterator<Item = &'a str>) -> String {
    tokens.collect::<Vec<_>>().join(" ")
}

/// Compare the shared words against each side's shared + extra words
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection = join_tokens(tokens_a.intersection(&tokens_b).copied());
    let only_a = join_tokens(tokens_a.difference(&tokens_b).copied());
    let only_b = join_tokens(tokens_b.difference(&tokens_a).copied());

    let combined_a = format!("{} {}", intersection, only_a).trim().to_string();
    let combined_b = format!("{} {}", intersection, only_b).trim().to_string();

    ratio(&intersection, &combined_a)
        .max(ratio(&intersection, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}
