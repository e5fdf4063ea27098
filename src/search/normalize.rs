//! Text normalization applied before any comparison

/// Canonicalize text for matching.
///
/// Lowercases, replaces every character that is not a letter, digit or
/// whitespace with a space, collapses whitespace runs and trims. Idempotent.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let replaced: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split normalized text into whitespace tokens
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}
