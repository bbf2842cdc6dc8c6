//! Shared tokenizer for indexing and queries.
//!
//! Both sides must tokenize identically or term statistics stop lining up,
//! so this is the only tokenizer in the workspace.

/// Collapse all runs of whitespace (including newlines) to single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased whitespace tokens, punctuation trimmed at both ends.
pub fn tokenize(s: &str) -> Vec<String> {
    s.split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_newlines_and_tabs() {
        assert_eq!(normalize_whitespace("a\t b\n\nc"), "a b c");
    }

    #[test]
    fn lowercases_and_trims_punctuation() {
        assert_eq!(
            tokenize("Vacation days, in France."),
            vec!["vacation", "days", "in", "france"]
        );
    }

    #[test]
    fn drops_pure_punctuation_tokens() {
        assert_eq!(tokenize("-- ?? days"), vec!["days"]);
    }
}
