use serde::{Deserialize, Serialize};

use super::AssetSpec;

pub const MAX_RECENT_AUTHORS: usize = 10;

/// Anti-repetition hints passed to the text model. Advisory only: the
/// pipeline never rejects a returned quote because it appears here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryBuffer {
    /// Unique, in the order they were first seen.
    #[serde(default)]
    pub seen_quotes: Vec<String>,
    /// Most recent first, at most `MAX_RECENT_AUTHORS` entries.
    #[serde(default)]
    pub recent_authors: Vec<String>,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember_quote(&mut self, quote: impl Into<String>) {
        let quote = quote.into();
        if !quote.trim().is_empty() && !self.seen_quotes.contains(&quote) {
            self.seen_quotes.push(quote);
        }
    }

    pub fn remember_author(&mut self, author: impl Into<String>) {
        let author = author.into();
        if author.trim().is_empty() {
            return;
        }
        self.recent_authors.insert(0, author);
        self.recent_authors.truncate(MAX_RECENT_AUTHORS);
    }

    /// Record the outcome of a successful run.
    pub fn record(&mut self, spec: &AssetSpec) {
        self.remember_quote(spec.quote.text.clone());
        self.remember_author(spec.metadata.author.clone());
    }

    /// The first `limit` quotes in the order they were seen.
    pub fn first_quotes(&self, limit: usize) -> Vec<&str> {
        self.seen_quotes.iter().take(limit).map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_are_deduplicated() {
        let mut history = HistoryBuffer::new();
        history.remember_quote("Stay hungry.");
        history.remember_quote("Stay hungry.");
        history.remember_quote("  ");
        assert_eq!(history.seen_quotes.len(), 1);
    }

    #[test]
    fn first_quotes_follow_insertion_order() {
        let mut history = HistoryBuffer::new();
        for quote in ["Zeal.", "Begin.", "Act.", "Begin.", "Rest.", "Move.", "Listen."] {
            history.remember_quote(quote);
        }
        assert_eq!(
            history.first_quotes(5),
            vec!["Zeal.", "Begin.", "Act.", "Rest.", "Move."]
        );
    }

    #[test]
    fn authors_are_bounded_and_most_recent_first() {
        let mut history = HistoryBuffer::new();
        for i in 0..12 {
            history.remember_author(format!("author-{}", i));
        }
        assert_eq!(history.recent_authors.len(), MAX_RECENT_AUTHORS);
        assert_eq!(history.recent_authors[0], "author-11");
        assert_eq!(history.recent_authors[9], "author-2");
    }

    #[test]
    fn record_takes_quote_and_author_from_spec() {
        let mut spec = AssetSpec::default();
        spec.quote.text = "Do or do not.".to_string();
        spec.metadata.author = "Yoda".to_string();
        let mut history = HistoryBuffer::new();
        history.record(&spec);
        assert_eq!(history.seen_quotes, vec!["Do or do not.".to_string()]);
        assert_eq!(history.recent_authors, vec!["Yoda".to_string()]);
    }
}
