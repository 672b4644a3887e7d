//! Free-text query parser
//!
//! Tokenizes on Unicode word boundaries while tracking quote state and
//! implicit phrases (tokens joined without whitespace, like `foo-bar`).
//! Each surviving token becomes either an exact term or, when a snapshot
//! is available, a synonym expansion over the dictionary completions with
//! the highest collection frequency.

use unicode_segmentation::UnicodeSegmentation;

use crate::index::{IndexData, IndexQuery};
use crate::tokenizer::Tokenizer;

/// Number of dictionary completions kept per token
const MAX_EXPANSIONS: usize = 100;

/// Parser from a user search string to an index query
pub struct TextQueryParser<'a> {
    tokenizer: Tokenizer,
    snapshot: Option<&'a IndexData>,
    prefix: String,
}

impl<'a> TextQueryParser<'a> {
    pub fn new(snapshot: Option<&'a IndexData>) -> Self {
        Self {
            tokenizer: Tokenizer::default(),
            snapshot,
            prefix: String::new(),
        }
    }

    /// Restrict emitted terms to a property channel
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Parse a search string; `None` when no tokens survive
    pub fn parse(&self, text: &str) -> Option<IndexQuery> {
        let mut queries: Vec<IndexQuery> = Vec::new();
        let mut phrase: Vec<IndexQuery> = Vec::new();

        let mut in_double_quote = false;
        let mut in_single_quote = false;
        let mut in_phrase = false;
        let mut last_end = 0usize;
        let mut seen_word = false;

        for (start, segment) in text.split_word_bound_indices() {
            if !segment.chars().any(char::is_alphanumeric) {
                continue;
            }

            let delim = &text[last_end..start];
            if delim.contains('"') {
                if in_double_quote {
                    flush_phrase(&mut queries, &mut phrase);
                    in_double_quote = false;
                } else {
                    in_double_quote = true;
                }
            } else if delim.contains('\'') {
                if in_single_quote {
                    flush_phrase(&mut queries, &mut phrase);
                    in_single_quote = false;
                } else {
                    in_single_quote = true;
                }
            } else if seen_word && !delim.chars().any(char::is_whitespace) && !delim.is_empty() {
                // Joined tokens without whitespace form an implicit phrase
                if !in_phrase && !in_double_quote && !in_single_quote {
                    if let Some(prev) = queries.pop() {
                        phrase.push(prev);
                    }
                    in_phrase = true;
                }
            } else if in_phrase {
                flush_phrase(&mut queries, &mut phrase);
                in_phrase = false;
            }

            seen_word = true;
            last_end = start + segment.len();

            let folded = self.tokenizer.fold(segment);
            for sub in folded.split('_').filter(|s| !s.is_empty()) {
                let query = self.make_query(sub);
                if in_double_quote || in_single_quote || in_phrase {
                    phrase.push(query);
                } else {
                    queries.push(query);
                }
            }
        }

        // A quote or joined phrase may end with the input
        flush_phrase(&mut queries, &mut phrase);

        match queries.len() {
            0 => None,
            1 => Some(queries.pop().unwrap()),
            _ => Some(IndexQuery::And(queries)),
        }
    }

    /// One subquery per token: an exact term, or the OR of its most
    /// common dictionary completions when a snapshot is supplied
    fn make_query(&self, token: &str) -> IndexQuery {
        let term = format!("{}{}", self.prefix, token);
        let Some(data) = self.snapshot else {
            return IndexQuery::Term(term);
        };

        let expanded = data.expand_prefix(&term, MAX_EXPANSIONS);
        if expanded.is_empty() {
            IndexQuery::Term(term)
        } else {
            IndexQuery::Synonym(expanded)
        }
    }
}

fn flush_phrase(queries: &mut Vec<IndexQuery>, phrase: &mut Vec<IndexQuery>) {
    match phrase.len() {
        0 => {}
        1 => queries.push(phrase.pop().unwrap()),
        _ => queries.push(IndexQuery::Phrase(std::mem::take(phrase))),
    }
}
