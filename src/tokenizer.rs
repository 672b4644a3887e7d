//! Text tokenization and term normalization
//!
//! Both indexing and query parsing run every token through the same
//! folding: lowercase, compatibility decomposition, removal of combining
//! marks, recomposition. `mälmöö` and `malmoo` therefore index and match
//! as the same term.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::TokenizerConfig;

/// Text tokenizer producing folded, positioned terms
#[derive(Clone, Debug, Default)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        Self { config }
    }

    /// Fold a single token: lowercase, NFKD, strip combining marks, NFKC
    pub fn fold(&self, token: &str) -> String {
        let mut folded = if self.config.lowercase {
            token.to_lowercase()
        } else {
            token.to_string()
        };

        if self.config.fold_accents {
            folded = folded
                .nfkd()
                .filter(|c| !is_combining_mark(*c))
                .collect::<String>()
                .nfkc()
                .collect();
        }

        folded
    }

    /// Tokenize text into folded terms; underscores split tokens further
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for word in text.unicode_words() {
            if word.len() > self.config.max_token_length {
                continue;
            }
            let folded = self.fold(word);
            for part in folded.split('_').filter(|p| !p.is_empty()) {
                tokens.push(part.to_string());
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokenization() {
        let tokenizer = Tokenizer::default();
        let tokens = tokenizer.tokenize("Hello World! This is a test.");
        assert_eq!(tokens, vec!["hello", "world", "this", "is", "a", "test"]);
    }

    #[test]
    fn test_accent_folding() {
        let tokenizer = Tokenizer::default();
        assert_eq!(tokenizer.tokenize("mälmöö"), vec!["malmoo"]);
        assert_eq!(tokenizer.fold("Crème"), "creme");
    }

    #[test]
    fn test_underscore_splitting() {
        let tokenizer = Tokenizer::default();
        let tokens = tokenizer.tokenize("snake_case_name");
        assert_eq!(tokens, vec!["snake", "case", "name"]);
    }

    #[test]
    fn test_tokenization_idempotent() {
        let tokenizer = Tokenizer::default();
        let once = tokenizer.fold("MÄLMÖÖ");
        let twice = tokenizer.fold(&once);
        assert_eq!(once, twice);
        assert_eq!(tokenizer.tokenize(&once), tokenizer.tokenize(&twice));
    }

    #[test]
    fn test_max_token_length() {
        let tokenizer = Tokenizer::new(TokenizerConfig {
            max_token_length: 5,
            ..TokenizerConfig::default()
        });
        let tokens = tokenizer.tokenize("short verylongtoken ok");
        assert_eq!(tokens, vec!["short", "ok"]);
    }
}
