//! Slang substitution filter.
//!
//! Replaces each token found in a [`SlangDictionary`] with its canonical
//! form. A multi-word replacement expands into several tokens, and an empty
//! replacement deletes the token.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use sapa::analysis::slang::SlangDictionary;
//! use sapa::analysis::token::Token;
//! use sapa::analysis::token_filter::Filter;
//! use sapa::analysis::token_filter::slang::SlangFilter;
//!
//! let filter = SlangFilter::new(Arc::new(SlangDictionary::new()));
//! let tokens = vec![Token::new("info", 0), Token::new("mhs", 1)];
//! let result: Vec<_> = filter.filter(Box::new(tokens.into_iter())).unwrap().collect();
//!
//! assert_eq!(result[1].text, "mahasiswa");
//! ```

use std::sync::Arc;

use crate::analysis::slang::SlangDictionary;
use crate::analysis::token::{Token, TokenStream};
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// A filter that rewrites slang tokens through a dictionary.
#[derive(Clone, Debug)]
pub struct SlangFilter {
    dictionary: Arc<SlangDictionary>,
}

impl SlangFilter {
    /// Create a new slang filter over the given dictionary.
    pub fn new(dictionary: Arc<SlangDictionary>) -> Self {
        SlangFilter { dictionary }
    }

    /// Get the dictionary used by this filter.
    pub fn dictionary(&self) -> &Arc<SlangDictionary> {
        &self.dictionary
    }
}

impl Filter for SlangFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let mut filtered = Vec::new();

        for token in tokens {
            if token.is_stopped() {
                filtered.push(token);
                continue;
            }
            match self.dictionary.get(&token.text) {
                Some(replacement) => {
                    let position = token.position;
                    filtered.extend(
                        replacement
                            .split_whitespace()
                            .map(|word| Token::new(word, position)),
                    );
                }
                None => filtered.push(token),
            }
        }

        Ok(Box::new(filtered.into_iter()))
    }

    fn name(&self) -> &'static str {
        "slang"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(filter: &SlangFilter, words: &[&str]) -> Vec<Token> {
        let tokens: Vec<Token> = words
            .iter()
            .enumerate()
            .map(|(i, w)| Token::new(*w, i))
            .collect();
        filter.filter(Box::new(tokens.into_iter())).unwrap().collect()
    }

    #[test]
    fn test_single_word_replacement() {
        let filter = SlangFilter::new(Arc::new(SlangDictionary::new()));
        let result = run(&filter, &["info", "mhs", "baru"]);

        let texts: Vec<_> = result.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["info", "mahasiswa", "baru"]);
    }

    #[test]
    fn test_multi_word_expansion() {
        let dictionary = SlangDictionary::from_pairs([("btw", "by the way")]);
        let filter = SlangFilter::new(Arc::new(dictionary));
        let result = run(&filter, &["btw", "hi"]);

        let texts: Vec<_> = result.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["by", "the", "way", "hi"]);
        assert!(result[..3].iter().all(|t| t.position == 0));
    }

    #[test]
    fn test_empty_replacement_deletes() {
        let dictionary = SlangDictionary::from_pairs([("lol", "")]);
        let filter = SlangFilter::new(Arc::new(dictionary));
        let result = run(&filter, &["lol", "ok"]);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].text, "ok");
    }

    #[test]
    fn test_stopped_tokens_pass_through() {
        let filter = SlangFilter::new(Arc::new(SlangDictionary::new()));
        let tokens = vec![Token::new("mhs", 0).stop()];
        let result: Vec<Token> = filter
            .filter(Box::new(tokens.into_iter()))
            .unwrap()
            .collect();

        assert_eq!(result[0].text, "mhs");
        assert!(result[0].is_stopped());
    }

    #[test]
    fn test_filter_name() {
        let filter = SlangFilter::new(Arc::new(SlangDictionary::empty()));
        assert_eq!(filter.name(), "slang");
    }
}
