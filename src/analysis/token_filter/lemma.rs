//! Lemmatization filter and lemmatizer implementations.
//!
//! Reduces inflected nouns to their dictionary form (`"classes"` → `"class"`,
//! `"cities"` → `"city"`, `"children"` → `"child"`). Unlike a stemmer, the
//! output is always a plausible word, and every rule produces a word that
//! no rule rewrites again.
//!
//! # Examples
//!
//! ```
//! use sapa::analysis::token_filter::lemma::{EnglishLemmatizer, Lemmatizer};
//!
//! let lemmatizer = EnglishLemmatizer::new();
//! assert_eq!(lemmatizer.lemmatize("courses"), "course");
//! assert_eq!(lemmatizer.lemmatize("fees"), "fee");
//! assert_eq!(lemmatizer.lemmatize("status"), "status");
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use super::Filter;
use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for lemmatization algorithms.
pub trait Lemmatizer: Send + Sync {
    /// Reduce a lowercase word to its lemma.
    fn lemmatize(&self, word: &str) -> String;

    /// Get the name of this lemmatizer.
    fn name(&self) -> &'static str;
}

/// Irregular plural forms.
const IRREGULAR_NOUNS: &[(&str, &str)] = &[
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("people", "person"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("data", "datum"),
    ("criteria", "criterion"),
    ("indices", "index"),
    ("analyses", "analysis"),
    ("theses", "thesis"),
];

/// Words ending in `s` that are not plurals.
const INVARIANT_WORDS: &[&str] = &[
    "news", "series", "species", "physics", "mathematics", "economics", "politics", "campus",
    "bus", "gas", "yes", "always", "perhaps", "was", "has", "does", "this", "thus", "us",
];

static IRREGULAR_MAP: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| IRREGULAR_NOUNS.iter().copied().collect());

/// Rule-based English noun lemmatizer.
///
/// Handles regular plural suffixes (`-s`, `-es`, `-ies`), an irregular form
/// table and a list of words that only look plural. Words of three
/// characters or fewer are returned unchanged.
#[derive(Clone, Debug, Default)]
pub struct EnglishLemmatizer;

impl EnglishLemmatizer {
    /// Create a new English lemmatizer.
    pub fn new() -> Self {
        EnglishLemmatizer
    }
}

impl Lemmatizer for EnglishLemmatizer {
    fn lemmatize(&self, word: &str) -> String {
        if let Some(lemma) = IRREGULAR_MAP.get(word) {
            return (*lemma).to_string();
        }
        if word.chars().count() <= 3 || INVARIANT_WORDS.contains(&word) {
            return word.to_string();
        }
        if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
            return word.to_string();
        }
        if let Some(stem) = word.strip_suffix("sses") {
            return format!("{stem}ss");
        }
        if let Some(stem) = word.strip_suffix("ies") {
            if stem.chars().count() >= 2 {
                return format!("{stem}y");
            }
        }
        for suffix in ["xes", "zes", "ches", "shes"] {
            if let Some(stem) = word.strip_suffix(suffix) {
                let kept = &suffix[..suffix.len() - 2];
                return format!("{stem}{kept}");
            }
        }
        if let Some(stem) = word.strip_suffix('s') {
            return stem.to_string();
        }
        word.to_string()
    }

    fn name(&self) -> &'static str {
        "english"
    }
}

/// Filter that applies lemmatization to tokens.
pub struct LemmaFilter {
    lemmatizer: Box<dyn Lemmatizer>,
}

impl std::fmt::Debug for LemmaFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LemmaFilter")
            .field("lemmatizer", &self.lemmatizer.name())
            .finish()
    }
}

impl LemmaFilter {
    /// Create a new lemma filter with the English lemmatizer.
    pub fn new() -> Self {
        LemmaFilter {
            lemmatizer: Box::new(EnglishLemmatizer::new()),
        }
    }
}

impl Default for LemmaFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for LemmaFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let filtered = tokens
            .map(|token| {
                if token.is_stopped() {
                    token
                } else {
                    let lemma = self.lemmatizer.lemmatize(&token.text);
                    token.with_text(lemma)
                }
            })
            .collect::<Vec<_>>();

        Ok(Box::new(filtered.into_iter()))
    }

    fn name(&self) -> &'static str {
        "lemma"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;

    #[test]
    fn test_regular_plurals() {
        let lemmatizer = EnglishLemmatizer::new();
        assert_eq!(lemmatizer.lemmatize("students"), "student");
        assert_eq!(lemmatizer.lemmatize("classes"), "class");
        assert_eq!(lemmatizer.lemmatize("cities"), "city");
        assert_eq!(lemmatizer.lemmatize("boxes"), "box");
        assert_eq!(lemmatizer.lemmatize("churches"), "church");
        assert_eq!(lemmatizer.lemmatize("houses"), "house");
    }

    #[test]
    fn test_irregular_and_invariant() {
        let lemmatizer = EnglishLemmatizer::new();
        assert_eq!(lemmatizer.lemmatize("children"), "child");
        assert_eq!(lemmatizer.lemmatize("campus"), "campus");
        assert_eq!(lemmatizer.lemmatize("news"), "news");
        assert_eq!(lemmatizer.lemmatize("analysis"), "analysis");
        assert_eq!(lemmatizer.lemmatize("its"), "its");
    }

    #[test]
    fn test_lemmatize_is_idempotent() {
        let lemmatizer = EnglishLemmatizer::new();
        for word in [
            "students", "classes", "cities", "boxes", "churches", "children", "dresses",
            "glasses", "buses", "series", "wishes", "ties", "fees", "schedules",
        ] {
            let once = lemmatizer.lemmatize(word);
            assert_eq!(lemmatizer.lemmatize(&once), once, "word: {word}");
        }
    }

    #[test]
    fn test_lemma_filter() {
        let filter = LemmaFilter::new();
        let tokens = vec![
            Token::new("courses", 0),
            Token::new("fees", 1),
            Token::new("skipped", 2).stop(),
        ];

        let result: Vec<Token> = filter
            .filter(Box::new(tokens.into_iter()))
            .unwrap()
            .collect();

        assert_eq!(result[0].text, "course");
        assert_eq!(result[1].text, "fee");
        assert_eq!(result[2].text, "skipped");
    }

    #[test]
    fn test_filter_name() {
        assert_eq!(LemmaFilter::new().name(), "lemma");
    }
}
