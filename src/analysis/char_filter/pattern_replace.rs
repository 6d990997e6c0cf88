use regex::Regex;

use super::CharFilter;
use crate::error::{Result, SapaError};

/// Pattern matching exactly the 32 ASCII punctuation characters.
const ASCII_PUNCTUATION_PATTERN: &str = r"[[:punct:]]";

/// A char filter that replaces text matching a regex pattern.
#[derive(Clone, Debug)]
pub struct PatternReplaceCharFilter {
    pattern: Regex,
    replacement: String,
}

impl PatternReplaceCharFilter {
    /// Create a new pattern replace char filter.
    pub fn new(pattern: &str, replacement: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| SapaError::analysis(format!("invalid pattern '{pattern}': {e}")))?;
        Ok(Self {
            pattern,
            replacement: replacement.to_string(),
        })
    }

    /// Create a filter that deletes every ASCII punctuation character.
    ///
    /// Non-ASCII punctuation (`¿`, `…`, `“`) is left in place.
    pub fn ascii_punctuation() -> Result<Self> {
        Self::new(ASCII_PUNCTUATION_PATTERN, "")
    }
}

impl CharFilter for PatternReplaceCharFilter {
    fn filter(&self, input: &str) -> String {
        self.pattern
            .replace_all(input, self.replacement.as_str())
            .into_owned()
    }

    fn name(&self) -> &'static str {
        "pattern_replace"
    }
}
