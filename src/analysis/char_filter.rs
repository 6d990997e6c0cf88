//! Char filter implementations for text normalization.
//!
//! Char filters pre-process the raw string before it is passed to the
//! tokenizer. The normalizer uses them for the two whole-string steps:
//! case folding and punctuation stripping.
//!
//! # Available Filters
//!
//! - [`lowercase::LowercaseCharFilter`] - Locale-independent lowercasing
//! - [`pattern_replace::PatternReplaceCharFilter`] - Regex-based replacement,
//!   including the ASCII punctuation stripper
//!
//! # Examples
//!
//! ```
//! use sapa::analysis::char_filter::CharFilter;
//! use sapa::analysis::char_filter::pattern_replace::PatternReplaceCharFilter;
//!
//! let filter = PatternReplaceCharFilter::ascii_punctuation().unwrap();
//! assert_eq!(filter.filter("Hi! How's it going?"), "Hi Hows it going");
//! ```

/// Trait for character filters that transform text before tokenization.
pub trait CharFilter: Send + Sync {
    /// Apply this filter to the input text, returning the filtered text.
    fn filter(&self, input: &str) -> String;

    /// Get the name of this char filter.
    fn name(&self) -> &'static str;
}

pub mod lowercase;
pub mod pattern_replace;
