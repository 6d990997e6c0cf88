//! Text analysis module for Sapa.
//!
//! This module turns raw chat input into normalized text: char filters for
//! case folding and punctuation, a whitespace tokenizer, and token filters
//! for slang, stop words and lemmas, assembled by [`normalizer::TextNormalizer`].

pub mod analyzer;
pub mod char_filter;
pub mod normalizer;
pub mod slang;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use normalizer::{NormalizerConfig, TextNormalizer};
pub use slang::SlangDictionary;
