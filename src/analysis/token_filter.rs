//! Token filter implementations for token transformation.
//!
//! Filters receive the token stream produced by the tokenizer and rewrite,
//! stop or expand tokens. The normalizer chains them in a fixed order:
//!
//! ```text
//! Tokenizer → Slang → Stop Words (optional) → Lemma (optional)
//! ```
//!
//! # Available Filters
//!
//! - [`slang::SlangFilter`] - Rewrites informal tokens to canonical words
//! - [`stop::StopFilter`] - Removes stop words
//! - [`lemma::LemmaFilter`] - Reduces tokens to their lemma

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for filters that transform token streams.
///
/// The trait requires `Send + Sync` to allow use in concurrent contexts.
///
/// # Examples
///
/// Implementing a custom filter:
///
/// ```
/// use sapa::analysis::token::{Token, TokenStream};
/// use sapa::analysis::token_filter::Filter;
/// use sapa::error::Result;
///
/// struct ReverseFilter;
///
/// impl Filter for ReverseFilter {
///     fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
///         let reversed: Vec<Token> = tokens
///             .map(|t| {
///                 let text: String = t.text.chars().rev().collect();
///                 t.with_text(text)
///             })
///             .collect();
///         Ok(Box::new(reversed.into_iter()))
///     }
///
///     fn name(&self) -> &'static str {
///         "reverse"
///     }
/// }
/// ```
pub trait Filter: Send + Sync {
    /// Apply this filter to a token stream.
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Get the name of this filter (for debugging and configuration).
    fn name(&self) -> &'static str;
}

pub mod lemma;
pub mod slang;
pub mod stop;
