//! Tokenizer implementations for text analysis.
//!
//! Tokenizers split the char-filtered string into tokens. The normalizer
//! splits on whitespace, which matches how the classifier artifacts were
//! fitted.
//!
//! # Examples
//!
//! ```
//! use sapa::analysis::tokenizer::Tokenizer;
//! use sapa::analysis::tokenizer::whitespace::WhitespaceTokenizer;
//!
//! let tokenizer = WhitespaceTokenizer::new();
//! let tokens: Vec<_> = tokenizer.tokenize("Hello world").unwrap().collect();
//! assert_eq!(tokens.len(), 2);
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for tokenizers that convert text into tokens.
///
/// The trait requires `Send + Sync` so a tokenizer can be shared by every
/// session served from the same process.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

pub mod whitespace;
