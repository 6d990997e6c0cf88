//! # Sapa
//!
//! An intent-classification chat engine: free text in, intent and canned
//! reply out.
//!
//! ## Features
//!
//! - Text normalization with slang expansion, stop words and lemmas
//! - TF-IDF and token-sequence feature adapters
//! - Centroid, linear and embedding-bag classifiers behind one trait
//! - Versioned artifacts with compatibility checks and load-once sharing
//! - Fallback replies for every per-request failure
//! - Per-session conversation history with optional idle expiry
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use sapa::analysis::TextNormalizer;
//! use sapa::engine::{InferenceEngine, ReplyOutcome};
//! use sapa::ml::{IntentSample, Trainer};
//! use sapa::response::{IntentResponseMap, ResponseResolver};
//!
//! let normalizer = Arc::new(TextNormalizer::default());
//! let context = Trainer::new(Arc::clone(&normalizer))
//!     .fit(&[
//!         IntentSample::new("hi", "greeting"),
//!         IntentSample::new("jadwal kuliah", "jadwal"),
//!     ])?
//!     .into_context()?;
//! let resolver = ResponseResolver::new(
//!     IntentResponseMap::from_pairs([("greeting", "Hello! How can I help?")]),
//!     "Sorry, I didn't understand that. Could you rephrase?",
//! );
//! let engine = InferenceEngine::new(normalizer, Arc::new(context), resolver)?;
//!
//! let reply = engine.handle("Hi!");
//! assert_eq!(reply.intent, "greeting");
//! assert_eq!(reply.response, "Hello! How can I help?");
//! assert_eq!(engine.handle("").outcome, ReplyOutcome::EmptyInput);
//! # Ok::<(), sapa::error::SapaError>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod ml;
pub mod response;
pub mod session;

pub mod prelude {
    pub use crate::analysis::{NormalizerConfig, SlangDictionary, TextNormalizer};
    pub use crate::config::EngineConfig;
    pub use crate::engine::{InferenceEngine, Reply, ReplyOutcome};
    pub use crate::error::{Result, SapaError};
    pub use crate::response::{IntentResponseMap, ResponseResolver};
    pub use crate::session::{ConversationSession, ConversationTurn, Role, SessionStore};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
