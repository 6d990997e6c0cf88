//! Text normalization for classifier input.
//!
//! [`TextNormalizer`] turns raw chat input into the canonical form the
//! classifier artifacts were fitted on:
//!
//! 1. lowercase (locale independent)
//! 2. strip ASCII punctuation
//! 3. split on whitespace
//! 4. rewrite slang tokens through the [`SlangDictionary`]
//! 5. optionally drop stop words and lemmatize
//! 6. join with single spaces
//!
//! Normalization never fails. Input that loses every token yields `""`.
//!
//! The same normalizer must be used when fitting artifacts and when serving
//! requests. [`NormalizerConfig`] is recorded in the vectorizer artifact so a
//! mismatch is caught when the engine starts.
//!
//! # Examples
//!
//! ```
//! use sapa::analysis::normalizer::TextNormalizer;
//!
//! let normalizer = TextNormalizer::default();
//! assert_eq!(normalizer.normalize("Info MHS baru?"), "info mahasiswa baru");
//! assert_eq!(normalizer.normalize("?!"), "");
//! ```

use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::{Analyzer, PipelineAnalyzer};
use crate::analysis::char_filter::lowercase::LowercaseCharFilter;
use crate::analysis::char_filter::pattern_replace::PatternReplaceCharFilter;
use crate::analysis::slang::SlangDictionary;
use crate::analysis::token_filter::lemma::LemmaFilter;
use crate::analysis::token_filter::slang::SlangFilter;
use crate::analysis::token_filter::stop::StopFilter;
use crate::analysis::tokenizer::whitespace::WhitespaceTokenizer;
use crate::error::Result;

/// Upper bound on analysis passes when settling a normalized string.
///
/// Lemmatization can turn a word into a stop word or a slang key, so the
/// pipeline is re-applied until its output stops changing.
const MAX_PASSES: usize = 8;

/// Passes a slang key may take to settle. Tokens that lemmatize onto a key
/// need one more pass than the key itself.
const KEY_PASSES: usize = MAX_PASSES / 2;

/// Optional preprocessing steps.
///
/// These must match the settings the classifier artifacts were fitted with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Drop English stop words (plus `extra_stopwords`).
    pub remove_stopwords: bool,
    /// Reduce tokens to their lemma.
    pub lemmatize: bool,
    /// Additional stop words, only used when `remove_stopwords` is set.
    pub extra_stopwords: Vec<String>,
}

/// Raw text to canonical text.
#[derive(Clone, Debug)]
pub struct TextNormalizer {
    analyzer: PipelineAnalyzer,
    config: NormalizerConfig,
    slang: Arc<SlangDictionary>,
}

impl TextNormalizer {
    /// Build a normalizer from preprocessing settings and a slang dictionary.
    ///
    /// Slang entries that never settle under this pipeline, such as a
    /// replacement that lemmatizes back onto another key in a cycle, are
    /// dropped with a warning so that normalization stays idempotent.
    pub fn new(config: NormalizerConfig, slang: Arc<SlangDictionary>) -> Result<Self> {
        let mut normalizer = Self::build(config, slang)?;
        loop {
            let unsettled: Vec<String> = normalizer
                .slang
                .iter()
                .filter(|(key, _)| !normalizer.settles(key))
                .map(|(key, _)| key.to_string())
                .collect();
            if unsettled.is_empty() {
                return Ok(normalizer);
            }

            warn!(
                "dropping {} slang entries that never settle: {}",
                unsettled.len(),
                unsettled.join(", ")
            );
            let slang = Arc::new(normalizer.slang.without(&unsettled));
            normalizer = Self::build(normalizer.config, slang)?;
        }
    }

    fn build(config: NormalizerConfig, slang: Arc<SlangDictionary>) -> Result<Self> {
        let mut analyzer = PipelineAnalyzer::new(Arc::new(WhitespaceTokenizer::new()))
            .add_char_filter(Arc::new(LowercaseCharFilter::new()))
            .add_char_filter(Arc::new(PatternReplaceCharFilter::ascii_punctuation()?))
            .add_filter(Arc::new(SlangFilter::new(Arc::clone(&slang))));

        if config.remove_stopwords {
            analyzer = analyzer.add_filter(Arc::new(StopFilter::with_extra_words(
                &config.extra_stopwords,
            )));
        }
        if config.lemmatize {
            analyzer = analyzer.add_filter(Arc::new(LemmaFilter::new()));
        }

        Ok(TextNormalizer {
            analyzer: analyzer.with_name("normalizer"),
            config,
            slang,
        })
    }

    /// Normalize raw text. Pure and deterministic, never fails.
    pub fn normalize(&self, text: &str) -> String {
        let (normalized, settled) = self.settle(text, MAX_PASSES);
        if !settled {
            debug!("normalization of {text:?} did not settle in {MAX_PASSES} passes");
        }
        normalized
    }

    /// Run the pipeline until the output stops changing or `passes` extra
    /// passes are spent. Returns the output and whether it settled.
    fn settle(&self, text: &str, passes: usize) -> (String, bool) {
        let mut current = self.normalize_once(text);
        for _ in 0..passes {
            let next = self.normalize_once(&current);
            if next == current {
                return (current, true);
            }
            current = next;
        }
        (current, false)
    }

    fn settles(&self, key: &str) -> bool {
        self.settle(key, KEY_PASSES).1
    }

    /// Normalized tokens of `text`.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        self.normalize(text)
            .split(' ')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The preprocessing settings of this normalizer.
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// The slang dictionary of this normalizer.
    pub fn slang(&self) -> &Arc<SlangDictionary> {
        &self.slang
    }

    fn normalize_once(&self, text: &str) -> String {
        match self.analyzer.analyze(text) {
            Ok(tokens) => tokens
                .filter(|t| !t.is_stopped() && !t.is_empty())
                .map(|t| t.text)
                .collect::<Vec<_>>()
                .join(" "),
            Err(e) => {
                warn!("analysis failed, treating input as empty: {e}");
                String::new()
            }
        }
    }
}

impl Default for TextNormalizer {
    /// Built-in slang table, no stop word removal, no lemmatization.
    fn default() -> Self {
        // The default pipeline has no fallible stage besides the punctuation
        // pattern, which is a valid constant.
        match Self::new(NormalizerConfig::default(), Arc::new(SlangDictionary::new())) {
            Ok(normalizer) => normalizer,
            Err(e) => unreachable!("default normalizer pipeline is valid: {e}"),
        }
    }
}
