//! Token id sequence encoder for sequence models.
//!
//! Words are mapped to integer ids by descending training frequency (ties in
//! alphabetical order). Two ids are reserved:
//!
//! - [`PAD_ID`] fills sequences shorter than `max_len`
//! - [`OOV_ID`] stands in for words outside the vocabulary
//!
//! Sequences are padded and truncated at the end.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::analysis::normalizer::NormalizerConfig;
use crate::error::{Result, SapaError};
use crate::ml::features::{FeatureAdapter, Features, InputShape};

/// Padding id.
pub const PAD_ID: u32 = 0;

/// Out-of-vocabulary id.
pub const OOV_ID: u32 = 1;

const FIRST_WORD_ID: u32 = 2;

/// Fitted word index plus padding length.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceEncoder {
    word_index: BTreeMap<String, u32>,
    max_len: usize,
    /// Keep only the most frequent words. `None` keeps all.
    #[serde(default)]
    max_words: Option<usize>,
    #[serde(default)]
    preprocessing: Option<NormalizerConfig>,
}

impl SequenceEncoder {
    /// Create an unfitted encoder producing sequences of `max_len` ids.
    pub fn new(max_len: usize) -> Self {
        SequenceEncoder {
            word_index: BTreeMap::new(),
            max_len,
            max_words: None,
            preprocessing: None,
        }
    }

    /// Limit the vocabulary to the `max_words` most frequent words.
    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = Some(max_words);
        self
    }

    /// Record the normalizer settings the training documents were produced with.
    pub fn with_preprocessing(mut self, config: NormalizerConfig) -> Self {
        self.preprocessing = Some(config);
        self
    }

    /// Build the word index from normalized training documents.
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<()> {
        if self.max_len == 0 {
            return Err(SapaError::feature("sequence length must be positive"));
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for doc in documents {
            for token in doc.as_ref().split_whitespace() {
                *counts.entry(token).or_insert(0) += 1;
            }
        }
        if counts.is_empty() {
            return Err(SapaError::feature(
                "cannot fit sequence encoder: training documents contain no terms",
            ));
        }

        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        if let Some(limit) = self.max_words {
            ranked.truncate(limit);
        }

        self.word_index = ranked
            .into_iter()
            .zip(FIRST_WORD_ID..)
            .map(|((word, _), id)| (word.to_string(), id))
            .collect();

        Ok(())
    }

    /// Encode normalized text as a padded id sequence.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        if !self.is_fitted() {
            return Err(SapaError::feature("sequence encoder is not fitted"));
        }

        let mut ids: Vec<u32> = text
            .split_whitespace()
            .take(self.max_len)
            .map(|token| self.word_index.get(token).copied().unwrap_or(OOV_ID))
            .collect();
        ids.resize(self.max_len, PAD_ID);
        Ok(ids)
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn vocabulary_size(&self) -> usize {
        self.word_index.len()
    }

    /// Id of `word`, if it is in the vocabulary.
    pub fn word_id(&self, word: &str) -> Option<u32> {
        self.word_index.get(word).copied()
    }

    /// Number of distinct ids including the reserved ones.
    pub fn id_space(&self) -> usize {
        self.word_index.len() + FIRST_WORD_ID as usize
    }

    /// Check internal consistency of a deserialized encoder.
    pub fn check(&self) -> Result<()> {
        if self.max_len == 0 {
            return Err(SapaError::resource_load("sequence encoder has zero max_len"));
        }
        let space = self.id_space() as u32;
        if let Some((word, id)) = self
            .word_index
            .iter()
            .find(|(_, id)| **id < FIRST_WORD_ID || **id >= space)
        {
            return Err(SapaError::resource_load(format!(
                "sequence encoder word {word:?} has invalid id {id}"
            )));
        }
        Ok(())
    }
}

impl FeatureAdapter for SequenceEncoder {
    fn transform(&self, text: &str) -> Result<Features> {
        self.encode(text).map(Features::Sequence)
    }

    fn output_shape(&self) -> InputShape {
        InputShape::sequence(self.id_space())
    }

    fn is_fitted(&self) -> bool {
        !self.word_index.is_empty()
    }

    fn preprocessing(&self) -> Option<&NormalizerConfig> {
        self.preprocessing.as_ref()
    }

    fn name(&self) -> &'static str {
        "sequence"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted() -> SequenceEncoder {
        let mut encoder = SequenceEncoder::new(4);
        encoder
            .fit(&["jadwal kuliah", "jadwal ujian", "biaya kuliah jadwal"])
            .unwrap();
        encoder
    }

    #[test]
    fn test_ids_by_frequency() {
        let encoder = fitted();
        assert_eq!(encoder.word_id("jadwal"), Some(2));
        assert_eq!(encoder.word_id("kuliah"), Some(3));
        // ties broken alphabetically
        assert_eq!(encoder.word_id("biaya"), Some(4));
        assert_eq!(encoder.word_id("ujian"), Some(5));
        assert_eq!(encoder.id_space(), 6);
    }

    #[test]
    fn test_post_padding_and_oov() {
        let encoder = fitted();
        assert_eq!(encoder.encode("kuliah libur").unwrap(), vec![3, OOV_ID, PAD_ID, PAD_ID]);
        assert_eq!(encoder.encode("").unwrap(), vec![PAD_ID; 4]);
    }

    #[test]
    fn test_post_truncation() {
        let encoder = fitted();
        assert_eq!(
            encoder.encode("ujian biaya jadwal kuliah jadwal").unwrap(),
            vec![5, 4, 2, 3]
        );
    }

    #[test]
    fn test_max_words() {
        let mut encoder = SequenceEncoder::new(3).with_max_words(1);
        encoder.fit(&["a b b"]).unwrap();
        assert_eq!(encoder.vocabulary_size(), 1);
        assert_eq!(encoder.encode("a b").unwrap(), vec![OOV_ID, 2, PAD_ID]);
    }

    #[test]
    fn test_unfitted_fails() {
        let encoder = SequenceEncoder::new(4);
        assert!(matches!(
            encoder.transform("jadwal"),
            Err(SapaError::Feature(_))
        ));
    }

    #[test]
    fn test_shape() {
        let encoder = fitted();
        let features = encoder.transform("jadwal ujian").unwrap();
        assert!(encoder.output_shape().validate(&features).is_ok());
        assert!(encoder.check().is_ok());
    }
}
