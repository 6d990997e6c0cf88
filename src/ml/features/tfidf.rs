//! TF-IDF vectorizer for text feature extraction.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::analysis::normalizer::NormalizerConfig;
use crate::error::{Result, SapaError};
use crate::ml::features::{FeatureAdapter, Features, InputShape};

/// TF-IDF vectorizer over normalized text.
///
/// Input is expected to be the output of a
/// [`TextNormalizer`](crate::analysis::normalizer::TextNormalizer), so
/// tokens are separated by single spaces and need no further analysis.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TfIdfVectorizer {
    /// Vocabulary: word -> index mapping. Indices follow sorted word order.
    vocabulary: BTreeMap<String, usize>,
    /// Inverse document frequency for each word.
    idf: Vec<f64>,
    /// Total number of documents seen during training.
    n_documents: usize,
    /// Normalizer settings the training documents were produced with.
    #[serde(default)]
    preprocessing: Option<NormalizerConfig>,
}

impl TfIdfVectorizer {
    /// Create a new, unfitted TF-IDF vectorizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the normalizer settings the training documents were produced with.
    pub fn with_preprocessing(mut self, config: NormalizerConfig) -> Self {
        self.preprocessing = Some(config);
        self
    }

    /// Fit the vectorizer on normalized training documents.
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<()> {
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();

        // Count document frequencies
        for doc in documents {
            let unique_tokens: HashSet<&str> = doc.as_ref().split_whitespace().collect();
            for token in unique_tokens {
                *document_frequency.entry(token.to_string()).or_insert(0) += 1;
            }
        }

        if document_frequency.is_empty() {
            return Err(SapaError::feature(
                "cannot fit vectorizer: training documents contain no terms",
            ));
        }

        let n_documents = documents.len();
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (idx, (word, df)) in document_frequency.into_iter().enumerate() {
            // IDF = log((N + 1) / (df + 1)) + 1
            idf.push(((n_documents as f64 + 1.0) / (df as f64 + 1.0)).ln() + 1.0);
            vocabulary.insert(word, idx);
        }

        self.vocabulary = vocabulary;
        self.idf = idf;
        self.n_documents = n_documents;

        Ok(())
    }

    /// Transform a normalized document into a TF-IDF feature vector.
    pub fn transform_dense(&self, document: &str) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(SapaError::feature("TF-IDF vectorizer is not fitted"));
        }

        let tokens: Vec<&str> = document.split_whitespace().collect();
        let mut tf = vec![0.0; self.vocabulary.len()];

        // Count term frequencies
        for token in &tokens {
            if let Some(&idx) = self.vocabulary.get(*token) {
                tf[idx] += 1.0;
            }
        }

        // Normalize by document length
        let doc_length = tokens.len() as f64;
        if doc_length > 0.0 {
            for count in &mut tf {
                *count /= doc_length;
            }
        }

        // Apply IDF
        for (idx, count) in tf.iter_mut().enumerate() {
            *count *= self.idf[idx];
        }

        Ok(tf)
    }

    /// Get the size of the vocabulary.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Index of `term` in the feature vector.
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Check internal consistency of a deserialized vectorizer.
    pub fn check(&self) -> Result<()> {
        if self.idf.len() != self.vocabulary.len() {
            return Err(SapaError::resource_load(format!(
                "vectorizer has {} idf weights for {} terms",
                self.idf.len(),
                self.vocabulary.len()
            )));
        }
        if let Some((term, &idx)) = self.vocabulary.iter().find(|(_, idx)| **idx >= self.idf.len())
        {
            return Err(SapaError::resource_load(format!(
                "vectorizer term {term:?} has out-of-range index {idx}"
            )));
        }
        Ok(())
    }
}

impl FeatureAdapter for TfIdfVectorizer {
    fn transform(&self, text: &str) -> Result<Features> {
        self.transform_dense(text).map(Features::Dense)
    }

    fn output_shape(&self) -> InputShape {
        InputShape::dense(self.vocabulary.len())
    }

    fn is_fitted(&self) -> bool {
        self.n_documents > 0 && !self.vocabulary.is_empty()
    }

    fn preprocessing(&self) -> Option<&NormalizerConfig> {
        self.preprocessing.as_ref()
    }

    fn name(&self) -> &'static str {
        "tfidf"
    }
}
