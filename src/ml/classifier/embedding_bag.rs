//! Embedding-bag classifier for token id sequences.
//!
//! Averages the embeddings of all non-padding ids and feeds the mean
//! through a linear layer with softmax output. This is the inference shape
//! of a small embedding + pooling + dense network.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SapaError};
use crate::ml::classifier::{IntentClassifier, Prediction, affine, check_layer, softmax};
use crate::ml::features::{Features, InputShape, PAD_ID};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingBagClassifier {
    /// One row per token id, including the reserved ones.
    embeddings: Vec<Vec<f64>>,
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl EmbeddingBagClassifier {
    pub fn new(embeddings: Vec<Vec<f64>>, weights: Vec<Vec<f64>>, bias: Vec<f64>) -> Result<Self> {
        let classifier = EmbeddingBagClassifier {
            embeddings,
            weights,
            bias,
        };
        classifier.check()?;
        Ok(classifier)
    }

    fn embedding_dim(&self) -> usize {
        self.embeddings.first().map(Vec::len).unwrap_or(0)
    }

    /// Check internal consistency of a deserialized classifier.
    pub fn check(&self) -> Result<()> {
        if self.embeddings.is_empty() {
            return Err(SapaError::resource_load("embedding table is empty"));
        }
        let dim = self.embedding_dim();
        if let Some(row) = self.embeddings.iter().position(|e| e.len() != dim) {
            return Err(SapaError::resource_load(format!(
                "embedding row {row} has length {}, expected {dim}",
                self.embeddings[row].len()
            )));
        }
        if self.embeddings.iter().flatten().any(|v| !v.is_finite()) {
            return Err(SapaError::resource_load("embedding table has non-finite values"));
        }
        check_layer("embedding-bag output layer", &self.weights, &self.bias, dim)
    }

    fn pool(&self, ids: &[u32]) -> Vec<f64> {
        let mut pooled = vec![0.0; self.embedding_dim()];
        let mut count = 0usize;
        for &id in ids.iter().filter(|&&id| id != PAD_ID) {
            for (p, e) in pooled.iter_mut().zip(&self.embeddings[id as usize]) {
                *p += e;
            }
            count += 1;
        }
        if count > 0 {
            for p in &mut pooled {
                *p /= count as f64;
            }
        }
        pooled
    }
}

impl IntentClassifier for EmbeddingBagClassifier {
    fn predict(&self, features: &Features) -> Result<Prediction> {
        self.validate(features)?;
        let pooled = self.pool(features.as_sequence()?);
        Prediction::from_scores(softmax(&affine(&self.weights, &self.bias, &pooled)))
    }

    fn input_shape(&self) -> InputShape {
        InputShape::sequence(self.embeddings.len())
    }

    fn n_classes(&self) -> usize {
        self.weights.len()
    }

    fn name(&self) -> &'static str {
        "embedding_bag"
    }
}
