//! Intent classifiers.
//!
//! An [`IntentClassifier`] turns adapted [`Features`] into a score per class.
//! The predicted class is the index of the highest score, ties going to the
//! lowest index. Class indices are mapped back to intent labels by a
//! [`LabelCodec`](crate::ml::label::LabelCodec).

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SapaError};
use crate::ml::features::{Features, InputShape};

pub mod centroid;
pub mod embedding_bag;
pub mod linear;

pub use centroid::CentroidClassifier;
pub use embedding_bag::EmbeddingBagClassifier;
pub use linear::LinearClassifier;

/// Predicted class index plus the scores it was chosen from.
///
/// A classifier that emits a label directly leaves `scores` empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub index: usize,
    pub scores: Vec<f64>,
}

impl Prediction {
    /// Pick the highest scoring class.
    ///
    /// Fails with [`SapaError::Prediction`] for an empty score vector or a
    /// non-finite score.
    pub fn from_scores(scores: Vec<f64>) -> Result<Self> {
        let index = argmax(&scores)?;
        Ok(Prediction { index, scores })
    }

    /// A class chosen without per-class scores.
    pub fn label(index: usize) -> Self {
        Prediction {
            index,
            scores: Vec::new(),
        }
    }

    /// Score of the predicted class, if the classifier produced scores.
    pub fn confidence(&self) -> Option<f64> {
        self.scores.get(self.index).copied()
    }

    /// Check the prediction against the number of classes it was made over.
    ///
    /// The index must name a class, and a non-empty score vector must hold
    /// one finite score per class.
    pub fn check(&self, n_classes: usize) -> Result<()> {
        if self.index >= n_classes {
            return Err(SapaError::prediction(format!(
                "predicted class {} out of range for {n_classes} classes",
                self.index
            )));
        }
        if self.scores.is_empty() {
            return Ok(());
        }
        if self.scores.len() != n_classes {
            return Err(SapaError::prediction(format!(
                "{} scores for {n_classes} classes",
                self.scores.len()
            )));
        }
        if let Some(idx) = self.scores.iter().position(|s| !s.is_finite()) {
            return Err(SapaError::prediction(format!(
                "non-finite score {} for class {idx}",
                self.scores[idx]
            )));
        }
        Ok(())
    }
}

/// Index of the maximum score, the lowest index on ties.
pub fn argmax(scores: &[f64]) -> Result<usize> {
    if scores.is_empty() {
        return Err(SapaError::prediction("classifier produced no scores"));
    }
    let mut best = 0;
    for (idx, &score) in scores.iter().enumerate() {
        if !score.is_finite() {
            return Err(SapaError::prediction(format!(
                "classifier produced non-finite score {score} for class {idx}"
            )));
        }
        if score > scores[best] {
            best = idx;
        }
    }
    Ok(best)
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Trait for intent classifiers.
pub trait IntentClassifier: Send + Sync + Debug {
    /// Score every class for the given features.
    ///
    /// Features that do not fit [`input_shape`](Self::input_shape) fail with
    /// [`SapaError::Feature`].
    fn predict(&self, features: &Features) -> Result<Prediction>;

    /// The features this classifier expects.
    fn input_shape(&self) -> InputShape;

    /// Number of classes scored.
    fn n_classes(&self) -> usize;

    /// Get the name of this classifier.
    fn name(&self) -> &'static str;

    /// Validate features against the expected input shape.
    fn validate(&self, features: &Features) -> Result<()> {
        self.input_shape().validate(features)
    }
}

/// Multiply a dense input by row-major `weights` and add `bias`.
pub(crate) fn affine(weights: &[Vec<f64>], bias: &[f64], input: &[f64]) -> Vec<f64> {
    weights
        .iter()
        .zip(bias)
        .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + b)
        .collect()
}

/// Check that `weights` is `rows x cols` and `bias` has `rows` entries.
pub(crate) fn check_layer(name: &str, weights: &[Vec<f64>], bias: &[f64], cols: usize) -> Result<()> {
    if weights.is_empty() {
        return Err(SapaError::resource_load(format!("{name} has no classes")));
    }
    if bias.len() != weights.len() {
        return Err(SapaError::resource_load(format!(
            "{name} has {} bias terms for {} classes",
            bias.len(),
            weights.len()
        )));
    }
    if let Some(row) = weights.iter().position(|r| r.len() != cols) {
        return Err(SapaError::resource_load(format!(
            "{name} weight row {row} has length {}, expected {cols}",
            weights[row].len()
        )));
    }
    if weights.iter().flatten().chain(bias).any(|w| !w.is_finite()) {
        return Err(SapaError::resource_load(format!("{name} has non-finite weights")));
    }
    Ok(())
}
