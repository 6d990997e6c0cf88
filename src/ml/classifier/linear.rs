//! Linear classifier with softmax output.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ml::classifier::{IntentClassifier, Prediction, affine, check_layer, softmax};
use crate::ml::features::{Features, InputShape};

/// One weight row and bias per class, as exported by a multinomial
/// logistic regression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    dimension: usize,
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl LinearClassifier {
    /// Create a classifier from `n_classes x dimension` weights.
    pub fn new(weights: Vec<Vec<f64>>, bias: Vec<f64>) -> Result<Self> {
        let dimension = weights.first().map(Vec::len).unwrap_or(0);
        let classifier = LinearClassifier {
            dimension,
            weights,
            bias,
        };
        classifier.check()?;
        Ok(classifier)
    }

    /// Check internal consistency of a deserialized classifier.
    pub fn check(&self) -> Result<()> {
        check_layer("linear classifier", &self.weights, &self.bias, self.dimension)
    }
}

impl IntentClassifier for LinearClassifier {
    fn predict(&self, features: &Features) -> Result<Prediction> {
        self.validate(features)?;
        let input = features.as_dense()?;
        Prediction::from_scores(softmax(&affine(&self.weights, &self.bias, input)))
    }

    fn input_shape(&self) -> InputShape {
        InputShape::dense(self.dimension)
    }

    fn n_classes(&self) -> usize {
        self.weights.len()
    }

    fn name(&self) -> &'static str {
        "linear"
    }
}
