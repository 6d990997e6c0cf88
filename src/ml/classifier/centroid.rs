//! Prototype classifier using cosine similarity over TF-IDF vectors.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SapaError};
use crate::ml::classifier::{IntentClassifier, Prediction};
use crate::ml::features::{Features, InputShape};

/// Scores each class by the average cosine similarity between the input and
/// the class's training vectors.
///
/// Since cosine similarity is linear in the normalized prototype, the average
/// is computed against one summed unit vector per class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CentroidClassifier {
    dimension: usize,
    /// Mean of the unit-normalized training vectors of each class.
    centroids: Vec<Vec<f64>>,
}

impl CentroidClassifier {
    /// Fit from dense training vectors and their class indices.
    pub fn fit(features: &[Vec<f64>], labels: &[usize], n_classes: usize) -> Result<Self> {
        if features.is_empty() {
            return Err(SapaError::feature("training samples cannot be empty"));
        }
        if features.len() != labels.len() {
            return Err(SapaError::feature(format!(
                "{} training vectors for {} labels",
                features.len(),
                labels.len()
            )));
        }

        let dimension = features[0].len();
        let mut centroids = vec![vec![0.0; dimension]; n_classes];
        let mut counts = vec![0usize; n_classes];

        for (vector, &label) in features.iter().zip(labels) {
            if vector.len() != dimension {
                return Err(SapaError::feature(format!(
                    "training vector of length {}, expected {dimension}",
                    vector.len()
                )));
            }
            let centroid = centroids.get_mut(label).ok_or_else(|| {
                SapaError::feature(format!("label {label} outside {n_classes} classes"))
            })?;
            counts[label] += 1;

            let magnitude = magnitude(vector);
            if magnitude > 0.0 {
                for (c, x) in centroid.iter_mut().zip(vector) {
                    *c += x / magnitude;
                }
            }
        }

        for (centroid, &count) in centroids.iter_mut().zip(&counts) {
            if count > 0 {
                for c in centroid.iter_mut() {
                    *c /= count as f64;
                }
            }
        }

        Ok(CentroidClassifier {
            dimension,
            centroids,
        })
    }

    /// Check internal consistency of a deserialized classifier.
    pub fn check(&self) -> Result<()> {
        if self.centroids.is_empty() {
            return Err(SapaError::resource_load("centroid classifier has no classes"));
        }
        if let Some(row) = self.centroids.iter().position(|c| c.len() != self.dimension) {
            return Err(SapaError::resource_load(format!(
                "centroid {row} has length {}, expected {}",
                self.centroids[row].len(),
                self.dimension
            )));
        }
        if self.centroids.iter().flatten().any(|v| !v.is_finite()) {
            return Err(SapaError::resource_load("centroid classifier has non-finite values"));
        }
        Ok(())
    }
}

fn magnitude(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

impl IntentClassifier for CentroidClassifier {
    fn predict(&self, features: &Features) -> Result<Prediction> {
        self.validate(features)?;
        let query = features.as_dense()?;

        let query_magnitude = magnitude(query);
        let scores = self
            .centroids
            .iter()
            .map(|centroid| {
                if query_magnitude == 0.0 {
                    0.0
                } else {
                    let dot: f64 = query.iter().zip(centroid).map(|(x, y)| x * y).sum();
                    dot / query_magnitude
                }
            })
            .collect();

        Prediction::from_scores(scores)
    }

    fn input_shape(&self) -> InputShape {
        InputShape::dense(self.dimension)
    }

    fn n_classes(&self) -> usize {
        self.centroids.len()
    }

    fn name(&self) -> &'static str {
        "centroid"
    }
}
