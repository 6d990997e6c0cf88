//! Feature adapters: normalized text to classifier input.
//!
//! A [`FeatureAdapter`] is fitted offline together with its classifier and
//! loaded immutable. Two representations are supported:
//!
//! - [`Features::Dense`] - a fixed-length numeric vector, produced by
//!   [`TfIdfVectorizer`]
//! - [`Features::Sequence`] - a padded sequence of token ids, produced by
//!   [`SequenceEncoder`]
//!
//! Adapters are deterministic: the same normalized text always yields the
//! same features, and `transform` never mutates the adapter.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::analysis::normalizer::NormalizerConfig;
use crate::error::{Result, SapaError};

mod sequence;
mod tfidf;

pub use sequence::{OOV_ID, PAD_ID, SequenceEncoder};
pub use tfidf::TfIdfVectorizer;

/// The representation a classifier consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Fixed-length numeric vector
    Dense,
    /// Padded integer token ids
    Sequence,
}

/// The shape an adapter produces and a classifier expects.
///
/// For [`FeatureKind::Dense`] the dimension is the vector length. For
/// [`FeatureKind::Sequence`] it is the size of the token id space, so every
/// id must be strictly below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShape {
    pub kind: FeatureKind,
    pub dimension: usize,
}

impl InputShape {
    pub fn dense(dimension: usize) -> Self {
        InputShape {
            kind: FeatureKind::Dense,
            dimension,
        }
    }

    pub fn sequence(id_space: usize) -> Self {
        InputShape {
            kind: FeatureKind::Sequence,
            dimension: id_space,
        }
    }

    /// Check that `features` fit this shape.
    pub fn validate(&self, features: &Features) -> Result<()> {
        match (self.kind, features) {
            (FeatureKind::Dense, Features::Dense(values)) => {
                if values.len() != self.dimension {
                    return Err(SapaError::feature(format!(
                        "expected dense vector of length {}, got {}",
                        self.dimension,
                        values.len()
                    )));
                }
                if let Some(bad) = values.iter().position(|v| !v.is_finite()) {
                    return Err(SapaError::feature(format!(
                        "non-finite feature value at index {bad}"
                    )));
                }
                Ok(())
            }
            (FeatureKind::Sequence, Features::Sequence(ids)) => {
                match ids.iter().find(|&&id| id as usize >= self.dimension) {
                    Some(id) => Err(SapaError::feature(format!(
                        "token id {id} outside id space of {}",
                        self.dimension
                    ))),
                    None => Ok(()),
                }
            }
            (expected, features) => Err(SapaError::feature(format!(
                "expected {expected:?} features, got {:?}",
                features.kind()
            ))),
        }
    }
}

/// Classifier input produced by a [`FeatureAdapter`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Features {
    Dense(Vec<f64>),
    Sequence(Vec<u32>),
}

impl Features {
    pub fn kind(&self) -> FeatureKind {
        match self {
            Features::Dense(_) => FeatureKind::Dense,
            Features::Sequence(_) => FeatureKind::Sequence,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Features::Dense(values) => values.len(),
            Features::Sequence(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the features carry any information from the input text.
    ///
    /// False for an all-zero vector and for a sequence holding only padding
    /// and out-of-vocabulary ids, which is what empty or entirely unknown
    /// input adapts to.
    pub fn has_signal(&self) -> bool {
        match self {
            Features::Dense(values) => values.iter().any(|&v| v != 0.0),
            Features::Sequence(ids) => ids.iter().any(|&id| id != PAD_ID && id != OOV_ID),
        }
    }

    pub fn as_dense(&self) -> Result<&[f64]> {
        match self {
            Features::Dense(values) => Ok(values),
            Features::Sequence(_) => Err(SapaError::feature("expected dense features")),
        }
    }

    pub fn as_sequence(&self) -> Result<&[u32]> {
        match self {
            Features::Sequence(ids) => Ok(ids),
            Features::Dense(_) => Err(SapaError::feature("expected sequence features")),
        }
    }
}

/// Converts normalized text into the representation a classifier was
/// trained on.
pub trait FeatureAdapter: Send + Sync + Debug {
    /// Transform normalized text into features.
    ///
    /// Fails with [`SapaError::Feature`] if the adapter has not been fitted.
    fn transform(&self, text: &str) -> Result<Features>;

    /// The shape of the features this adapter produces.
    fn output_shape(&self) -> InputShape;

    /// Whether the adapter has been fitted and can transform text.
    fn is_fitted(&self) -> bool;

    /// The normalizer settings the adapter was fitted with, if recorded.
    fn preprocessing(&self) -> Option<&NormalizerConfig>;

    /// Get the name of this adapter for debugging and logging.
    fn name(&self) -> &'static str;
}
