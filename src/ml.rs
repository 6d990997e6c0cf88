//! Machine learning components of the inference pipeline.
//!
//! - [`features`] adapts normalized text into classifier input
//! - [`classifier`] scores intents from features
//! - [`label`] maps class indices back to intent labels
//! - [`artifact`] reads, writes and cross-checks the fitted artifacts
//! - [`trainer`] fits artifacts offline from labelled samples

pub mod artifact;
pub mod classifier;
pub mod features;
pub mod label;
pub mod trainer;

pub use artifact::{ArtifactPaths, ContextCell, EngineContext};
pub use classifier::{IntentClassifier, Prediction};
pub use features::{FeatureAdapter, Features};
pub use label::LabelCodec;
pub use trainer::{IntentSample, Trainer};
