//! Offline fitting of the three engine artifacts.
//!
//! The trainer normalizes samples with the same [`TextNormalizer`] the
//! engine serves with, fits a TF-IDF vectorizer on the normalized text and
//! builds one centroid per intent. The vectorizer records the normalizer
//! settings, which lets the engine refuse artifacts fitted on differently
//! preprocessed text.

use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::analysis::normalizer::TextNormalizer;
use crate::error::{Result, SapaError};
use crate::ml::artifact::{
    AdapterArtifact, ArtifactPaths, ClassifierArtifact, EngineContext, write_artifact,
};
use crate::ml::classifier::CentroidClassifier;
use crate::ml::features::TfIdfVectorizer;
use crate::ml::label::LabelCodec;

/// Labelled training sample.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentSample {
    /// Raw user text.
    pub text: String,
    /// Intent label.
    pub intent: String,
}

impl IntentSample {
    pub fn new<T: Into<String>, I: Into<String>>(text: T, intent: I) -> Self {
        IntentSample {
            text: text.into(),
            intent: intent.into(),
        }
    }
}

/// Artifacts produced by [`Trainer::fit`].
#[derive(Clone, Debug)]
pub struct TrainedModel {
    pub adapter: AdapterArtifact,
    pub classifier: ClassifierArtifact,
    pub codec: LabelCodec,
}

impl TrainedModel {
    /// Write all three artifacts.
    pub fn save(&self, paths: &ArtifactPaths) -> Result<()> {
        write_artifact(&paths.adapter, &self.adapter)?;
        write_artifact(&paths.classifier, &self.classifier)?;
        write_artifact(&paths.label_codec, &self.codec)?;
        info!(
            "wrote {} classes to {}, {} and {}",
            self.codec.len(),
            paths.classifier.display(),
            paths.adapter.display(),
            paths.label_codec.display()
        );
        Ok(())
    }

    /// Use the fitted artifacts directly, without a round trip through disk.
    pub fn into_context(self) -> Result<EngineContext> {
        EngineContext::new(
            self.adapter.into_adapter()?,
            self.classifier.into_classifier()?,
            self.codec,
        )
    }
}

/// Fits a TF-IDF + centroid model from labelled samples.
#[derive(Clone, Debug)]
pub struct Trainer {
    normalizer: Arc<TextNormalizer>,
}

impl Trainer {
    pub fn new(normalizer: Arc<TextNormalizer>) -> Self {
        Trainer { normalizer }
    }

    /// Fit all artifacts.
    ///
    /// Samples whose text normalizes to nothing are skipped. Fails if no
    /// usable sample remains.
    pub fn fit(&self, samples: &[IntentSample]) -> Result<TrainedModel> {
        let mut documents = Vec::with_capacity(samples.len());
        let mut intents = Vec::with_capacity(samples.len());
        for sample in samples {
            let normalized = self.normalizer.normalize(&sample.text);
            let intent = sample.intent.trim();
            if normalized.is_empty() || intent.is_empty() {
                debug!("skipping training sample {:?}", sample.text);
                continue;
            }
            documents.push(normalized);
            intents.push(intent.to_string());
        }
        if documents.is_empty() {
            return Err(SapaError::feature("training samples cannot be empty"));
        }

        let codec = LabelCodec::fit(intents.iter().cloned());
        let labels = intents
            .iter()
            .map(|intent| {
                codec
                    .encode(intent)
                    .ok_or_else(|| SapaError::other(format!("intent {intent:?} missing from codec")))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut vectorizer =
            TfIdfVectorizer::new().with_preprocessing(self.normalizer.config().clone());
        vectorizer.fit(&documents)?;

        let features = documents
            .iter()
            .map(|doc| vectorizer.transform_dense(doc))
            .collect::<Result<Vec<_>>>()?;
        let classifier = CentroidClassifier::fit(&features, &labels, codec.len())?;

        info!(
            "fitted {} samples ({} skipped) into {} intents over {} terms",
            documents.len(),
            samples.len() - documents.len(),
            codec.len(),
            vectorizer.vocabulary_size()
        );

        Ok(TrainedModel {
            adapter: AdapterArtifact::Tfidf(vectorizer),
            classifier: ClassifierArtifact::Centroid(classifier),
            codec,
        })
    }
}
