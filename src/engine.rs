//! Request orchestration: raw text in, intent and reply out.
//!
//! ```text
//! raw → normalize → transform → predict → decode → resolve → Reply
//! ```
//!
//! [`InferenceEngine::classify`] runs the pipeline and returns every stage
//! failure as a typed error. [`InferenceEngine::handle`] is the serving
//! boundary built on top of it: it never fails, turning each failure class
//! into the fallback reply and a log line for the operator.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::normalizer::TextNormalizer;
use crate::analysis::slang::SlangDictionary;
use crate::config::{DEFAULT_UNKNOWN_INTENT, EngineConfig};
use crate::error::{Result, SapaError};
use crate::ml::artifact::{ContextCell, EngineContext};
use crate::ml::classifier::Prediction;
use crate::ml::features::Features;
use crate::response::{IntentResponseMap, ResponseResolver};

/// How a reply was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// The predicted intent has a response.
    Resolved,
    /// The predicted intent has no response; fallback used.
    UnknownIntent,
    /// The prediction scored below the confidence threshold; fallback used.
    LowConfidence,
    /// The input was blank; fallback used unless an empty-input reply is set.
    EmptyInput,
    /// Nothing in the input is known to the model; fallback used.
    OutOfVocabulary,
    /// A pipeline stage failed; fallback used.
    Degraded,
}

/// Reply to one user message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub intent: String,
    pub response: String,
    /// Score of the predicted intent, when the classifier produced scores.
    pub confidence: Option<f64>,
    pub outcome: ReplyOutcome,
}

impl Reply {
    /// Whether the reply is the answer mapped to the predicted intent.
    pub fn is_resolved(&self) -> bool {
        self.outcome == ReplyOutcome::Resolved
    }
}

/// Result of running the classification stages on one input.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub normalized: String,
    pub intent: String,
    pub prediction: Prediction,
    /// Whether the features carried anything the model knows.
    pub has_signal: bool,
}

impl Classification {
    pub fn confidence(&self) -> Option<f64> {
        self.prediction.confidence()
    }
}

/// Reply policy of the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    /// Reply to blank input. `None` answers with the fallback response.
    pub empty_input_response: Option<String>,
    pub unknown_intent: String,
    pub min_confidence: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            empty_input_response: None,
            unknown_intent: DEFAULT_UNKNOWN_INTENT.to_string(),
            min_confidence: 0.0,
        }
    }
}

impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        EngineSettings {
            empty_input_response: config.empty_input_response.clone(),
            unknown_intent: config.unknown_intent.clone(),
            min_confidence: config.min_confidence,
        }
    }
}

/// Normalizer, artifacts and responses serving one request at a time.
///
/// The engine holds no per-request state; one instance can serve any number
/// of sessions and threads.
#[derive(Clone, Debug)]
pub struct InferenceEngine {
    normalizer: Arc<TextNormalizer>,
    context: Arc<EngineContext>,
    resolver: ResponseResolver,
    settings: EngineSettings,
}

impl InferenceEngine {
    /// Assemble an engine.
    ///
    /// Fails with [`SapaError::ResourceLoad`] if the artifacts record
    /// normalizer settings different from `normalizer`'s.
    pub fn new(
        normalizer: Arc<TextNormalizer>,
        context: Arc<EngineContext>,
        resolver: ResponseResolver,
    ) -> Result<Self> {
        match context.adapter().preprocessing() {
            Some(recorded) if recorded != normalizer.config() => {
                return Err(SapaError::resource_load(format!(
                    "preprocessing mismatch: artifacts were fitted with {recorded:?}, \
                     normalizer uses {:?}",
                    normalizer.config()
                )));
            }
            Some(_) => {}
            None => debug!(
                "{} adapter records no preprocessing settings, parity unchecked",
                context.adapter().name()
            ),
        }

        let unmapped: Vec<&str> = context
            .codec()
            .classes()
            .iter()
            .map(String::as_str)
            .filter(|intent| !resolver.responses().contains(intent))
            .collect();
        if !unmapped.is_empty() {
            warn!(
                "{} of {} intents have no response and will get the fallback: {}",
                unmapped.len(),
                context.codec().len(),
                unmapped.join(", ")
            );
        }

        Ok(InferenceEngine {
            normalizer,
            context,
            resolver,
            settings: EngineSettings::default(),
        })
    }

    /// Replace the reply policy.
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build an engine from configuration.
    ///
    /// Artifacts are loaded through `cell`, so engines built from the same
    /// cell share one loaded context.
    pub fn from_config(config: &EngineConfig, cell: &ContextCell) -> Result<Self> {
        config.validate()?;

        let slang = Arc::new(SlangDictionary::load(config.slang_path.as_deref()));
        let normalizer = Arc::new(TextNormalizer::new(config.normalizer.clone(), slang)?);

        let paths = config.artifact_paths();
        let context = cell.get_or_load(|| EngineContext::load(&paths))?;

        let dataset_path = config.dataset_path.as_deref().ok_or_else(|| {
            SapaError::resource_load("no response dataset configured (dataset_path)")
        })?;
        let responses = IntentResponseMap::load(dataset_path)?;
        let resolver = ResponseResolver::new(responses, config.fallback_response.as_str());

        let engine = Self::new(normalizer, context, resolver)?.with_settings(config.into());
        info!("inference engine ready");
        Ok(engine)
    }

    /// Normalize raw text the way requests are normalized.
    pub fn normalize(&self, raw: &str) -> String {
        self.normalizer.normalize(raw)
    }

    /// Run normalization, feature adaptation, prediction and label decoding.
    ///
    /// A panic in any stage is caught and returned as an error.
    pub fn classify(&self, raw: &str) -> Result<Classification> {
        panic::catch_unwind(AssertUnwindSafe(|| self.run_stages(raw))).unwrap_or_else(|payload| {
            Err(SapaError::other(format!(
                "request pipeline panicked: {}",
                panic_message(payload.as_ref())
            )))
        })
    }

    fn run_stages(&self, raw: &str) -> Result<Classification> {
        let normalized = self.normalizer.normalize(raw);
        let features = self.context.adapter().transform(&normalized)?;
        let has_signal = features.has_signal();
        let prediction = self.predict(&features)?;
        let intent = self.context.codec().decode(prediction.index)?.to_string();

        debug!(
            "{raw:?} -> {normalized:?} -> class {} ({intent}, {:?})",
            prediction.index,
            prediction.confidence()
        );

        Ok(Classification {
            normalized,
            intent,
            prediction,
            has_signal,
        })
    }

    /// Classifier call with panics and malformed predictions turned into
    /// prediction errors.
    fn predict(&self, features: &Features) -> Result<Prediction> {
        let classifier = self.context.classifier();
        let prediction = panic::catch_unwind(AssertUnwindSafe(|| classifier.predict(features)))
            .unwrap_or_else(|payload| {
                Err(SapaError::prediction(format!(
                    "{} classifier panicked: {}",
                    classifier.name(),
                    panic_message(payload.as_ref())
                )))
            })?;
        prediction.check(classifier.n_classes()).map_err(|e| {
            SapaError::prediction(format!("{} classifier: {e}", classifier.name()))
        })?;
        Ok(prediction)
    }

    /// Reply to one message. Never fails.
    pub fn handle(&self, raw: &str) -> Reply {
        if raw.trim().is_empty() {
            let response = match &self.settings.empty_input_response {
                Some(response) => response.clone(),
                None => self.resolver.fallback().to_string(),
            };
            return Reply {
                intent: self.settings.unknown_intent.clone(),
                response,
                confidence: None,
                outcome: ReplyOutcome::EmptyInput,
            };
        }

        let classification = match self.classify(raw) {
            Ok(classification) => classification,
            Err(e) => {
                if e.is_recoverable() {
                    warn!("request degraded to fallback reply: {e}");
                } else {
                    error!("request failed, answering with fallback reply: {e}");
                }
                return self.fallback(
                    self.settings.unknown_intent.clone(),
                    None,
                    ReplyOutcome::Degraded,
                );
            }
        };

        let confidence = classification.confidence();
        if !classification.has_signal {
            debug!("no known terms in {:?}", classification.normalized);
            return self.fallback(
                self.settings.unknown_intent.clone(),
                None,
                ReplyOutcome::OutOfVocabulary,
            );
        }
        // Direct labels carry no score and are not thresholded.
        if let Some(score) = confidence.filter(|&score| score < self.settings.min_confidence) {
            debug!(
                "confidence {score:.3} for {} below {:.3}",
                classification.intent, self.settings.min_confidence
            );
            return self.fallback(
                classification.intent,
                confidence,
                ReplyOutcome::LowConfidence,
            );
        }

        match self.resolver.lookup(&classification.intent) {
            Ok(response) => Reply {
                response: response.to_string(),
                intent: classification.intent,
                confidence,
                outcome: ReplyOutcome::Resolved,
            },
            Err(e) => {
                warn!("{e}, answering with fallback");
                self.fallback(
                    classification.intent,
                    confidence,
                    ReplyOutcome::UnknownIntent,
                )
            }
        }
    }

    fn fallback(&self, intent: String, confidence: Option<f64>, outcome: ReplyOutcome) -> Reply {
        Reply {
            intent,
            response: self.resolver.fallback().to_string(),
            confidence,
            outcome,
        }
    }

    /// Reply to many independent messages in parallel, in input order.
    pub fn handle_batch<S: AsRef<str> + Sync>(&self, inputs: &[S]) -> Vec<Reply> {
        inputs
            .par_iter()
            .map(|input| self.handle(input.as_ref()))
            .collect()
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    pub fn resolver(&self) -> &ResponseResolver {
        &self.resolver
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::normalizer::NormalizerConfig;
    use crate::config::DEFAULT_FALLBACK_RESPONSE;
    use crate::ml::trainer::{IntentSample, Trainer};

    fn engine_with(normalizer: TextNormalizer) -> Result<InferenceEngine> {
        let normalizer = Arc::new(normalizer);
        let samples = vec![
            IntentSample::new("hi", "greeting"),
            IntentSample::new("hello there", "greeting"),
            IntentSample::new("jadwal kuliah kapan", "jadwal"),
            IntentSample::new("kapan jadwal ujian", "jadwal"),
            IntentSample::new("berapa biaya kuliah", "biaya"),
        ];
        let context = Trainer::new(Arc::clone(&normalizer))
            .fit(&samples)?
            .into_context()?;
        let resolver = ResponseResolver::new(
            IntentResponseMap::from_pairs([
                ("greeting", "Hello! How can I help?"),
                ("jadwal", "Jadwal kuliah ada di portal akademik."),
            ]),
            DEFAULT_FALLBACK_RESPONSE,
        );
        InferenceEngine::new(normalizer, Arc::new(context), resolver)
    }

    fn engine() -> InferenceEngine {
        engine_with(TextNormalizer::default()).unwrap()
    }

    #[test]
    fn test_resolved() {
        let reply = engine().handle("Hi!");
        assert_eq!(reply.intent, "greeting");
        assert_eq!(reply.response, "Hello! How can I help?");
        assert_eq!(reply.outcome, ReplyOutcome::Resolved);
        assert!(reply.confidence.unwrap() > 0.0);
    }

    #[test]
    fn test_empty_input() {
        let engine = engine();
        for input in ["", "   ", "\n\t"] {
            let reply = engine.handle(input);
            assert_eq!(reply.outcome, ReplyOutcome::EmptyInput);
            assert_eq!(reply.intent, DEFAULT_UNKNOWN_INTENT);
            assert_eq!(reply.response, DEFAULT_FALLBACK_RESPONSE);
        }
    }

    #[test]
    fn test_empty_input_reply_setting() {
        let engine = engine().with_settings(EngineSettings {
            empty_input_response: Some("Please type a message to get a response.".to_string()),
            ..EngineSettings::default()
        });
        let reply = engine.handle("  ");
        assert_eq!(reply.outcome, ReplyOutcome::EmptyInput);
        assert_eq!(reply.response, "Please type a message to get a response.");
    }

    #[test]
    fn test_punctuation_and_unknown_words() {
        let engine = engine();
        for input in ["?!...", "zzz qqq", "¿¡"] {
            let reply = engine.handle(input);
            assert_eq!(reply.outcome, ReplyOutcome::OutOfVocabulary, "input: {input}");
            assert_eq!(reply.response, DEFAULT_FALLBACK_RESPONSE);
        }
    }

    #[test]
    fn test_unmapped_intent_falls_back() {
        let reply = engine().handle("berapa biaya kuliah?");
        assert_eq!(reply.intent, "biaya");
        assert_eq!(reply.outcome, ReplyOutcome::UnknownIntent);
        assert_eq!(reply.response, DEFAULT_FALLBACK_RESPONSE);
    }

    #[test]
    fn test_low_confidence() {
        let engine = engine().with_settings(EngineSettings {
            min_confidence: 1.0,
            ..EngineSettings::default()
        });
        let reply = engine.handle("jadwal biaya hello");
        assert_eq!(reply.outcome, ReplyOutcome::LowConfidence);
        assert_eq!(reply.response, DEFAULT_FALLBACK_RESPONSE);
    }

    #[test]
    fn test_preprocessing_mismatch() {
        let fitted = engine();
        let other = TextNormalizer::new(
            NormalizerConfig {
                remove_stopwords: true,
                ..NormalizerConfig::default()
            },
            Arc::new(SlangDictionary::new()),
        )
        .unwrap();
        let err = InferenceEngine::new(
            Arc::new(other),
            Arc::new(fitted.context().clone()),
            fitted.resolver().clone(),
        )
        .unwrap_err();
        assert!(matches!(err, SapaError::ResourceLoad(ref m) if m.contains("preprocessing mismatch")));
    }

    #[test]
    fn test_classify_reports_normalized_text() {
        let classification = engine().classify("Kpn jadwal UJIAN?").unwrap();
        assert_eq!(classification.normalized, "kapan jadwal ujian");
        assert_eq!(classification.intent, "jadwal");
        assert!(classification.has_signal);
    }

    #[test]
    fn test_handle_batch_keeps_order() {
        let engine = engine();
        let inputs = ["hi", "", "jadwal ujian", "zzz"];
        let replies = engine.handle_batch(&inputs);
        let outcomes: Vec<ReplyOutcome> = replies.iter().map(|r| r.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                ReplyOutcome::Resolved,
                ReplyOutcome::EmptyInput,
                ReplyOutcome::Resolved,
                ReplyOutcome::OutOfVocabulary
            ]
        );
        assert_eq!(replies[2].intent, "jadwal");
    }
}
