//! Serialized model artifacts and the loaded engine context.
//!
//! Training produces three artifacts, each wrapped in an [`Envelope`]:
//!
//! - the classifier ([`ClassifierArtifact`])
//! - the feature adapter ([`AdapterArtifact`])
//! - the label codec ([`LabelCodec`])
//!
//! Files ending in `.bin` are encoded with bincode, everything else is JSON.
//! All three are loaded together into an [`EngineContext`], which refuses to
//! exist unless the artifacts agree with each other. [`ContextCell`] loads a
//! context at most once per process, even under concurrent first use.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use log::info;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SapaError};
use crate::ml::classifier::{
    CentroidClassifier, EmbeddingBagClassifier, IntentClassifier, LinearClassifier,
};
use crate::ml::features::{FeatureAdapter, SequenceEncoder, TfIdfVectorizer};
use crate::ml::label::LabelCodec;

/// Version of the artifact layout written by this crate.
pub const FORMAT_VERSION: u32 = 1;

/// Versioned wrapper around a serialized artifact.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub artifact: T,
}

impl<T> Envelope<T> {
    pub fn new(artifact: T) -> Self {
        Envelope {
            format_version: FORMAT_VERSION,
            created_at: Utc::now(),
            artifact,
        }
    }
}

/// A fitted feature adapter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AdapterArtifact {
    Tfidf(TfIdfVectorizer),
    Sequence(SequenceEncoder),
}

impl AdapterArtifact {
    /// Check internal consistency and turn into a shareable adapter.
    pub fn into_adapter(self) -> Result<Arc<dyn FeatureAdapter>> {
        let adapter: Arc<dyn FeatureAdapter> = match self {
            AdapterArtifact::Tfidf(vectorizer) => {
                vectorizer.check()?;
                Arc::new(vectorizer)
            }
            AdapterArtifact::Sequence(encoder) => {
                encoder.check()?;
                Arc::new(encoder)
            }
        };
        if !adapter.is_fitted() {
            return Err(SapaError::resource_load(format!(
                "{} feature adapter artifact is not fitted",
                adapter.name()
            )));
        }
        Ok(adapter)
    }
}

/// A trained classifier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ClassifierArtifact {
    Centroid(CentroidClassifier),
    Linear(LinearClassifier),
    EmbeddingBag(EmbeddingBagClassifier),
}

impl ClassifierArtifact {
    /// Check internal consistency and turn into a shareable classifier.
    pub fn into_classifier(self) -> Result<Arc<dyn IntentClassifier>> {
        Ok(match self {
            ClassifierArtifact::Centroid(classifier) => {
                classifier.check()?;
                Arc::new(classifier)
            }
            ClassifierArtifact::Linear(classifier) => {
                classifier.check()?;
                Arc::new(classifier)
            }
            ClassifierArtifact::EmbeddingBag(classifier) => {
                classifier.check()?;
                Arc::new(classifier)
            }
        })
    }
}

fn is_binary(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "bin")
}

/// Read an artifact envelope from `path`.
///
/// Missing, unreadable, undecodable or version-incompatible files fail with
/// [`SapaError::ResourceLoad`].
pub fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| {
        SapaError::resource_load(format!("cannot open artifact {}: {e}", path.display()))
    })?;
    let reader = BufReader::new(file);

    let envelope: Envelope<T> = if is_binary(path) {
        bincode::deserialize_from(reader).map_err(|e| {
            SapaError::resource_load(format!("cannot decode artifact {}: {e}", path.display()))
        })?
    } else {
        serde_json::from_reader(reader).map_err(|e| {
            SapaError::resource_load(format!("cannot parse artifact {}: {e}", path.display()))
        })?
    };

    if envelope.format_version != FORMAT_VERSION {
        return Err(SapaError::resource_load(format!(
            "artifact {} has format version {}, expected {FORMAT_VERSION}",
            path.display(),
            envelope.format_version
        )));
    }
    Ok(envelope.artifact)
}

/// Write `artifact` to `path` in a fresh envelope.
pub fn write_artifact<T: Serialize>(path: &Path, artifact: &T) -> Result<()> {
    let envelope = Envelope::new(artifact);
    let mut writer = BufWriter::new(File::create(path)?);
    if is_binary(path) {
        bincode::serialize_into(&mut writer, &envelope)?;
    } else {
        serde_json::to_writer_pretty(&mut writer, &envelope)?;
    }
    writer.flush()?;
    Ok(())
}

/// Locations of the three artifacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub classifier: PathBuf,
    pub adapter: PathBuf,
    pub label_codec: PathBuf,
}

impl ArtifactPaths {
    pub const CLASSIFIER_FILE: &'static str = "intent_classifier.json";
    pub const ADAPTER_FILE: &'static str = "text_vectorization.json";
    pub const LABEL_CODEC_FILE: &'static str = "label_encoder.json";

    /// Default file names inside `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        ArtifactPaths {
            classifier: dir.join(Self::CLASSIFIER_FILE),
            adapter: dir.join(Self::ADAPTER_FILE),
            label_codec: dir.join(Self::LABEL_CODEC_FILE),
        }
    }
}

/// The three artifacts a request needs, checked for compatibility.
#[derive(Clone, Debug)]
pub struct EngineContext {
    adapter: Arc<dyn FeatureAdapter>,
    classifier: Arc<dyn IntentClassifier>,
    codec: Arc<LabelCodec>,
}

impl EngineContext {
    /// Assemble a context, failing with [`SapaError::ResourceLoad`] if the
    /// artifacts do not fit together.
    pub fn new(
        adapter: Arc<dyn FeatureAdapter>,
        classifier: Arc<dyn IntentClassifier>,
        codec: LabelCodec,
    ) -> Result<Self> {
        if !adapter.is_fitted() {
            return Err(SapaError::resource_load(format!(
                "{} feature adapter is not fitted",
                adapter.name()
            )));
        }
        codec.check()?;

        let produced = adapter.output_shape();
        let expected = classifier.input_shape();
        if produced.kind != expected.kind {
            return Err(SapaError::resource_load(format!(
                "{} adapter produces {:?} features but {} classifier expects {:?}",
                adapter.name(),
                produced.kind,
                classifier.name(),
                expected.kind
            )));
        }
        if produced.dimension != expected.dimension {
            return Err(SapaError::resource_load(format!(
                "{} adapter output dimension {} does not match {} classifier input dimension {}",
                adapter.name(),
                produced.dimension,
                classifier.name(),
                expected.dimension
            )));
        }
        if classifier.n_classes() != codec.len() {
            return Err(SapaError::resource_load(format!(
                "{} classifier scores {} classes but label codec has {}",
                classifier.name(),
                classifier.n_classes(),
                codec.len()
            )));
        }

        Ok(EngineContext {
            adapter,
            classifier,
            codec: Arc::new(codec),
        })
    }

    /// Load and check all three artifacts.
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let adapter = read_artifact::<AdapterArtifact>(&paths.adapter)?.into_adapter()?;
        let classifier =
            read_artifact::<ClassifierArtifact>(&paths.classifier)?.into_classifier()?;
        let codec: LabelCodec = read_artifact(&paths.label_codec)?;

        let context = Self::new(adapter, classifier, codec)?;
        info!(
            "loaded {} classifier with {} adapter ({} classes) from {}",
            context.classifier.name(),
            context.adapter.name(),
            context.codec.len(),
            paths.classifier.parent().unwrap_or(Path::new(".")).display()
        );
        Ok(context)
    }

    pub fn adapter(&self) -> &dyn FeatureAdapter {
        self.adapter.as_ref()
    }

    pub fn classifier(&self) -> &dyn IntentClassifier {
        self.classifier.as_ref()
    }

    pub fn codec(&self) -> &LabelCodec {
        &self.codec
    }
}

/// Load-once holder for an [`EngineContext`].
///
/// The first successful load is kept for the life of the cell. Concurrent
/// first callers wait on a lock so the loader runs only once. A failed load
/// is not stored, so a later call retries.
#[derive(Debug, Default)]
pub struct ContextCell {
    context: OnceLock<Arc<EngineContext>>,
    init: Mutex<()>,
}

impl ContextCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// The loaded context, if any.
    pub fn get(&self) -> Option<Arc<EngineContext>> {
        self.context.get().cloned()
    }

    /// Return the loaded context, running `load` if nothing is loaded yet.
    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<EngineContext>>
    where
        F: FnOnce() -> Result<EngineContext>,
    {
        if let Some(context) = self.context.get() {
            return Ok(Arc::clone(context));
        }

        let _guard = self.init.lock();
        if let Some(context) = self.context.get() {
            return Ok(Arc::clone(context));
        }

        let context = Arc::new(load()?);
        // Only this thread sets the cell while the guard is held.
        let _ = self.context.set(Arc::clone(&context));
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use tempfile::TempDir;

    use super::*;
    use crate::ml::features::FeatureKind;

    fn vectorizer() -> TfIdfVectorizer {
        let mut vectorizer = TfIdfVectorizer::new();
        vectorizer.fit(&["hi", "jadwal kuliah"]).unwrap();
        vectorizer
    }

    fn context() -> EngineContext {
        let vectorizer = vectorizer();
        let classifier =
            CentroidClassifier::fit(&[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 1.0]], &[0, 1], 2)
                .unwrap();
        EngineContext::new(
            Arc::new(vectorizer),
            Arc::new(classifier),
            LabelCodec::fit(["greeting", "jadwal"]),
        )
        .unwrap()
    }

    #[test]
    fn test_write_and_load_json_and_bin() {
        let dir = TempDir::new().unwrap();
        let vectorizer = vectorizer();
        let classifier =
            CentroidClassifier::fit(&[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 1.0]], &[0, 1], 2)
                .unwrap();

        let paths = ArtifactPaths {
            classifier: dir.path().join("intent_classifier.bin"),
            adapter: dir.path().join("text_vectorization.json"),
            label_codec: dir.path().join("label_encoder.json"),
        };
        write_artifact(&paths.adapter, &AdapterArtifact::Tfidf(vectorizer)).unwrap();
        write_artifact(&paths.classifier, &ClassifierArtifact::Centroid(classifier)).unwrap();
        write_artifact(&paths.label_codec, &LabelCodec::fit(["greeting", "jadwal"])).unwrap();

        let context = EngineContext::load(&paths).unwrap();
        assert_eq!(context.codec().len(), 2);
        let features = context.adapter().transform("hi").unwrap();
        let prediction = context.classifier().predict(&features).unwrap();
        assert_eq!(context.codec().decode(prediction.index).unwrap(), "greeting");
    }

    #[test]
    fn test_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let err = EngineContext::load(&ArtifactPaths::in_dir(dir.path())).unwrap_err();
        assert!(matches!(err, SapaError::ResourceLoad(_)));
    }

    #[test]
    fn test_corrupt_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("label_encoder.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_artifact::<LabelCodec>(&path).unwrap_err();
        assert!(matches!(err, SapaError::ResourceLoad(_)));
    }

    #[test]
    fn test_format_version_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("label_encoder.json");
        std::fs::write(
            &path,
            r#"{"format_version":99,"created_at":"2024-01-01T00:00:00Z","artifact":{"classes":["a"]}}"#,
        )
        .unwrap();
        let err = read_artifact::<LabelCodec>(&path).unwrap_err();
        assert!(err.to_string().contains("format version 99"));
    }

    #[test]
    fn test_incompatible_artifacts() {
        let classifier = Arc::new(LinearClassifier::new(vec![vec![1.0; 5]], vec![0.0]).unwrap());
        let err = EngineContext::new(
            Arc::new(vectorizer()),
            classifier,
            LabelCodec::fit(["greeting"]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("dimension"));

        let classifier =
            Arc::new(LinearClassifier::new(vec![vec![1.0; 3], vec![0.0; 3]], vec![0.0, 0.0]).unwrap());
        let err = EngineContext::new(
            Arc::new(vectorizer()),
            classifier,
            LabelCodec::fit(["greeting"]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("classes"));

        let mut encoder = SequenceEncoder::new(4);
        encoder.fit(&["hi", "jadwal kuliah"]).unwrap();
        let classifier = Arc::new(LinearClassifier::new(vec![vec![1.0; 5]], vec![0.0]).unwrap());
        let err = EngineContext::new(Arc::new(encoder), classifier, LabelCodec::fit(["greeting"]))
            .unwrap_err();
        assert!(matches!(err, SapaError::ResourceLoad(_)));
    }

    #[test]
    fn test_unfitted_adapter_rejected() {
        let err = AdapterArtifact::Tfidf(TfIdfVectorizer::new())
            .into_adapter()
            .unwrap_err();
        assert!(matches!(err, SapaError::ResourceLoad(_)));
    }

    #[test]
    fn test_context_cell_loads_once() {
        let cell = Arc::new(ContextCell::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let loads = Arc::clone(&loads);
                thread::spawn(move || {
                    cell.get_or_load(|| {
                        loads.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(20));
                        Ok(context())
                    })
                    .map(|context| context.codec().len())
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), 2);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_context_cell_retries_after_failure() {
        let cell = ContextCell::new();
        let err = cell
            .get_or_load(|| Err(SapaError::resource_load("missing")))
            .unwrap_err();
        assert!(matches!(err, SapaError::ResourceLoad(_)));
        assert!(cell.get().is_none());

        let context = cell.get_or_load(|| Ok(context())).unwrap();
        assert!(Arc::ptr_eq(&context, &cell.get().unwrap()));
        let features = context.adapter().transform("jadwal").unwrap();
        assert_eq!(features.kind(), FeatureKind::Dense);
    }
}
