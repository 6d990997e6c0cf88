//! Intent to response resolution.
//!
//! [`IntentResponseMap`] holds one canned reply per intent. It is built from
//! `(intent, response)` pairs where a later pair for the same intent replaces
//! the earlier one. Overrides are counted and logged, since duplicated intents
//! in source data are more often a data problem than a deliberate choice.
//!
//! [`ResponseResolver`] looks an intent up and falls back to a fixed reply
//! when it is missing, so a caller always has something to say.

use std::path::Path;

use ahash::AHashMap;
use log::{debug, info, warn};

use crate::dataset::Dataset;
use crate::error::{Result, SapaError};

/// Intent label to response text.
#[derive(Clone, Debug, Default)]
pub struct IntentResponseMap {
    responses: AHashMap<String, String>,
    overridden: usize,
}

impl IntentResponseMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs, last write wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Self::new();
        for (intent, response) in pairs {
            map.insert(intent, response);
        }
        if map.overridden > 0 {
            warn!(
                "{} duplicate intent rows overrode earlier responses",
                map.overridden
            );
        }
        map
    }

    /// Build from the `Intent` and `Respon(se)` columns of a dataset.
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        Ok(Self::from_pairs(dataset.responses()?))
    }

    /// Read a dataset file and build from it.
    pub fn load(path: &Path) -> Result<Self> {
        let map = Self::from_dataset(&Dataset::read(path, None)?)?;
        if map.is_empty() {
            return Err(SapaError::resource_load(format!(
                "dataset '{}' has no intent responses",
                path.display()
            )));
        }
        info!(
            "loaded {} intent responses from '{}'",
            map.len(),
            path.display()
        );
        Ok(map)
    }

    /// Insert a response, replacing any earlier response for the intent.
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, intent: K, response: V) {
        let intent = intent.into();
        let response = response.into();
        if let Some(previous) = self.responses.get(&intent) {
            debug!("intent {intent:?}: response {previous:?} replaced by {response:?}");
            self.overridden += 1;
        }
        self.responses.insert(intent, response);
    }

    pub fn get(&self, intent: &str) -> Option<&str> {
        self.responses.get(intent).map(String::as_str)
    }

    pub fn contains(&self, intent: &str) -> bool {
        self.responses.contains_key(intent)
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Number of inserts that replaced an existing response.
    pub fn overridden(&self) -> usize {
        self.overridden
    }

    /// Intents in sorted order.
    pub fn intents(&self) -> Vec<&str> {
        let mut intents: Vec<&str> = self.responses.keys().map(String::as_str).collect();
        intents.sort_unstable();
        intents
    }
}

/// Resolves intents to replies with a fixed fallback.
#[derive(Clone, Debug)]
pub struct ResponseResolver {
    responses: IntentResponseMap,
    fallback: String,
}

impl ResponseResolver {
    pub fn new<S: Into<String>>(responses: IntentResponseMap, fallback: S) -> Self {
        ResponseResolver {
            responses,
            fallback: fallback.into(),
        }
    }

    /// Response for `intent`, or the fallback if it has none.
    pub fn resolve(&self, intent: &str) -> &str {
        self.responses.get(intent).unwrap_or(self.fallback.as_str())
    }

    /// Response for `intent`, failing with [`SapaError::UnknownIntent`] if it
    /// has none.
    pub fn lookup(&self, intent: &str) -> Result<&str> {
        self.responses
            .get(intent)
            .ok_or_else(|| SapaError::unknown_intent(intent))
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn responses(&self) -> &IntentResponseMap {
        &self.responses
    }
}
