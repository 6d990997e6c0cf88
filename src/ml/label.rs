//! Mapping between class indices and intent labels.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SapaError};

/// Fitted class index <-> intent label mapping.
///
/// Classes are stored sorted and unique, so index `i` is the `i`-th label in
/// lexical order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCodec {
    classes: Vec<String>,
}

impl LabelCodec {
    /// Fit from the labels seen in training data.
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = labels.into_iter().map(Into::into).collect();
        classes.sort();
        classes.dedup();
        LabelCodec { classes }
    }

    /// Class index of `label`.
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .ok()
    }

    /// Intent label of class `index`.
    pub fn decode(&self, index: usize) -> Result<&str> {
        self.classes.get(index).map(String::as_str).ok_or_else(|| {
            SapaError::prediction(format!(
                "class index {index} outside label codec of {} classes",
                self.classes.len()
            ))
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Check internal consistency of a deserialized codec.
    pub fn check(&self) -> Result<()> {
        if self.classes.is_empty() {
            return Err(SapaError::resource_load("label codec has no classes"));
        }
        if self.classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SapaError::resource_load(
                "label codec classes must be sorted and unique",
            ));
        }
        Ok(())
    }
}
