//! Tabular intent dataset reader.
//!
//! A dataset is a UTF-8 CSV (or TSV, by `.tsv` extension) file with a header
//! row. Columns are matched by name, case-insensitively:
//!
//! - `Intent` (required)
//! - `Respon` or `Response`: the canned reply for the intent
//! - a text column (`text`, `question`, `pertanyaan`, `query`, `pattern`, or
//!   a caller-chosen name): an example utterance, used for training and
//!   evaluation
//!
//! Rows with an empty intent are skipped.

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use log::debug;

use crate::error::{Result, SapaError};
use crate::ml::trainer::IntentSample;

const INTENT_HEADERS: &[&str] = &["intent"];
const RESPONSE_HEADERS: &[&str] = &["respon", "response"];
const TEXT_HEADERS: &[&str] = &["text", "question", "pertanyaan", "query", "pattern"];

/// One dataset row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetRow {
    pub intent: String,
    pub response: Option<String>,
    pub text: Option<String>,
}

/// Rows of an intent dataset in file order.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    rows: Vec<DatasetRow>,
    has_responses: bool,
    has_text: bool,
}

fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

fn cell(record: &StringRecord, column: Option<usize>) -> Option<String> {
    column
        .and_then(|idx| record.get(idx))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl Dataset {
    /// Read a dataset file.
    ///
    /// `text_column` overrides the text column name. Fails with
    /// [`SapaError::ResourceLoad`] if the file cannot be read or has no
    /// `Intent` column.
    pub fn read(path: &Path, text_column: Option<&str>) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            SapaError::resource_load(format!("failed to open dataset '{}': {e}", path.display()))
        })?;

        let delimiter = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(file);

        let load_error = |e: csv::Error| {
            SapaError::resource_load(format!("failed to read dataset '{}': {e}", path.display()))
        };

        let headers = reader.headers().map_err(load_error)?.clone();
        let intent_column = find_column(&headers, INTENT_HEADERS).ok_or_else(|| {
            SapaError::resource_load(format!(
                "dataset '{}' has no Intent column",
                path.display()
            ))
        })?;
        let response_column = find_column(&headers, RESPONSE_HEADERS);
        let text_column = match text_column {
            Some(name) => Some(find_column(&headers, &[name]).ok_or_else(|| {
                SapaError::resource_load(format!(
                    "dataset '{}' has no '{name}' column",
                    path.display()
                ))
            })?),
            None => find_column(&headers, TEXT_HEADERS),
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(load_error)?;
            let Some(intent) = cell(&record, Some(intent_column)) else {
                debug!("skipping dataset row without intent: {record:?}");
                continue;
            };
            rows.push(DatasetRow {
                intent,
                response: cell(&record, response_column),
                text: cell(&record, text_column),
            });
        }

        debug!("read {} rows from dataset '{}'", rows.len(), path.display());
        Ok(Dataset {
            rows,
            has_responses: response_column.is_some(),
            has_text: text_column.is_some(),
        })
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(intent, response)` pairs in file order, skipping rows without a
    /// response.
    pub fn responses(&self) -> Result<Vec<(&str, &str)>> {
        if !self.has_responses {
            return Err(SapaError::resource_load(
                "dataset has no Respon or Response column",
            ));
        }
        Ok(self
            .rows
            .iter()
            .filter_map(|row| Some((row.intent.as_str(), row.response.as_deref()?)))
            .collect())
    }

    /// Labelled utterances, skipping rows without text.
    pub fn samples(&self) -> Result<Vec<IntentSample>> {
        if !self.has_text {
            return Err(SapaError::resource_load("dataset has no text column"));
        }
        Ok(self
            .rows
            .iter()
            .filter_map(|row| Some(IntentSample::new(row.text.as_deref()?, row.intent.as_str())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::{Builder, NamedTempFile};

    use super::*;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_responses() {
        let file = write_csv(
            "Intent,Respon\n\
             greeting,Hello! How can I help?\n\
             jadwal,\"Jadwal ada di portal, cek ya\"\n\
             ,orphan\n",
        );
        let dataset = Dataset::read(file.path(), None).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(
            dataset.responses().unwrap(),
            vec![
                ("greeting", "Hello! How can I help?"),
                ("jadwal", "Jadwal ada di portal, cek ya")
            ]
        );
        assert!(dataset.samples().is_err());
    }

    #[test]
    fn test_headers_case_insensitive() {
        let file = write_csv("QUESTION,intent,Response\nhi there,greeting,Hello\n");
        let dataset = Dataset::read(file.path(), None).unwrap();
        assert_eq!(dataset.responses().unwrap(), vec![("greeting", "Hello")]);
        assert_eq!(
            dataset.samples().unwrap(),
            vec![IntentSample::new("hi there", "greeting")]
        );
    }

    #[test]
    fn test_custom_text_column() {
        let file = write_csv("utterance,Intent\nhalo,greeting\n");
        let dataset = Dataset::read(file.path(), Some("Utterance")).unwrap();
        assert_eq!(dataset.samples().unwrap().len(), 1);

        let err = Dataset::read(file.path(), Some("missing")).unwrap_err();
        assert!(matches!(err, SapaError::ResourceLoad(_)));
    }

    #[test]
    fn test_missing_intent_column() {
        let file = write_csv("Label,Respon\ngreeting,Hello\n");
        let err = Dataset::read(file.path(), None).unwrap_err();
        assert!(matches!(err, SapaError::ResourceLoad(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = Dataset::read(Path::new("/nonexistent/dataset.csv"), None).unwrap_err();
        assert!(matches!(err, SapaError::ResourceLoad(_)));
    }

    #[test]
    fn test_short_rows() {
        let file = write_csv("Intent,Respon,text\ngreeting\njadwal,Cek portal\n");
        let dataset = Dataset::read(file.path(), None).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.responses().unwrap(), vec![("jadwal", "Cek portal")]);
        assert!(dataset.samples().unwrap().is_empty());
    }
}
