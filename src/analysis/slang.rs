//! Slang dictionary for token-level rewriting of informal words.
//!
//! The dictionary maps a lowercase token (`"mhs"`) to its canonical form
//! (`"mahasiswa"`). It is built from a small built-in table merged with rows
//! from an optional external two-column file. Loading the external file is
//! best-effort: a missing or malformed file is logged as a warning and the
//! built-in table is used on its own.
//!
//! Replacements are canonicalized when the dictionary is built: they are
//! lowercased, stripped of ASCII punctuation and resolved through the table
//! until none of their words is itself a key. A chain that never settles
//! (`"a" -> "b"`, `"b" -> "a"`) is dropped. This keeps slang substitution a
//! fixed point, so normalizing already-normalized text changes nothing.
//!
//! # File format
//!
//! ```text
//! slang,formal
//! mhs,mahasiswa
//! gmn,bagaimana
//! ```
//!
//! Comma-delimited, or tab-delimited when the file ends in `.tsv`. The header
//! row is optional. Rows with fewer than two columns are skipped.
//!
//! # Examples
//!
//! ```
//! use sapa::analysis::slang::SlangDictionary;
//!
//! let slang = SlangDictionary::new();
//! assert_eq!(slang.resolve("MHS"), "mahasiswa");
//! assert_eq!(slang.resolve("kampus"), "kampus");
//! ```

use std::fs::File;
use std::path::Path;

use ahash::AHashMap;
use csv::ReaderBuilder;
use log::{debug, info, warn};

use crate::error::{Result, SapaError};

/// Built-in slang table, Indonesian campus chat abbreviations.
const DEFAULT_SLANG: &[(&str, &str)] = &[
    ("mhs", "mahasiswa"),
    ("maba", "mahasiswa baru"),
    ("dosen2", "dosen"),
    ("yg", "yang"),
    ("ga", "tidak"),
    ("gak", "tidak"),
    ("gk", "tidak"),
    ("tdk", "tidak"),
    ("dgn", "dengan"),
    ("utk", "untuk"),
    ("krn", "karena"),
    ("jg", "juga"),
    ("sdh", "sudah"),
    ("udh", "sudah"),
    ("blm", "belum"),
    ("gmn", "bagaimana"),
    ("gimana", "bagaimana"),
    ("dmn", "dimana"),
    ("kpn", "kapan"),
    ("tp", "tapi"),
    ("sy", "saya"),
    ("aq", "saya"),
    ("thx", "terima kasih"),
    ("makasih", "terima kasih"),
];

/// Header cells recognized in the first row of a slang file.
const SOURCE_HEADERS: &[&str] = &["slang", "source", "token", "word", "kata", "from", "key"];
const TARGET_HEADERS: &[&str] = &[
    "formal",
    "replacement",
    "canonical",
    "baku",
    "to",
    "value",
    "normal",
];

/// Maximum number of substitution rounds when resolving replacement chains.
const MAX_CHAIN_DEPTH: usize = 8;

/// Mapping from lowercase slang token to canonical replacement.
#[derive(Clone, Debug, Default)]
pub struct SlangDictionary {
    entries: AHashMap<String, String>,
}

impl SlangDictionary {
    /// Create a dictionary holding only the built-in table.
    pub fn new() -> Self {
        Self::from_pairs(DEFAULT_SLANG.iter().map(|&(k, v)| (k, v)))
    }

    /// Create an empty dictionary. Every token resolves to itself.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a dictionary from `(source, replacement)` pairs.
    ///
    /// Later pairs win over earlier pairs with the same key.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut entries = AHashMap::new();
        for (key, value) in pairs {
            if let Some(key) = canonical_key(key.as_ref()) {
                entries.insert(key, canonical_value(value.as_ref()));
            }
        }
        SlangDictionary {
            entries: resolve_chains(entries),
        }
    }

    /// Build the built-in table merged with an optional external file.
    ///
    /// Never fails. A missing or malformed file is reported with `warn!`
    /// and only the built-in table is used.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::new();
        };

        match Self::read_table(path) {
            Ok(rows) => {
                info!(
                    "loaded {} slang rows from {}",
                    rows.len(),
                    path.display()
                );
                let defaults = DEFAULT_SLANG
                    .iter()
                    .map(|&(k, v)| (k.to_string(), v.to_string()));
                Self::from_pairs(defaults.chain(rows))
            }
            Err(e) => {
                warn!(
                    "slang table {} unavailable, using built-in defaults: {e}",
                    path.display()
                );
                Self::new()
            }
        }
    }

    /// Read the rows of a slang file.
    ///
    /// Rows with fewer than two columns or an empty source cell are skipped.
    /// A header row is skipped when both of its cells are known header names.
    pub fn read_table(path: &Path) -> Result<Vec<(String, String)>> {
        let file = File::open(path).map_err(|e| {
            SapaError::resource_load(format!(
                "failed to open slang table '{}': {e}",
                path.display()
            ))
        })?;

        let delimiter = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(file);

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() < 2 {
                continue;
            }
            let source = record[0].trim();
            let target = record[1].trim();
            if source.is_empty() {
                continue;
            }
            if line == 0 && is_header(source, target) {
                debug!("skipping slang table header row");
                continue;
            }
            rows.push((source.to_string(), target.to_string()));
        }

        Ok(rows)
    }

    /// A copy of this dictionary without `keys`.
    pub fn without<S: AsRef<str>>(&self, keys: &[S]) -> Self {
        let mut entries = self.entries.clone();
        for key in keys {
            entries.remove(key.as_ref());
        }
        SlangDictionary { entries }
    }

    /// Resolve a token to its canonical form, or return it unchanged.
    ///
    /// The lookup lowercases the token before matching.
    pub fn resolve(&self, token: &str) -> String {
        match self.get(token) {
            Some(replacement) => replacement.to_string(),
            None => token.to_string(),
        }
    }

    /// Look up the replacement for a token, if it is in the table.
    pub fn get(&self, token: &str) -> Option<&str> {
        if let Some(replacement) = self.entries.get(token) {
            return Some(replacement.as_str());
        }
        if token.chars().any(char::is_uppercase) {
            return self.entries.get(&token.to_lowercase()).map(String::as_str);
        }
        None
    }

    /// Check if a token has a replacement.
    pub fn contains(&self, token: &str) -> bool {
        self.get(token).is_some()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(source, replacement)` entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn is_header(source: &str, target: &str) -> bool {
    let source = source.to_lowercase();
    let target = target.to_lowercase();
    SOURCE_HEADERS.contains(&source.as_str()) && TARGET_HEADERS.contains(&target.as_str())
}

/// Keys are trimmed and lowercased. A key with inner whitespace can never
/// match a single token and is rejected.
fn canonical_key(key: &str) -> Option<String> {
    let key = key.trim().to_lowercase();
    if key.is_empty() || key.contains(char::is_whitespace) {
        if !key.is_empty() {
            debug!("ignoring multi-word slang key '{key}'");
        }
        return None;
    }
    Some(key)
}

/// Replacements are lowercased, stripped of ASCII punctuation and collapsed to
/// single spaces, the same shape normalized text has.
fn canonical_value(value: &str) -> String {
    let lowered = value.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn resolve_chains(entries: AHashMap<String, String>) -> AHashMap<String, String> {
    let mut resolved = AHashMap::with_capacity(entries.len());
    for (key, value) in &entries {
        if value == key {
            continue;
        }
        match expand(value, &entries) {
            Some(expanded) => {
                resolved.insert(key.clone(), expanded);
            }
            None => warn!("dropping slang entry '{key}': replacement chain does not terminate"),
        }
    }
    resolved
}

fn expand(value: &str, entries: &AHashMap<String, String>) -> Option<String> {
    let mut current = value.to_string();
    for _ in 0..MAX_CHAIN_DEPTH {
        let next = current
            .split_whitespace()
            .map(|word| match entries.get(word) {
                Some(replacement) if replacement != word => replacement.as_str(),
                _ => word,
            })
            .collect::<Vec<_>>()
            .join(" ");
        if next == current {
            return Some(current);
        }
        current = next;
    }
    None
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_table() {
        let slang = SlangDictionary::new();
        assert_eq!(slang.resolve("mhs"), "mahasiswa");
        assert_eq!(slang.resolve("Gmn"), "bagaimana");
        assert_eq!(slang.resolve("thx"), "terima kasih");
        assert_eq!(slang.resolve("unmatched"), "unmatched");
    }

    #[test]
    fn test_from_pairs_canonicalizes() {
        let slang = SlangDictionary::from_pairs([("  BTW ", "By the WAY!")]);
        assert_eq!(slang.get("btw"), Some("by the way"));
    }

    #[test]
    fn test_later_pairs_win() {
        let slang = SlangDictionary::from_pairs([("u", "you"), ("u", "kamu")]);
        assert_eq!(slang.resolve("u"), "kamu");
    }

    #[test]
    fn test_chains_are_resolved() {
        let slang = SlangDictionary::from_pairs([("gk", "ga"), ("ga", "tidak")]);
        assert_eq!(slang.resolve("gk"), "tidak");
        assert_eq!(slang.resolve("ga"), "tidak");
    }

    #[test]
    fn test_cycles_are_dropped() {
        let slang = SlangDictionary::from_pairs([("a", "b"), ("b", "a"), ("c", "d")]);
        assert!(!slang.contains("a"));
        assert!(!slang.contains("b"));
        assert_eq!(slang.resolve("c"), "d");
    }

    #[test]
    fn test_identity_and_multiword_keys_ignored() {
        let slang = SlangDictionary::from_pairs([("ok", "ok"), ("by the", "x")]);
        assert!(slang.is_empty());
    }

    #[test]
    fn test_load_external_table() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "slang,formal").unwrap();
        writeln!(file, "krs,kartu rencana studi").unwrap();
        writeln!(file, "broken-row").unwrap();
        writeln!(file, " MHS ,mahasiswa aktif").unwrap();
        file.flush().unwrap();

        let slang = SlangDictionary::load(Some(file.path()));
        assert_eq!(slang.resolve("krs"), "kartu rencana studi");
        assert_eq!(slang.resolve("mhs"), "mahasiswa aktif");
        assert!(!slang.contains("slang"));
        assert!(!slang.contains("broken-row"));
        // defaults survive the merge
        assert_eq!(slang.resolve("yg"), "yang");
    }

    #[test]
    fn test_load_tsv_table() {
        let mut file = tempfile::Builder::new().suffix(".tsv").tempfile().unwrap();
        writeln!(file, "bsk\tbesok").unwrap();
        file.flush().unwrap();

        let slang = SlangDictionary::load(Some(file.path()));
        assert_eq!(slang.resolve("bsk"), "besok");
    }

    #[test]
    fn test_missing_table_falls_back() {
        let slang = SlangDictionary::load(Some(Path::new("/nonexistent/slang.csv")));
        assert_eq!(slang.len(), SlangDictionary::new().len());
        assert_eq!(slang.resolve("mhs"), "mahasiswa");
    }
}
