//! Global summaries and their nested JSON persistence.
//!
//! Terms are flat `"<attribute>.<modality>"` keys in memory and are nested
//! as `attribute -> modality -> degree` on disk.

use crate::error::{Result, SummaryError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// On-disk shape: attribute -> modality -> degree.
pub type NestedDegrees = BTreeMap<String, BTreeMap<String, f64>>;

/// Splits a term at its first `.` into `(attribute, modality)`.
pub fn split_term(term: &str) -> Result<(&str, &str)> {
    match term.split_once('.') {
        Some((attribute, modality)) if !attribute.is_empty() && !modality.is_empty() => {
            Ok((attribute, modality))
        }
        _ => Err(SummaryError::InvalidTerm(term.to_string())),
    }
}

pub fn join_term(attribute: &str, modality: &str) -> String {
    format!("{attribute}.{modality}")
}

/// Appends `.json` unless the path already ends with it.
pub fn with_json_extension(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.extension().is_some_and(|ext| ext == "json") {
        path.to_path_buf()
    } else {
        let mut raw = path.as_os_str().to_os_string();
        raw.push(".json");
        PathBuf::from(raw)
    }
}

/// Term -> degree mapping, every degree in [0, 1].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    degrees: BTreeMap<String, f64>,
}

impl Summary {
    pub fn from_degrees(degrees: BTreeMap<String, f64>) -> Self {
        Self { degrees }
    }

    /// Degree of `term`, 0 when the term is absent.
    pub fn degree(&self, term: &str) -> f64 {
        self.degrees.get(term).copied().unwrap_or(0.0)
    }

    pub fn get(&self, term: &str) -> Option<f64> {
        self.degrees.get(term).copied()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.degrees.contains_key(term)
    }

    pub fn len(&self) -> usize {
        self.degrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.degrees.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.degrees.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.degrees.iter().map(|(term, &degree)| (term.as_str(), degree))
    }

    /// Keeps only the terms whose degree is strictly greater than `alpha`.
    pub fn retain_above(&mut self, alpha: f64) {
        self.degrees.retain(|_, degree| *degree > alpha);
    }

    pub fn to_nested(&self) -> Result<NestedDegrees> {
        let mut nested = NestedDegrees::new();
        for (term, &degree) in &self.degrees {
            let (attribute, modality) = split_term(term)?;
            nested
                .entry(attribute.to_string())
                .or_default()
                .insert(modality.to_string(), degree);
        }
        Ok(nested)
    }

    pub fn from_nested(nested: NestedDegrees) -> Self {
        let degrees = nested
            .into_iter()
            .flat_map(|(attribute, modalities)| {
                modalities
                    .into_iter()
                    .map(move |(modality, degree)| (join_term(&attribute, &modality), degree))
            })
            .collect();
        Self { degrees }
    }

    /// Writes the nested JSON form, appending `.json` to `path` when missing.
    ///
    /// Returns the path actually written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = with_json_extension(path);
        let json = serde_json::to_string_pretty(&self.to_nested()?)
            .map_err(SummaryError::JsonEncode)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SummaryError::from_io(parent, e))?;
        }
        fs::write(&path, json).map_err(|e| SummaryError::from_io(&path, e))?;
        info!(path = %path.display(), terms = self.len(), "Successfully saved summary");
        Ok(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| SummaryError::from_io(path, e))?;
        let nested: NestedDegrees =
            serde_json::from_str(&content).map_err(|source| SummaryError::JsonDecode {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_nested(nested))
    }
}

impl FromIterator<(String, f64)> for Summary {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            degrees: iter.into_iter().collect(),
        }
    }
}

/// Alpha-filtered summary over the records satisfying a premise.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalSummary {
    pub summary: Summary,
    pub premise: Vec<String>,
    /// Number of records that satisfied the whole premise conjunction.
    pub total_satisfying_count: usize,
}

/// Association degree of every term of the unconditional summary.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationTable {
    /// Terms extracted from the conditional summary as practically certain.
    pub premise: Vec<String>,
    pub degrees: Summary,
}

impl AssociationTable {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        self.degrees.save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delay_summary() -> Summary {
        [
            ("Delay.high".to_string(), 0.5),
            ("Delay.low".to_string(), 0.5),
            ("Distance.short".to_string(), 0.25),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_split_term_at_first_dot() {
        assert_eq!(split_term("Delay.high").unwrap(), ("Delay", "high"));
        assert_eq!(split_term("Delay.very.high").unwrap(), ("Delay", "very.high"));
        assert!(split_term("Delay").is_err());
        assert!(split_term(".high").is_err());
    }

    #[test]
    fn test_nested_shape() {
        let nested = delay_summary().to_nested().unwrap();
        assert_eq!(nested.len(), 2);
        assert_eq!(nested["Delay"]["high"], 0.5);
        assert_eq!(nested["Distance"]["short"], 0.25);
        assert_eq!(Summary::from_nested(nested), delay_summary());
    }

    #[test]
    fn test_json_extension_appended_once() {
        assert_eq!(with_json_extension("Data/rewrite_mean"), PathBuf::from("Data/rewrite_mean.json"));
        assert_eq!(with_json_extension("assoc.json"), PathBuf::from("assoc.json"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let written = delay_summary().save(dir.path().join("out/rewrite_mean")).unwrap();
        assert!(written.ends_with("out/rewrite_mean.json"));

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&written).unwrap()).unwrap();
        assert_eq!(raw["Delay"]["low"], 0.5);

        assert_eq!(Summary::load(&written).unwrap(), delay_summary());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Summary::load(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(SummaryError::FileNotFound { .. })));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            Summary::load(&broken),
            Err(SummaryError::JsonDecode { .. })
        ));
    }

    #[test]
    fn test_retain_above_is_strict() {
        let mut summary = delay_summary();
        summary.retain_above(0.5);
        assert_eq!(summary.len(), 0);

        let mut summary = delay_summary();
        summary.retain_above(0.25);
        assert!(summary.contains("Delay.high"));
        assert!(!summary.contains("Distance.short"));
    }
}
