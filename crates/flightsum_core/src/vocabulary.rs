//! Fuzzy vocabulary and record rewriting.
//!
//! A vocabulary names, for each dataset attribute, a set of linguistic
//! modalities with a membership function. Rewriting a raw record yields one
//! degree per `"<attribute>.<modality>"` term.
//!
//! Vocabulary files are TOML:
//!
//! ```toml
//! [[attributes]]
//! name = "Delay"
//! column = "ArrDelay"
//!
//! [[attributes.modalities]]
//! name = "high"
//! kind = "trapezoid"
//! points = [15.0, 60.0, 1e9, 1e9]
//! ```

use crate::error::{Result, SummaryError};
use crate::summary::join_term;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Term -> degree for one record. Absent terms have degree 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewrittenRecord {
    degrees: HashMap<String, f64>,
}

impl RewrittenRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, term: impl Into<String>, degree: f64) {
        self.degrees.insert(term.into(), degree);
    }

    pub fn degree(&self, term: &str) -> f64 {
        self.degrees.get(term).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.degrees.iter().map(|(term, &degree)| (term.as_str(), degree))
    }

    pub fn len(&self) -> usize {
        self.degrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.degrees.is_empty()
    }
}

impl<T: Into<String>> FromIterator<(T, f64)> for RewrittenRecord {
    fn from_iter<I: IntoIterator<Item = (T, f64)>>(iter: I) -> Self {
        Self {
            degrees: iter
                .into_iter()
                .map(|(term, degree)| (term.into(), degree))
                .collect(),
        }
    }
}

/// Turns one raw record into term degrees. Shared by every worker.
pub trait Rewriter: Sync {
    fn rewrite(&self, record: &StringRecord) -> Result<RewrittenRecord>;
}

/// Membership function of one modality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Membership {
    /// Degree 1 on `[b, c]`, linear ramps on `(a, b)` and `(c, d)`, 0 elsewhere.
    Trapezoid { points: [f64; 4] },
    /// Degree 1 when the field equals one of `values`.
    Category { values: Vec<String> },
}

impl Membership {
    pub fn trapezoid(a: f64, b: f64, c: f64, d: f64) -> Self {
        Membership::Trapezoid {
            points: [a, b, c, d],
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Membership::Trapezoid { points } => {
                if points.iter().any(|p| p.is_nan()) {
                    return Err("trapezoid points must be numbers".to_string());
                }
                if points.windows(2).any(|w| w[0] > w[1]) {
                    return Err(format!("trapezoid points {points:?} are not non-decreasing"));
                }
                Ok(())
            }
            Membership::Category { values } if values.is_empty() => {
                Err("category modality needs at least one value".to_string())
            }
            Membership::Category { .. } => Ok(()),
        }
    }

    /// Degree of a raw field, `None` when the field cannot be read as this kind.
    pub fn degree(&self, raw: &str) -> Option<f64> {
        match self {
            Membership::Trapezoid { points } => {
                let x: f64 = raw.parse().ok().filter(|x: &f64| x.is_finite())?;
                Some(trapezoid(*points, x))
            }
            Membership::Category { values } => {
                Some(if values.iter().any(|v| v == raw) { 1.0 } else { 0.0 })
            }
        }
    }
}

fn trapezoid([a, b, c, d]: [f64; 4], x: f64) -> f64 {
    if x >= b && x <= c {
        1.0
    } else if x <= a || x >= d {
        0.0
    } else if x < b {
        (x - a) / (b - a)
    } else {
        (d - x) / (d - c)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modality {
    pub name: String,
    #[serde(flatten)]
    pub membership: Membership,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    /// Header name of the dataset column read by this attribute
    pub column: String,
    pub modalities: Vec<Modality>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub attributes: Vec<Attribute>,
}

impl Vocabulary {
    pub fn from_toml(content: &str) -> Result<Self> {
        let vocabulary: Vocabulary =
            toml::from_str(content).map_err(|e| SummaryError::Vocabulary(e.to_string()))?;
        vocabulary.validate()?;
        Ok(vocabulary)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| SummaryError::from_io(path, e))?;
        Self::from_toml(&content)
    }

    fn validate(&self) -> Result<()> {
        for attribute in &self.attributes {
            if attribute.name.is_empty() || attribute.name.contains('.') {
                return Err(SummaryError::Vocabulary(format!(
                    "attribute name `{}` must be non-empty and free of `.`",
                    attribute.name
                )));
            }
            for modality in &attribute.modalities {
                if modality.name.is_empty() {
                    return Err(SummaryError::Vocabulary(format!(
                        "attribute `{}` has an unnamed modality",
                        attribute.name
                    )));
                }
                modality.membership.validate().map_err(|reason| {
                    SummaryError::Vocabulary(format!(
                        "{}: {reason}",
                        join_term(&attribute.name, &modality.name)
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Every term this vocabulary can emit.
    pub fn terms(&self) -> Vec<String> {
        self.attributes
            .iter()
            .flat_map(|a| a.modalities.iter().map(|m| join_term(&a.name, &m.name)))
            .collect()
    }

    /// Resolves each attribute's column against the dataset header.
    pub fn bind(&self, headers: &StringRecord) -> Result<RecordRewriter> {
        let attributes = self
            .attributes
            .iter()
            .map(|attribute| {
                let column = headers
                    .iter()
                    .position(|h| h == attribute.column)
                    .ok_or_else(|| {
                        SummaryError::Vocabulary(format!(
                            "column `{}` of attribute `{}` is not in the dataset header",
                            attribute.column, attribute.name
                        ))
                    })?;
                let modalities = attribute
                    .modalities
                    .iter()
                    .map(|m| (join_term(&attribute.name, &m.name), m.membership.clone()))
                    .collect();
                Ok(BoundAttribute { column, modalities })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RecordRewriter { attributes })
    }
}

#[derive(Debug, Clone)]
struct BoundAttribute {
    column: usize,
    modalities: Vec<(String, Membership)>,
}

/// A vocabulary bound to column positions.
#[derive(Debug, Clone)]
pub struct RecordRewriter {
    attributes: Vec<BoundAttribute>,
}

impl Rewriter for RecordRewriter {
    fn rewrite(&self, record: &StringRecord) -> Result<RewrittenRecord> {
        let mut rewritten = RewrittenRecord::new();
        for attribute in &self.attributes {
            let raw = match record.get(attribute.column).map(str::trim) {
                Some(raw) if !raw.is_empty() && raw != "NA" => raw,
                _ => continue,
            };
            // An unparseable numeric field means the whole attribute does not apply.
            let degrees: Option<Vec<(&String, f64)>> = attribute
                .modalities
                .iter()
                .map(|(term, membership)| membership.degree(raw).map(|degree| (term, degree)))
                .collect();
            for (term, degree) in degrees.into_iter().flatten() {
                rewritten.insert(term.clone(), degree);
            }
        }
        Ok(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOCABULARY: &str = r#"
[[attributes]]
name = "Delay"
column = "ArrDelay"

[[attributes.modalities]]
name = "low"
kind = "trapezoid"
points = [-1e9, -1e9, 5.0, 15.0]

[[attributes.modalities]]
name = "high"
kind = "trapezoid"
points = [5.0, 15.0, 1e9, 1e9]

[[attributes]]
name = "Carrier"
column = "UniqueCarrier"

[[attributes.modalities]]
name = "legacy"
kind = "category"
values = ["AA", "UA", "DL"]
"#;

    fn headers() -> StringRecord {
        StringRecord::from(vec!["Year", "UniqueCarrier", "ArrDelay"])
    }

    #[test]
    fn test_trapezoid_shape() {
        let m = Membership::trapezoid(0.0, 2.0, 8.0, 10.0);
        assert_eq!(m.degree("-1"), Some(0.0));
        assert_eq!(m.degree("0"), Some(0.0));
        assert_eq!(m.degree("1"), Some(0.5));
        assert_eq!(m.degree("5"), Some(1.0));
        assert_eq!(m.degree("9"), Some(0.5));
        assert_eq!(m.degree("10"), Some(0.0));
        assert_eq!(m.degree("abc"), None);
    }

    #[test]
    fn test_trapezoid_shoulders() {
        let left = Membership::trapezoid(0.0, 0.0, 5.0, 10.0);
        assert_eq!(left.degree("0"), Some(1.0));
        let right = Membership::trapezoid(0.0, 5.0, 10.0, 10.0);
        assert_eq!(right.degree("10"), Some(1.0));
    }

    #[test]
    fn test_rewrite_record() {
        let vocabulary = Vocabulary::from_toml(VOCABULARY).unwrap();
        assert_eq!(vocabulary.terms().len(), 3);
        let rewriter = vocabulary.bind(&headers()).unwrap();

        let record = StringRecord::from(vec!["2008", "AA", "10"]);
        let rewritten = rewriter.rewrite(&record).unwrap();
        assert_eq!(rewritten.degree("Delay.low"), 0.5);
        assert_eq!(rewritten.degree("Delay.high"), 0.5);
        assert_eq!(rewritten.degree("Carrier.legacy"), 1.0);
    }

    #[test]
    fn test_missing_field_does_not_apply() {
        let rewriter = Vocabulary::from_toml(VOCABULARY)
            .unwrap()
            .bind(&headers())
            .unwrap();
        let record = StringRecord::from(vec!["2008", "WN", "NA"]);
        let rewritten = rewriter.rewrite(&record).unwrap();
        assert_eq!(rewritten.len(), 1);
        assert_eq!(rewritten.degree("Carrier.legacy"), 0.0);
        assert_eq!(rewritten.degree("Delay.high"), 0.0);
    }

    #[test]
    fn test_unknown_column_rejected() {
        let vocabulary = Vocabulary::from_toml(VOCABULARY).unwrap();
        let err = vocabulary
            .bind(&StringRecord::from(vec!["Year", "ArrDelay"]))
            .unwrap_err();
        assert!(matches!(err, SummaryError::Vocabulary(_)));
    }

    #[test]
    fn test_decreasing_points_rejected() {
        let bad = r#"
[[attributes]]
name = "Delay"
column = "ArrDelay"

[[attributes.modalities]]
name = "odd"
kind = "trapezoid"
points = [10.0, 5.0, 20.0, 30.0]
"#;
        assert!(matches!(
            Vocabulary::from_toml(bad),
            Err(SummaryError::Vocabulary(_))
        ));
    }
}
