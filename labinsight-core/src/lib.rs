//! Core data model for laboratory report interpretation.
//!
//! Everything in this crate is a plain value object. Analysis logic lives in
//! `labinsight-engine`; this crate only describes observations, categories,
//! reference tables and the shape of an analysis result.

use std::collections::{btree_map, BTreeMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod category;
mod reference;

pub use category::{display_label, is_known_test, known_tests, Category};
pub use reference::{CriticalBounds, RangeBounds, ReferenceData, ReferenceRange};

/// Tuning knobs for the knowledge enhancement step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    /// How many abnormal findings feed the knowledge query.
    pub max_query_findings: usize,
    /// Number of knowledge passages retrieved per query.
    pub retrieval_top_k: usize,
    /// Maximum characters of retrieved context quoted in the insight text.
    pub insight_context_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_query_findings: 5,
            retrieval_top_k: 3,
            insight_context_chars: 1000,
        }
    }
}

/// Patient sex used to pick sex-specific reference ranges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            _ => Err(LabError::InvalidGender(s.to_string())),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("male"),
            Gender::Female => f.write_str("female"),
        }
    }
}

/// A measured value: numeric, or the raw text when it is not a plain number (titres).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LabValue {
    Numeric(f64),
    Text(String),
}

impl LabValue {
    /// Interpret a captured token. `<`/`>` qualifiers are dropped; anything that
    /// is not digits with an optional decimal point is kept verbatim as text.
    pub fn parse(raw: &str) -> Self {
        let cleaned = raw.replace(['<', '>'], "");
        let cleaned = cleaned.trim();
        let plain_number = !cleaned.is_empty()
            && cleaned.chars().all(|c| c.is_ascii_digit() || c == '.')
            && cleaned.chars().any(|c| c.is_ascii_digit());

        match cleaned.parse::<f64>() {
            Ok(value) if plain_number => LabValue::Numeric(value),
            _ => LabValue::Text(raw.trim().to_string()),
        }
    }

    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            LabValue::Numeric(value) => Some(*value),
            LabValue::Text(_) => None,
        }
    }
}

impl From<f64> for LabValue {
    fn from(value: f64) -> Self {
        LabValue::Numeric(value)
    }
}

impl From<&str> for LabValue {
    fn from(value: &str) -> Self {
        LabValue::Text(value.to_string())
    }
}

impl fmt::Display for LabValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabValue::Numeric(value) => f.write_str(&format_value(*value)),
            LabValue::Text(text) => f.write_str(text),
        }
    }
}

/// Render a number the way it appears in findings (`10`, `1.5`).
pub fn format_value(value: f64) -> String {
    format!("{value}")
}

/// Test name -> value. At most one value per name; later writes overwrite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct ObservationSet(BTreeMap<String, LabValue>);

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unchecked write used by extraction collaborators.
    pub fn insert(
        &mut self,
        test: impl Into<String>,
        value: impl Into<LabValue>,
    ) -> Option<LabValue> {
        self.0.insert(test.into(), value.into())
    }

    /// Correction write: the test must be categorized or have an entry in
    /// `reference`.
    pub fn set(
        &mut self,
        test: &str,
        value: impl Into<LabValue>,
        reference: &ReferenceData,
    ) -> Result<Option<LabValue>, LabError> {
        if !is_known_test(test) && !reference.knows(test) {
            return Err(LabError::UnknownTest(test.to_string()));
        }
        Ok(self.0.insert(test.to_string(), value.into()))
    }

    pub fn remove(&mut self, test: &str) -> Option<LabValue> {
        self.0.remove(test)
    }

    pub fn get(&self, test: &str) -> Option<&LabValue> {
        self.0.get(test)
    }

    /// Numeric value of `test`; `None` when absent or textual.
    pub fn numeric(&self, test: &str) -> Option<f64> {
        self.0.get(test).and_then(LabValue::as_numeric)
    }

    pub fn contains(&self, test: &str) -> bool {
        self.0.contains_key(test)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LabValue)> {
        self.0.iter().map(|(test, value)| (test.as_str(), value))
    }

    /// Numeric observations only, in name order.
    pub fn numeric_iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.iter()
            .filter_map(|(test, value)| value.as_numeric().map(|v| (test, v)))
    }
}

impl FromIterator<(String, LabValue)> for ObservationSet {
    fn from_iter<I: IntoIterator<Item = (String, LabValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<(String, LabValue)> for ObservationSet {
    fn extend<I: IntoIterator<Item = (String, LabValue)>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for ObservationSet {
    type Item = (String, LabValue);
    type IntoIter = btree_map::IntoIter<String, LabValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Observations grouped by category. Only non-empty groups are ever stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct CategorizedSet(BTreeMap<Category, ObservationSet>);

impl CategorizedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: Category, test: impl Into<String>, value: LabValue) {
        self.0.entry(category).or_default().insert(test, value);
    }

    pub fn get(&self, category: Category) -> Option<&ObservationSet> {
        self.0.get(&category).filter(|tests| !tests.is_empty())
    }

    pub fn contains(&self, category: Category) -> bool {
        self.get(category).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &ObservationSet)> {
        self.0
            .iter()
            .filter(|(_, tests)| !tests.is_empty())
            .map(|(category, tests)| (*category, tests))
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.iter().map(|(category, _)| category)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge every group back into one flat set.
    pub fn flatten(&self) -> ObservationSet {
        self.iter()
            .flat_map(|(_, tests)| tests.iter())
            .map(|(test, value)| (test.to_string(), value.clone()))
            .collect()
    }
}

/// Side of a range a value falls on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Low,
    High,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Low => f.write_str("low"),
            Direction::High => f.write_str("high"),
        }
    }
}

/// A numeric value outside its reference range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Abnormality {
    pub test: String,
    pub value: f64,
    pub direction: Direction,
}

/// A value outside its critical safety bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriticalAlert {
    pub test: String,
    pub value: f64,
    /// Bounds rendered as `low-high`.
    pub range: String,
    pub direction: Direction,
}

/// Severity cue carried by a pattern finding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FindingLevel {
    Emergent,
    Significant,
    Caution,
    Supportive,
    Trend,
}

impl FindingLevel {
    pub fn glyph(self) -> &'static str {
        match self {
            FindingLevel::Emergent => "🚨",
            FindingLevel::Significant => "🔴",
            FindingLevel::Caution => "🟡",
            FindingLevel::Supportive => "📊",
            FindingLevel::Trend => "📉",
        }
    }

    fn from_glyph(glyph: &str) -> Option<Self> {
        [
            FindingLevel::Emergent,
            FindingLevel::Significant,
            FindingLevel::Caution,
            FindingLevel::Supportive,
            FindingLevel::Trend,
        ]
        .into_iter()
        .find(|level| level.glyph() == glyph)
    }
}

/// A textual clinical inference. Serialized as `"<glyph> <text>"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(into = "String", try_from = "String")]
pub struct PatternFinding {
    pub level: FindingLevel,
    pub text: String,
}

impl PatternFinding {
    pub fn new(level: FindingLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

impl fmt::Display for PatternFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.level.glyph(), self.text)
    }
}

impl From<PatternFinding> for String {
    fn from(finding: PatternFinding) -> Self {
        finding.to_string()
    }
}

impl TryFrom<String> for PatternFinding {
    type Error = LabError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let (glyph, text) = value
            .split_once(' ')
            .ok_or_else(|| LabError::Parse(format!("finding without severity glyph: {value}")))?;
        let level = FindingLevel::from_glyph(glyph)
            .ok_or_else(|| LabError::Parse(format!("unknown severity glyph: {glyph}")))?;
        Ok(PatternFinding::new(level, text))
    }
}

/// Likelihood attached to a candidate diagnosis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Probability {
    Confirmed,
    High,
    Moderate,
    Low,
}

/// Ordinal urgency. Declaration order is the ranking: `Critical` sorts first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Urgency {
    Critical,
    High,
    Moderate,
    Low,
}

impl Urgency {
    pub fn rank(self) -> u8 {
        self as u8
    }
}

/// A ranked candidate condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diagnosis {
    pub condition: String,
    pub probability: Probability,
    pub urgency: Urgency,
    pub supporting_evidence: Vec<String>,
    pub next_step: String,
}

/// Pattern findings and abnormalities for one category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CategoryAnalysis {
    pub patterns: Vec<PatternFinding>,
    pub abnormalities: Vec<Abnormality>,
}

/// Full output of one analysis call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AnalysisResult {
    pub summary: Vec<String>,
    pub categories: BTreeMap<Category, CategoryAnalysis>,
    pub diagnoses: Vec<Diagnosis>,
    pub next_steps: Vec<String>,
    pub critical_alerts: Vec<CriticalAlert>,
    pub rag_insights: String,
}

impl AnalysisResult {
    pub fn abnormality_count(&self) -> usize {
        self.categories
            .values()
            .map(|analysis| analysis.abnormalities.len())
            .sum()
    }

    /// Every abnormality across categories, in category order.
    pub fn abnormalities(&self) -> impl Iterator<Item = &Abnormality> {
        self.categories
            .values()
            .flat_map(|analysis| analysis.abnormalities.iter())
    }
}

/// Outcome of comparing one value against its reference range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceStatus {
    Normal,
    AbnormalLow,
    AbnormalHigh,
}

impl ReferenceStatus {
    pub fn glyph(self) -> &'static str {
        match self {
            ReferenceStatus::Normal => "✓",
            ReferenceStatus::AbnormalLow => "↓",
            ReferenceStatus::AbnormalHigh => "↑",
        }
    }
}

/// Status, glyph and a description quoting the resolved bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub status: ReferenceStatus,
    pub description: String,
}

impl Classification {
    pub fn glyph(&self) -> &'static str {
        self.status.glyph()
    }
}

/// Errors surfaced to callers. Per-rule problems never produce one of these.
#[derive(Debug, thiserror::Error)]
pub enum LabError {
    #[error("gender must be 'male' or 'female', received '{0}'")]
    InvalidGender(String),
    #[error("unrecognised test name: {0}")]
    UnknownTest(String),
    #[error("could not parse input: {0}")]
    Parse(String),
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_titres_as_text() {
        assert_eq!(LabValue::parse("12.5"), LabValue::Numeric(12.5));
        assert_eq!(LabValue::parse(" <0.5 "), LabValue::Numeric(0.5));
        assert_eq!(LabValue::parse("1:160"), LabValue::Text("1:160".into()));
        assert_eq!(LabValue::parse("Positive"), LabValue::Text("Positive".into()));
        assert_eq!(LabValue::parse("1e5"), LabValue::Text("1e5".into()));
    }

    #[test]
    fn set_rejects_unknown_names_but_insert_does_not() {
        let reference = ReferenceData::standard();
        let mut set = ObservationSet::new();
        assert!(matches!(
            set.set("Troponin_I", 0.3, &reference),
            Err(LabError::UnknownTest(name)) if name == "Troponin_I"
        ));

        set.insert("Troponin_I", 0.3);
        assert_eq!(set.set("Hemoglobin", 11.0, &reference).unwrap(), None);
        assert_eq!(
            set.set("Hemoglobin", 12.0, &reference).unwrap(),
            Some(LabValue::Numeric(11.0))
        );
        assert_eq!(set.len(), 2);
        assert_eq!(set.remove("Troponin_I"), Some(LabValue::Numeric(0.3)));
        assert_eq!(set.numeric("Hemoglobin"), Some(12.0));
    }

    #[test]
    fn set_accepts_tests_from_a_custom_reference_table() {
        let reference = ReferenceData::from_json_str(
            r#"{"ranges": {"Troponin_I": {"unit": "ng/mL", "range": [0, 0.04]}}}"#,
        )
        .unwrap();
        let mut set = ObservationSet::new();

        assert_eq!(set.set("Troponin_I", 0.3, &reference).unwrap(), None);
        assert_eq!(set.set("Hemoglobin", 11.0, &reference).unwrap(), None);
        assert!(set.set("Lactate", 2.0, &reference).is_err());
        assert_eq!(set.numeric("Troponin_I"), Some(0.3));
    }

    #[test]
    fn gender_parsing_is_case_insensitive() {
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("MALE".parse::<Gender>().unwrap(), Gender::Male);
        assert!(matches!("".parse::<Gender>(), Err(LabError::InvalidGender(_))));
    }

    #[test]
    fn finding_serializes_with_glyph_prefix() {
        let finding =
            PatternFinding::new(FindingLevel::Caution, "Low HDL - cardiovascular risk factor");
        let json = serde_json::to_string(&finding).unwrap();
        assert_eq!(json, "\"🟡 Low HDL - cardiovascular risk factor\"");

        let back: PatternFinding = serde_json::from_str(&json).unwrap();
        assert_eq!(back, finding);
        assert!(serde_json::from_str::<PatternFinding>("\"no glyph here\"").is_err());
    }

    #[test]
    fn urgency_orders_critical_first() {
        let mut urgencies = vec![
            Urgency::Low,
            Urgency::Critical,
            Urgency::Moderate,
            Urgency::High,
        ];
        urgencies.sort();
        assert_eq!(
            urgencies,
            vec![Urgency::Critical, Urgency::High, Urgency::Moderate, Urgency::Low]
        );
        assert_eq!(Urgency::Moderate.rank(), 2);
    }
}
