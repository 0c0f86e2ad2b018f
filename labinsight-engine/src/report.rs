//! Exportable report document: patient context, raw values and the analysis.

use chrono::{NaiveDate, Utc};
use labinsight_core::{AnalysisResult, Gender, LabError, ObservationSet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientInfo {
    pub gender: Gender,
    pub age: u32,
    /// Calendar date of the report, serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabReport {
    pub patient_info: PatientInfo,
    pub results: ObservationSet,
    pub analysis: AnalysisResult,
}

/// Headline counts shown above a report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutiveSummary {
    pub total_parameters: usize,
    pub abnormal_findings: usize,
    pub critical_alerts: usize,
    pub diagnoses: usize,
}

impl LabReport {
    /// Report dated today (UTC).
    pub fn new(gender: Gender, age: u32, results: ObservationSet, analysis: AnalysisResult) -> Self {
        Self::with_date(gender, age, Utc::now().date_naive(), results, analysis)
    }

    pub fn with_date(
        gender: Gender,
        age: u32,
        date: NaiveDate,
        results: ObservationSet,
        analysis: AnalysisResult,
    ) -> Self {
        Self {
            patient_info: PatientInfo { gender, age, date },
            results,
            analysis,
        }
    }

    pub fn executive_summary(&self) -> ExecutiveSummary {
        ExecutiveSummary {
            total_parameters: self.results.len(),
            abnormal_findings: self.analysis.abnormality_count(),
            critical_alerts: self.analysis.critical_alerts.len(),
            diagnoses: self.analysis.diagnoses.len(),
        }
    }

    pub fn to_json(&self) -> Result<String, LabError> {
        serde_json::to_string_pretty(self).map_err(|err| LabError::Other(err.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, LabError> {
        serde_json::from_str(json).map_err(|err| LabError::Parse(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use labinsight_core::{
        Abnormality, Category, CategoryAnalysis, Direction, FindingLevel, LabValue,
        PatternFinding,
    };

    use super::*;

    fn sample() -> LabReport {
        let mut results = ObservationSet::new();
        results.insert("Hemoglobin", 9.4);
        results.insert("ANA", "1:320");

        let mut analysis = AnalysisResult::default();
        analysis.categories.insert(
            Category::Hematology,
            CategoryAnalysis {
                patterns: vec![PatternFinding::new(
                    FindingLevel::Caution,
                    "Normocytic anemia - consider chronic disease, acute blood loss, or hemolysis",
                )],
                abnormalities: vec![Abnormality {
                    test: "Hemoglobin".to_string(),
                    value: 9.4,
                    direction: Direction::Low,
                }],
            },
        );
        analysis.summary = vec!["Hematology: 1 abnormal parameters".to_string()];

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        LabReport::with_date(Gender::Female, 47, date, results, analysis)
    }

    #[test]
    fn report_round_trips_through_json() {
        let report = sample();
        let json = report.to_json().unwrap();
        assert_eq!(LabReport::from_json(&json).unwrap(), report);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["patient_info"]["date"], "2024-03-01");
        assert_eq!(value["patient_info"]["gender"], "female");
        assert_eq!(value["results"]["ANA"], "1:320");
        assert_eq!(
            value["analysis"]["categories"]["Hematology"]["abnormalities"][0]["direction"],
            "low"
        );
    }

    #[test]
    fn executive_summary_counts() {
        let summary = sample().executive_summary();
        assert_eq!(
            summary,
            ExecutiveSummary {
                total_parameters: 2,
                abnormal_findings: 1,
                critical_alerts: 0,
                diagnoses: 0,
            }
        );
        assert_eq!(
            sample().results.get("ANA"),
            Some(&LabValue::Text("1:320".to_string()))
        );
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        assert!(matches!(
            LabReport::from_json("{\"results\": {}}"),
            Err(LabError::Parse(_))
        ));
    }
}
