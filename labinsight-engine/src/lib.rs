//! Rule-based interpretation of laboratory panels.
//!
//! [`analyze`] is the single entry point that turns a [`CategorizedSet`] into an
//! [`AnalysisResult`]; the per-stage functions are public so callers can run
//! them on their own. [`LabAnalyzer`] bundles the reference table, tuning and
//! an optional knowledge enhancer for callers that analyze many panels.

use std::collections::BTreeMap;

use labinsight_core::{
    AnalysisConfig, AnalysisResult, CategorizedSet, Category, CategoryAnalysis, Classification,
    CriticalAlert, Diagnosis, Gender, ObservationSet, ReferenceData,
};

pub mod abnormality;
pub mod categorize;
pub mod critical;
pub mod diagnosis;
pub mod enhance;
pub mod patterns;
pub mod recommend;
pub mod report;

pub use abnormality::{classify, detect_abnormalities};
pub use categorize::categorize;
pub use critical::{check_critical, is_critical};
pub use diagnosis::generate_differential;
pub use enhance::{
    EnhancementError, KeywordKnowledgeBase, KnowledgeEnhancer, KnowledgePassage,
    ALL_NORMAL_INSIGHT, NOT_CONFIGURED_INSIGHT, UNAVAILABLE_INSIGHT,
};
pub use patterns::analyze_category;
pub use recommend::generate_recommendations;
pub use report::{ExecutiveSummary, LabReport, PatientInfo};

/// Run the full pipeline over a categorized panel.
///
/// Never fails: rules that lack their inputs simply do not fire, and an
/// enhancer error is replaced by a fixed fallback text.
pub fn analyze(
    categorized: &CategorizedSet,
    gender: Gender,
    age: u32,
    reference: &ReferenceData,
    enhancer: Option<&dyn KnowledgeEnhancer>,
) -> AnalysisResult {
    let mut aggregate = AnalysisAggregate::default();

    aggregate.critical_alerts = check_critical(&categorized.flatten(), reference);

    for (category, tests) in categorized.iter() {
        let Some(patterns) = analyze_category(category, categorized) else {
            continue;
        };
        let abnormalities = detect_abnormalities(tests, gender, reference);
        tracing::debug!(
            category = category.key(),
            patterns = patterns.len(),
            abnormalities = abnormalities.len(),
            "category analyzed"
        );
        aggregate.record_category(
            category,
            CategoryAnalysis {
                patterns,
                abnormalities,
            },
        );
    }

    let diagnoses = generate_differential(categorized, gender, age);
    let next_steps = generate_recommendations(categorized, &diagnoses, reference);

    let mut result = aggregate.finalize(diagnoses, next_steps);
    result.rag_insights = enhancement_text(categorized, gender, &result, enhancer);

    tracing::info!(
        categories = result.categories.len(),
        abnormalities = result.abnormality_count(),
        diagnoses = result.diagnoses.len(),
        critical_alerts = result.critical_alerts.len(),
        "analysis complete"
    );

    result
}

fn enhancement_text(
    categorized: &CategorizedSet,
    gender: Gender,
    analysis: &AnalysisResult,
    enhancer: Option<&dyn KnowledgeEnhancer>,
) -> String {
    let Some(enhancer) = enhancer else {
        tracing::debug!("no knowledge enhancer configured");
        return NOT_CONFIGURED_INSIGHT.to_string();
    };

    match enhancer.enhance(categorized, gender, analysis) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, "knowledge enhancement failed");
            UNAVAILABLE_INSIGHT.to_string()
        }
    }
}

#[derive(Default)]
struct AnalysisAggregate {
    summary: Vec<String>,
    categories: BTreeMap<Category, CategoryAnalysis>,
    critical_alerts: Vec<CriticalAlert>,
}

impl AnalysisAggregate {
    fn record_category(&mut self, category: Category, analysis: CategoryAnalysis) {
        if !analysis.abnormalities.is_empty() {
            self.summary.push(format!(
                "{}: {} abnormal parameters",
                category.label(),
                analysis.abnormalities.len()
            ));
        }
        self.categories.insert(category, analysis);
    }

    fn finalize(self, diagnoses: Vec<Diagnosis>, next_steps: Vec<String>) -> AnalysisResult {
        AnalysisResult {
            summary: self.summary,
            categories: self.categories,
            diagnoses,
            next_steps,
            critical_alerts: self.critical_alerts,
            rag_insights: String::new(),
        }
    }
}

/// Reusable analyzer holding a reference table, tuning and an optional enhancer.
pub struct LabAnalyzer {
    reference: ReferenceData,
    config: AnalysisConfig,
    enhancer: Option<Box<dyn KnowledgeEnhancer>>,
}

impl Default for LabAnalyzer {
    fn default() -> Self {
        Self::new(ReferenceData::standard())
    }
}

impl LabAnalyzer {
    pub fn new(reference: ReferenceData) -> Self {
        Self {
            reference,
            config: AnalysisConfig::default(),
            enhancer: None,
        }
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_enhancer(mut self, enhancer: Box<dyn KnowledgeEnhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    /// Attach the built-in keyword knowledge base, tuned by the current config
    /// and judging values against this analyzer's reference table.
    pub fn with_standard_knowledge(self) -> Self {
        let knowledge = KeywordKnowledgeBase::standard(self.config.clone())
            .with_reference(self.reference.clone());
        self.with_enhancer(Box::new(knowledge))
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn categorize(&self, observations: &ObservationSet) -> CategorizedSet {
        categorize(observations)
    }

    pub fn check_critical(&self, observations: &ObservationSet) -> Vec<CriticalAlert> {
        check_critical(observations, &self.reference)
    }

    pub fn classify(&self, test: &str, value: f64, gender: Gender) -> Classification {
        classify(test, value, gender, &self.reference)
    }

    pub fn analyze(
        &self,
        categorized: &CategorizedSet,
        gender: Gender,
        age: u32,
    ) -> AnalysisResult {
        analyze(
            categorized,
            gender,
            age,
            &self.reference,
            self.enhancer.as_deref(),
        )
    }

    /// Categorize a flat panel and analyze it in one call.
    pub fn analyze_observations(
        &self,
        observations: &ObservationSet,
        gender: Gender,
        age: u32,
    ) -> AnalysisResult {
        self.analyze(&categorize(observations), gender, age)
    }
}

#[cfg(test)]
mod tests {
    use labinsight_core::{Direction, LabValue};

    use super::*;

    fn panel(values: &[(&str, f64)]) -> ObservationSet {
        values
            .iter()
            .map(|(test, value)| (test.to_string(), LabValue::Numeric(*value)))
            .collect()
    }

    struct Failing;

    impl KnowledgeEnhancer for Failing {
        fn enhance(
            &self,
            _categorized: &CategorizedSet,
            _gender: Gender,
            _analysis: &AnalysisResult,
        ) -> Result<String, EnhancementError> {
            Err(EnhancementError::Failed("backend offline".to_string()))
        }
    }

    #[test]
    fn summary_lists_categories_with_abnormalities() {
        let analyzer = LabAnalyzer::default();
        let result = analyzer.analyze_observations(
            &panel(&[("ALT", 95.0), ("ALP", 300.0), ("TSH", 2.0)]),
            Gender::Female,
            40,
        );

        assert_eq!(result.summary, vec!["Liver Function: 2 abnormal parameters"]);
        assert!(result.categories.contains_key(&Category::Endocrine));
        assert!(result.categories[&Category::Endocrine].abnormalities.is_empty());
        assert_eq!(
            result.categories[&Category::LiverFunction].abnormalities[0].direction,
            Direction::High
        );
    }

    #[test]
    fn categories_without_rules_are_not_reported() {
        let analyzer = LabAnalyzer::default();
        let result =
            analyzer.analyze_observations(&panel(&[("PSA", 9.0), ("INR", 1.1)]), Gender::Male, 60);

        assert!(result.categories.is_empty());
        assert!(result.summary.is_empty());
        assert_eq!(result.rag_insights, NOT_CONFIGURED_INSIGHT);
    }

    #[test]
    fn enhancer_failure_falls_back() {
        let analyzer = LabAnalyzer::default().with_enhancer(Box::new(Failing));
        let result =
            analyzer.analyze_observations(&panel(&[("Hemoglobin", 9.0)]), Gender::Male, 30);

        assert_eq!(result.rag_insights, UNAVAILABLE_INSIGHT);
        assert_eq!(result.abnormality_count(), 1);
    }

    #[test]
    fn standard_knowledge_reports_normal_panels() {
        let analyzer = LabAnalyzer::default().with_standard_knowledge();
        let result =
            analyzer.analyze_observations(&panel(&[("Hemoglobin", 14.0)]), Gender::Male, 30);

        assert_eq!(result.rag_insights, ALL_NORMAL_INSIGHT);
    }
}
