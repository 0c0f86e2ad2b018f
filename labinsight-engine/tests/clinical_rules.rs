use labinsight_core::{
    AnalysisResult, CategorizedSet, Category, Gender, LabValue, ObservationSet, ReferenceData,
    Urgency,
};
use labinsight_engine::{
    analyze, categorize, EnhancementError, KnowledgeEnhancer, LabAnalyzer, LabReport,
    ALL_NORMAL_INSIGHT, UNAVAILABLE_INSIGHT,
};

fn observations(values: &[(&str, f64)]) -> ObservationSet {
    values
        .iter()
        .map(|(test, value)| (test.to_string(), LabValue::Numeric(*value)))
        .collect()
}

fn run(values: &[(&str, f64)]) -> AnalysisResult {
    LabAnalyzer::default().analyze_observations(&observations(values), Gender::Male, 45)
}

fn patterns(result: &AnalysisResult, category: Category) -> Vec<String> {
    result
        .categories
        .get(&category)
        .map(|analysis| analysis.patterns.iter().map(ToString::to_string).collect())
        .unwrap_or_default()
}

#[test]
fn blasts_put_acute_leukemia_first() {
    let result = run(&[
        ("Blasts", 6.0),
        ("HbA1c", 9.1),
        ("eGFR", 12.0),
        ("Total_Bilirubin", 4.0),
    ]);

    let first = &result.diagnoses[0];
    assert_eq!(first.condition, "Acute Leukemia");
    assert_eq!(first.urgency, Urgency::Critical);
    assert!(result
        .diagnoses
        .windows(2)
        .all(|pair| pair[0].urgency <= pair[1].urgency));
}

#[test]
fn anemia_morphology_follows_mcv() {
    let microcytic = run(&[("Hemoglobin", 10.0), ("MCV", 75.0)]);
    assert!(patterns(&microcytic, Category::Hematology)[0].contains("Microcytic anemia"));

    let macrocytic = run(&[("Hemoglobin", 10.0), ("MCV", 110.0)]);
    assert!(patterns(&macrocytic, Category::Hematology)[0].contains("Macrocytic anemia"));

    let normal = run(&[("Hemoglobin", 13.0), ("MCV", 75.0)]);
    assert!(!patterns(&normal, Category::Hematology)
        .iter()
        .any(|text| text.contains("anemia")));
}

#[test]
fn bun_creatinine_ratio_separates_prerenal_from_intrinsic() {
    let prerenal = run(&[("BUN", 40.0), ("Creatinine", 1.5)]);
    assert!(patterns(&prerenal, Category::KidneyFunction)
        .iter()
        .any(|text| text.contains("prerenal azotemia")));

    let intrinsic = run(&[("BUN", 10.0), ("Creatinine", 2.0)]);
    assert!(patterns(&intrinsic, Category::KidneyFunction)
        .iter()
        .any(|text| text.contains("intrinsic renal disease")));
}

#[test]
fn hyperkalemia_is_a_finding_before_it_is_critical() {
    let elevated = run(&[("Potassium", 5.5)]);
    assert_eq!(
        patterns(&elevated, Category::KidneyFunction),
        vec!["🚨 Hyperkalemia (5.5) - risk of cardiac arrhythmia, requires urgent management"]
    );
    assert!(elevated.critical_alerts.is_empty());

    let critical = run(&[("Potassium", 7.0)]);
    assert_eq!(patterns(&critical, Category::KidneyFunction).len(), 1);
    assert_eq!(critical.critical_alerts.len(), 1);
    assert_eq!(critical.critical_alerts[0].range, "2.5-6.5");
    assert_eq!(
        critical.next_steps[0],
        "🚨 URGENT: Critical Potassium value (7) - immediate physician notification required"
    );
}

#[test]
fn unknown_tests_land_in_other_without_output() {
    let mut panel = observations(&[("Troponin_I", 2.3)]);
    panel.insert("Hemoglobin", 14.5);

    let categorized = categorize(&panel);
    assert_eq!(
        categorized
            .get(Category::Other)
            .and_then(|other| other.numeric("Troponin_I")),
        Some(2.3)
    );

    let result = LabAnalyzer::default().analyze(&categorized, Gender::Male, 50);
    assert!(!result.categories.contains_key(&Category::Other));
    assert!(result.critical_alerts.is_empty());
    assert!(!result
        .next_steps
        .iter()
        .any(|step| step.contains("Troponin_I")));
}

#[test]
fn empty_categories_are_never_emitted() {
    let categorized = categorize(&observations(&[("TSH", 2.1)]));
    assert_eq!(categorized.categories().collect::<Vec<_>>(), vec![Category::Endocrine]);

    let json = serde_json::to_value(&categorized).unwrap();
    assert_eq!(json.as_object().unwrap().len(), 1);
}

#[test]
fn analysis_is_deterministic() {
    let values = [
        ("Hemoglobin", 9.0),
        ("MCV", 104.0),
        ("ALT", 120.0),
        ("ALP", 300.0),
        ("Creatinine", 1.9),
        ("BUN", 45.0),
        ("TSH", 8.0),
        ("Free_T4", 0.6),
        ("LDL", 180.0),
        ("CRP", 25.0),
    ];

    let first = serde_json::to_string(&run(&values)).unwrap();
    let second = serde_json::to_string(&run(&values)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn next_steps_have_no_duplicates() {
    let result = run(&[
        ("Hemoglobin", 5.5),
        ("Platelets", 12.0),
        ("ALT", 300.0),
        ("Creatinine", 11.0),
        ("eGFR", 8.0),
    ]);

    let mut seen = std::collections::HashSet::new();
    assert!(result.next_steps.iter().all(|step| seen.insert(step)));
    assert!(result
        .next_steps
        .contains(&"🔬 Consider abdominal imaging if liver enzymes elevated >3x ULN".to_string()));
}

struct Unreachable;

impl KnowledgeEnhancer for Unreachable {
    fn enhance(
        &self,
        _categorized: &CategorizedSet,
        _gender: Gender,
        _analysis: &AnalysisResult,
    ) -> Result<String, EnhancementError> {
        Err(EnhancementError::Unavailable("connection refused".to_string()))
    }
}

#[test]
fn enhancer_failure_does_not_change_rule_output() {
    let categorized = categorize(&observations(&[("HbA1c", 7.4), ("Hemoglobin", 6.0)]));
    let reference = ReferenceData::standard();

    let baseline = analyze(&categorized, Gender::Female, 61, &reference, None);
    let degraded = analyze(
        &categorized,
        Gender::Female,
        61,
        &reference,
        Some(&Unreachable),
    );

    assert_eq!(degraded.rag_insights, UNAVAILABLE_INSIGHT);
    assert_eq!(degraded.diagnoses, baseline.diagnoses);
    assert_eq!(degraded.next_steps, baseline.next_steps);
    assert_eq!(degraded.categories, baseline.categories);
}

#[test]
fn knowledge_base_insight_mentions_abnormal_values() {
    let analyzer = LabAnalyzer::default().with_standard_knowledge();
    let result = analyzer.analyze_observations(
        &observations(&[("HbA1c", 8.2), ("Platelets", 95.0)]),
        Gender::Male,
        58,
    );

    assert!(result
        .rag_insights
        .contains("Laboratory abnormalities: Platelets 95 (low), HbA1c 8.2 (high)"));
    assert!(result.rag_insights.contains("HbA1c elevation:"));
    assert!(result.rag_insights.contains("Thrombocytopenia: Peripheral smear essential"));
}

#[test]
fn knowledge_base_sees_categories_without_pattern_rules() {
    let analyzer = LabAnalyzer::default().with_standard_knowledge();
    let result = analyzer.analyze_observations(
        &observations(&[
            ("PSA", 25.0),
            ("INR", 3.4),
            ("Ferritin", 4.0),
            ("Fibrinogen", 80.0),
        ]),
        Gender::Male,
        67,
    );

    assert!(result.categories.is_empty());
    assert_eq!(result.critical_alerts.len(), 1);
    assert_eq!(result.critical_alerts[0].test, "Fibrinogen");
    assert_ne!(result.rag_insights, ALL_NORMAL_INSIGHT);
    assert!(result
        .rag_insights
        .contains("Laboratory abnormalities: Fibrinogen 80 (low), INR 3.4 (high), PSA 25 (high), Ferritin 4 (low)"));
}

#[test]
fn exported_report_round_trips() {
    let panel = observations(&[("Hemoglobin", 6.8), ("Blasts", 12.0), ("eGFR", 28.0)]);
    let analysis = LabAnalyzer::default().analyze_observations(&panel, Gender::Male, 72);
    let report = LabReport::new(Gender::Male, 72, panel, analysis);

    let json = report.to_json().unwrap();
    assert_eq!(LabReport::from_json(&json).unwrap(), report);
}
