//! Next-step recommendations derived from critical values, diagnoses and
//! category presence.

use std::collections::HashSet;

use labinsight_core::{format_value, CategorizedSet, Category, Diagnosis, ReferenceData};

use crate::critical::check_critical;

/// Build the ordered, de-duplicated list of next steps.
pub fn generate_recommendations(
    categorized: &CategorizedSet,
    diagnoses: &[Diagnosis],
    reference: &ReferenceData,
) -> Vec<String> {
    let mut steps = Vec::new();

    for (_, tests) in categorized.iter() {
        for alert in check_critical(tests, reference) {
            steps.push(format!(
                "🚨 URGENT: Critical {} value ({}) - immediate physician notification required",
                alert.test,
                format_value(alert.value)
            ));
        }
    }

    steps.extend(diagnoses.iter().map(|dx| format!("📋 {}", dx.next_step)));

    if categorized.contains(Category::Hematology) {
        steps.push("🔬 Peripheral blood smear review if not already performed".to_string());
    }
    if categorized.contains(Category::LiverFunction) {
        steps.push("🔬 Consider abdominal imaging if liver enzymes elevated >3x ULN".to_string());
    }
    if categorized.contains(Category::KidneyFunction) {
        steps.push("🔬 Monitor electrolytes closely if eGFR <60".to_string());
    }

    dedup_preserving_order(steps)
}

/// Drop exact duplicates, keeping the first occurrence.
pub fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
