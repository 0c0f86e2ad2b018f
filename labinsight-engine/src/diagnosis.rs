//! Cross-category differential diagnosis rules.

use labinsight_core::{
    format_value, CategorizedSet, Category, Diagnosis, Gender, Probability, Urgency,
};

/// Evaluate every diagnosis rule against the snapshot and rank the hits by
/// urgency. Equal urgencies keep rule order.
///
/// `gender` and `age` are accepted for sex/age-adjusted thresholds; no current
/// rule depends on them.
pub fn generate_differential(
    categorized: &CategorizedSet,
    _gender: Gender,
    _age: u32,
) -> Vec<Diagnosis> {
    let mut diagnoses = Vec::new();

    if let Some(heme) = categorized.get(Category::Hematology) {
        if let Some(blasts) = heme.numeric("Blasts").filter(|b| *b > 5.0) {
            diagnoses.push(Diagnosis {
                condition: "Acute Leukemia".to_string(),
                probability: Probability::High,
                urgency: Urgency::Critical,
                supporting_evidence: vec![format!(
                    "{}% blasts in peripheral blood",
                    format_value(blasts)
                )],
                next_step: "Urgent hematology referral, bone marrow biopsy, flow cytometry"
                    .to_string(),
            });
        }

        if let Some(hgb) = heme.numeric("Hemoglobin").filter(|h| *h < 7.0) {
            diagnoses.push(Diagnosis {
                condition: "Severe Anemia".to_string(),
                probability: Probability::Confirmed,
                urgency: Urgency::High,
                supporting_evidence: vec![format!("Hemoglobin {} g/dL", format_value(hgb))],
                next_step:
                    "Transfusion consideration, iron studies, B12/folate, reticulocyte count"
                        .to_string(),
            });
        }
    }

    if let Some(a1c) = categorized
        .get(Category::Metabolic)
        .and_then(|metabolic| metabolic.numeric("HbA1c"))
        .filter(|a1c| *a1c >= 6.5)
    {
        diagnoses.push(Diagnosis {
            condition: "Diabetes Mellitus".to_string(),
            probability: Probability::High,
            urgency: Urgency::Moderate,
            supporting_evidence: vec![format!("HbA1c {}%", format_value(a1c))],
            next_step: "Confirm with repeat testing, ophthalmology referral, urine microalbumin, lipid panel"
                .to_string(),
        });
    }

    if let Some(egfr) = categorized
        .get(Category::KidneyFunction)
        .and_then(|renal| renal.numeric("eGFR"))
        .filter(|egfr| *egfr < 30.0)
    {
        diagnoses.push(Diagnosis {
            condition: "Stage 4-5 Chronic Kidney Disease".to_string(),
            probability: Probability::High,
            urgency: Urgency::High,
            supporting_evidence: vec![format!("eGFR {} mL/min", format_value(egfr))],
            next_step: "Nephrology referral, renal ultrasound, anemia workup, bone metabolism assessment"
                .to_string(),
        });
    }

    if let Some(bilirubin) = categorized
        .get(Category::LiverFunction)
        .and_then(|liver| liver.numeric("Total_Bilirubin"))
        .filter(|bili| *bili > 3.0)
    {
        diagnoses.push(Diagnosis {
            condition: "Jaundice/Hepatic Dysfunction".to_string(),
            probability: Probability::High,
            urgency: Urgency::Moderate,
            supporting_evidence: vec![format!("Bilirubin {} mg/dL", format_value(bilirubin))],
            next_step: "Hepatitis serologies, abdominal ultrasound, INR, albumin".to_string(),
        });
    }

    // Stable: ties keep evaluation order.
    diagnoses.sort_by_key(|dx| dx.urgency);
    diagnoses
}
