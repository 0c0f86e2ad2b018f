//! Per-category pattern recognition.
//!
//! Each analyzer walks its rules in a fixed order and appends every finding
//! that fires. Values that are present but textual are skipped rule by rule.

use labinsight_core::{
    format_value, CategorizedSet, Category, FindingLevel, ObservationSet, PatternFinding,
};

/// Run the analyzer bound to `category`, if it has one.
///
/// Returns `None` for categories without pattern rules (coagulation, tumour
/// markers, vitamins, other) so the caller can skip them entirely.
pub fn analyze_category(
    category: Category,
    categorized: &CategorizedSet,
) -> Option<Vec<PatternFinding>> {
    let tests = categorized.get(category)?;
    let findings = match category {
        Category::Hematology => analyze_hematology(tests),
        Category::LiverFunction => {
            analyze_liver(tests, categorized.get(Category::Coagulation))
        }
        Category::KidneyFunction => analyze_kidney(tests),
        Category::Metabolic => analyze_metabolic(tests),
        Category::Endocrine => analyze_thyroid(tests),
        Category::LipidProfile => analyze_lipids(tests),
        Category::ImmunologyRheumatology => analyze_rheumatology(tests),
        Category::Coagulation
        | Category::TumorMarkers
        | Category::VitaminsMinerals
        | Category::Other => return None,
    };
    Some(findings)
}

pub fn analyze_hematology(tests: &ObservationSet) -> Vec<PatternFinding> {
    let mut findings = Vec::new();

    if let (Some(hgb), Some(mcv)) = (tests.numeric("Hemoglobin"), tests.numeric("MCV")) {
        if hgb < 12.0 {
            findings.push(if mcv < 80.0 {
                PatternFinding::new(
                    FindingLevel::Significant,
                    "Microcytic anemia - consider iron deficiency, thalassemia, or anemia of chronic disease",
                )
            } else if mcv > 100.0 {
                PatternFinding::new(
                    FindingLevel::Significant,
                    "Macrocytic anemia - consider B12/folate deficiency, liver disease, MDS, or hemolysis",
                )
            } else {
                PatternFinding::new(
                    FindingLevel::Caution,
                    "Normocytic anemia - consider acute blood loss, hemolysis, or early iron deficiency",
                )
            });
        }
    }

    if tests.numeric("RDW").is_some_and(|rdw| rdw > 14.5) {
        findings.push(PatternFinding::new(
            FindingLevel::Supportive,
            "Elevated RDW suggests anisocytosis - seen in iron deficiency, mixed deficiencies, or post-transfusion",
        ));
    }

    if tests.numeric("Platelets").is_some_and(|plt| plt < 150.0) {
        // A textual MPV counts as present: it rules out the generic branch
        // but cannot be compared.
        let finding = match tests.get("MPV").map(|mpv| mpv.as_numeric()) {
            Some(Some(mpv)) if mpv > 11.5 => Some(PatternFinding::new(
                FindingLevel::Significant,
                "Thrombocytopenia with high MPV suggests peripheral destruction (ITP, TTP)",
            )),
            Some(Some(_)) => Some(PatternFinding::new(
                FindingLevel::Significant,
                "Thrombocytopenia with normal/low MPV suggests bone marrow failure or sequestration",
            )),
            Some(None) => None,
            None => Some(PatternFinding::new(
                FindingLevel::Caution,
                "Thrombocytopenia - verify with peripheral smear for pseudothrombocytopenia",
            )),
        };
        findings.extend(finding);
    }

    if let Some(wbc) = tests.numeric("WBC") {
        if wbc > 11.0 {
            if tests.numeric("Neutrophils").is_some_and(|n| n > 70.0) {
                findings.push(PatternFinding::new(
                    FindingLevel::Caution,
                    "Neutrophilic leukocytosis suggests bacterial infection, inflammation, or stress",
                ));
            } else if tests.numeric("Lymphocytes").is_some_and(|l| l > 40.0) {
                findings.push(PatternFinding::new(
                    FindingLevel::Caution,
                    "Lymphocytosis suggests viral infection, lymphoid malignancy, or pertussis",
                ));
            }
        } else if wbc < 4.0 {
            findings.push(PatternFinding::new(
                FindingLevel::Significant,
                "Leukopenia - increased infection risk, consider viral infection or bone marrow suppression",
            ));
        }
    }

    if let Some(blasts) = tests.numeric("Blasts").filter(|b| *b > 0.0) {
        findings.push(PatternFinding::new(
            FindingLevel::Emergent,
            format!(
                "CRITICAL: {}% blasts detected - possible acute leukemia requiring immediate hematology referral",
                format_value(blasts)
            ),
        ));
    }

    findings
}

/// Liver rules. INR is reported by the coagulation panel, so it is looked up
/// there as well as in the liver group itself.
pub fn analyze_liver(
    tests: &ObservationSet,
    coagulation: Option<&ObservationSet>,
) -> Vec<PatternFinding> {
    let mut findings = Vec::new();

    if let (Some(alt), Some(alp)) = (tests.numeric("ALT"), tests.numeric("ALP")) {
        if alt > 40.0 && alp < 120.0 {
            findings.push(PatternFinding::new(
                FindingLevel::Significant,
                "Hepatocellular pattern - suggests viral hepatitis, drug-induced injury, or ischemic hepatitis",
            ));
        } else if alp > 120.0 && alt < 40.0 {
            findings.push(PatternFinding::new(
                FindingLevel::Significant,
                "Cholestatic pattern - suggests biliary obstruction, primary biliary cholangitis, or drug-induced cholestasis",
            ));
        } else if alt > 40.0 && alp > 120.0 {
            findings.push(PatternFinding::new(
                FindingLevel::Caution,
                "Mixed hepatocellular-cholestatic pattern - suggests alcoholic hepatitis or acute viral hepatitis",
            ));
        }
    }

    if let (Some(total), Some(direct)) = (
        tests.numeric("Total_Bilirubin"),
        tests.numeric("Direct_Bilirubin"),
    ) {
        if total > 1.2 {
            findings.push(if direct / total > 0.5 {
                PatternFinding::new(
                    FindingLevel::Significant,
                    "Conjugated hyperbilirubinemia - suggests hepatocellular disease or biliary obstruction",
                )
            } else {
                PatternFinding::new(
                    FindingLevel::Caution,
                    "Unconjugated hyperbilirubinemia - suggests hemolysis, Gilbert syndrome, or ineffective erythropoiesis",
                )
            });
        }
    }

    if tests.numeric("Albumin").is_some_and(|alb| alb < 3.5) {
        findings.push(PatternFinding::new(
            FindingLevel::Trend,
            "Hypoalbuminemia suggests decreased synthetic function - chronic liver disease, malnutrition, or nephrotic syndrome",
        ));
    }

    let inr = tests
        .numeric("INR")
        .or_else(|| coagulation.and_then(|coag| coag.numeric("INR")));
    if inr.is_some_and(|inr| inr > 1.2) {
        findings.push(PatternFinding::new(
            FindingLevel::Significant,
            "Elevated INR suggests impaired coagulation factor synthesis - severe liver disease or vitamin K deficiency",
        ));
    }

    findings
}

pub fn analyze_kidney(tests: &ObservationSet) -> Vec<PatternFinding> {
    let mut findings = Vec::new();

    if let Some(creatinine) = tests.numeric("Creatinine").filter(|c| *c > 1.2) {
        findings.push(PatternFinding::new(
            FindingLevel::Significant,
            format!(
                "Elevated creatinine ({}) suggests reduced GFR",
                format_value(creatinine)
            ),
        ));

        if let Some(bun) = tests.numeric("BUN") {
            let ratio = bun / creatinine;
            if ratio > 20.0 {
                findings.push(PatternFinding::new(
                    FindingLevel::Supportive,
                    "BUN:Creatinine ratio >20 suggests prerenal azotemia (dehydration, CHF, GI bleeding)",
                ));
            } else if ratio < 10.0 {
                findings.push(PatternFinding::new(
                    FindingLevel::Supportive,
                    "BUN:Creatinine ratio <10 suggests intrinsic renal disease or liver disease",
                ));
            }
        }
    }

    if let Some(egfr) = tests.numeric("eGFR") {
        if let Some(stage) = ckd_stage(egfr) {
            findings.push(PatternFinding::new(
                FindingLevel::Significant,
                format!(
                    "eGFR {} indicates CKD {stage} - evaluate for complications",
                    format_value(egfr)
                ),
            ));
        }
    }

    if let Some(potassium) = tests.numeric("Potassium") {
        if potassium > 5.0 {
            findings.push(PatternFinding::new(
                FindingLevel::Emergent,
                format!(
                    "Hyperkalemia ({}) - risk of cardiac arrhythmia, requires urgent management",
                    format_value(potassium)
                ),
            ));
        } else if potassium < 3.5 {
            findings.push(PatternFinding::new(
                FindingLevel::Caution,
                format!(
                    "Hypokalemia ({}) - consider diuretic use, GI losses, or renal wasting",
                    format_value(potassium)
                ),
            ));
        }
    }

    findings
}

/// KDIGO GFR category for a reduced eGFR; `None` at 60 and above.
pub fn ckd_stage(egfr: f64) -> Option<&'static str> {
    match egfr {
        e if e >= 60.0 => None,
        e if e >= 45.0 => Some("G3a"),
        e if e >= 30.0 => Some("G3b"),
        e if e >= 15.0 => Some("G4"),
        _ => Some("G5"),
    }
}

pub fn analyze_metabolic(tests: &ObservationSet) -> Vec<PatternFinding> {
    let mut findings = Vec::new();

    if let Some(a1c) = tests.numeric("HbA1c") {
        if a1c >= 6.5 {
            findings.push(PatternFinding::new(
                FindingLevel::Significant,
                format!("HbA1c {}% meets criteria for diabetes mellitus", format_value(a1c)),
            ));
        } else if a1c >= 5.7 {
            findings.push(PatternFinding::new(
                FindingLevel::Caution,
                format!(
                    "HbA1c {}% indicates prediabetes - lifestyle intervention recommended",
                    format_value(a1c)
                ),
            ));
        }
    }

    if let Some(glucose) = tests.numeric("Glucose_Fasting") {
        if glucose >= 126.0 {
            findings.push(PatternFinding::new(
                FindingLevel::Significant,
                format!(
                    "Fasting glucose {} mg/dL meets diabetes criteria",
                    format_value(glucose)
                ),
            ));
        } else if glucose >= 100.0 {
            findings.push(PatternFinding::new(
                FindingLevel::Caution,
                format!(
                    "Impaired fasting glucose ({}) - prediabetes",
                    format_value(glucose)
                ),
            ));
        }
    }

    findings
}

pub fn analyze_thyroid(tests: &ObservationSet) -> Vec<PatternFinding> {
    let mut findings = Vec::new();
    let Some(tsh) = tests.numeric("TSH") else {
        return findings;
    };
    let free_t4 = tests.numeric("Free_T4");

    if tsh > 4.5 {
        if let Some(ft4) = free_t4 {
            findings.push(if ft4 < 0.8 {
                PatternFinding::new(
                    FindingLevel::Significant,
                    "Primary hypothyroidism - elevated TSH with low FT4",
                )
            } else {
                PatternFinding::new(
                    FindingLevel::Caution,
                    "Subclinical hypothyroidism - elevated TSH with normal FT4",
                )
            });
        }

        if tests.numeric("Anti_TPO").is_some_and(|tpo| tpo > 35.0) {
            findings.push(PatternFinding::new(
                FindingLevel::Supportive,
                "Positive Anti-TPO suggests autoimmune (Hashimoto's) thyroiditis",
            ));
        }
    } else if tsh < 0.4 {
        if let Some(ft4) = free_t4 {
            findings.push(if ft4 > 1.8 {
                PatternFinding::new(
                    FindingLevel::Significant,
                    "Primary hyperthyroidism - suppressed TSH with elevated FT4",
                )
            } else {
                PatternFinding::new(
                    FindingLevel::Caution,
                    "Subclinical hyperthyroidism - suppressed TSH with normal FT4",
                )
            });
        }
    }

    findings
}

pub fn analyze_lipids(tests: &ObservationSet) -> Vec<PatternFinding> {
    let mut findings = Vec::new();

    if let Some(ldl) = tests.numeric("LDL").filter(|ldl| *ldl > 100.0) {
        findings.push(PatternFinding::new(
            FindingLevel::Caution,
            format!(
                "Elevated LDL ({}) - increased cardiovascular risk",
                format_value(ldl)
            ),
        ));
    }

    if tests.numeric("HDL").is_some_and(|hdl| hdl < 40.0) {
        findings.push(PatternFinding::new(
            FindingLevel::Caution,
            "Low HDL - cardiovascular risk factor",
        ));
    }

    if let Some(tg) = tests.numeric("Triglycerides").filter(|tg| *tg > 150.0) {
        findings.push(if tg > 500.0 {
            PatternFinding::new(
                FindingLevel::Significant,
                format!(
                    "Severe hypertriglyceridemia ({}) - pancreatitis risk",
                    format_value(tg)
                ),
            )
        } else {
            PatternFinding::new(
                FindingLevel::Caution,
                "Elevated triglycerides - metabolic syndrome component",
            )
        });
    }

    findings
}

pub fn analyze_rheumatology(tests: &ObservationSet) -> Vec<PatternFinding> {
    let mut findings = Vec::new();

    if tests.numeric("RF").is_some_and(|rf| rf > 20.0) {
        findings.push(PatternFinding::new(
            FindingLevel::Supportive,
            "Positive RF supports rheumatoid arthritis diagnosis",
        ));
    }
    if tests.numeric("Anti_CCP").is_some_and(|ccp| ccp > 20.0) {
        findings.push(PatternFinding::new(
            FindingLevel::Supportive,
            "Anti-CCP positive - highly specific for rheumatoid arthritis",
        ));
    }

    // Any captured ANA value, titre or number, is treated as positive.
    if tests.contains("ANA") {
        findings.push(PatternFinding::new(
            FindingLevel::Supportive,
            "Positive ANA - if clinically suspected, check specific autoantibodies (dsDNA, Sm, RNP)",
        ));
    }
    if tests.numeric("dsDNA").is_some_and(|dsdna| dsdna > 100.0) {
        findings.push(PatternFinding::new(
            FindingLevel::Significant,
            "Elevated anti-dsDNA - specific for systemic lupus erythematosus",
        ));
    }

    if let Some(esr) = tests.numeric("ESR").filter(|esr| *esr > 20.0) {
        findings.push(PatternFinding::new(
            FindingLevel::Supportive,
            format!(
                "Elevated ESR ({}) indicates active inflammation",
                format_value(esr)
            ),
        ));
    }
    if let Some(crp) = tests.numeric("CRP").filter(|crp| *crp > 10.0) {
        findings.push(PatternFinding::new(
            FindingLevel::Supportive,
            format!(
                "Elevated CRP ({}) suggests acute inflammation or infection",
                format_value(crp)
            ),
        ));
    }

    findings
}
