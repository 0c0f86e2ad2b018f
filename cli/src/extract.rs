//! Pulls lab values out of free report text.
//!
//! Every test has a list of aliases as printed on common report layouts. When
//! two aliases overlap ("Glycated Hemoglobin 7.2" also contains
//! "Hemoglobin 7.2") the longer alias wins.

use std::sync::LazyLock;

use labinsight_core::{LabValue, ObservationSet};
use regex::Regex;

struct TestPattern {
    test: &'static str,
    regex: Regex,
}

const NUMBER: &str = r"[<>]?\d+(?:\.\d+)?";
const TITRE: &str = r"[<>]?\d+:\d+|[<>]?\d+(?:\.\d+)?|positive|negative";

/// Test name and the aliases it appears under.
const ALIASES: &[(&str, &[&str])] = &[
    ("RBC", &["RBC", "Red Blood Cell", "Red Blood Cells"]),
    ("Hemoglobin", &["Hemoglobin", "Haemoglobin", "Hb", "HGB"]),
    ("Hematocrit", &["Hematocrit", "Hct"]),
    ("MCV", &["MCV"]),
    ("MCH", &["MCH"]),
    ("MCHC", &["MCHC"]),
    ("RDW", &["RDW"]),
    ("WBC", &["WBC", "White Blood Cell", "White Blood Cells"]),
    ("Platelets", &["Platelets", "Platelet Count", "PLT"]),
    ("MPV", &["MPV"]),
    ("Neutrophils", &["Neutrophils", "Neutrophil", "NEUT", "ANC"]),
    ("Lymphocytes", &["Lymphocytes", "Lymphocyte", "LYMPH"]),
    ("Monocytes", &["Monocytes", "Monocyte", "MONO"]),
    ("Eosinophils", &["Eosinophils", "Eosinophil", "EO"]),
    ("Basophils", &["Basophils", "Basophil", "BASO"]),
    ("Reticulocytes", &["Reticulocytes", "Retic"]),
    ("Blasts", &["Blasts", "Blast"]),
    ("ALT", &["ALT", "SGPT", "Alanine Aminotransferase"]),
    ("AST", &["AST", "SGOT", "Aspartate Aminotransferase"]),
    ("ALP", &["ALP", "Alkaline Phosphatase"]),
    ("GGT", &["GGT", "Gamma GT"]),
    ("Total_Bilirubin", &["Total Bilirubin", "T. Bili", "T Bili"]),
    ("Direct_Bilirubin", &["Direct Bilirubin", "Conjugated Bilirubin"]),
    ("Indirect_Bilirubin", &["Indirect Bilirubin", "Unconjugated Bilirubin"]),
    ("Total_Protein", &["Total Protein", "T. Protein"]),
    ("Albumin", &["Albumin", "Alb"]),
    ("Globulin", &["Globulin"]),
    ("A_G_Ratio", &["A/G Ratio", "Albumin/Globulin"]),
    ("Creatinine", &["Creatinine", "Creat"]),
    ("BUN", &["BUN", "Blood Urea Nitrogen", "Urea"]),
    ("eGFR", &["eGFR", "Estimated GFR"]),
    ("Uric_Acid", &["Uric Acid", "Urate"]),
    ("Sodium", &["Sodium", "Na"]),
    ("Potassium", &["Potassium", "K"]),
    ("Chloride", &["Chloride", "Cl"]),
    ("Bicarbonate", &["Bicarbonate", "CO2", "HCO3"]),
    ("Calcium", &["Calcium", "Ca"]),
    ("Phosphorus", &["Phosphorus", "Phosphate"]),
    ("Magnesium", &["Magnesium", "Mg"]),
    ("Glucose_Fasting", &["Fasting Glucose", "FBS", "Fasting Blood Sugar"]),
    ("Glucose_Random", &["Random Glucose", "RBS", "Random Blood Sugar"]),
    ("HbA1c", &["HbA1c", "A1c", "Glycated Hemoglobin"]),
    ("Insulin", &["Insulin", "Fasting Insulin"]),
    ("C_Peptide", &["C-Peptide", "C Peptide"]),
    ("TSH", &["TSH", "Thyroid Stimulating Hormone"]),
    ("T3", &["T3", "Total T3", "Triiodothyronine"]),
    ("T4", &["T4", "Total T4", "Thyroxine"]),
    ("Free_T3", &["Free T3", "FT3"]),
    ("Free_T4", &["Free T4", "FT4"]),
    ("Anti_TPO", &["Anti-TPO", "TPO Antibodies"]),
    ("Anti_Thyroglobulin", &["Anti-Thyroglobulin", "Tg Antibodies"]),
    ("Total_Cholesterol", &["Total Cholesterol", "T. Chol"]),
    ("HDL", &["HDL", "HDL Cholesterol"]),
    ("LDL", &["LDL", "LDL Cholesterol"]),
    ("Triglycerides", &["Triglycerides", "TG"]),
    ("VLDL", &["VLDL"]),
    ("Non_HDL_Cholesterol", &["Non-HDL Cholesterol"]),
    ("RF", &["RF", "Rheumatoid Factor"]),
    ("Anti_CCP", &["Anti-CCP", "CCP Antibodies"]),
    ("ANA", &["ANA", "Antinuclear Antibody"]),
    ("dsDNA", &["Anti-dsDNA", "dsDNA"]),
    ("ESR", &["ESR", "Erythrocyte Sedimentation Rate"]),
    ("CRP", &["CRP", "C-Reactive Protein"]),
    ("ASO", &["ASO", "Anti-Streptolysin O"]),
    ("PT", &["PT", "Prothrombin Time"]),
    ("INR", &["INR", "International Normalized Ratio"]),
    ("aPTT", &["aPTT", "APTT", "Activated Partial Thromboplastin Time"]),
    ("Fibrinogen", &["Fibrinogen"]),
    ("D_Dimer", &["D-Dimer", "D Dimer"]),
    ("AFP", &["AFP", "Alpha-Fetoprotein"]),
    ("CEA", &["CEA", "Carcinoembryonic Antigen"]),
    ("CA_125", &["CA-125", "CA 125"]),
    ("CA_19_9", &["CA 19-9", "CA19-9"]),
    ("PSA", &["PSA", "Prostate Specific Antigen"]),
    ("CA_15_3", &["CA 15-3", "CA15-3"]),
    ("Vitamin_D", &["Vitamin D", "25-OH Vitamin D", "25(OH)D"]),
    ("Vitamin_B12", &["Vitamin B12", "B12", "Cobalamin"]),
    ("Folate", &["Folate", "Folic Acid"]),
    ("Iron", &["Iron", "Serum Iron"]),
    ("Ferritin", &["Ferritin"]),
    ("TIBC", &["TIBC", "Total Iron Binding Capacity"]),
    ("Transferrin_Saturation", &["Transferrin Saturation", "TSAT"]),
];

static PATTERNS: LazyLock<Vec<TestPattern>> = LazyLock::new(|| {
    ALIASES
        .iter()
        .map(|&(test, aliases)| TestPattern {
            test,
            regex: Regex::new(&pattern_for(test, aliases)).expect("invalid lab value pattern"),
        })
        .collect()
});

/// Short aliases ("K", "Na", "PT") only match in their printed case.
fn pattern_for(test: &str, aliases: &[&str]) -> String {
    let names = aliases
        .iter()
        .map(|alias| {
            let escaped = regex::escape(alias);
            if alias.len() <= 3 {
                format!("(?-i:{escaped})")
            } else {
                escaped
            }
        })
        .collect::<Vec<_>>()
        .join("|");
    let value = if test == "ANA" { TITRE } else { NUMBER };
    format!(r"(?i)\b(?P<name>{names})\s*(?:\([^)]*\))?[\s:=]+(?P<value>{value})\b")
}

struct Candidate {
    test: &'static str,
    start: usize,
    end: usize,
    name_len: usize,
    raw: String,
}

/// Extract every recognised test from `text`. Each test keeps its first
/// occurrence; names hidden inside a longer alias are ignored.
pub fn extract_lab_values(text: &str) -> ObservationSet {
    let mut candidates: Vec<Candidate> = PATTERNS
        .iter()
        .flat_map(|pattern| {
            pattern.regex.captures_iter(text).filter_map(|caps| {
                let name = caps.name("name")?;
                let value = caps.name("value")?;
                Some(Candidate {
                    test: pattern.test,
                    start: name.start(),
                    end: value.end(),
                    name_len: name.as_str().len(),
                    raw: value.as_str().to_string(),
                })
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.name_len.cmp(&a.name_len).then(a.start.cmp(&b.start)));

    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut observations = ObservationSet::new();
    for candidate in candidates {
        if observations.contains(candidate.test) {
            continue;
        }
        if claimed
            .iter()
            .any(|(start, end)| candidate.start < *end && *start < candidate.end)
        {
            continue;
        }
        claimed.push((candidate.start, candidate.end));
        observations.insert(candidate.test, LabValue::parse(&candidate.raw));
    }

    tracing::debug!(count = observations.len(), "lab values extracted");
    observations
}
