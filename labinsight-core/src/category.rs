//! Closed set of clinical categories and the static test membership table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Clinical system a laboratory test belongs to.
///
/// The declaration order is the order categories appear in every output map.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Hematology,
    #[serde(rename = "Liver_Function")]
    LiverFunction,
    #[serde(rename = "Kidney_Function")]
    KidneyFunction,
    Metabolic,
    Endocrine,
    #[serde(rename = "Lipid_Profile")]
    LipidProfile,
    #[serde(rename = "Immunology_Rheumatology")]
    ImmunologyRheumatology,
    Coagulation,
    #[serde(rename = "Tumor_Markers")]
    TumorMarkers,
    #[serde(rename = "Vitamins_Minerals")]
    VitaminsMinerals,
    Other,
}

const HEMATOLOGY: &[&str] = &[
    "RBC",
    "Hemoglobin",
    "Hematocrit",
    "MCV",
    "MCH",
    "MCHC",
    "RDW",
    "WBC",
    "Platelets",
    "MPV",
    "Neutrophils",
    "Lymphocytes",
    "Monocytes",
    "Eosinophils",
    "Basophils",
    "Reticulocytes",
    "Blasts",
];

const LIVER_FUNCTION: &[&str] = &[
    "ALT",
    "AST",
    "ALP",
    "GGT",
    "Total_Bilirubin",
    "Direct_Bilirubin",
    "Indirect_Bilirubin",
    "Total_Protein",
    "Albumin",
    "Globulin",
    "A_G_Ratio",
];

const KIDNEY_FUNCTION: &[&str] = &[
    "Creatinine",
    "BUN",
    "eGFR",
    "Uric_Acid",
    "Sodium",
    "Potassium",
    "Chloride",
    "Bicarbonate",
    "Calcium",
    "Phosphorus",
    "Magnesium",
];

const METABOLIC: &[&str] = &[
    "Glucose_Fasting",
    "Glucose_Random",
    "HbA1c",
    "Insulin",
    "C_Peptide",
];

const ENDOCRINE: &[&str] = &[
    "TSH",
    "T3",
    "T4",
    "Free_T3",
    "Free_T4",
    "Anti_TPO",
    "Anti_Thyroglobulin",
];

const LIPID_PROFILE: &[&str] = &[
    "Total_Cholesterol",
    "HDL",
    "LDL",
    "Triglycerides",
    "VLDL",
    "Non_HDL_Cholesterol",
];

const IMMUNOLOGY_RHEUMATOLOGY: &[&str] = &["RF", "Anti_CCP", "ANA", "dsDNA", "ESR", "CRP", "ASO"];

const COAGULATION: &[&str] = &["PT", "INR", "aPTT", "Fibrinogen", "D_Dimer"];

const TUMOR_MARKERS: &[&str] = &["AFP", "CEA", "CA_125", "CA_19_9", "PSA", "CA_15_3"];

const VITAMINS_MINERALS: &[&str] = &[
    "Vitamin_D",
    "Vitamin_B12",
    "Folate",
    "Iron",
    "Ferritin",
    "TIBC",
    "Transferrin_Saturation",
];

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Hematology,
        Category::LiverFunction,
        Category::KidneyFunction,
        Category::Metabolic,
        Category::Endocrine,
        Category::LipidProfile,
        Category::ImmunologyRheumatology,
        Category::Coagulation,
        Category::TumorMarkers,
        Category::VitaminsMinerals,
        Category::Other,
    ];

    /// Stable key used in serialized output (`Liver_Function`).
    pub fn key(self) -> &'static str {
        match self {
            Category::Hematology => "Hematology",
            Category::LiverFunction => "Liver_Function",
            Category::KidneyFunction => "Kidney_Function",
            Category::Metabolic => "Metabolic",
            Category::Endocrine => "Endocrine",
            Category::LipidProfile => "Lipid_Profile",
            Category::ImmunologyRheumatology => "Immunology_Rheumatology",
            Category::Coagulation => "Coagulation",
            Category::TumorMarkers => "Tumor_Markers",
            Category::VitaminsMinerals => "Vitamins_Minerals",
            Category::Other => "Other",
        }
    }

    /// Human readable label (`Liver Function`).
    pub fn label(self) -> String {
        display_label(self.key())
    }

    /// Test names that belong to this category. `Other` has no fixed members.
    pub fn members(self) -> &'static [&'static str] {
        match self {
            Category::Hematology => HEMATOLOGY,
            Category::LiverFunction => LIVER_FUNCTION,
            Category::KidneyFunction => KIDNEY_FUNCTION,
            Category::Metabolic => METABOLIC,
            Category::Endocrine => ENDOCRINE,
            Category::LipidProfile => LIPID_PROFILE,
            Category::ImmunologyRheumatology => IMMUNOLOGY_RHEUMATOLOGY,
            Category::Coagulation => COAGULATION,
            Category::TumorMarkers => TUMOR_MARKERS,
            Category::VitaminsMinerals => VITAMINS_MINERALS,
            Category::Other => &[],
        }
    }

    /// Look up the category of a known test name. Names are case-sensitive.
    pub fn for_test(test: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|category| category.members().contains(&test))
    }

    /// Total classification: unknown names land in `Other`.
    pub fn classify(test: &str) -> Category {
        Category::for_test(test).unwrap_or(Category::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Whether `test` is part of the recognised test vocabulary.
pub fn is_known_test(test: &str) -> bool {
    Category::for_test(test).is_some()
}

/// Every recognised test name, grouped in category order.
pub fn known_tests() -> impl Iterator<Item = &'static str> {
    Category::ALL
        .into_iter()
        .flat_map(|category| category.members().iter().copied())
}

/// `Total_Bilirubin` -> `Total Bilirubin`.
pub fn display_label(name: &str) -> String {
    name.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_test_maps_to_exactly_one_category() {
        for test in known_tests() {
            let owners = Category::ALL
                .iter()
                .filter(|category| category.members().contains(&test))
                .count();
            assert_eq!(owners, 1, "{test} belongs to {owners} categories");
        }
    }

    #[test]
    fn unknown_test_falls_back_to_other() {
        assert_eq!(Category::classify("Troponin_I"), Category::Other);
        assert_eq!(Category::classify("hemoglobin"), Category::Other);
        assert_eq!(Category::classify("Hemoglobin"), Category::Hematology);
    }

    #[test]
    fn keys_match_serde_names() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.key()));
        }
        assert_eq!(Category::ImmunologyRheumatology.label(), "Immunology Rheumatology");
    }
}
