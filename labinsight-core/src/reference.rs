//! Reference ranges and critical safety bounds keyed by test name.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{format_value, Direction, Gender, LabError};

/// Population-normal interval for one test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceRange {
    pub unit: String,
    #[serde(flatten)]
    pub bounds: RangeBounds,
}

/// Either one interval for everyone or a pair of sex-specific intervals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RangeBounds {
    BySex { male: (f64, f64), female: (f64, f64) },
    Single { range: (f64, f64) },
}

impl ReferenceRange {
    pub fn single(unit: &str, low: f64, high: f64) -> Self {
        Self {
            unit: unit.to_string(),
            bounds: RangeBounds::Single { range: (low, high) },
        }
    }

    pub fn by_sex(unit: &str, male: (f64, f64), female: (f64, f64)) -> Self {
        Self {
            unit: unit.to_string(),
            bounds: RangeBounds::BySex { male, female },
        }
    }

    /// Resolve `(low, high)` for a patient, preferring sex-specific bounds.
    pub fn bounds_for(&self, gender: Gender) -> (f64, f64) {
        match (&self.bounds, gender) {
            (RangeBounds::BySex { male, .. }, Gender::Male) => *male,
            (RangeBounds::BySex { female, .. }, Gender::Female) => *female,
            (RangeBounds::Single { range }, _) => *range,
        }
    }
}

/// Life-threatening thresholds. A value strictly outside `[low, high]` is critical.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CriticalBounds(pub f64, pub f64);

impl CriticalBounds {
    pub fn low(&self) -> f64 {
        self.0
    }

    pub fn high(&self) -> f64 {
        self.1
    }

    pub fn breach(&self, value: f64) -> Option<Direction> {
        if value < self.0 {
            Some(Direction::Low)
        } else if value > self.1 {
            Some(Direction::High)
        } else {
            None
        }
    }
}

impl fmt::Display for CriticalBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_value(self.0), format_value(self.1))
    }
}

/// Static lookup tables consulted by the analysis engine.
///
/// Absence of an entry is never an error: it only means no judgement can be made.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReferenceData {
    #[serde(default)]
    pub ranges: BTreeMap<String, ReferenceRange>,
    #[serde(default)]
    pub critical: BTreeMap<String, CriticalBounds>,
}

impl ReferenceData {
    /// Built-in adult reference table.
    pub fn standard() -> Self {
        let mut ranges = BTreeMap::new();
        for (test, unit, low, high) in SINGLE_RANGES {
            ranges.insert(test.to_string(), ReferenceRange::single(unit, *low, *high));
        }
        for (test, unit, male, female) in SEX_RANGES {
            ranges.insert(test.to_string(), ReferenceRange::by_sex(unit, *male, *female));
        }

        let critical = CRITICAL_LIMITS
            .iter()
            .map(|(test, low, high)| (test.to_string(), CriticalBounds(*low, *high)))
            .collect();

        Self { ranges, critical }
    }

    /// Load tables from JSON shaped like `{"ranges": {..}, "critical": {..}}`.
    pub fn from_json_str(json: &str) -> Result<Self, LabError> {
        serde_json::from_str(json).map_err(|err| LabError::Parse(err.to_string()))
    }

    pub fn range(&self, test: &str) -> Option<&ReferenceRange> {
        self.ranges.get(test)
    }

    pub fn critical(&self, test: &str) -> Option<CriticalBounds> {
        self.critical.get(test).copied()
    }

    pub fn unit(&self, test: &str) -> Option<&str> {
        self.ranges.get(test).map(|range| range.unit.as_str())
    }

    /// Whether either table has an entry for `test`.
    pub fn knows(&self, test: &str) -> bool {
        self.ranges.contains_key(test) || self.critical.contains_key(test)
    }
}

const SINGLE_RANGES: &[(&str, &str, f64, f64)] = &[
    ("MCV", "fL", 80.0, 100.0),
    ("MCH", "pg", 27.0, 33.0),
    ("MCHC", "g/dL", 32.0, 36.0),
    ("RDW", "%", 11.5, 14.5),
    ("WBC", "x10^9/L", 4.0, 11.0),
    ("Platelets", "x10^9/L", 150.0, 450.0),
    ("MPV", "fL", 7.5, 11.5),
    ("Neutrophils", "%", 40.0, 70.0),
    ("Lymphocytes", "%", 20.0, 40.0),
    ("Monocytes", "%", 2.0, 8.0),
    ("Eosinophils", "%", 1.0, 4.0),
    ("Basophils", "%", 0.0, 1.0),
    ("Reticulocytes", "%", 0.5, 2.5),
    ("Blasts", "%", 0.0, 0.0),
    ("ALT", "U/L", 7.0, 40.0),
    ("AST", "U/L", 10.0, 40.0),
    ("ALP", "U/L", 44.0, 120.0),
    ("Total_Bilirubin", "mg/dL", 0.1, 1.2),
    ("Direct_Bilirubin", "mg/dL", 0.0, 0.3),
    ("Indirect_Bilirubin", "mg/dL", 0.2, 0.9),
    ("Total_Protein", "g/dL", 6.0, 8.3),
    ("Albumin", "g/dL", 3.5, 5.0),
    ("Globulin", "g/dL", 2.0, 3.5),
    ("A_G_Ratio", "ratio", 1.1, 2.5),
    ("BUN", "mg/dL", 7.0, 20.0),
    ("eGFR", "mL/min/1.73m2", 90.0, 150.0),
    ("Sodium", "mEq/L", 135.0, 145.0),
    ("Potassium", "mEq/L", 3.5, 5.0),
    ("Chloride", "mEq/L", 98.0, 107.0),
    ("Bicarbonate", "mEq/L", 22.0, 29.0),
    ("Calcium", "mg/dL", 8.5, 10.5),
    ("Phosphorus", "mg/dL", 2.5, 4.5),
    ("Magnesium", "mg/dL", 1.7, 2.2),
    ("Glucose_Fasting", "mg/dL", 70.0, 99.0),
    ("Glucose_Random", "mg/dL", 70.0, 140.0),
    ("HbA1c", "%", 4.0, 5.6),
    ("Insulin", "μU/mL", 2.6, 24.9),
    ("C_Peptide", "ng/mL", 0.8, 3.1),
    ("TSH", "μIU/mL", 0.4, 4.5),
    ("T3", "ng/dL", 80.0, 200.0),
    ("T4", "μg/dL", 5.0, 12.0),
    ("Free_T3", "pg/mL", 2.3, 4.2),
    ("Free_T4", "ng/dL", 0.8, 1.8),
    ("Anti_TPO", "IU/mL", 0.0, 35.0),
    ("Anti_Thyroglobulin", "IU/mL", 0.0, 40.0),
    ("Total_Cholesterol", "mg/dL", 0.0, 200.0),
    ("LDL", "mg/dL", 0.0, 100.0),
    ("Triglycerides", "mg/dL", 0.0, 150.0),
    ("VLDL", "mg/dL", 5.0, 40.0),
    ("Non_HDL_Cholesterol", "mg/dL", 0.0, 130.0),
    ("RF", "IU/mL", 0.0, 20.0),
    ("Anti_CCP", "U/mL", 0.0, 20.0),
    ("dsDNA", "IU/mL", 0.0, 30.0),
    ("CRP", "mg/L", 0.0, 10.0),
    ("ASO", "IU/mL", 0.0, 200.0),
    ("PT", "seconds", 11.0, 13.5),
    ("INR", "ratio", 0.8, 1.2),
    ("aPTT", "seconds", 25.0, 35.0),
    ("Fibrinogen", "mg/dL", 200.0, 400.0),
    ("D_Dimer", "ng/mL", 0.0, 500.0),
    ("AFP", "ng/mL", 0.0, 10.0),
    ("CEA", "ng/mL", 0.0, 3.0),
    ("CA_125", "U/mL", 0.0, 35.0),
    ("CA_19_9", "U/mL", 0.0, 37.0),
    ("PSA", "ng/mL", 0.0, 4.0),
    ("CA_15_3", "U/mL", 0.0, 30.0),
    ("Vitamin_D", "ng/mL", 30.0, 100.0),
    ("Vitamin_B12", "pg/mL", 200.0, 900.0),
    ("Folate", "ng/mL", 2.7, 17.0),
    ("TIBC", "μg/dL", 250.0, 450.0),
    ("Transferrin_Saturation", "%", 20.0, 50.0),
];

type SexRange = (&'static str, &'static str, (f64, f64), (f64, f64));

const SEX_RANGES: &[SexRange] = &[
    ("RBC", "x10^12/L", (4.5, 5.9), (4.1, 5.1)),
    ("Hemoglobin", "g/dL", (13.5, 17.5), (12.0, 15.5)),
    ("Hematocrit", "%", (41.0, 53.0), (36.0, 46.0)),
    ("GGT", "U/L", (8.0, 61.0), (5.0, 36.0)),
    ("Creatinine", "mg/dL", (0.7, 1.3), (0.6, 1.1)),
    ("Uric_Acid", "mg/dL", (3.4, 7.0), (2.4, 6.0)),
    ("HDL", "mg/dL", (40.0, 200.0), (50.0, 200.0)),
    ("ESR", "mm/hr", (0.0, 15.0), (0.0, 20.0)),
    ("Iron", "μg/dL", (65.0, 175.0), (50.0, 170.0)),
    ("Ferritin", "ng/mL", (24.0, 336.0), (11.0, 307.0)),
];

const CRITICAL_LIMITS: &[(&str, f64, f64)] = &[
    ("Hemoglobin", 7.0, 20.0),
    ("Hematocrit", 20.0, 60.0),
    ("WBC", 2.0, 30.0),
    ("Platelets", 20.0, 1000.0),
    ("Sodium", 120.0, 160.0),
    ("Potassium", 2.5, 6.5),
    ("Calcium", 6.0, 13.0),
    ("Magnesium", 1.0, 4.7),
    ("Bicarbonate", 10.0, 40.0),
    ("Creatinine", 0.0, 10.0),
    ("Glucose_Fasting", 40.0, 400.0),
    ("Glucose_Random", 40.0, 500.0),
    ("Total_Bilirubin", 0.0, 15.0),
    ("INR", 0.0, 5.0),
    ("aPTT", 0.0, 100.0),
    ("Fibrinogen", 100.0, 1000.0),
];
