//! Reference range comparison: per-category abnormalities and single-value status.

use labinsight_core::{
    format_value, Abnormality, Classification, Direction, Gender, ObservationSet, ReferenceData,
    ReferenceStatus,
};

/// Numeric observations strictly outside their (sex-specific) reference range.
///
/// Tests without a reference entry produce nothing.
pub fn detect_abnormalities(
    tests: &ObservationSet,
    gender: Gender,
    reference: &ReferenceData,
) -> Vec<Abnormality> {
    tests
        .numeric_iter()
        .filter_map(|(test, value)| {
            let (low, high) = reference.range(test)?.bounds_for(gender);
            let direction = if value < low {
                Direction::Low
            } else if value > high {
                Direction::High
            } else {
                return None;
            };
            Some(Abnormality {
                test: test.to_string(),
                value,
                direction,
            })
        })
        .collect()
}

/// Status of one value against its reference range, with a description
/// quoting the bounds used.
pub fn classify(
    test: &str,
    value: f64,
    gender: Gender,
    reference: &ReferenceData,
) -> Classification {
    let Some(range) = reference.range(test) else {
        return Classification {
            status: ReferenceStatus::Normal,
            description: "Unknown reference".to_string(),
        };
    };

    let (low, high) = range.bounds_for(gender);
    let (status, label) = if value < low {
        (ReferenceStatus::AbnormalLow, "Low")
    } else if value > high {
        (ReferenceStatus::AbnormalHigh, "High")
    } else {
        (ReferenceStatus::Normal, "Normal")
    };

    let bounds = format!("{}-{}", format_value(low), format_value(high));
    let description = if range.unit.is_empty() {
        format!("{label} (Ref: {bounds})")
    } else {
        format!("{label} (Ref: {bounds} {})", range.unit)
    };

    Classification {
        status,
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labinsight_core::LabValue;

    #[test]
    fn uses_sex_specific_bounds() {
        let reference = ReferenceData::standard();
        let mut tests = ObservationSet::new();
        tests.insert("Hemoglobin", 12.8);

        assert_eq!(
            detect_abnormalities(&tests, Gender::Male, &reference),
            vec![Abnormality {
                test: "Hemoglobin".into(),
                value: 12.8,
                direction: Direction::Low,
            }]
        );
        assert!(detect_abnormalities(&tests, Gender::Female, &reference).is_empty());
    }

    #[test]
    fn skips_text_and_unreferenced_tests() {
        let reference = ReferenceData::standard();
        let mut tests = ObservationSet::new();
        tests.insert("ANA", LabValue::Text("1:320".into()));
        tests.insert("Novel_Marker", 1e6);
        tests.insert("MCV", 100.0);

        assert!(detect_abnormalities(&tests, Gender::Female, &reference).is_empty());
    }

    #[test]
    fn classification_describes_bounds() {
        let reference = ReferenceData::standard();

        let low = classify("Hemoglobin", 10.0, Gender::Female, &reference);
        assert_eq!(low.status, ReferenceStatus::AbnormalLow);
        assert_eq!(low.glyph(), "↓");
        assert_eq!(low.description, "Low (Ref: 12-15.5 g/dL)");

        let high = classify("Potassium", 5.4, Gender::Male, &reference);
        assert_eq!(high.status, ReferenceStatus::AbnormalHigh);
        assert_eq!(high.description, "High (Ref: 3.5-5 mEq/L)");

        let normal = classify("MCV", 80.0, Gender::Male, &reference);
        assert_eq!(normal.status, ReferenceStatus::Normal);
        assert_eq!(normal.glyph(), "✓");

        let unknown = classify("Novel_Marker", 3.0, Gender::Male, &reference);
        assert_eq!(unknown.status, ReferenceStatus::Normal);
        assert_eq!(unknown.description, "Unknown reference");
    }
}
