//! Critical value screening, independent of category.

use labinsight_core::{CriticalAlert, ObservationSet, ReferenceData};

/// Flag every numeric observation outside its critical bounds.
///
/// Textual values and tests without critical bounds are skipped.
pub fn check_critical(
    observations: &ObservationSet,
    reference: &ReferenceData,
) -> Vec<CriticalAlert> {
    observations
        .numeric_iter()
        .filter_map(|(test, value)| {
            let bounds = reference.critical(test)?;
            let direction = bounds.breach(value)?;
            Some(CriticalAlert {
                test: test.to_string(),
                value,
                range: bounds.to_string(),
                direction,
            })
        })
        .collect()
}

/// Whether a single value breaches its critical bounds.
pub fn is_critical(test: &str, value: f64, reference: &ReferenceData) -> bool {
    reference
        .critical(test)
        .and_then(|bounds| bounds.breach(value))
        .is_some()
}
