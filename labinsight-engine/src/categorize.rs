//! Assigns every observation to exactly one clinical category.

use labinsight_core::{CategorizedSet, Category, ObservationSet};

/// Group observations by category. Unknown names land in `Other`; categories
/// with no observations are absent from the result.
pub fn categorize(observations: &ObservationSet) -> CategorizedSet {
    let mut categorized = CategorizedSet::new();
    for (test, value) in observations.iter() {
        categorized.insert(Category::classify(test), test, value.clone());
    }
    categorized
}
