use super::{AggregationResult, Bucket};
use std::collections::HashMap;

/// Compute terms aggregation from field values
pub fn aggregate_terms(field_values: Vec<String>, size: usize) -> AggregationResult {
    let mut counts: HashMap<String, usize> = HashMap::new();

    // Count occurrences
    for value in field_values {
        *counts.entry(value).or_insert(0) += 1;
    }

    // Sort by count descending, take top N
    let mut buckets: Vec<_> = counts
        .into_iter()
        .map(|(key, count)| Bucket { key, count })
        .collect();

    buckets.sort_by(|a, b| b.count.cmp(&a.count));
    buckets.truncate(size);

    AggregationResult {
        field: "".to_string(), // Will be set by caller
        buckets,
    }
}
