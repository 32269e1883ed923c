use std::cmp::Ordering;

use crate::models::Lead;

/// Bucket ranking: higher priority weight first, then higher revenue.
///
/// Equal leads compare as `Equal`; callers must sort stably so input order breaks ties.
pub fn compare_leads(a: &Lead, b: &Lead) -> Ordering {
    b.priority
        .weight()
        .cmp(&a.priority.weight())
        .then_with(|| b.revenue().total_cmp(&a.revenue()))
}

/// Stable in-place ranking of a bucket.
pub fn rank_bucket(bucket: &mut [&Lead]) {
    // slice::sort_by is stable
    bucket.sort_by(|a, b| compare_leads(a, b));
}
