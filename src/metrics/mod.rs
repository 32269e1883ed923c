mod types;

pub use types::{PipelineMetrics, StageMetrics};

use crate::models::{Lead, Stage};
use crate::pipeline::Partitioned;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Compute stage and pipeline figures from a single partition.
pub fn aggregate(partitioned: &Partitioned<'_>) -> PipelineMetrics {
    let mut metrics = PipelineMetrics::default();

    for (stage, bucket) in partitioned.iter() {
        let value: f64 = bucket.iter().map(|lead| lead.revenue()).sum();
        let entry = metrics.stage_metrics.entry(stage).or_default();
        entry.count = bucket.len();
        entry.value = value;

        metrics.total_leads += bucket.len();
        metrics.total_value += value;
    }

    let won = partitioned.bucket(Stage::ClosedWon);
    let denominator = metrics.total_leads.max(1) as f64;

    metrics.average_deal_size = metrics.total_value / denominator;
    metrics.conversion_rate = won.len() as f64 / denominator * 100.0;
    metrics.average_cycle_time = if won.is_empty() {
        0.0
    } else {
        won.iter().map(|lead| cycle_time_days(lead)).sum::<f64>() / won.len() as f64
    };

    metrics
}

/// Days between creation and last update, fractional.
pub fn cycle_time_days(lead: &Lead) -> f64 {
    (lead.updated_at - lead.created_at).num_milliseconds() as f64 / MILLIS_PER_DAY
}
