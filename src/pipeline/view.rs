use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::metrics::{aggregate, PipelineMetrics};
use crate::models::{Lead, Stage};
use crate::pipeline::{
    config::HealthThresholds,
    health::{classify_health_with, HealthBreakdown, HealthTier},
    partition::{partition, Partitioned},
};
use crate::windowing::{RenderWindow, WindowingStrategy};

/// Everything the display layer reads, derived from one snapshot at one instant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineView<'a> {
    pub buckets: Partitioned<'a>,
    pub metrics: PipelineMetrics,
    pub health: HashMap<&'a str, HealthTier>,
    pub health_breakdown: HealthBreakdown,
    pub computed_at: DateTime<Utc>,
}

impl<'a> PipelineView<'a> {
    pub fn build(leads: &'a [Lead], now: DateTime<Utc>, thresholds: &HealthThresholds) -> Self {
        let buckets = partition(leads);
        let metrics = aggregate(&buckets);

        let mut health = HashMap::with_capacity(leads.len());
        let mut health_breakdown = HealthBreakdown::default();
        for lead in leads {
            let tier = classify_health_with(lead, now, thresholds);
            health_breakdown.record(tier);
            health.insert(lead.id.as_str(), tier);
        }

        Self {
            buckets,
            metrics,
            health,
            health_breakdown,
            computed_at: now,
        }
    }

    pub fn bucket(&self, stage: Stage) -> &[&'a Lead] {
        self.buckets.bucket(stage)
    }

    pub fn health_of(&self, lead_id: &str) -> Option<HealthTier> {
        self.health.get(lead_id).copied()
    }

    pub fn window<'b>(
        &'b self,
        stage: Stage,
        strategy: &WindowingStrategy,
    ) -> RenderWindow<'b, 'a> {
        strategy.window_for(self.buckets.bucket(stage))
    }
}
