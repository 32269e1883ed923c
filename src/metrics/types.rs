use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::Stage;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StageMetrics {
    pub count: usize,
    pub value: f64,
}

/// Whole-pipeline figures derived from one partition.
///
/// Rates and averages resolve to 0 on an empty pipeline (or with no won deals for the
/// cycle time); they are never NaN.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetrics {
    pub stage_metrics: BTreeMap<Stage, StageMetrics>,
    pub total_leads: usize,
    pub total_value: f64,
    pub average_deal_size: f64,
    /// Percentage of leads in closed_won, 0..=100.
    pub conversion_rate: f64,
    /// Mean days from creation to last update over closed_won leads.
    pub average_cycle_time: f64,
}

impl PipelineMetrics {
    pub fn stage(&self, stage: Stage) -> StageMetrics {
        self.stage_metrics.get(&stage).copied().unwrap_or_default()
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            stage_metrics: Stage::ALL
                .into_iter()
                .map(|stage| (stage, StageMetrics::default()))
                .collect(),
            total_leads: 0,
            total_value: 0.0,
            average_deal_size: 0.0,
            conversion_rate: 0.0,
            average_cycle_time: 0.0,
        }
    }
}
