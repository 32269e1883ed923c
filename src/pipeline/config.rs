use serde::{Deserialize, Serialize};

/// Day thresholds for health classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HealthThresholds {
    /// Older than this with no recent activity: poor.
    pub poor_after_days: i64,

    /// Older than this with no recent activity: fair.
    pub fair_after_days: i64,

    /// Activity younger than this counts as recent.
    pub recent_activity_days: i64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            poor_after_days: 30,
            fair_after_days: 14,
            recent_activity_days: 7,
        }
    }
}

/// Render windowing tunables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowingConfig {
    /// Buckets at or below this size render in full.
    pub full_threshold: usize,

    /// Fixed row height of the virtual list
    pub row_height_px: u32,

    /// Extra rows materialized on each side of the visible range.
    pub overscan_rows: usize,
}

impl Default for WindowingConfig {
    fn default() -> Self {
        Self {
            full_threshold: 10,
            row_height_px: 72,
            overscan_rows: 3,
        }
    }
}
