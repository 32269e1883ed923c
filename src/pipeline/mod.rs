pub mod config;
pub mod health;
pub mod partition;
pub mod ranking;
pub mod view;

pub use config::{HealthThresholds, WindowingConfig};
pub use health::{classify_health, classify_health_with, health_breakdown, HealthBreakdown, HealthTier};
pub use partition::{partition, Partitioned};
pub use ranking::compare_leads;
pub use view::PipelineView;
