//! Lead Record Store boundary.
//!
//! The engine never owns lead persistence; it reads snapshots and issues stage and activity
//! writes through this trait. `Database` is the bundled SQLite implementation.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Activity, Lead, NewActivity, Stage};

#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Current leads in store order.
    async fn fetch_snapshot(&self) -> Result<Vec<Lead>>;

    /// Persist a stage change and return the updated lead.
    async fn update_stage(
        &self,
        lead_id: &str,
        stage: Stage,
        updated_at: DateTime<Utc>,
    ) -> Result<Lead>;

    async fn append_activity(&self, activity: NewActivity) -> Result<Activity>;
}
