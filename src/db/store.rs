use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::models::{Activity, Lead, NewActivity, Stage};
use crate::store::LeadStore;

#[async_trait]
impl LeadStore for Database {
    async fn fetch_snapshot(&self) -> Result<Vec<Lead>> {
        self.list_leads().await
    }

    async fn update_stage(
        &self,
        lead_id: &str,
        stage: Stage,
        updated_at: DateTime<Utc>,
    ) -> Result<Lead> {
        self.update_lead_stage(lead_id, stage, updated_at).await
    }

    async fn append_activity(&self, activity: NewActivity) -> Result<Activity> {
        self.insert_activity(activity).await
    }
}
