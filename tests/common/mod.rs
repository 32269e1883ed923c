#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use leadflow::models::{Activity, Lead, NewActivity, Priority, Stage};
use leadflow::LeadStore;

/// In-memory store that records every write and can be told to fail or stall.
#[derive(Default)]
pub struct RecordingStore {
    leads: Mutex<Vec<Lead>>,
    stage_writes: Mutex<Vec<(String, Stage)>>,
    activities: Mutex<Vec<Activity>>,
    next_activity: AtomicUsize,
    fail: AtomicBool,
    corrupt_updates: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl RecordingStore {
    pub fn with_leads(leads: Vec<Lead>) -> Self {
        Self {
            leads: Mutex::new(leads),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Persist stage writes but hand back a lead that fails snapshot validation.
    pub fn set_corrupt_updates(&self, corrupt: bool) {
        self.corrupt_updates.store(corrupt, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn stage_writes(&self) -> Vec<(String, Stage)> {
        self.stage_writes.lock().unwrap().clone()
    }

    pub fn activities(&self) -> Vec<Activity> {
        self.activities.lock().unwrap().clone()
    }

    pub fn stage_of(&self, lead_id: &str) -> Option<Stage> {
        self.leads
            .lock()
            .unwrap()
            .iter()
            .find(|lead| lead.id == lead_id)
            .map(|lead| lead.stage)
    }

    async fn pre_call(&self) -> Result<()> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl LeadStore for RecordingStore {
    async fn fetch_snapshot(&self) -> Result<Vec<Lead>> {
        self.pre_call().await?;
        Ok(self.leads.lock().unwrap().clone())
    }

    async fn update_stage(
        &self,
        lead_id: &str,
        stage: Stage,
        updated_at: DateTime<Utc>,
    ) -> Result<Lead> {
        self.pre_call().await?;
        let mut leads = self.leads.lock().unwrap();
        let lead = leads
            .iter_mut()
            .find(|lead| lead.id == lead_id)
            .ok_or_else(|| anyhow!("lead {lead_id} not found"))?;
        lead.stage = stage;
        lead.updated_at = updated_at;
        self.stage_writes
            .lock()
            .unwrap()
            .push((lead_id.to_string(), stage));
        let mut returned = lead.clone();
        if self.corrupt_updates.load(Ordering::SeqCst) {
            returned.estimated_revenue = Some(-1.0);
        }
        Ok(returned)
    }

    async fn append_activity(&self, activity: NewActivity) -> Result<Activity> {
        self.pre_call().await?;
        let id = self.next_activity.fetch_add(1, Ordering::SeqCst);
        let record = Activity {
            id: format!("act-{id}"),
            lead_id: activity.lead_id,
            activity_type: activity.activity_type,
            description: activity.description,
            created_at: activity.created_at,
        };
        let mut leads = self.leads.lock().unwrap();
        if let Some(lead) = leads.iter_mut().find(|lead| lead.id == record.lead_id) {
            lead.activities.push(record.clone());
        }
        self.activities.lock().unwrap().push(record.clone());
        Ok(record)
    }
}

pub fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()
}

pub fn lead(id: &str, stage: Stage, priority: Priority, revenue: Option<f64>) -> Lead {
    Lead {
        id: id.to_string(),
        company_name: format!("{id} Holdings"),
        contact_name: "Jordan".into(),
        estimated_revenue: revenue,
        priority,
        stage,
        created_at: created_at(),
        updated_at: created_at(),
        follow_up_date: None,
        activities: Vec::new(),
        match_score: 64,
    }
}
