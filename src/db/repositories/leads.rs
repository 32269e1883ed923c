use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    helpers::{parse_datetime, parse_enum, parse_optional_datetime, to_match_score, to_revenue},
    repositories::activities::{load_activities, row_to_activity},
    Database,
};
use crate::models::{Activity, Lead, Stage};

const LEAD_COLUMNS: &str = "id, company_name, contact_name, estimated_revenue, priority, stage,
     created_at, updated_at, follow_up_date, match_score";

fn row_to_lead(row: &Row) -> Result<Lead> {
    let priority: String = row.get("priority")?;
    let stage: String = row.get("stage")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let follow_up_date: Option<String> = row.get("follow_up_date")?;
    let match_score: i64 = row.get("match_score")?;

    Ok(Lead {
        id: row.get("id")?,
        company_name: row.get("company_name")?,
        contact_name: row.get("contact_name")?,
        estimated_revenue: to_revenue(row.get("estimated_revenue")?)?,
        priority: parse_enum(&priority, "priority")?,
        stage: parse_enum(&stage, "stage")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
        follow_up_date: parse_optional_datetime(follow_up_date, "follow_up_date")?,
        activities: Vec::new(),
        match_score: to_match_score(match_score)?,
    })
}

pub(crate) fn load_lead(conn: &Connection, lead_id: &str) -> Result<Option<Lead>> {
    let mut stmt = conn.prepare(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"))?;
    let lead = stmt
        .query_row(params![lead_id], |row| Ok(row_to_lead(row)))
        .optional()?
        .transpose()?;

    match lead {
        Some(mut lead) => {
            lead.activities = load_activities(conn, &lead.id)?;
            Ok(Some(lead))
        }
        None => Ok(None),
    }
}

impl Database {
    /// Insert a lead together with any activities it already carries.
    pub async fn insert_lead(&self, lead: &Lead) -> Result<()> {
        let record = lead.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO leads (id, company_name, contact_name, estimated_revenue, priority,
                                    stage, created_at, updated_at, follow_up_date, match_score)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.company_name,
                    record.contact_name,
                    to_revenue(record.estimated_revenue)?,
                    record.priority.as_str(),
                    record.stage.as_str(),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                    record.follow_up_date.map(|dt| dt.to_rfc3339()),
                    i64::from(record.match_score),
                ],
            )
            .with_context(|| format!("failed to insert lead {}", record.id))?;

            for activity in &record.activities {
                tx.execute(
                    "INSERT INTO activities (id, lead_id, activity_type, description, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        activity.id,
                        record.id,
                        activity.activity_type.as_str(),
                        activity.description,
                        activity.created_at.to_rfc3339(),
                    ],
                )
                .with_context(|| format!("failed to insert activity {}", activity.id))?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn get_lead(&self, lead_id: &str) -> Result<Option<Lead>> {
        let lead_id = lead_id.to_string();
        self.execute(move |conn| load_lead(conn, &lead_id)).await
    }

    /// All leads in insertion order, each with its activities in insertion order.
    pub async fn list_leads(&self) -> Result<Vec<Lead>> {
        self.execute(|conn| {
            let mut activities_by_lead: HashMap<String, Vec<Activity>> = HashMap::new();
            {
                let mut stmt = conn.prepare(
                    "SELECT id, lead_id, activity_type, description, created_at
                     FROM activities
                     ORDER BY rowid ASC",
                )?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    let activity = row_to_activity(row)?;
                    activities_by_lead
                        .entry(activity.lead_id.clone())
                        .or_default()
                        .push(activity);
                }
            }

            let mut stmt =
                conn.prepare(&format!("SELECT {LEAD_COLUMNS} FROM leads ORDER BY rowid ASC"))?;
            let mut rows = stmt.query([])?;
            let mut leads = Vec::new();
            while let Some(row) = rows.next()? {
                let mut lead = row_to_lead(row)?;
                lead.activities = activities_by_lead.remove(&lead.id).unwrap_or_default();
                leads.push(lead);
            }

            Ok(leads)
        })
        .await
    }

    /// Set a lead's stage and return the stored result.
    pub async fn update_lead_stage(
        &self,
        lead_id: &str,
        stage: Stage,
        updated_at: DateTime<Utc>,
    ) -> Result<Lead> {
        let lead_id = lead_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE leads
                 SET stage = ?1,
                     updated_at = ?2
                 WHERE id = ?3",
                params![stage.as_str(), updated_at.to_rfc3339(), lead_id],
            )?;

            if rows_affected == 0 {
                bail!("lead {lead_id} not found");
            }

            load_lead(conn, &lead_id)?
                .with_context(|| format!("lead {lead_id} missing after stage update"))
        })
        .await
    }
}
