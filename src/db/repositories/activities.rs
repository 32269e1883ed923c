use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::{
    helpers::{parse_datetime, parse_enum},
    Database,
};
use crate::models::{Activity, NewActivity};

pub(crate) fn row_to_activity(row: &Row) -> Result<Activity> {
    let activity_type: String = row.get("activity_type")?;
    let created_at: String = row.get("created_at")?;

    Ok(Activity {
        id: row.get("id")?,
        lead_id: row.get("lead_id")?,
        activity_type: parse_enum(&activity_type, "activity_type")?,
        description: row.get("description")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

pub(crate) fn load_activities(conn: &Connection, lead_id: &str) -> Result<Vec<Activity>> {
    let mut stmt = conn.prepare(
        "SELECT id, lead_id, activity_type, description, created_at
         FROM activities
         WHERE lead_id = ?1
         ORDER BY rowid ASC",
    )?;

    let mut rows = stmt.query(params![lead_id])?;
    let mut activities = Vec::new();
    while let Some(row) = rows.next()? {
        activities.push(row_to_activity(row)?);
    }

    Ok(activities)
}

impl Database {
    /// Append an activity; fails if the lead does not exist.
    pub async fn insert_activity(&self, activity: NewActivity) -> Result<Activity> {
        self.execute(move |conn| {
            let record = Activity {
                id: Uuid::new_v4().to_string(),
                lead_id: activity.lead_id,
                activity_type: activity.activity_type,
                description: activity.description,
                created_at: activity.created_at,
            };

            conn.execute(
                "INSERT INTO activities (id, lead_id, activity_type, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.lead_id,
                    record.activity_type.as_str(),
                    record.description,
                    record.created_at.to_rfc3339(),
                ],
            )
            .with_context(|| format!("failed to insert activity for lead {}", record.lead_id))?;

            Ok(record)
        })
        .await
    }

    pub async fn list_activities_for_lead(&self, lead_id: &str) -> Result<Vec<Activity>> {
        let lead_id = lead_id.to_string();
        self.execute(move |conn| load_activities(conn, &lead_id)).await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use crate::models::{ActivityType, Lead, NewActivity, Priority, Stage};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    #[tokio::test]
    async fn activities_keep_insertion_order_not_timestamp_order() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("leads.sqlite3")).unwrap();
        let now = Utc::now();
        db.insert_lead(&Lead {
            id: "lead".into(),
            company_name: "Globex".into(),
            contact_name: "Hank".into(),
            estimated_revenue: None,
            priority: Priority::Low,
            stage: Stage::Contacted,
            created_at: now,
            updated_at: now,
            follow_up_date: None,
            activities: Vec::new(),
            match_score: 12,
        })
        .await
        .unwrap();

        let later = db
            .insert_activity(NewActivity {
                lead_id: "lead".into(),
                activity_type: ActivityType::Meeting,
                description: "Demo".into(),
                created_at: now,
            })
            .await
            .unwrap();
        // Back-dated correction recorded afterwards.
        let correction = db
            .insert_activity(NewActivity {
                lead_id: "lead".into(),
                activity_type: ActivityType::NoteAdded,
                description: "Missed call logged late".into(),
                created_at: now - Duration::days(2),
            })
            .await
            .unwrap();

        let stored = db.list_activities_for_lead("lead").await.unwrap();
        assert_eq!(stored, vec![later, correction]);
    }

    #[tokio::test]
    async fn activity_for_unknown_lead_is_rejected() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("leads.sqlite3")).unwrap();
        let result = db
            .insert_activity(NewActivity {
                lead_id: "nobody".into(),
                activity_type: ActivityType::Call,
                description: "Call".into(),
                created_at: Utc::now(),
            })
            .await;
        assert!(result.is_err());
    }
}
