use std::{collections::HashSet, ops::Deref, sync::Arc};

use super::lead::{Activity, Lead};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    #[error("duplicate lead id '{0}'")]
    DuplicateId(String),

    #[error("lead '{lead_id}' has invalid revenue {value}")]
    InvalidRevenue { lead_id: String, value: f64 },

    #[error("lead '{lead_id}' has match score {value} outside 0..=100")]
    InvalidMatchScore { lead_id: String, value: u8 },
}

/// Immutable, validated view of the lead collection as handed over by the store.
///
/// Clones share the same allocation; a new snapshot (new reference) is what triggers a
/// repartition downstream.
#[derive(Debug, Clone)]
pub struct LeadSnapshot {
    leads: Arc<[Lead]>,
}

impl LeadSnapshot {
    pub fn new(leads: Vec<Lead>) -> Result<Self, SnapshotError> {
        let mut seen = HashSet::with_capacity(leads.len());
        for lead in &leads {
            validate_lead(lead)?;
            if !seen.insert(lead.id.as_str()) {
                return Err(SnapshotError::DuplicateId(lead.id.clone()));
            }
        }

        Ok(Self {
            leads: leads.into(),
        })
    }

    pub fn empty() -> Self {
        Self {
            leads: Arc::from(Vec::new()),
        }
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn get(&self, lead_id: &str) -> Option<&Lead> {
        self.leads.iter().find(|lead| lead.id == lead_id)
    }

    /// True when both handles point at the same snapshot allocation.
    pub fn ptr_eq(&self, other: &LeadSnapshot) -> bool {
        Arc::ptr_eq(&self.leads, &other.leads)
    }

    /// New snapshot with `updated` swapped in at the position of the lead sharing its id.
    /// Returns `None` if no such lead exists.
    pub fn with_lead(&self, updated: Lead) -> Result<Option<Self>, SnapshotError> {
        validate_lead(&updated)?;
        let Some(position) = self.leads.iter().position(|lead| lead.id == updated.id) else {
            return Ok(None);
        };

        let mut leads = self.leads.to_vec();
        leads[position] = updated;
        Ok(Some(Self {
            leads: leads.into(),
        }))
    }

    /// New snapshot with `activity` appended to its lead; `None` if the lead is unknown.
    pub fn with_activity(&self, activity: Activity) -> Option<Self> {
        let position = self
            .leads
            .iter()
            .position(|lead| lead.id == activity.lead_id)?;

        let mut leads = self.leads.to_vec();
        leads[position].activities.push(activity);
        Some(Self {
            leads: leads.into(),
        })
    }
}

impl Default for LeadSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for LeadSnapshot {
    type Target = [Lead];

    fn deref(&self) -> &Self::Target {
        &self.leads
    }
}

fn validate_lead(lead: &Lead) -> Result<(), SnapshotError> {
    if let Some(value) = lead.estimated_revenue {
        if !value.is_finite() || value < 0.0 {
            return Err(SnapshotError::InvalidRevenue {
                lead_id: lead.id.clone(),
                value,
            });
        }
    }
    if lead.match_score > 100 {
        return Err(SnapshotError::InvalidMatchScore {
            lead_id: lead.id.clone(),
            value: lead.match_score,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, Stage};
    use chrono::Utc;

    fn lead(id: &str, revenue: Option<f64>) -> Lead {
        let now = Utc::now();
        Lead {
            id: id.to_string(),
            company_name: "Acme".into(),
            contact_name: "Sam".into(),
            estimated_revenue: revenue,
            priority: Priority::Medium,
            stage: Stage::New,
            created_at: now,
            updated_at: now,
            follow_up_date: None,
            activities: Vec::new(),
            match_score: 50,
        }
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = LeadSnapshot::new(vec![lead("a", None), lead("a", Some(5.0))]);
        assert_eq!(result.unwrap_err(), SnapshotError::DuplicateId("a".into()));
    }

    #[test]
    fn rejects_negative_revenue() {
        let result = LeadSnapshot::new(vec![lead("a", Some(-1.0))]);
        assert!(matches!(result, Err(SnapshotError::InvalidRevenue { .. })));
    }

    #[test]
    fn rejects_out_of_range_match_score() {
        let mut bad = lead("a", None);
        bad.match_score = 101;
        assert!(matches!(
            LeadSnapshot::new(vec![bad]),
            Err(SnapshotError::InvalidMatchScore { value: 101, .. })
        ));
    }

    #[test]
    fn with_lead_produces_new_reference_and_keeps_order() {
        let snapshot = LeadSnapshot::new(vec![lead("a", None), lead("b", None)]).unwrap();
        let mut moved = snapshot.get("a").unwrap().clone();
        moved.stage = Stage::Qualified;

        let next = snapshot.with_lead(moved).unwrap().unwrap();
        assert!(!next.ptr_eq(&snapshot));
        assert_eq!(next[0].stage, Stage::Qualified);
        assert_eq!(next[1].id, "b");
        assert_eq!(snapshot[0].stage, Stage::New);
    }

    #[test]
    fn with_lead_unknown_id_is_none() {
        let snapshot = LeadSnapshot::new(vec![lead("a", None)]).unwrap();
        assert!(snapshot.with_lead(lead("zzz", None)).unwrap().is_none());
    }
}
