use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Lead;
use crate::pipeline::config::HealthThresholds;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HealthTier {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl HealthTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthTier::Poor => "poor",
            HealthTier::Fair => "fair",
            HealthTier::Good => "good",
            HealthTier::Excellent => "excellent",
        }
    }
}

/// Classify with the default thresholds (30 / 14 / 7 days).
pub fn classify_health(lead: &Lead, now: DateTime<Utc>) -> HealthTier {
    classify_health_with(lead, now, &HealthThresholds::default())
}

/// First matching rule wins:
/// stale and quiet -> poor, aging and quiet -> fair, engaged with a future follow-up ->
/// excellent, anything else -> good. Brand-new leads therefore start out good.
pub fn classify_health_with(
    lead: &Lead,
    now: DateTime<Utc>,
    thresholds: &HealthThresholds,
) -> HealthTier {
    let age_days = (now - lead.created_at).num_days();
    let has_recent_activity = lead
        .activities
        .iter()
        .any(|activity| (now - activity.created_at).num_days() < thresholds.recent_activity_days);
    let has_future_follow_up = lead.follow_up_date.is_some_and(|date| date > now);

    if age_days > thresholds.poor_after_days && !has_recent_activity {
        HealthTier::Poor
    } else if age_days > thresholds.fair_after_days && !has_recent_activity {
        HealthTier::Fair
    } else if has_future_follow_up && has_recent_activity {
        HealthTier::Excellent
    } else {
        HealthTier::Good
    }
}

/// Lead counts per health tier.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthBreakdown {
    pub poor: usize,
    pub fair: usize,
    pub good: usize,
    pub excellent: usize,
}

impl HealthBreakdown {
    pub fn record(&mut self, tier: HealthTier) {
        match tier {
            HealthTier::Poor => self.poor += 1,
            HealthTier::Fair => self.fair += 1,
            HealthTier::Good => self.good += 1,
            HealthTier::Excellent => self.excellent += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.poor + self.fair + self.good + self.excellent
    }
}

pub fn health_breakdown<'a, I>(
    leads: I,
    now: DateTime<Utc>,
    thresholds: &HealthThresholds,
) -> HealthBreakdown
where
    I: IntoIterator<Item = &'a Lead>,
{
    let mut breakdown = HealthBreakdown::default();
    for lead in leads {
        breakdown.record(classify_health_with(lead, now, thresholds));
    }
    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Activity, ActivityType, Priority, Stage};
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn lead_aged(days: i64) -> Lead {
        let created = now() - Duration::days(days);
        Lead {
            id: "lead-1".into(),
            company_name: "Acme".into(),
            contact_name: "Sam".into(),
            estimated_revenue: Some(100.0),
            priority: Priority::High,
            stage: Stage::Contacted,
            created_at: created,
            updated_at: created,
            follow_up_date: None,
            activities: Vec::new(),
            match_score: 70,
        }
    }

    fn activity_ago(days: i64) -> Activity {
        Activity {
            id: format!("act-{days}"),
            lead_id: "lead-1".into(),
            activity_type: ActivityType::Call,
            description: "Call".into(),
            created_at: now() - Duration::days(days),
        }
    }

    #[test]
    fn new_lead_without_activity_is_good() {
        assert_eq!(classify_health(&lead_aged(0), now()), HealthTier::Good);
    }

    #[test]
    fn quiet_old_leads_degrade() {
        assert_eq!(classify_health(&lead_aged(31), now()), HealthTier::Poor);
        assert_eq!(classify_health(&lead_aged(30), now()), HealthTier::Fair);
        assert_eq!(classify_health(&lead_aged(15), now()), HealthTier::Fair);
        assert_eq!(classify_health(&lead_aged(14), now()), HealthTier::Good);
    }

    #[test]
    fn recent_activity_rescues_old_lead() {
        let mut lead = lead_aged(60);
        lead.activities.push(activity_ago(40));
        lead.activities.push(activity_ago(6));
        assert_eq!(classify_health(&lead, now()), HealthTier::Good);

        lead.activities.pop();
        lead.activities.push(activity_ago(7));
        assert_eq!(classify_health(&lead, now()), HealthTier::Poor);
    }

    #[test]
    fn future_follow_up_with_recent_activity_is_excellent() {
        let mut lead = lead_aged(20);
        lead.activities.push(activity_ago(1));
        lead.follow_up_date = Some(now() + Duration::days(2));
        assert_eq!(classify_health(&lead, now()), HealthTier::Excellent);

        lead.follow_up_date = Some(now() - Duration::hours(1));
        assert_eq!(classify_health(&lead, now()), HealthTier::Good);
    }

    #[test]
    fn follow_up_alone_is_not_excellent() {
        let mut lead = lead_aged(2);
        lead.follow_up_date = Some(now() + Duration::days(2));
        assert_eq!(classify_health(&lead, now()), HealthTier::Good);
    }

    #[test]
    fn classification_is_deterministic() {
        let mut lead = lead_aged(18);
        lead.activities.push(activity_ago(9));
        let first = classify_health(&lead, now());
        for _ in 0..5 {
            assert_eq!(classify_health(&lead, now()), first);
        }
    }

    #[test]
    fn breakdown_counts_every_lead() {
        let leads = vec![lead_aged(0), lead_aged(20), lead_aged(45)];
        let breakdown = health_breakdown(&leads, now(), &HealthThresholds::default());
        assert_eq!(
            breakdown,
            HealthBreakdown {
                poor: 1,
                fair: 1,
                good: 1,
                excellent: 0
            }
        );
        assert_eq!(breakdown.total(), 3);
    }
}
