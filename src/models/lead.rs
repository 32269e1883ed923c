//! Lead-related data models.
//!
//! `Stage`, `Priority` and `ActivityType` are closed sets; anything outside them is rejected
//! at parse/deserialize time rather than carried through the engine.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    New,
    Contacted,
    Qualified,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl Stage {
    /// Pipeline order, used for bucket layout.
    pub const ALL: [Stage; 7] = [
        Stage::New,
        Stage::Contacted,
        Stage::Qualified,
        Stage::Proposal,
        Stage::Negotiation,
        Stage::ClosedWon,
        Stage::ClosedLost,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::New => "new",
            Stage::Contacted => "contacted",
            Stage::Qualified => "qualified",
            Stage::Proposal => "proposal",
            Stage::Negotiation => "negotiation",
            Stage::ClosedWon => "closed_won",
            Stage::ClosedLost => "closed_lost",
        }
    }

    /// Position in [`Stage::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pipeline stage '{0}'")]
pub struct ParseStageError(pub String);

impl FromStr for Stage {
    type Err = ParseStageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == value)
            .ok_or_else(|| ParseStageError(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Ranking weight; higher sorts first within a bucket.
    pub fn weight(&self) -> u8 {
        match self {
            Priority::Urgent => 4,
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority '{0}'")]
pub struct ParsePriorityError(pub String);

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "urgent" => Ok(Priority::Urgent),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(ParsePriorityError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Call,
    Email,
    Whatsapp,
    Meeting,
    ProposalSent,
    ContractSigned,
    FollowUp,
    NoteAdded,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Call => "call",
            ActivityType::Email => "email",
            ActivityType::Whatsapp => "whatsapp",
            ActivityType::Meeting => "meeting",
            ActivityType::ProposalSent => "proposal_sent",
            ActivityType::ContractSigned => "contract_signed",
            ActivityType::FollowUp => "follow_up",
            ActivityType::NoteAdded => "note_added",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown activity type '{0}'")]
pub struct ParseActivityTypeError(pub String);

impl FromStr for ActivityType {
    type Err = ParseActivityTypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "call" => Ok(ActivityType::Call),
            "email" => Ok(ActivityType::Email),
            "whatsapp" => Ok(ActivityType::Whatsapp),
            "meeting" => Ok(ActivityType::Meeting),
            "proposal_sent" => Ok(ActivityType::ProposalSent),
            "contract_signed" => Ok(ActivityType::ContractSigned),
            "follow_up" => Ok(ActivityType::FollowUp),
            "note_added" => Ok(ActivityType::NoteAdded),
            other => Err(ParseActivityTypeError(other.to_string())),
        }
    }
}

/// Recorded interaction with a lead. Never mutated once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub lead_id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Input for appending an activity; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub lead_id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Call-site context attached to a transition, e.g. "Call scheduled".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityNote {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub company_name: String,
    pub contact_name: String,
    #[serde(default)]
    pub estimated_revenue: Option<f64>,
    pub priority: Priority,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub follow_up_date: Option<DateTime<Utc>>,
    /// Insertion order, not necessarily timestamp order.
    #[serde(default)]
    pub activities: Vec<Activity>,
    pub match_score: u8,
}

impl Lead {
    /// Revenue with absence treated as zero.
    pub fn revenue(&self) -> f64 {
        self.estimated_revenue.unwrap_or(0.0)
    }
}
