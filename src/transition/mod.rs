pub mod controller;
pub mod error;
pub mod events;
pub mod throttle;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Activity, ActivityNote, Stage};

pub use controller::{ControllerConfig, TransitionController};
pub use error::TransitionError;
pub use events::{LogSink, PipelineEvent, PipelineEventSink};
pub use throttle::{GestureOutcome, GestureThrottle};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TransitionOrigin {
    /// Programmatic call; never throttled.
    Api,
    /// Drag/motion stream; coalesced per gesture.
    Gesture,
}

/// Stage-change command as received from a caller. Stages stay raw text until validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub lead_id: String,
    pub from_stage: String,
    pub to_stage: String,
    #[serde(default)]
    pub note: Option<ActivityNote>,
}

impl TransitionRequest {
    pub fn new(lead_id: impl Into<String>, from: Stage, to: Stage) -> Self {
        Self {
            lead_id: lead_id.into(),
            from_stage: from.as_str().to_string(),
            to_stage: to.as_str().to_string(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: ActivityNote) -> Self {
        self.note = Some(note);
        self
    }
}

/// One motion-originated event of a drag gesture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GestureEvent {
    pub gesture_id: String,
    pub lead_id: String,
    pub from_stage: String,
    pub to_stage: String,
    #[serde(default)]
    pub note: Option<ActivityNote>,
}

impl GestureEvent {
    pub fn new(
        gesture_id: impl Into<String>,
        lead_id: impl Into<String>,
        from: Stage,
        to: Stage,
    ) -> Self {
        Self {
            gesture_id: gesture_id.into(),
            lead_id: lead_id.into(),
            from_stage: from.as_str().to_string(),
            to_stage: to.as_str().to_string(),
            note: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransitionAck {
    pub lead_id: String,
    pub from_stage: Stage,
    pub to_stage: Stage,
    pub origin: TransitionOrigin,
    pub applied_at: DateTime<Utc>,
    /// False for a same-stage request: nothing was written for the stage.
    pub changed: bool,
    pub activity: Option<Activity>,
}

/// Target stage is checked first, then source stage.
pub(crate) fn parse_stages(from: &str, to: &str) -> Result<(Stage, Stage), TransitionError> {
    let to = to.parse::<Stage>().map_err(|err| TransitionError::InvalidStage { value: err.0 })?;
    let from = from
        .parse::<Stage>()
        .map_err(|err| TransitionError::InvalidStage { value: err.0 })?;
    Ok((from, to))
}
