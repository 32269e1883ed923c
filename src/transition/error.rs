use serde::Serialize;

use crate::models::Stage;

/// Why a transition was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TransitionError {
    /// Unknown stage value; nothing was sent to the store.
    #[error("invalid stage '{value}'")]
    InvalidStage { value: String },

    /// The lead is not where the caller thought it was; refresh and retry.
    #[error("stale transition for lead {lead_id}: expected {expected}, found {}", .actual.map_or("nothing", |s| s.as_str()))]
    #[serde(rename_all = "camelCase")]
    StaleTransition {
        lead_id: String,
        expected: Stage,
        actual: Option<Stage>,
    },

    /// The store call failed or timed out. Not retried.
    #[error("lead store unavailable: {message}")]
    StoreUnavailable { message: String },
}

impl TransitionError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransitionError::InvalidStage { .. })
    }
}
