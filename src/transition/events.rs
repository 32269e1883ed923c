use log::{info, warn};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use super::{TransitionAck, TransitionError, TransitionOrigin};
use crate::models::Stage;

/// Notifications emitted by the controller for the notification/activity-log collaborator.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PipelineEvent {
    #[serde(rename_all = "camelCase")]
    TransitionApplied { ack: TransitionAck },

    #[serde(rename_all = "camelCase")]
    TransitionRejected {
        lead_id: String,
        to_stage: Stage,
        origin: TransitionOrigin,
        error: TransitionError,
    },

    /// A pending gesture target was replaced by a newer one before it was applied.
    #[serde(rename_all = "camelCase")]
    GestureCoalesced {
        gesture_id: String,
        lead_id: String,
        dropped: Stage,
        pending: Stage,
    },

    #[serde(rename_all = "camelCase")]
    SnapshotRefreshed { lead_count: usize },
}

impl PipelineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::TransitionApplied { .. } => "transition-applied",
            PipelineEvent::TransitionRejected { .. } => "transition-rejected",
            PipelineEvent::GestureCoalesced { .. } => "gesture-coalesced",
            PipelineEvent::SnapshotRefreshed { .. } => "snapshot-refreshed",
        }
    }
}

pub trait PipelineEventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Sink that only writes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl PipelineEventSink for LogSink {
    fn emit(&self, event: PipelineEvent) {
        match &event {
            PipelineEvent::TransitionRejected { lead_id, error, .. } => {
                warn!("{}: lead {} ({})", event.name(), lead_id, error);
            }
            PipelineEvent::TransitionApplied { ack } => {
                info!(
                    "{}: lead {} {} -> {}",
                    event.name(),
                    ack.lead_id,
                    ack.from_stage,
                    ack.to_stage
                );
            }
            _ => log::debug!("{}: {:?}", event.name(), event),
        }
    }
}

impl PipelineEventSink for UnboundedSender<PipelineEvent> {
    fn emit(&self, event: PipelineEvent) {
        // Receiver gone means nobody is listening any more.
        let _ = self.send(event);
    }
}
