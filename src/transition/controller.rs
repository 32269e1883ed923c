use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::{
    models::{ActivityNote, LeadSnapshot, NewActivity, Stage},
    settings::PipelineSettings,
    store::LeadStore,
};

use super::{
    events::{PipelineEvent, PipelineEventSink},
    parse_stages,
    throttle::{GestureOutcome, GestureThrottle, PendingTransition},
    GestureEvent, TransitionAck, TransitionError, TransitionOrigin, TransitionRequest,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    pub throttle_window: Duration,
    pub store_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from(&PipelineSettings::default())
    }
}

impl From<&PipelineSettings> for ControllerConfig {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            throttle_window: settings.throttle_window(),
            store_timeout: settings.store_timeout(),
        }
    }
}

/// Validates stage changes against the last-seen snapshot and forwards them to the store.
///
/// The snapshot lock is held for the whole validate-write-update sequence, so transitions
/// are applied one at a time and readers never observe a half-applied change. Gesture
/// events go through a keep-latest throttle and are applied by a background flusher.
#[derive(Clone)]
pub struct TransitionController {
    store: Arc<dyn LeadStore>,
    sink: Arc<dyn PipelineEventSink>,
    snapshot: Arc<Mutex<LeadSnapshot>>,
    throttle: Arc<Mutex<GestureThrottle>>,
    flusher: Arc<Mutex<Option<JoinHandle<()>>>>,
    cancel_token: CancellationToken,
    config: ControllerConfig,
}

impl TransitionController {
    pub fn new(
        store: Arc<dyn LeadStore>,
        sink: Arc<dyn PipelineEventSink>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            store,
            sink,
            snapshot: Arc::new(Mutex::new(LeadSnapshot::empty())),
            throttle: Arc::new(Mutex::new(GestureThrottle::new(config.throttle_window))),
            flusher: Arc::new(Mutex::new(None)),
            cancel_token: CancellationToken::new(),
            config,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Last-seen snapshot. Cheap: shares the underlying allocation.
    pub async fn snapshot(&self) -> LeadSnapshot {
        self.snapshot.lock().await.clone()
    }

    /// Adopt a snapshot handed over by the caller.
    pub async fn replace_snapshot(&self, snapshot: LeadSnapshot) {
        let lead_count = snapshot.len();
        *self.snapshot.lock().await = snapshot;
        self.sink.emit(PipelineEvent::SnapshotRefreshed { lead_count });
    }

    /// Fetch a fresh snapshot from the store and make it the validation baseline.
    pub async fn refresh(&self) -> Result<LeadSnapshot, TransitionError> {
        let mut current = self.snapshot.lock().await;
        let leads = self.call_store(self.store.fetch_snapshot()).await?;
        let snapshot = LeadSnapshot::new(leads).map_err(|err| {
            log_error!("Store returned an invalid snapshot: {err}");
            TransitionError::StoreUnavailable {
                message: format!("invalid snapshot: {err}"),
            }
        })?;

        *current = snapshot.clone();
        drop(current);

        log_info!("Loaded snapshot with {} leads", snapshot.len());
        self.sink.emit(PipelineEvent::SnapshotRefreshed {
            lead_count: snapshot.len(),
        });
        Ok(snapshot)
    }

    /// Programmatic transition. Never throttled or dropped.
    pub async fn request_transition(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionAck, TransitionError> {
        let (from, to) = self.validate_stages(&request.lead_id, &request.from_stage, &request.to_stage)?;
        self.apply(&request.lead_id, from, to, request.note, TransitionOrigin::Api)
            .await
    }

    /// Motion-originated transition. Coalesced per `(gesture_id, lead_id)`; the outcome of
    /// the eventual write is reported through the event sink.
    pub async fn submit_gesture(
        &self,
        event: GestureEvent,
    ) -> Result<GestureOutcome, TransitionError> {
        let (from, to) = self.validate_stages(&event.lead_id, &event.from_stage, &event.to_stage)?;

        // No flusher runs after shutdown, so nothing may be left in the throttle.
        if self.cancel_token.is_cancelled() {
            log_debug!(
                "Gesture {} for lead {} arrived after shutdown, applying directly",
                event.gesture_id,
                event.lead_id
            );
            self.apply(&event.lead_id, from, to, event.note, TransitionOrigin::Gesture)
                .await?;
            return Ok(GestureOutcome::Applied);
        }

        let pending = PendingTransition {
            gesture_id: event.gesture_id,
            lead_id: event.lead_id,
            from_stage: from,
            to_stage: to,
            note: event.note,
            last_seen: Instant::now(),
            superseded: 0,
        };
        let gesture_id = pending.gesture_id.clone();
        let lead_id = pending.lead_id.clone();

        let outcome = {
            let mut throttle = self.throttle.lock().await;
            throttle.submit(pending, Instant::now())
        };

        if let GestureOutcome::Replaced { dropped } = outcome {
            log_debug!(
                "Coalesced gesture {} for lead {}: {} replaced by {}",
                gesture_id,
                lead_id,
                dropped,
                to
            );
            self.sink.emit(PipelineEvent::GestureCoalesced {
                gesture_id,
                lead_id,
                dropped,
                pending: to,
            });
        }

        self.ensure_flusher().await;
        if self.cancel_token.is_cancelled() {
            // Shutdown raced this submit; its final flush may already have run.
            self.flush_gestures().await;
        }
        Ok(outcome)
    }

    pub async fn pending_gestures(&self) -> usize {
        self.throttle.lock().await.pending_len()
    }

    /// Apply every pending gesture target now, ignoring the quiet period.
    pub async fn flush_gestures(&self) -> Vec<Result<TransitionAck, TransitionError>> {
        let pending = self.throttle.lock().await.drain_all();
        let mut results = Vec::with_capacity(pending.len());
        for transition in pending {
            results.push(self.apply_pending(transition).await);
        }
        results
    }

    /// Stop the background flusher and apply whatever is still pending.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        let handle = self.flusher.lock().await.take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                log_error!("Gesture flusher task failed to join: {err}");
            }
        }

        let flushed = self.flush_gestures().await;
        if !flushed.is_empty() {
            log_info!("Applied {} pending gesture transitions on shutdown", flushed.len());
        }
    }

    fn validate_stages(
        &self,
        lead_id: &str,
        from: &str,
        to: &str,
    ) -> Result<(Stage, Stage), TransitionError> {
        parse_stages(from, to).map_err(|err| {
            log_warn!("Rejected transition for lead {}: {}", lead_id, err);
            err
        })
    }

    async fn apply_pending(
        &self,
        transition: PendingTransition,
    ) -> Result<TransitionAck, TransitionError> {
        self.apply(
            &transition.lead_id,
            transition.from_stage,
            transition.to_stage,
            transition.note,
            TransitionOrigin::Gesture,
        )
        .await
    }

    async fn apply(
        &self,
        lead_id: &str,
        from: Stage,
        to: Stage,
        note: Option<ActivityNote>,
        origin: TransitionOrigin,
    ) -> Result<TransitionAck, TransitionError> {
        let result = self.apply_locked(lead_id, from, to, note, origin).await;

        match &result {
            Ok(ack) => {
                log_info!(
                    "Applied {:?} transition for lead {}: {} -> {}",
                    origin,
                    lead_id,
                    from,
                    to
                );
                self.sink
                    .emit(PipelineEvent::TransitionApplied { ack: ack.clone() });
            }
            Err(err) => {
                log_warn!(
                    "Rejected {:?} transition for lead {} ({} -> {}): {}",
                    origin,
                    lead_id,
                    from,
                    to,
                    err
                );
                self.sink.emit(PipelineEvent::TransitionRejected {
                    lead_id: lead_id.to_string(),
                    to_stage: to,
                    origin,
                    error: err.clone(),
                });
            }
        }

        result
    }

    async fn apply_locked(
        &self,
        lead_id: &str,
        from: Stage,
        to: Stage,
        note: Option<ActivityNote>,
        origin: TransitionOrigin,
    ) -> Result<TransitionAck, TransitionError> {
        let mut current = self.snapshot.lock().await;

        let actual = current.get(lead_id).map(|lead| lead.stage);
        if actual != Some(from) {
            return Err(TransitionError::StaleTransition {
                lead_id: lead_id.to_string(),
                expected: from,
                actual,
            });
        }

        let applied_at = Utc::now();
        let changed = from != to;
        let mut next = current.clone();

        if changed {
            let updated = self
                .call_store(self.store.update_stage(lead_id, to, applied_at))
                .await?;
            let message = match next.with_lead(updated) {
                Ok(Some(snapshot)) => {
                    next = snapshot;
                    None
                }
                Ok(None) => Some(format!("store returned a different lead than {lead_id}")),
                Err(err) => Some(format!("store returned an invalid lead: {err}")),
            };
            if let Some(message) = message {
                // The write may already be persisted; resync before reporting.
                log_error!(
                    "Stage write for lead {} returned an unusable lead, reloading snapshot: {}",
                    lead_id,
                    message
                );
                self.reload_locked(&mut current).await;
                return Err(TransitionError::StoreUnavailable { message });
            }
        }

        let activity = match note {
            Some(note) => {
                let request = NewActivity {
                    lead_id: lead_id.to_string(),
                    activity_type: note.activity_type,
                    description: note.description,
                    created_at: applied_at,
                };
                // Activity metadata never decides whether the transition succeeded.
                match self.call_store(self.store.append_activity(request)).await {
                    Ok(activity) => {
                        if let Some(snapshot) = next.with_activity(activity.clone()) {
                            next = snapshot;
                        }
                        Some(activity)
                    }
                    Err(err) => {
                        log_warn!("Activity append failed for lead {}: {}", lead_id, err);
                        None
                    }
                }
            }
            None => None,
        };

        *current = next;

        Ok(TransitionAck {
            lead_id: lead_id.to_string(),
            from_stage: from,
            to_stage: to,
            origin,
            applied_at,
            changed,
            activity,
        })
    }

    /// Replace the baseline from the store while the snapshot lock is held. Keeps the old
    /// baseline if the store cannot produce a valid one.
    async fn reload_locked(&self, current: &mut LeadSnapshot) {
        let leads = match self.call_store(self.store.fetch_snapshot()).await {
            Ok(leads) => leads,
            Err(err) => {
                log_warn!("Snapshot reload failed, baseline may be stale: {err}");
                return;
            }
        };
        match LeadSnapshot::new(leads) {
            Ok(snapshot) => {
                let lead_count = snapshot.len();
                *current = snapshot;
                self.sink.emit(PipelineEvent::SnapshotRefreshed { lead_count });
            }
            Err(err) => log_warn!("Reloaded snapshot is invalid, baseline may be stale: {err}"),
        }
    }

    async fn call_store<T, F>(&self, call: F) -> Result<T, TransitionError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match time::timeout(self.config.store_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                log_error!("Lead store call failed: {err:#}");
                Err(TransitionError::StoreUnavailable {
                    message: format!("{err:#}"),
                })
            }
            Err(_) => {
                log_error!(
                    "Lead store call timed out after {}ms",
                    self.config.store_timeout.as_millis()
                );
                Err(TransitionError::StoreUnavailable {
                    message: format!(
                        "timed out after {}ms",
                        self.config.store_timeout.as_millis()
                    ),
                })
            }
        }
    }

    async fn ensure_flusher(&self) {
        if self.cancel_token.is_cancelled() {
            return;
        }

        let mut flusher = self.flusher.lock().await;
        if flusher.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let controller = self.clone();
        *flusher = Some(tokio::spawn(async move {
            controller.run_flusher().await;
        }));
    }

    async fn run_flusher(&self) {
        loop {
            let deadline = self.throttle.lock().await.next_deadline();

            let Some(deadline) = deadline else {
                // Exit under the handle lock so a concurrent submit either sees this task
                // still registered (and its pending entry picked up below) or spawns anew.
                let mut flusher = self.flusher.lock().await;
                if self.throttle.lock().await.pending_len() == 0 {
                    *flusher = None;
                    break;
                }
                continue;
            };

            tokio::select! {
                _ = time::sleep_until(deadline) => {}
                _ = self.cancel_token.cancelled() => {
                    log_info!("Gesture flusher shutting down");
                    break;
                }
            }

            let due = self.throttle.lock().await.take_due(Instant::now());
            for transition in due {
                // Outcome is reported through the sink.
                let _ = self.apply_pending(transition).await;
            }
        }
    }
}
