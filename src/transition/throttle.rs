use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::models::{ActivityNote, Stage};

/// Coalescing key: one pending target per lead per gesture stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GestureKey {
    pub gesture_id: String,
    pub lead_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingTransition {
    pub gesture_id: String,
    pub lead_id: String,
    pub from_stage: Stage,
    pub to_stage: Stage,
    pub note: Option<ActivityNote>,
    pub last_seen: Instant,
    /// Earlier targets dropped in favour of this one.
    pub superseded: u32,
}

impl PendingTransition {
    fn key(&self) -> GestureKey {
        GestureKey {
            gesture_id: self.gesture_id.clone(),
            lead_id: self.lead_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum GestureOutcome {
    /// First event of a burst; applied once the stream goes quiet.
    Queued,
    /// Replaced a still-pending target for the same gesture and lead.
    Replaced { dropped: Stage },
    /// Controller already shut down; written straight through like a programmatic call.
    Applied,
}

/// Keep-latest debouncer for motion-originated transitions.
///
/// Events for the same key arriving less than `window` apart replace each other; a target
/// becomes due once `window` has passed since the last event for its key.
#[derive(Debug)]
pub struct GestureThrottle {
    window: Duration,
    pending: HashMap<GestureKey, PendingTransition>,
    /// Targets that were already due when a newer burst for their key started.
    ready: VecDeque<PendingTransition>,
}

impl GestureThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
            ready: VecDeque::new(),
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len() + self.ready.len()
    }

    pub fn submit(&mut self, mut transition: PendingTransition, now: Instant) -> GestureOutcome {
        transition.last_seen = now;
        let key = transition.key();

        match self.pending.remove(&key) {
            Some(previous) if now < previous.last_seen + self.window => {
                transition.superseded = previous.superseded + 1;
                self.pending.insert(key, transition);
                GestureOutcome::Replaced {
                    dropped: previous.to_stage,
                }
            }
            Some(previous) => {
                // Quiet period already elapsed: the older target settled and must still apply.
                self.ready.push_back(previous);
                self.pending.insert(key, transition);
                GestureOutcome::Queued
            }
            None => {
                self.pending.insert(key, transition);
                GestureOutcome::Queued
            }
        }
    }

    /// Earliest instant at which something becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.ready
            .iter()
            .chain(self.pending.values())
            .map(|pending| pending.last_seen + self.window)
            .min()
    }

    /// Remove and return everything due at `now`, oldest deadline first.
    pub fn take_due(&mut self, now: Instant) -> Vec<PendingTransition> {
        let mut due: Vec<PendingTransition> = self.ready.drain(..).collect();

        let window = self.window;
        let due_keys: Vec<GestureKey> = self
            .pending
            .iter()
            .filter(|(_, pending)| now >= pending.last_seen + window)
            .map(|(key, _)| key.clone())
            .collect();
        for key in due_keys {
            if let Some(pending) = self.pending.remove(&key) {
                due.push(pending);
            }
        }

        due.sort_by_key(|pending| pending.last_seen);
        due
    }

    /// Remove and return everything regardless of deadline.
    pub fn drain_all(&mut self) -> Vec<PendingTransition> {
        let mut all: Vec<PendingTransition> = self.ready.drain(..).collect();
        all.extend(self.pending.drain().map(|(_, pending)| pending));
        all.sort_by_key(|pending| pending.last_seen);
        all
    }
}
