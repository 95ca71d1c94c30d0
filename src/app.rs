use uuid::Uuid;

use crate::auth::SessionIdentity;
use crate::errors::TrackerError;
use crate::feed::WorkoutFeed;
use crate::program::WeightDraft;
use crate::workout::WorkoutRecord;

pub const MSG_NOT_READY: &str = "App not fully initialized. Please wait.";
pub const MSG_LOGGED: &str = "Workout logged successfully!";
pub const MSG_LOG_FAILED: &str = "Failed to log workout. Please try again.";
pub const MSG_DELETED: &str = "Workout deleted successfully!";
pub const MSG_DELETE_FAILED: &str = "Failed to delete workout. Please try again.";
pub const MSG_HISTORY_FAILED: &str = "Failed to load workout history.";

/// Where the page is in its lifecycle. `Submitting` and `Deleting` refuse
/// further writes of either kind; subscription pushes are never blocked.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Loading,
    Idle,
    Submitting,
    Deleting,
}

/// The page state, owned in one place: identity, phase, draft, the history
/// snapshot and the transient status message.
pub struct App {
    identity: SessionIdentity,
    phase: Phase,
    draft: WeightDraft,
    history: Vec<WorkoutRecord>,
    history_failed: bool,
    message: Option<String>,
}

impl App {
    pub fn new() -> Self {
        App {
            identity: SessionIdentity::pending(),
            phase: Phase::Loading,
            draft: WeightDraft::new(),
            history: vec![],
            history_failed: false,
            message: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn draft(&self) -> &WeightDraft {
        &self.draft
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The history list, or nothing while the subscription is failed — the
    /// page shows the error message in its place.
    pub fn history(&self) -> Option<&[WorkoutRecord]> {
        if self.history_failed {
            None
        } else {
            Some(&self.history)
        }
    }

    /// Adopts a resolved (or regenerated) identity. The page leaves
    /// `Loading` once the first snapshot, or the subscription failure,
    /// arrives.
    pub fn session_ready(&mut self, identity: SessionIdentity) {
        self.identity = identity;
    }

    /// Applies a replacement history list pushed by the subscription.
    pub fn apply_snapshot(&mut self, records: Vec<WorkoutRecord>) {
        self.history = records;
        self.history_failed = false;

        if self.phase == Phase::Loading && self.identity.ready {
            self.phase = Phase::Idle;
        }
    }

    /// Records that the subscription failed: the list display is replaced
    /// by a persistent message. No automatic retry.
    pub fn subscription_failed(&mut self) {
        self.history.clear();
        self.history_failed = true;
        self.message = Some(MSG_HISTORY_FAILED.to_owned());

        if self.phase == Phase::Loading && self.identity.ready {
            self.phase = Phase::Idle;
        }
    }

    /// Records a typed weight for the named exercise.
    pub fn set_weight(&mut self, name: &str, value: impl Into<String>) {
        self.draft.set(name, value);
    }

    /// Submits the draft. On success the draft resets; on failure the typed
    /// weights are preserved so the user does not lose input.
    pub async fn log_workout(&mut self, feed: &WorkoutFeed) {
        if !self.identity.ready {
            self.message = Some(MSG_NOT_READY.to_owned());
            return;
        }

        if self.phase != Phase::Idle {
            return;
        }

        self.phase = Phase::Submitting;
        self.message = None;

        match feed.create(&self.identity, self.draft.snapshot()).await {
            Ok(_) => {
                self.message = Some(MSG_LOGGED.to_owned());
                self.draft.reset();
            }
            Err(_) => {
                self.message = Some(MSG_LOG_FAILED.to_owned());
            }
        }

        self.phase = Phase::Idle;
    }

    /// Deletes a history entry. A record that is already gone reads as
    /// success; the user cannot tell the difference.
    pub async fn delete_workout(&mut self, feed: &WorkoutFeed, id: &Uuid) {
        if !self.identity.ready {
            self.message = Some(MSG_NOT_READY.to_owned());
            return;
        }

        if self.phase != Phase::Idle {
            return;
        }

        self.phase = Phase::Deleting;
        self.message = None;

        match feed.delete(&self.identity, id).await {
            Ok(()) | Err(TrackerError::NotFound { .. }) => {
                self.message = Some(MSG_DELETED.to_owned());
            }
            Err(_) => {
                self.message = Some(MSG_DELETE_FAILED.to_owned());
            }
        }

        self.phase = Phase::Idle;
    }
}

impl Default for App {
    fn default() -> Self {
        App::new()
    }
}
