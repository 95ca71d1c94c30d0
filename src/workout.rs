use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A single logged workout in the store.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WorkoutRecord {
    /// The ID of the record, assigned by the store.
    id: Uuid,

    /// The weight entered for each exercise, keyed by exercise name.
    exercises: HashMap<String, String>,

    /// The time the store accepted the entry.
    #[serde(with = "time::serde::timestamp")]
    logged_at: OffsetDateTime,
}

impl WorkoutRecord {
    pub fn new(id: Uuid, exercises: HashMap<String, String>, logged_at: OffsetDateTime) -> Self {
        WorkoutRecord {
            id,
            exercises,
            logged_at,
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn exercises(&self) -> &HashMap<String, String> {
        &self.exercises
    }

    pub fn logged_at(&self) -> OffsetDateTime {
        self.logged_at
    }
}

/// A workout accepted by the store, before it appears in the history feed.
///
/// The visible list is never updated from this value; only the next
/// subscription push is.
#[derive(Clone, Debug)]
pub struct NewWorkout {
    /// The ID of the record, assigned by the store.
    id: Uuid,

    /// The time the store accepted the entry.
    logged_at: OffsetDateTime,
}

impl NewWorkout {
    pub fn new(id: Uuid, logged_at: OffsetDateTime) -> Self {
        NewWorkout { id, logged_at }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn logged_at(&self) -> OffsetDateTime {
        self.logged_at
    }
}
