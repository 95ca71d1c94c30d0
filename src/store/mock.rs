use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::RwLock;

use futures::future::BoxFuture;
use futures::FutureExt;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::TrackerError;
use crate::store::WorkoutStore;
use crate::workout::{NewWorkout, WorkoutRecord};

const BASE_TIMESTAMP: i64 = 1_700_000_000;

/// An in-memory store for tests: per-user collections, monotonic
/// timestamps and a togglable failure mode.
#[derive(Default)]
pub struct MockStore {
    records: RwLock<HashMap<String, Vec<WorkoutRecord>>>,
    clock: AtomicI64,
    failing: AtomicBool,
}

impl MockStore {
    pub fn new() -> Self {
        MockStore::default()
    }

    /// Makes every subsequent operation fail, or heals the store again.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), TrackerError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TrackerError::Store {
                message: "mock store is offline".to_owned(),
            });
        }

        Ok(())
    }

    fn next_timestamp(&self) -> OffsetDateTime {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst);

        OffsetDateTime::from_unix_timestamp(BASE_TIMESTAMP + tick)
    }
}

impl WorkoutStore for MockStore {
    fn insert(
        &self,
        user_id: &str,
        exercises: HashMap<String, String>,
    ) -> BoxFuture<Result<NewWorkout, TrackerError>> {
        let result = self.check_available().map(|()| {
            let record = WorkoutRecord::new(Uuid::new_v4(), exercises, self.next_timestamp());
            let new = NewWorkout::new(*record.id(), record.logged_at());

            let mut records = self.records.write().unwrap();
            let collection = records.entry(user_id.to_owned()).or_default();

            // newest first, the order the backing query would return
            collection.insert(0, record);

            new
        });

        async move { result }.boxed()
    }

    fn delete(&self, user_id: &str, id: &Uuid) -> BoxFuture<Result<(), TrackerError>> {
        let id = *id;

        let result = self.check_available().and_then(|()| {
            let mut records = self.records.write().unwrap();
            let collection = records.entry(user_id.to_owned()).or_default();
            let before = collection.len();

            collection.retain(|record| *record.id() != id);

            if collection.len() == before {
                return Err(TrackerError::NotFound { id });
            }

            Ok(())
        });

        async move { result }.boxed()
    }

    fn list(&self, user_id: &str) -> BoxFuture<Result<Vec<WorkoutRecord>, TrackerError>> {
        let result = self.check_available().map(|()| {
            self.records
                .read()
                .unwrap()
                .get(user_id)
                .cloned()
                .unwrap_or_default()
        });

        async move { result }.boxed()
    }
}
