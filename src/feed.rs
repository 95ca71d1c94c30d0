use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use uuid::Uuid;

use crate::auth::SessionIdentity;
use crate::environment::Environment;
use crate::errors::TrackerError;
use crate::log::{debug, error, Logger};
use crate::store::WorkoutStore;
use crate::workout::{NewWorkout, WorkoutRecord};

/// The live view of a user's workout history plus the write operations
/// that feed it.
///
/// Every operation requires a ready identity. The feed never hands back an
/// updated list from a write; subscriptions receive the next push instead.
pub struct WorkoutFeed {
    logger: Arc<Logger>,
    store: Arc<dyn WorkoutStore>,
    subscribers: Arc<Mutex<Registry>>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: HashMap<u64, Entry>,
}

struct Entry {
    user_id: String,
    sender: watch::Sender<Vec<WorkoutRecord>>,
}

impl WorkoutFeed {
    pub fn new(environment: &Environment) -> Self {
        WorkoutFeed {
            logger: environment.logger.clone(),
            store: environment.store.clone(),
            subscribers: Arc::new(Mutex::new(Registry::default())),
        }
    }

    /// Opens a standing query over the user's history. The subscription
    /// starts from a full fetch and receives a full replacement list, never
    /// a diff, on every change.
    pub async fn subscribe(
        &self,
        identity: &SessionIdentity,
    ) -> Result<Subscription, TrackerError> {
        if !identity.ready {
            return Err(TrackerError::NotReady);
        }

        let records = self
            .store
            .list(&identity.user_id)
            .await
            .map_err(|e| TrackerError::Subscription {
                source: Box::new(e),
            })?;

        debug!(self.logger, "Opened history subscription"; "user_id" => &identity.user_id, "records" => records.len());

        let (sender, receiver) = watch::channel(records);

        let entry_id = {
            let mut registry = self.subscribers.lock().unwrap();
            let entry_id = registry.next_id;
            registry.next_id += 1;

            registry.entries.insert(
                entry_id,
                Entry {
                    user_id: identity.user_id.clone(),
                    sender,
                },
            );

            entry_id
        };

        Ok(Subscription {
            receiver,
            registry: self.subscribers.clone(),
            entry_id,
        })
    }

    /// Writes a new workout into the user's collection.
    pub async fn create(
        &self,
        identity: &SessionIdentity,
        exercises: HashMap<String, String>,
    ) -> Result<NewWorkout, TrackerError> {
        if !identity.ready {
            return Err(TrackerError::NotReady);
        }

        let new = self
            .store
            .insert(&identity.user_id, exercises)
            .await
            .map_err(|e| TrackerError::Write {
                source: Box::new(e),
            })?;

        debug!(self.logger, "Logged workout"; "user_id" => &identity.user_id, "id" => %new.id());

        self.refresh(&identity.user_id).await;

        Ok(new)
    }

    /// Removes the identified workout. `NotFound` is passed through for the
    /// caller to fold into success.
    pub async fn delete(&self, identity: &SessionIdentity, id: &Uuid) -> Result<(), TrackerError> {
        if !identity.ready {
            return Err(TrackerError::NotReady);
        }

        match self.store.delete(&identity.user_id, id).await {
            Ok(()) => {
                debug!(self.logger, "Deleted workout"; "user_id" => &identity.user_id, "id" => %id);
                self.refresh(&identity.user_id).await;

                Ok(())
            }
            Err(e @ TrackerError::NotFound { .. }) => Err(e),
            Err(e) => Err(TrackerError::Write {
                source: Box::new(e),
            }),
        }
    }

    /// Refetches the user's history and pushes it to every open
    /// subscription for that user. A failed refresh leaves subscribers on
    /// their previous snapshot; the next successful push heals them.
    async fn refresh(&self, user_id: &str) {
        let records = match self.store.list(user_id).await {
            Ok(records) => records,
            Err(e) => {
                error!(self.logger, "Failed to refresh workout history"; "user_id" => user_id, "error" => %e);
                return;
            }
        };

        let mut registry = self.subscribers.lock().unwrap();
        let mut closed = vec![];

        for (entry_id, entry) in registry.entries.iter() {
            if entry.user_id != user_id {
                continue;
            }

            if entry.sender.send(records.clone()).is_err() {
                closed.push(*entry_id);
            }
        }

        for entry_id in closed {
            registry.entries.remove(&entry_id);
        }
    }
}

/// A standing history query. Closing (or dropping) it releases the
/// underlying listener; a subscription must not outlive its identity.
pub struct Subscription {
    receiver: watch::Receiver<Vec<WorkoutRecord>>,
    registry: Arc<Mutex<Registry>>,
    entry_id: u64,
}

impl Subscription {
    /// The latest full list.
    pub fn snapshot(&self) -> Vec<WorkoutRecord> {
        self.receiver.borrow().clone()
    }

    /// Resolves when the next replacement list arrives.
    pub async fn changed(&mut self) -> Result<(), TrackerError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| TrackerError::Subscription {
                source: Box::new(TrackerError::Store {
                    message: "history feed closed".to_owned(),
                }),
            })
    }

    /// Releases the listener.
    pub fn close(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.lock().unwrap().entries.remove(&self.entry_id);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use proptest::prelude::*;

    use crate::auth::{LocalAuth, SessionIdentity};
    use crate::environment::{Config, Environment};
    use crate::errors::TrackerError;
    use crate::program::WeightDraft;
    use crate::store::mock::MockStore;

    use super::WorkoutFeed;

    fn test_feed() -> (WorkoutFeed, Arc<MockStore>) {
        let store = Arc::new(MockStore::new());
        let environment = Environment::new(
            Arc::new(slog::Logger::root(slog::Discard, slog::o!())),
            Arc::new(LocalAuth::new()),
            store.clone(),
            Config::new("test-app".to_owned(), None),
        );

        (WorkoutFeed::new(&environment), store)
    }

    fn draft_with(weight: u16) -> HashMap<String, String> {
        let mut draft = WeightDraft::new();
        draft.set("Barbell Curl", weight.to_string());
        draft.snapshot()
    }

    #[tokio::test]
    async fn operations_require_a_ready_identity() {
        let (feed, _) = test_feed();
        let pending = SessionIdentity::pending();

        assert!(matches!(
            feed.subscribe(&pending).await,
            Err(TrackerError::NotReady)
        ));
        assert!(matches!(
            feed.create(&pending, draft_with(40)).await,
            Err(TrackerError::NotReady)
        ));
        assert!(matches!(
            feed.delete(&pending, &uuid::Uuid::new_v4()).await,
            Err(TrackerError::NotReady)
        ));
    }

    #[tokio::test]
    async fn subscriptions_are_scoped_to_their_user() {
        let (feed, _) = test_feed();
        let first = SessionIdentity::ready("user-1".to_owned());
        let second = SessionIdentity::ready("user-2".to_owned());

        let mut ours = feed.subscribe(&first).await.unwrap();
        let theirs = feed.subscribe(&second).await.unwrap();

        feed.create(&first, draft_with(40)).await.unwrap();
        ours.changed().await.unwrap();

        assert_eq!(ours.snapshot().len(), 1);
        assert!(theirs.snapshot().is_empty());
    }

    #[tokio::test]
    async fn a_failed_initial_fetch_is_a_subscription_error() {
        let (feed, store) = test_feed();
        store.set_failing(true);

        let result = feed
            .subscribe(&SessionIdentity::ready("user-1".to_owned()))
            .await;

        assert!(matches!(result, Err(TrackerError::Subscription { .. })));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 32, ..ProptestConfig::default()
        })]

        #[test]
        fn history_is_always_newest_first(weights in prop::collection::vec(0u16..500, 1..12)) {
            let runtime = tokio::runtime::Runtime::new().unwrap();

            runtime.block_on(async move {
                let (feed, _) = test_feed();
                let identity = SessionIdentity::ready("user-1".to_owned());
                let mut subscription = feed.subscribe(&identity).await.unwrap();

                for (count, weight) in weights.iter().enumerate() {
                    feed.create(&identity, draft_with(*weight)).await.unwrap();
                    subscription.changed().await.unwrap();

                    let snapshot = subscription.snapshot();

                    prop_assert_eq!(snapshot.len(), count + 1);
                    prop_assert!(snapshot
                        .windows(2)
                        .all(|pair| pair[0].logged_at() >= pair[1].logged_at()));
                }

                Ok(())
            })?;
        }
    }
}
