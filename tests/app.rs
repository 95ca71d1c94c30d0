use std::sync::Arc;

use tracker::app::{
    App, Phase, MSG_DELETED, MSG_HISTORY_FAILED, MSG_LOGGED, MSG_LOG_FAILED, MSG_NOT_READY,
};
use tracker::auth::{bootstrap, LocalAuth, SessionIdentity};
use tracker::environment::{Config, Environment};
use tracker::errors::TrackerError;
use tracker::feed::{Subscription, WorkoutFeed};
use tracker::program::WORKOUT_PROGRAM;
use tracker::store::mock::MockStore;

fn test_environment() -> (Environment, Arc<MockStore>) {
    let store = Arc::new(MockStore::new());
    let environment = Environment::new(
        Arc::new(slog::Logger::root(slog::Discard, slog::o!())),
        Arc::new(LocalAuth::new()),
        store.clone(),
        Config::new("test-app".to_owned(), None),
    );

    (environment, store)
}

/// Boots the page the way the binary does: resolve an identity, open the
/// history subscription, apply the first snapshot.
async fn ready_page(
    environment: &Environment,
) -> (App, WorkoutFeed, Subscription, SessionIdentity) {
    let session = bootstrap(
        environment.logger.clone(),
        environment.auth.clone(),
        environment.config.initial_token().map(str::to_owned),
    )
    .await
    .expect("bootstrap session");

    let identity = session.identity();
    let feed = WorkoutFeed::new(environment);
    let subscription = feed
        .subscribe(&identity)
        .await
        .expect("open history subscription");

    let mut app = App::new();
    app.session_ready(identity.clone());
    app.apply_snapshot(subscription.snapshot());
    assert_eq!(app.phase(), Phase::Idle);

    (app, feed, subscription, identity)
}

#[tokio::test]
async fn logging_a_workout_appends_to_the_top_and_clears_the_form() {
    let (environment, _) = test_environment();
    let (mut app, feed, mut subscription, _) = ready_page(&environment).await;

    app.set_weight("Barbell Curl", "40");
    app.set_weight("Dumbbell Squat", "60");
    app.log_workout(&feed).await;

    subscription.changed().await.expect("history push");
    app.apply_snapshot(subscription.snapshot());

    assert_eq!(app.message(), Some(MSG_LOGGED));
    assert_eq!(app.phase(), Phase::Idle);
    assert!(app.draft().is_empty());

    let history = app.history().expect("history visible");
    assert_eq!(history.len(), 1);

    let exercises = history[0].exercises();
    assert_eq!(exercises.len(), WORKOUT_PROGRAM.len());
    assert_eq!(exercises.get("Barbell Curl").map(String::as_str), Some("40"));
    assert_eq!(
        exercises.get("Dumbbell Squat").map(String::as_str),
        Some("60")
    );

    for exercise in &WORKOUT_PROGRAM {
        if exercise.name != "Barbell Curl" && exercise.name != "Dumbbell Squat" {
            assert_eq!(exercises.get(exercise.name).map(String::as_str), Some(""));
        }
    }
}

#[tokio::test]
async fn new_records_appear_before_older_ones() {
    let (environment, _) = test_environment();
    let (mut app, feed, mut subscription, _) = ready_page(&environment).await;

    app.set_weight("Barbell Curl", "40");
    app.log_workout(&feed).await;
    subscription.changed().await.expect("first push");

    app.set_weight("Barbell Curl", "45");
    app.log_workout(&feed).await;
    subscription.changed().await.expect("second push");

    app.apply_snapshot(subscription.snapshot());
    let history = app.history().expect("history visible");

    assert_eq!(history.len(), 2);
    assert_eq!(
        history[0].exercises().get("Barbell Curl").map(String::as_str),
        Some("45")
    );
    assert!(history[0].logged_at() > history[1].logged_at());
}

#[tokio::test]
async fn deleting_the_new_record_removes_only_it() {
    let (environment, _) = test_environment();
    let (mut app, feed, mut subscription, _) = ready_page(&environment).await;

    app.set_weight("Barbell Curl", "40");
    app.log_workout(&feed).await;
    subscription.changed().await.expect("first push");

    app.set_weight("Barbell Curl", "45");
    app.log_workout(&feed).await;
    subscription.changed().await.expect("second push");

    app.apply_snapshot(subscription.snapshot());
    let history = app.history().expect("history visible");
    let newest = *history[0].id();
    let older = *history[1].id();

    app.delete_workout(&feed, &newest).await;
    subscription.changed().await.expect("push after delete");
    app.apply_snapshot(subscription.snapshot());

    assert_eq!(app.message(), Some(MSG_DELETED));

    let history = app.history().expect("history visible");
    assert_eq!(history.len(), 1);
    assert_eq!(*history[0].id(), older);
}

#[tokio::test]
async fn deleting_an_already_deleted_record_reads_as_success() {
    let (environment, _) = test_environment();
    let (mut app, feed, mut subscription, _) = ready_page(&environment).await;

    app.set_weight("Barbell Curl", "40");
    app.log_workout(&feed).await;
    subscription.changed().await.expect("history push");
    app.apply_snapshot(subscription.snapshot());

    let id = *app.history().expect("history visible")[0].id();

    app.delete_workout(&feed, &id).await;
    subscription.changed().await.expect("push after delete");
    app.apply_snapshot(subscription.snapshot());
    assert!(app.history().expect("history visible").is_empty());

    // the record is gone; a second delete is indistinguishable from success
    app.delete_workout(&feed, &id).await;

    assert_eq!(app.message(), Some(MSG_DELETED));
    assert_eq!(app.phase(), Phase::Idle);
    assert!(app.history().expect("history visible").is_empty());

    // and the page still works afterwards
    app.set_weight("Barbell Row", "55");
    app.log_workout(&feed).await;
    subscription.changed().await.expect("push after relog");
    app.apply_snapshot(subscription.snapshot());

    assert_eq!(app.history().expect("history visible").len(), 1);
}

#[tokio::test]
async fn a_failed_write_preserves_the_draft() {
    let (environment, store) = test_environment();
    let (mut app, feed, _subscription, _) = ready_page(&environment).await;

    store.set_failing(true);

    app.set_weight("Barbell Curl", "40");
    app.log_workout(&feed).await;

    assert_eq!(app.message(), Some(MSG_LOG_FAILED));
    assert_eq!(app.phase(), Phase::Idle);
    assert_eq!(app.draft().get("Barbell Curl"), Some("40"));
    assert!(app.history().expect("history visible").is_empty());

    store.set_failing(false);

    app.log_workout(&feed).await;

    assert_eq!(app.message(), Some(MSG_LOGGED));
    assert!(app.draft().is_empty());
}

#[tokio::test]
async fn a_failed_subscription_replaces_the_list_display() {
    let (environment, store) = test_environment();

    let session = bootstrap(environment.logger.clone(), environment.auth.clone(), None)
        .await
        .expect("bootstrap session");
    let identity = session.identity();
    let feed = WorkoutFeed::new(&environment);

    store.set_failing(true);

    let result = feed.subscribe(&identity).await;
    assert!(matches!(result, Err(TrackerError::Subscription { .. })));

    let mut app = App::new();
    app.session_ready(identity);
    app.subscription_failed();

    assert!(app.history().is_none());
    assert_eq!(app.message(), Some(MSG_HISTORY_FAILED));
    assert_eq!(app.phase(), Phase::Idle);
}

#[tokio::test]
async fn writes_before_ready_are_refused() {
    let (environment, _) = test_environment();
    let feed = WorkoutFeed::new(&environment);

    let mut app = App::new();
    app.set_weight("Barbell Curl", "40");
    app.log_workout(&feed).await;

    assert_eq!(app.message(), Some(MSG_NOT_READY));
    assert_eq!(app.phase(), Phase::Loading);
    assert_eq!(app.draft().get("Barbell Curl"), Some("40"));
}

#[tokio::test]
async fn switching_identity_never_leaks_another_users_history() {
    let (environment, _) = test_environment();
    let feed = WorkoutFeed::new(&environment);

    let first = SessionIdentity::ready("user-1".to_owned());
    let subscription = feed.subscribe(&first).await.expect("first subscription");

    let mut draft = tracker::program::WeightDraft::new();
    draft.set("Barbell Curl", "40");
    feed.create(&first, draft.snapshot()).await.expect("create");

    // identity changed: the old subscription must be closed and a fresh one
    // opened for the new user
    subscription.close();

    let second = SessionIdentity::ready("user-2".to_owned());
    let reopened = feed.subscribe(&second).await.expect("second subscription");

    let mut app = App::new();
    app.session_ready(second);
    app.apply_snapshot(reopened.snapshot());

    assert!(app.history().expect("history visible").is_empty());
}
