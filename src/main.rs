use std::error::Error;
use std::sync::Arc;

use tracker::app::App;
use tracker::auth::{bootstrap, LocalAuth};
use tracker::config::{get_optional_variable, get_variable};
use tracker::environment::{Config, Environment};
use tracker::feed::{Subscription, WorkoutFeed};
use tracker::log::{error, info, initialize_logger};
use tracker::store::PgStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let app_id = get_variable("TRACKER_APP_ID");
    let initial_token = get_optional_variable("TRACKER_INITIAL_AUTH_TOKEN");

    info!(logger, "Starting..."; "app_id" => &app_id);
    let logger = Arc::new(logger);

    info!(logger, "Creating database pool...");
    let connection_string = get_variable("TRACKER_DB_CONNECTION_STRING");
    let pool = sqlx::PgPool::connect(&connection_string)
        .await
        .expect("create database pool from TRACKER_DB_CONNECTION_STRING");

    let store = Arc::new(PgStore::new(pool, app_id.clone()));
    let auth = Arc::new(LocalAuth::new());

    let environment = Environment::new(
        logger.clone(),
        auth,
        store,
        Config::new(app_id, initial_token),
    );

    let session = match bootstrap(
        environment.logger.clone(),
        environment.auth.clone(),
        environment.config.initial_token().map(str::to_owned),
    )
    .await
    {
        Ok(session) => session,
        Err(e) => {
            error!(logger, "Failed to initialize the app"; "error" => %e);
            return Err(Box::new(e) as Box<dyn Error>);
        }
    };

    let mut identities = session.subscribe();
    let identity = session.identity();

    let feed = WorkoutFeed::new(&environment);

    let mut app = App::new();
    app.session_ready(identity.clone());

    let mut subscription: Option<Subscription> = match feed.subscribe(&identity).await {
        Ok(subscription) => {
            app.apply_snapshot(subscription.snapshot());
            Some(subscription)
        }
        Err(e) => {
            error!(logger, "Failed to load workout history"; "error" => %e);
            app.subscription_failed();
            None
        }
    };

    info!(logger, "History ready"; "records" => app.history().map(|records| records.len()).unwrap_or(0));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            changed = identities.changed() => {
                if changed.is_err() {
                    break;
                }

                let identity = identities.borrow().clone();
                let changed_user = identity.user_id != app.identity().user_id;
                app.session_ready(identity.clone());

                if changed_user {
                    info!(logger, "Identity changed, reopening subscription"; "user_id" => &identity.user_id);

                    if let Some(subscription) = subscription.take() {
                        subscription.close();
                    }

                    match feed.subscribe(&identity).await {
                        Ok(reopened) => {
                            app.apply_snapshot(reopened.snapshot());
                            subscription = Some(reopened);
                        }
                        Err(e) => {
                            error!(logger, "Failed to load workout history"; "error" => %e);
                            app.subscription_failed();
                        }
                    }
                }
            }

            result = async { subscription.as_mut().expect("subscription present").changed().await }, if subscription.is_some() => {
                match result {
                    Ok(()) => {
                        let records = subscription.as_ref().expect("subscription present").snapshot();
                        info!(logger, "History updated"; "records" => records.len());
                        app.apply_snapshot(records);
                    }
                    Err(e) => {
                        error!(logger, "Lost workout history subscription"; "error" => %e);
                        app.subscription_failed();
                        subscription = None;
                    }
                }
            }
        }
    }

    if let Some(subscription) = subscription {
        subscription.close();
    }

    session.close();

    info!(logger, "Exiting gracefully...");

    Ok(())
}
