use std::collections::HashMap;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::errors::TrackerError;
use crate::workout::{NewWorkout, WorkoutRecord};

pub mod mock;

/// Boundary to the document store holding each user's workout collection.
pub trait WorkoutStore: Send + Sync {
    /// Inserts a workout into the user's collection. The store assigns the
    /// ID and the timestamp.
    fn insert(
        &self,
        user_id: &str,
        exercises: HashMap<String, String>,
    ) -> BoxFuture<Result<NewWorkout, TrackerError>>;

    /// Deletes the identified workout from the user's collection.
    fn delete(&self, user_id: &str, id: &Uuid) -> BoxFuture<Result<(), TrackerError>>;

    /// Returns the user's full history, most recent first.
    fn list(&self, user_id: &str) -> BoxFuture<Result<Vec<WorkoutRecord>, TrackerError>>;
}

pub use self::postgres::*;

mod postgres {
    use std::collections::HashMap;

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::postgres::PgPool;
    use sqlx::types::Json;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::errors::TrackerError;
    use crate::workout::{NewWorkout, WorkoutRecord};

    /// A store that keeps each user's collection in Postgres, scoped by
    /// deployment and user.
    pub struct PgStore {
        pool: PgPool,
        app_id: String,
    }

    impl PgStore {
        pub fn new(pool: PgPool, app_id: String) -> Self {
            PgStore { pool, app_id }
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::WorkoutStore for PgStore {
        fn insert(
            &self,
            user_id: &str,
            exercises: HashMap<String, String>,
        ) -> BoxFuture<Result<NewWorkout, TrackerError>> {
            let user_id = user_id.to_owned();

            async move {
                let query = sqlx::query_as::<_, (Uuid, OffsetDateTime)>(include_str!(
                    "queries/create.sql"
                ));

                let (id, logged_at) = query
                    .bind(&self.app_id)
                    .bind(user_id)
                    .bind(Json(exercises))
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(NewWorkout::new(id, logged_at))
            }
            .boxed()
        }

        fn delete(&self, user_id: &str, id: &Uuid) -> BoxFuture<Result<(), TrackerError>> {
            let user_id = user_id.to_owned();
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/delete.sql"));

                let result = query
                    .bind(&self.app_id)
                    .bind(user_id)
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                if result.rows_affected() == 0 {
                    return Err(TrackerError::NotFound { id });
                }

                Ok(())
            }
            .boxed()
        }

        fn list(&self, user_id: &str) -> BoxFuture<Result<Vec<WorkoutRecord>, TrackerError>> {
            let user_id = user_id.to_owned();

            async move {
                let query = sqlx::query_as::<
                    _,
                    (Uuid, Json<HashMap<String, String>>, OffsetDateTime),
                >(include_str!("queries/list.sql"));

                let rows = query
                    .bind(&self.app_id)
                    .bind(user_id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(rows
                    .into_iter()
                    .map(|(id, Json(exercises), logged_at)| {
                        WorkoutRecord::new(id, exercises, logged_at)
                    })
                    .collect())
            }
            .boxed()
        }
    }

    fn map_sqlx_error(source: sqlx::Error) -> TrackerError {
        TrackerError::Sqlx { source }
    }
}
