use sqlx;
use thiserror::Error;
use uuid::Uuid;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Represents a failure to reach the authentication backend at startup.
    #[error("failed to initialize authentication")]
    AuthInit { source: Box<TrackerError> },

    /// Represents a sign-in path rejected by the authentication backend.
    #[error("sign-in failed: {message}")]
    SignInFailed { message: String },

    /// Represents a standing history query that could not be opened.
    #[error("failed to load workout history")]
    Subscription { source: Box<TrackerError> },

    /// Represents a store operation issued before the session was ready.
    #[error("session identity is not ready")]
    NotReady,

    /// Represents a record missing from the user's collection.
    #[error("workout {id} not found")]
    NotFound { id: Uuid },

    /// Represents a create or delete rejected by the store.
    #[error("store write failed")]
    Write { source: Box<TrackerError> },

    /// Represents an SQL error.
    #[error("SQLx error")]
    Sqlx { source: sqlx::Error },

    /// Represents any other failure reported by the backing store.
    #[error("store request failed: {message}")]
    Store { message: String },
}
