use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::TrackerError;
use crate::log::{info, warn, Logger};

/// The resolved user identifier plus readiness flag used to scope all store
/// operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionIdentity {
    pub user_id: String,
    pub ready: bool,
}

impl SessionIdentity {
    /// The identity before bootstrap has resolved anything.
    pub fn pending() -> Self {
        SessionIdentity {
            user_id: String::new(),
            ready: false,
        }
    }

    pub fn ready(user_id: String) -> Self {
        SessionIdentity {
            user_id,
            ready: true,
        }
    }
}

/// Boundary to the external authentication service. This component supplies
/// only the listener side and the optional startup token.
pub trait AuthProvider: Send + Sync {
    /// Returns the already-signed-in user, if any.
    fn current_user(&self) -> BoxFuture<Result<Option<String>, TrackerError>>;

    /// Exchanges an externally supplied token for a signed-in user.
    fn sign_in_with_token(&self, token: &str) -> BoxFuture<Result<String, TrackerError>>;

    /// Signs in as a new anonymous user.
    fn sign_in_anonymously(&self) -> BoxFuture<Result<String, TrackerError>>;

    /// A stream of sign-in state transitions: `Some(user_id)` on sign-in,
    /// `None` on sign-out.
    fn state_changes(&self) -> BoxStream<'static, Option<String>>;
}

/// Resolves a session identity through the provider and registers the
/// long-lived auth-state listener.
///
/// Exactly one sign-in path runs per attempt, in priority order: an
/// already-signed-in session, the supplied token, anonymous sign-in. A
/// rejected sign-in degrades to a locally generated identity, still ready.
/// A provider that cannot even report the current session is fatal.
pub async fn bootstrap(
    logger: Arc<Logger>,
    auth: Arc<dyn AuthProvider>,
    initial_token: Option<String>,
) -> Result<Session, TrackerError> {
    let current = auth
        .current_user()
        .await
        .map_err(|e| TrackerError::AuthInit {
            source: Box::new(e),
        })?;

    let user_id = match current {
        Some(user_id) => user_id,
        None => sign_in(&logger, auth.as_ref(), initial_token.as_deref()).await,
    };

    info!(logger, "Session ready"; "user_id" => &user_id);

    let (sender, receiver) = watch::channel(SessionIdentity::ready(user_id));

    let listener = {
        let logger = logger.clone();
        let auth = auth.clone();

        tokio::spawn(async move {
            let mut changes = auth.state_changes();

            while let Some(state) = changes.next().await {
                let identity = match state {
                    Some(user_id) => SessionIdentity::ready(user_id),
                    None => {
                        let user_id =
                            sign_in(&logger, auth.as_ref(), initial_token.as_deref()).await;
                        SessionIdentity::ready(user_id)
                    }
                };

                if sender.send(identity).is_err() {
                    break;
                }
            }
        })
    };

    Ok(Session {
        identity: receiver,
        listener,
    })
}

/// Runs the token or anonymous sign-in path, degrading to a locally
/// generated identity if the provider rejects it.
async fn sign_in(logger: &Logger, auth: &dyn AuthProvider, initial_token: Option<&str>) -> String {
    let attempt = match initial_token {
        Some(token) => auth.sign_in_with_token(token).await,
        None => auth.sign_in_anonymously().await,
    };

    match attempt {
        Ok(user_id) => user_id,
        Err(e) => {
            let user_id = Uuid::new_v4().to_string();
            warn!(logger, "Sign-in failed, continuing with a local identity"; "error" => %e, "user_id" => &user_id);
            user_id
        }
    }
}

/// A bootstrapped session: the identity signal plus the listener keeping it
/// current. Dropping the session releases the listener.
pub struct Session {
    identity: watch::Receiver<SessionIdentity>,
    listener: JoinHandle<()>,
}

impl Session {
    /// The current identity.
    pub fn identity(&self) -> SessionIdentity {
        self.identity.borrow().clone()
    }

    /// A receiver that observes identity changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionIdentity> {
        self.identity.clone()
    }

    /// Releases the auth-state listener.
    pub fn close(self) {}
}

impl Drop for Session {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

pub use self::local::*;

mod local {
    use std::sync::RwLock;

    use futures::future::BoxFuture;
    use futures::stream::BoxStream;
    use futures::{FutureExt, StreamExt};
    use tokio::sync::broadcast;
    use tokio_stream::wrappers::BroadcastStream;
    use uuid::Uuid;

    use crate::errors::TrackerError;

    use super::AuthProvider;

    /// An auth provider that mints identities locally, standing in for a
    /// hosted service in single-user deployments. Hosted providers plug in
    /// behind [`AuthProvider`] instead.
    pub struct LocalAuth {
        current: RwLock<Option<String>>,
        changes: broadcast::Sender<Option<String>>,
    }

    impl LocalAuth {
        pub fn new() -> Self {
            let (changes, _) = broadcast::channel(16);

            LocalAuth {
                current: RwLock::new(None),
                changes,
            }
        }

        /// Signs the current user out, notifying listeners.
        pub fn sign_out(&self) {
            *self.current.write().unwrap() = None;
            let _ = self.changes.send(None);
        }

        fn record_sign_in(&self, user_id: String) -> String {
            *self.current.write().unwrap() = Some(user_id.clone());
            let _ = self.changes.send(Some(user_id.clone()));
            user_id
        }
    }

    impl Default for LocalAuth {
        fn default() -> Self {
            LocalAuth::new()
        }
    }

    impl AuthProvider for LocalAuth {
        fn current_user(&self) -> BoxFuture<Result<Option<String>, TrackerError>> {
            let current = self.current.read().unwrap().clone();

            async move { Ok(current) }.boxed()
        }

        fn sign_in_with_token(&self, token: &str) -> BoxFuture<Result<String, TrackerError>> {
            // a hosted provider would exchange the token; locally it names
            // the user directly
            let result = if token.is_empty() {
                Err(TrackerError::SignInFailed {
                    message: "empty auth token".to_owned(),
                })
            } else {
                Ok(self.record_sign_in(token.to_owned()))
            };

            async move { result }.boxed()
        }

        fn sign_in_anonymously(&self) -> BoxFuture<Result<String, TrackerError>> {
            let user_id = self.record_sign_in(Uuid::new_v4().to_string());

            async move { Ok(user_id) }.boxed()
        }

        fn state_changes(&self) -> BoxStream<'static, Option<String>> {
            BroadcastStream::new(self.changes.subscribe())
                .filter_map(|state| async move { state.ok() })
                .boxed()
        }
    }
}
