use std::sync::Arc;

use slog::Logger;

use crate::auth::AuthProvider;
use crate::store::WorkoutStore;

/// The long-lived dependencies of the page, wired once at startup.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub auth: Arc<dyn AuthProvider>,
    pub store: Arc<dyn WorkoutStore>,
    pub config: Config,
}

impl Environment {
    pub fn new(
        logger: Arc<Logger>,
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn WorkoutStore>,
        config: Config,
    ) -> Self {
        Self {
            logger,
            auth,
            store,
            config,
        }
    }
}

/// Startup configuration supplied by the deployment.
#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) app_id: String,
    pub(crate) initial_token: Option<String>,
}

impl Config {
    pub fn new(app_id: String, initial_token: Option<String>) -> Self {
        Self {
            app_id,
            initial_token,
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn initial_token(&self) -> Option<&str> {
        self.initial_token.as_deref()
    }
}
