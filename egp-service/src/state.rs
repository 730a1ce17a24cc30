//! Application state shared across handlers

use std::sync::Arc;

use crate::config::Config;
use crate::middleware::BasicAuth;
use crate::model::{User, UserId};
use crate::repository::Repository;
use crate::service::UserService;

/// Shared handler state, generic over the user store
///
/// Cloning is cheap: everything sits behind `Arc`s.
pub struct AppState<R> {
    config: Arc<Config>,
    users: Arc<UserService<R>>,
    auth: BasicAuth,
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            users: Arc::clone(&self.users),
            auth: self.auth.clone(),
        }
    }
}

impl<R> AppState<R>
where
    R: Repository<UserId, User> + 'static,
{
    /// Assemble state from already-built parts
    pub fn new(config: Config, users: UserService<R>, auth: BasicAuth) -> Self {
        Self {
            config: Arc::new(config),
            users: Arc::new(users),
            auth,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the user service
    pub fn users(&self) -> &UserService<R> {
        &self.users
    }

    /// Get the authentication middleware state
    pub fn auth(&self) -> &BasicAuth {
        &self.auth
    }
}
