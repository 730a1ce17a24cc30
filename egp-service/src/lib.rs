//! # egp-service
//!
//! User CRUD backend with an HTTP API, HTTP Basic authentication and a small
//! server-rendered shell.
//!
//! ## Features
//!
//! - **REST API**: `/api/users` create, read, update (upsert), delete
//! - **Storage**: in-memory by default, PostgreSQL with the `database` feature
//! - **Security**: Argon2id password hashing, permit rules, Basic auth
//! - **Shell pages**: `/`, `/about` and an HTML 404 page
//! - **Ambient**: figment configuration, structured tracing, request IDs,
//!   health/readiness probes, graceful shutdown
//!
//! ## Example
//!
//! ```rust,no_run
//! use egp_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!     egp_service::app::run(config).await
//! }
//! ```

pub mod api;
pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod middleware;
pub mod model;
pub mod observability;
pub mod repository;
pub mod responses;
pub mod server;
pub mod service;
pub mod state;
pub mod web;

#[cfg(feature = "database")]
pub mod database;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::app::{router, run};
    pub use crate::auth::{PasswordHasher, Principal, ServiceUser};
    pub use crate::client::UsersClient;
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorResponse, Result};
    pub use crate::health::{health, readiness};
    pub use crate::middleware::{AccessRules, BasicAuth};
    pub use crate::model::{User, UserDto, UserId};
    pub use crate::observability::init_tracing;
    pub use crate::repository::{
        InMemoryUserRepository, Repository, RepositoryError, RepositoryResult,
    };
    #[cfg(feature = "database")]
    pub use crate::repository::PgUserRepository;
    pub use crate::responses::{Created, NoContent};
    pub use crate::server::Server;
    pub use crate::service::UserService;
    pub use crate::state::AppState;

    pub use axum::{
        extract::{Path, State},
        routing::{delete, get, post, put},
        Json, Router,
    };
    pub use serde::{Deserialize, Serialize};
    pub use tokio;
    pub use tracing::{debug, error, info, warn};
}
