//! REST API under `/api`

pub mod users;

use axum::{routing::get, Router};

use crate::model::{User, UserId};
use crate::repository::Repository;
use crate::state::AppState;

/// Routes mounted under `/api`
pub fn routes<R>() -> Router<AppState<R>>
where
    R: Repository<UserId, User> + 'static,
{
    Router::new()
        .route(
            "/users",
            get(users::list_users::<R>).post(users::create_user::<R>),
        )
        .route(
            "/users/{id}",
            get(users::get_user::<R>)
                .put(users::update_user::<R>)
                .delete(users::delete_user::<R>),
        )
}
