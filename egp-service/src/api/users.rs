//! `/api/users` handlers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{Error, Result};
use crate::model::{User, UserDto, UserId};
use crate::repository::Repository;
use crate::responses::{Created, NoContent};
use crate::state::AppState;

/// List all users
pub async fn list_users<R>(State(state): State<AppState<R>>) -> Result<Json<Vec<UserDto>>>
where
    R: Repository<UserId, User> + 'static,
{
    Ok(Json(state.users().get_all_users().await?))
}

/// Get a user by ID; 404 when absent
pub async fn get_user<R>(
    State(state): State<AppState<R>>,
    Path(id): Path<UserId>,
) -> Result<Json<UserDto>>
where
    R: Repository<UserId, User> + 'static,
{
    state
        .users()
        .get_user_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("User {} not found", id)))
}

/// Create a user; 201 with `Location`
pub async fn create_user<R>(
    State(state): State<AppState<R>>,
    Json(payload): Json<UserDto>,
) -> Result<Created<UserDto>>
where
    R: Repository<UserId, User> + 'static,
{
    let user = state.users().create_user(payload).await?;
    let location = user
        .id
        .map(|id| format!("/api/users/{}", id))
        .unwrap_or_else(|| "/api/users".to_string());

    Ok(Created::new(user).with_location(location))
}

/// Replace or create the user at `id`
pub async fn update_user<R>(
    State(state): State<AppState<R>>,
    Path(id): Path<UserId>,
    Json(payload): Json<UserDto>,
) -> Result<Json<UserDto>>
where
    R: Repository<UserId, User> + 'static,
{
    Ok(Json(state.users().update_user(id, payload).await?))
}

/// Delete a user; 204 whether or not it existed
pub async fn delete_user<R>(
    State(state): State<AppState<R>>,
    Path(id): Path<UserId>,
) -> Result<NoContent>
where
    R: Repository<UserId, User> + 'static,
{
    state.users().delete_user(id).await?;
    Ok(NoContent)
}
