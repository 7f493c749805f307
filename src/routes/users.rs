use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{NewUser, User, UserId, UserUpdate},
    routes::AppState,
    services::{catalog, similarity},
};

pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<NewUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = catalog::create_user(state.users.as_ref(), request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    let users = catalog::list_users(state.users.as_ref()).await?;
    Ok(Json(users))
}

pub async fn update_user(
    State(state): State<AppState>,
    Json(request): Json<UserUpdate>,
) -> AppResult<Json<User>> {
    let user = catalog::update_user(state.users.as_ref(), request).await?;
    Ok(Json(user))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<User>> {
    let user = catalog::require_user(state.users.as_ref(), user_id).await?;
    Ok(Json(user))
}

/// Users sharing the most liked films with the given user, by ascending id
pub async fn similar_users(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<Vec<UserId>>> {
    catalog::require_user(state.users.as_ref(), user_id).await?;

    let mut similar: Vec<UserId> = similarity::find_similar_users(state.likes.as_ref(), user_id)
        .await?
        .into_iter()
        .collect();
    similar.sort_unstable();

    Ok(Json(similar))
}
