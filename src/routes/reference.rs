use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{Director, DirectorId, Genre, Mpa},
    routes::AppState,
    services::catalog,
};

#[derive(Debug, Deserialize)]
pub struct CreateDirectorRequest {
    pub name: String,
}

pub async fn genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(state.films.genres().await?))
}

pub async fn genre(
    State(state): State<AppState>,
    Path(genre_id): Path<i32>,
) -> AppResult<Json<Genre>> {
    Ok(Json(catalog::require_genre(state.films.as_ref(), genre_id).await?))
}

pub async fn mpa_ratings(State(state): State<AppState>) -> AppResult<Json<Vec<Mpa>>> {
    Ok(Json(state.films.mpa_ratings().await?))
}

pub async fn mpa(State(state): State<AppState>, Path(mpa_id): Path<i32>) -> AppResult<Json<Mpa>> {
    Ok(Json(catalog::require_mpa(state.films.as_ref(), mpa_id).await?))
}

pub async fn create_director(
    State(state): State<AppState>,
    Json(request): Json<CreateDirectorRequest>,
) -> AppResult<(StatusCode, Json<Director>)> {
    if request.name.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Director name cannot be empty".to_string(),
        ));
    }
    let director = catalog::create_director(state.films.as_ref(), request.name).await?;
    Ok((StatusCode::CREATED, Json(director)))
}

pub async fn director(
    State(state): State<AppState>,
    Path(director_id): Path<DirectorId>,
) -> AppResult<Json<Director>> {
    Ok(Json(
        catalog::require_director(state.films.as_ref(), director_id).await?,
    ))
}
