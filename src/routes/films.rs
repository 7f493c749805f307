use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{DirectorId, DirectorSort, Film, FilmId, FilmUpdate, NewFilm, UserId},
    routes::AppState,
    services::{catalog, ranking},
};

const DEFAULT_POPULAR_COUNT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    count: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonQuery {
    user_id: UserId,
    friend_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorQuery {
    #[serde(default)]
    sort_by: DirectorSort,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    query: String,
    by: Option<String>,
}

pub async fn create_film(
    State(state): State<AppState>,
    Json(request): Json<NewFilm>,
) -> AppResult<(StatusCode, Json<Film>)> {
    let film = catalog::create_film(state.films.as_ref(), request).await?;
    Ok((StatusCode::CREATED, Json(film)))
}

pub async fn list_films(State(state): State<AppState>) -> AppResult<Json<Vec<Film>>> {
    let films = catalog::list_films(state.films.as_ref()).await?;
    Ok(Json(films))
}

pub async fn update_film(
    State(state): State<AppState>,
    Json(request): Json<FilmUpdate>,
) -> AppResult<Json<Film>> {
    let film = catalog::update_film(state.films.as_ref(), request).await?;
    Ok(Json(film))
}

pub async fn get_film(
    State(state): State<AppState>,
    Path(film_id): Path<FilmId>,
) -> AppResult<Json<Film>> {
    let film = catalog::require_film(state.films.as_ref(), film_id).await?;
    Ok(Json(film))
}

pub async fn add_like(
    State(state): State<AppState>,
    Path((film_id, user_id)): Path<(FilmId, UserId)>,
) -> AppResult<StatusCode> {
    catalog::add_like(state.films.as_ref(), state.users.as_ref(), film_id, user_id).await?;
    Ok(StatusCode::OK)
}

pub async fn remove_like(
    State(state): State<AppState>,
    Path((film_id, user_id)): Path<(FilmId, UserId)>,
) -> AppResult<StatusCode> {
    catalog::remove_like(state.films.as_ref(), state.users.as_ref(), film_id, user_id).await?;
    Ok(StatusCode::OK)
}

/// Most liked films, `count` of them (10 by default)
pub async fn popular(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<PopularQuery>,
) -> AppResult<Json<Vec<Film>>> {
    let count = params.count.unwrap_or(DEFAULT_POPULAR_COUNT);
    tracing::info!(request_id = %request_id, count, "Processing popular films request");

    let films = ranking::best_films(state.films.as_ref(), count).await?;
    Ok(Json(films))
}

/// Films liked by both `userId` and `friendId`
pub async fn common(
    State(state): State<AppState>,
    Query(params): Query<CommonQuery>,
) -> AppResult<Json<Vec<Film>>> {
    catalog::require_user(state.users.as_ref(), params.user_id).await?;
    catalog::require_user(state.users.as_ref(), params.friend_id).await?;

    let films =
        ranking::common_films(state.films.as_ref(), params.user_id, params.friend_id).await?;
    Ok(Json(films))
}

pub async fn by_director(
    State(state): State<AppState>,
    Path(director_id): Path<DirectorId>,
    Query(params): Query<DirectorQuery>,
) -> AppResult<Json<Vec<Film>>> {
    catalog::require_director(state.films.as_ref(), director_id).await?;

    let films =
        ranking::films_by_director(state.films.as_ref(), director_id, params.sort_by).await?;
    Ok(Json(films))
}

/// Text search; `by` lists the fields to match and defaults to `title`
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<Film>>> {
    let by = params.by.as_deref().unwrap_or("title");
    let films = ranking::search_films(state.films.as_ref(), &params.query, by).await?;
    Ok(Json(films))
}
