use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::{FilmStore, InMemoryStorage, LikeIndex, UserStore},
    middleware::{make_span_with_request_id, request_id_middleware},
};

pub mod films;
pub mod recommendations;
pub mod reference;
pub mod users;

/// Storage handles shared by every handler, usually views of one backend
#[derive(Clone)]
pub struct AppState {
    pub likes: Arc<dyn LikeIndex>,
    pub films: Arc<dyn FilmStore>,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    pub fn from_storage<S>(storage: Arc<S>) -> Self
    where
        S: LikeIndex + FilmStore + UserStore + 'static,
    {
        Self {
            likes: storage.clone(),
            films: storage.clone(),
            users: storage,
        }
    }

    /// State over a fresh in-memory catalog
    pub fn in_memory() -> Self {
        Self::from_storage(Arc::new(InMemoryStorage::new()))
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Users
        .route(
            "/users",
            get(users::list_users)
                .post(users::create_user)
                .put(users::update_user),
        )
        .route("/users/:id", get(users::get_user))
        .route("/users/:id/similar", get(users::similar_users))
        .route(
            "/users/:id/recommendations",
            get(recommendations::recommend),
        )
        // Films
        .route(
            "/films",
            get(films::list_films)
                .post(films::create_film)
                .put(films::update_film),
        )
        .route("/films/popular", get(films::popular))
        .route("/films/common", get(films::common))
        .route("/films/search", get(films::search))
        .route("/films/director/:director_id", get(films::by_director))
        .route("/films/:id", get(films::get_film))
        .route(
            "/films/:id/like/:user_id",
            put(films::add_like).delete(films::remove_like),
        )
        // Reference data
        .route("/genres", get(reference::genres))
        .route("/genres/:id", get(reference::genre))
        .route("/mpa", get(reference::mpa_ratings))
        .route("/mpa/:id", get(reference::mpa))
        .route("/directors", post(reference::create_director))
        .route("/directors/:id", get(reference::director))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
