use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{Film, UserId},
    routes::AppState,
    services::{catalog, recommendations},
};

/// Handler for the recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<Vec<Film>>> {
    tracing::info!(
        request_id = %request_id,
        user_id,
        "Processing recommendation request"
    );

    catalog::require_user(state.users.as_ref(), user_id).await?;

    let films =
        recommendations::recommend(state.likes.as_ref(), state.films.as_ref(), user_id).await?;

    tracing::info!(
        request_id = %request_id,
        recommended = films.len(),
        "Recommendations completed"
    );

    Ok(Json(films))
}
