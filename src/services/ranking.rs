use std::collections::BTreeSet;

use tracing::instrument;

use crate::{
    db::FilmStore,
    error::{AppError, AppResult},
    models::{DirectorId, DirectorSort, Film, SearchField, UserId},
};

/// Most liked films, ties broken by name
///
/// `count` must be positive. Fewer films than `count` yields all of them.
#[instrument(skip(films))]
pub async fn best_films(films: &dyn FilmStore, count: i64) -> AppResult<Vec<Film>> {
    if count <= 0 {
        return Err(AppError::InvalidInput(format!(
            "count must be positive, got {}",
            count
        )));
    }
    let limit = usize::try_from(count).unwrap_or(usize::MAX);

    let mut ranked = films.films_ranked_by_like_count(limit).await?;
    ranked.sort_by(Film::popularity_cmp);
    ranked.truncate(limit);

    tracing::debug!(count, returned = ranked.len(), "Ranked best films");
    Ok(ranked)
}

/// Films both users liked, most liked first then by name
pub async fn common_films(
    films: &dyn FilmStore,
    user_id: UserId,
    other_id: UserId,
) -> AppResult<Vec<Film>> {
    let mut common = films.common_liked_films(user_id, other_id).await?;
    common.sort_by(Film::popularity_cmp);
    Ok(common)
}

/// Films of one director, by likes or by release year
pub async fn films_by_director(
    films: &dyn FilmStore,
    director_id: DirectorId,
    sort: DirectorSort,
) -> AppResult<Vec<Film>> {
    let mut directed = films.films_by_director(director_id).await?;
    match sort {
        DirectorSort::Likes => directed.sort_by(Film::popularity_cmp),
        DirectorSort::Year => directed.sort_by(Film::release_cmp),
    }
    Ok(directed)
}

/// Parses a comma-separated list of search fields such as `title,director`
pub fn parse_search_fields(by: &str) -> AppResult<Vec<SearchField>> {
    let fields = by
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| part.parse::<SearchField>().map_err(AppError::InvalidInput))
        .collect::<AppResult<BTreeSet<_>>>()?;

    if fields.is_empty() {
        return Err(AppError::InvalidInput(
            "at least one search field is required".to_string(),
        ));
    }
    Ok(fields.into_iter().collect())
}

/// Case-insensitive substring search over titles and/or director names,
/// ordered like the best films list
pub async fn search_films(films: &dyn FilmStore, query: &str, by: &str) -> AppResult<Vec<Film>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::InvalidInput(
            "search query cannot be empty".to_string(),
        ));
    }
    let fields = parse_search_fields(by)?;

    let mut found = films.search_films(query.to_string(), fields).await?;
    found.sort_by(Film::popularity_cmp);

    tracing::debug!(query = %query, by = %by, found = found.len(), "Searched films");
    Ok(found)
}
