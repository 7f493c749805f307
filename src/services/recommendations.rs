use std::collections::{HashMap, HashSet};

use tracing::instrument;

use crate::{
    db::{FilmStore, LikeIndex},
    error::AppResult,
    models::{Film, FilmId, UserId},
    services::similarity::find_similar_users,
};

/// Generates film recommendations from users with similar taste
///
/// Every film liked by a similar user and not yet liked by `user_id` gets one
/// vote per similar user. Films are returned with the most votes first, ties
/// broken by film id so repeated calls give the same order.
#[instrument(skip(index, films))]
pub async fn recommend(
    index: &dyn LikeIndex,
    films: &dyn FilmStore,
    user_id: UserId,
) -> AppResult<Vec<Film>> {
    let similar = find_similar_users(index, user_id).await?;
    if similar.is_empty() {
        return Ok(Vec::new());
    }

    let own_likes = index.likes_of(user_id).await?;
    let mut neighbour_likes = Vec::with_capacity(similar.len());
    for other in &similar {
        neighbour_likes.push(index.likes_of(*other).await?);
    }

    let ranked = rank_candidates(&own_likes, &neighbour_likes);

    let mut hydrated: HashMap<FilmId, Film> = films
        .films_by_ids(ranked.clone())
        .await?
        .into_iter()
        .map(|film| (film.id, film))
        .collect();

    let recommendations: Vec<Film> = ranked
        .iter()
        .filter_map(|film_id| hydrated.remove(film_id))
        .collect();

    tracing::info!(
        user_id,
        similar_users = similar.len(),
        recommended = recommendations.len(),
        "Built recommendations"
    );

    Ok(recommendations)
}

/// Orders candidate films by how many neighbours liked them
///
/// Films already in `own_likes` are never candidates.
pub fn rank_candidates(
    own_likes: &HashSet<FilmId>,
    neighbour_likes: &[HashSet<FilmId>],
) -> Vec<FilmId> {
    let mut votes: HashMap<FilmId, usize> = HashMap::new();
    for likes in neighbour_likes {
        for film_id in likes.iter().filter(|id| !own_likes.contains(id)) {
            *votes.entry(*film_id).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(FilmId, usize)> = votes.into_iter().collect();
    ranked.sort_by(|(a_id, a_votes), (b_id, b_votes)| {
        b_votes.cmp(a_votes).then_with(|| a_id.cmp(b_id))
    });

    ranked.into_iter().map(|(film_id, _)| film_id).collect()
}
