use std::collections::{HashMap, HashSet};

use tracing::instrument;

use crate::{db::LikeIndex, error::AppResult, models::UserId};

/// Finds the users whose taste is closest to `user_id`
///
/// Closeness is the number of films both users liked. Only users at the
/// maximum overlap are returned, all of them when several tie. A user with
/// no likes, or whose likes nobody shares, has no similar users.
#[instrument(skip(index))]
pub async fn find_similar_users(
    index: &dyn LikeIndex,
    user_id: UserId,
) -> AppResult<HashSet<UserId>> {
    let mut overlaps = index.overlap_counts(user_id).await?;
    overlaps.remove(&user_id);

    let similar = most_overlapping(&overlaps);

    tracing::debug!(
        candidates = overlaps.len(),
        similar = similar.len(),
        "Computed similar users"
    );

    Ok(similar)
}

/// Keeps the users whose overlap count equals the maximum
pub fn most_overlapping(overlaps: &HashMap<UserId, usize>) -> HashSet<UserId> {
    let Some(max) = overlaps.values().copied().filter(|count| *count > 0).max() else {
        return HashSet::new();
    };

    overlaps
        .iter()
        .filter(|(_, count)| **count == max)
        .map(|(user_id, _)| *user_id)
        .collect()
}
