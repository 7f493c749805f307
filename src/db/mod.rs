//! Storage collaborators
//!
//! The ranking core only ever reads through these traits. Two backends are
//! provided: an in-memory store for tests and local runs, and PostgreSQL.
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};

use crate::{
    error::AppResult,
    models::{Director, DirectorId, Film, FilmId, Genre, Mpa, NewFilm, NewUser, SearchField, User, UserId},
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStorage;
pub use postgres::{create_pool, PgStorage};

/// Read view over the like relation in both directions
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LikeIndex: Send + Sync {
    /// Films liked by the user
    async fn likes_of(&self, user_id: UserId) -> AppResult<HashSet<FilmId>>;

    /// Users who liked the film
    async fn users_who_liked(&self, film_id: FilmId) -> AppResult<HashSet<UserId>>;

    /// Number of co-liked films for every other user sharing at least one like
    ///
    /// The default walks the index one film at a time. Backends that can
    /// aggregate in a single query should override it; the result must be
    /// identical.
    async fn overlap_counts(&self, user_id: UserId) -> AppResult<HashMap<UserId, usize>> {
        let mut counts = HashMap::new();
        for film_id in self.likes_of(user_id).await? {
            for other in self.users_who_liked(film_id).await? {
                if other != user_id {
                    *counts.entry(other).or_insert(0) += 1;
                }
            }
        }
        Ok(counts)
    }
}

/// Film catalog, reference data and like mutations
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FilmStore: Send + Sync {
    /// Film with its genres, directors and likes
    async fn film(&self, film_id: FilmId) -> AppResult<Option<Film>>;

    /// Hydrates several films at once; unknown ids are skipped and order is
    /// not guaranteed.
    async fn films_by_ids(&self, film_ids: Vec<FilmId>) -> AppResult<Vec<Film>> {
        let mut films = Vec::with_capacity(film_ids.len());
        for film_id in film_ids {
            if let Some(film) = self.film(film_id).await? {
                films.push(film);
            }
        }
        Ok(films)
    }

    /// Every film, ordered by id
    async fn all_films(&self) -> AppResult<Vec<Film>>;

    /// Adds a film whose MPA rating, genres and directors are known to exist
    async fn add_film(&self, film: NewFilm) -> AppResult<Film>;

    /// Replaces the film's fields, genres and directors; likes are kept.
    /// Returns `None` for an unknown film.
    async fn update_film(&self, film_id: FilmId, film: NewFilm) -> AppResult<Option<Film>>;

    /// Returns false when the like was already present
    async fn add_like(&self, film_id: FilmId, user_id: UserId) -> AppResult<bool>;

    /// Returns false when there was no such like
    async fn remove_like(&self, film_id: FilmId, user_id: UserId) -> AppResult<bool>;

    /// Up to `limit` films, most liked first, ties by name
    async fn films_ranked_by_like_count(&self, limit: usize) -> AppResult<Vec<Film>>;

    /// Films liked by both users, in no particular order
    async fn common_liked_films(&self, user_a: UserId, user_b: UserId) -> AppResult<Vec<Film>>;

    /// Films credited to the director, in no particular order
    async fn films_by_director(&self, director_id: DirectorId) -> AppResult<Vec<Film>>;

    /// Films whose title or director name contains `needle`, case-insensitively
    async fn search_films(&self, needle: String, fields: Vec<SearchField>) -> AppResult<Vec<Film>>;

    /// All genres, ordered by id
    async fn genres(&self) -> AppResult<Vec<Genre>>;

    /// Genre by id
    async fn genre(&self, genre_id: i32) -> AppResult<Option<Genre>>;

    /// All MPA ratings, ordered by id
    async fn mpa_ratings(&self) -> AppResult<Vec<Mpa>>;

    /// MPA rating by id
    async fn mpa(&self, mpa_id: i32) -> AppResult<Option<Mpa>>;

    /// Stores a director under a fresh id
    async fn add_director(&self, name: String) -> AppResult<Director>;

    /// Director by id
    async fn director(&self, director_id: DirectorId) -> AppResult<Option<Director>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn add_user(&self, user: NewUser) -> AppResult<User>;

    async fn user(&self, user_id: UserId) -> AppResult<Option<User>>;

    /// Every user, ordered by id
    async fn all_users(&self) -> AppResult<Vec<User>>;

    /// Overwrites the stored user with the same id; returns false when there
    /// is none
    async fn update_user(&self, user: User) -> AppResult<bool>;
}

/// Source of fresh identifiers for newly created entities
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> i64;
}

/// Monotonic sequence starting at 1; identifiers are never handed out twice
#[derive(Debug)]
pub struct Sequence {
    next: AtomicI64,
}

impl Sequence {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for Sequence {
    fn next_id(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
