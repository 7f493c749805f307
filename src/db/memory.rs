use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tokio::sync::RwLock;

use crate::{
    db::{FilmStore, IdGenerator, LikeIndex, Sequence, UserStore},
    error::{AppError, AppResult},
    models::{
        Director, DirectorId, Film, FilmId, Genre, Mpa, NewFilm, NewUser, SearchField, User, UserId,
    },
};

const GENRES: [(i32, &str); 6] = [
    (1, "Comedy"),
    (2, "Drama"),
    (3, "Animation"),
    (4, "Thriller"),
    (5, "Documentary"),
    (6, "Action"),
];

const MPA_RATINGS: [(i32, &str); 5] = [(1, "G"), (2, "PG"), (3, "PG-13"), (4, "R"), (5, "NC-17")];

/// Catalog kept entirely in process memory
///
/// Likes are indexed both ways: each film carries its liking users and
/// `user_likes` maps users back to their films.
pub struct InMemoryStorage {
    inner: RwLock<Inner>,
    user_ids: Box<dyn IdGenerator>,
    film_ids: Box<dyn IdGenerator>,
    director_ids: Box<dyn IdGenerator>,
}

struct Inner {
    users: HashMap<UserId, User>,
    films: HashMap<FilmId, Film>,
    user_likes: HashMap<UserId, HashSet<FilmId>>,
    genres: BTreeMap<i32, Genre>,
    mpa: BTreeMap<i32, Mpa>,
    directors: BTreeMap<DirectorId, Director>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    /// Creates an empty catalog seeded with genres and MPA ratings
    pub fn new() -> Self {
        Self::with_id_generators(
            Box::new(Sequence::new()),
            Box::new(Sequence::new()),
            Box::new(Sequence::new()),
        )
    }

    pub fn with_id_generators(
        user_ids: Box<dyn IdGenerator>,
        film_ids: Box<dyn IdGenerator>,
        director_ids: Box<dyn IdGenerator>,
    ) -> Self {
        let genres = GENRES
            .iter()
            .map(|(id, name)| {
                (
                    *id,
                    Genre {
                        id: *id,
                        name: name.to_string(),
                    },
                )
            })
            .collect();
        let mpa = MPA_RATINGS
            .iter()
            .map(|(id, name)| {
                (
                    *id,
                    Mpa {
                        id: *id,
                        name: name.to_string(),
                    },
                )
            })
            .collect();

        Self {
            inner: RwLock::new(Inner {
                users: HashMap::new(),
                films: HashMap::new(),
                user_likes: HashMap::new(),
                genres,
                mpa,
                directors: BTreeMap::new(),
            }),
            user_ids,
            film_ids,
            director_ids,
        }
    }
}

impl Inner {
    fn resolve_references(
        &self,
        film: &NewFilm,
    ) -> AppResult<(Mpa, BTreeSet<Genre>, BTreeSet<Director>)> {
        let mpa = self
            .mpa
            .get(&film.mpa.id)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("MPA rating {} missing", film.mpa.id)))?;
        let genres = film
            .genre_ids()
            .iter()
            .filter_map(|id| self.genres.get(id).cloned())
            .collect();
        let directors = film
            .director_ids()
            .iter()
            .filter_map(|id| self.directors.get(id).cloned())
            .collect();
        Ok((mpa, genres, directors))
    }
}

#[async_trait::async_trait]
impl LikeIndex for InMemoryStorage {
    async fn likes_of(&self, user_id: UserId) -> AppResult<HashSet<FilmId>> {
        let inner = self.inner.read().await;
        Ok(inner.user_likes.get(&user_id).cloned().unwrap_or_default())
    }

    async fn users_who_liked(&self, film_id: FilmId) -> AppResult<HashSet<UserId>> {
        let inner = self.inner.read().await;
        Ok(inner
            .films
            .get(&film_id)
            .map(|film| film.likes.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn overlap_counts(&self, user_id: UserId) -> AppResult<HashMap<UserId, usize>> {
        // One read guard for the whole walk keeps the counts on one snapshot
        let inner = self.inner.read().await;
        let mut counts = HashMap::new();
        let Some(liked) = inner.user_likes.get(&user_id) else {
            return Ok(counts);
        };

        for film in liked.iter().filter_map(|id| inner.films.get(id)) {
            for other in film.likes.iter().filter(|other| **other != user_id) {
                *counts.entry(*other).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[async_trait::async_trait]
impl FilmStore for InMemoryStorage {
    async fn film(&self, film_id: FilmId) -> AppResult<Option<Film>> {
        let inner = self.inner.read().await;
        Ok(inner.films.get(&film_id).cloned())
    }

    async fn films_by_ids(&self, film_ids: Vec<FilmId>) -> AppResult<Vec<Film>> {
        let inner = self.inner.read().await;
        Ok(film_ids
            .iter()
            .filter_map(|id| inner.films.get(id))
            .cloned()
            .collect())
    }

    async fn all_films(&self) -> AppResult<Vec<Film>> {
        let inner = self.inner.read().await;
        let mut films: Vec<Film> = inner.films.values().cloned().collect();
        films.sort_by_key(|film| film.id);
        Ok(films)
    }

    async fn add_film(&self, film: NewFilm) -> AppResult<Film> {
        let mut inner = self.inner.write().await;
        let (mpa, genres, directors) = inner.resolve_references(&film)?;

        let stored = Film {
            id: self.film_ids.next_id(),
            name: film.name,
            description: film.description,
            release_date: film.release_date,
            duration: film.duration,
            mpa,
            genres,
            directors,
            likes: BTreeSet::new(),
        };
        inner.films.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn update_film(&self, film_id: FilmId, film: NewFilm) -> AppResult<Option<Film>> {
        let mut inner = self.inner.write().await;
        if !inner.films.contains_key(&film_id) {
            return Ok(None);
        }
        let (mpa, genres, directors) = inner.resolve_references(&film)?;

        let Some(stored) = inner.films.get_mut(&film_id) else {
            return Ok(None);
        };
        stored.name = film.name;
        stored.description = film.description;
        stored.release_date = film.release_date;
        stored.duration = film.duration;
        stored.mpa = mpa;
        stored.genres = genres;
        stored.directors = directors;

        Ok(Some(stored.clone()))
    }

    async fn add_like(&self, film_id: FilmId, user_id: UserId) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let film = inner
            .films
            .get_mut(&film_id)
            .ok_or_else(|| AppError::NotFound(format!("Film {} not found", film_id)))?;

        if !film.likes.insert(user_id) {
            return Ok(false);
        }
        inner.user_likes.entry(user_id).or_default().insert(film_id);
        Ok(true)
    }

    async fn remove_like(&self, film_id: FilmId, user_id: UserId) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let removed = inner
            .films
            .get_mut(&film_id)
            .is_some_and(|film| film.likes.remove(&user_id));

        if removed {
            if let Some(liked) = inner.user_likes.get_mut(&user_id) {
                liked.remove(&film_id);
            }
        }
        Ok(removed)
    }

    async fn films_ranked_by_like_count(&self, limit: usize) -> AppResult<Vec<Film>> {
        let inner = self.inner.read().await;
        let mut films: Vec<Film> = inner.films.values().cloned().collect();
        films.sort_by(Film::popularity_cmp);
        films.truncate(limit);
        Ok(films)
    }

    async fn common_liked_films(&self, user_a: UserId, user_b: UserId) -> AppResult<Vec<Film>> {
        let inner = self.inner.read().await;
        let (Some(a), Some(b)) = (inner.user_likes.get(&user_a), inner.user_likes.get(&user_b))
        else {
            return Ok(Vec::new());
        };

        Ok(a.intersection(b)
            .filter_map(|id| inner.films.get(id))
            .cloned()
            .collect())
    }

    async fn films_by_director(&self, director_id: DirectorId) -> AppResult<Vec<Film>> {
        let inner = self.inner.read().await;
        Ok(inner
            .films
            .values()
            .filter(|film| film.directors.iter().any(|d| d.id == director_id))
            .cloned()
            .collect())
    }

    async fn search_films(&self, needle: String, fields: Vec<SearchField>) -> AppResult<Vec<Film>> {
        let needle = needle.to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner
            .films
            .values()
            .filter(|film| {
                fields.iter().any(|field| match field {
                    SearchField::Title => film.name.to_lowercase().contains(&needle),
                    SearchField::Director => film.director_matches(&needle),
                })
            })
            .cloned()
            .collect())
    }

    async fn genres(&self) -> AppResult<Vec<Genre>> {
        let inner = self.inner.read().await;
        Ok(inner.genres.values().cloned().collect())
    }

    async fn genre(&self, genre_id: i32) -> AppResult<Option<Genre>> {
        let inner = self.inner.read().await;
        Ok(inner.genres.get(&genre_id).cloned())
    }

    async fn mpa_ratings(&self) -> AppResult<Vec<Mpa>> {
        let inner = self.inner.read().await;
        Ok(inner.mpa.values().cloned().collect())
    }

    async fn mpa(&self, mpa_id: i32) -> AppResult<Option<Mpa>> {
        let inner = self.inner.read().await;
        Ok(inner.mpa.get(&mpa_id).cloned())
    }

    async fn add_director(&self, name: String) -> AppResult<Director> {
        let director = Director {
            id: self.director_ids.next_id(),
            name,
        };
        let mut inner = self.inner.write().await;
        inner.directors.insert(director.id, director.clone());
        Ok(director)
    }

    async fn director(&self, director_id: DirectorId) -> AppResult<Option<Director>> {
        let inner = self.inner.read().await;
        Ok(inner.directors.get(&director_id).cloned())
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryStorage {
    async fn add_user(&self, user: NewUser) -> AppResult<User> {
        let user = user.into_user(self.user_ids.next_id());
        let mut inner = self.inner.write().await;
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user(&self, user_id: UserId) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&user_id).cloned())
    }

    async fn all_users(&self) -> AppResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by_key(|user| user.id);
        Ok(users)
    }

    async fn update_user(&self, user: User) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::models::film::IdRef;

    #[test]
    fn test_seeded_reference_data() {
        let storage = InMemoryStorage::new();
        let genres = tokio_test::block_on(storage.genres()).unwrap();
        assert_eq!(genres.len(), 6);
        assert_eq!(genres[0].name, "Comedy");

        let mpa = tokio_test::block_on(storage.mpa(3)).unwrap().unwrap();
        assert_eq!(mpa.name, "PG-13");
    }

    #[tokio::test]
    async fn test_like_is_indexed_both_ways() {
        let (storage, users, films) = seeded(1, &["Heat"], &[(0, 0)]).await;

        assert_eq!(storage.likes_of(users[0]).await.unwrap(), HashSet::from([films[0]]));
        assert_eq!(storage.users_who_liked(films[0]).await.unwrap(), HashSet::from([users[0]]));

        assert!(!storage.add_like(films[0], users[0]).await.unwrap());
        assert!(storage.remove_like(films[0], users[0]).await.unwrap());
        assert!(!storage.remove_like(films[0], users[0]).await.unwrap());
        assert!(storage.likes_of(users[0]).await.unwrap().is_empty());
        assert!(storage.users_who_liked(films[0]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_not_reused() {
        let storage = InMemoryStorage::new();
        let first = storage.add_user(new_user("ann")).await.unwrap();
        let second = storage.add_user(new_user("bob")).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_add_film_resolves_references() {
        let storage = InMemoryStorage::new();
        let director = storage.add_director("Michael Mann".to_string()).await.unwrap();

        let mut film = new_film("Heat");
        film.mpa = IdRef { id: 4 };
        film.genres = vec![IdRef { id: 6 }, IdRef { id: 4 }, IdRef { id: 6 }];
        film.directors = vec![IdRef { id: director.id }];

        let stored = storage.add_film(film).await.unwrap();
        assert_eq!(stored.mpa.name, "R");
        let genre_ids: Vec<i32> = stored.genres.iter().map(|g| g.id).collect();
        assert_eq!(genre_ids, vec![4, 6]);
        assert_eq!(stored.directors.len(), 1);
        assert_eq!(storage.film(stored.id).await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn test_overlap_counts_matches_default_walk() {
        let (storage, users, _) = seeded(
            3,
            &["A", "B", "C"],
            &[(0, 0), (0, 1), (1, 0), (1, 1), (2, 1), (2, 2)],
        )
        .await;

        let counts = storage.overlap_counts(users[0]).await.unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&users[1]], 2);
        assert_eq!(counts[&users[2]], 1);
    }

    #[tokio::test]
    async fn test_update_film_keeps_likes() {
        let (storage, users, films) = seeded(1, &["Heat"], &[(0, 0)]).await;

        let mut changed = new_film("Heat (Director's Cut)");
        changed.mpa = IdRef { id: 4 };
        changed.genres = vec![IdRef { id: 2 }];
        let updated = storage.update_film(films[0], changed).await.unwrap().unwrap();

        assert_eq!(updated.id, films[0]);
        assert_eq!(updated.name, "Heat (Director's Cut)");
        assert_eq!(updated.mpa.name, "R");
        assert_eq!(updated.genres.len(), 1);
        assert_eq!(updated.likes, BTreeSet::from([users[0]]));
        assert_eq!(storage.likes_of(users[0]).await.unwrap(), HashSet::from([films[0]]));

        assert!(storage.update_film(films[0] + 1, new_film("Nope")).await.unwrap().is_none());
        assert_eq!(storage.all_films().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_list_users() {
        let storage = InMemoryStorage::new();
        let ann = storage.add_user(new_user("ann")).await.unwrap();
        let bob = storage.add_user(new_user("bob")).await.unwrap();

        let renamed = User {
            name: "Ann Smith".to_string(),
            ..ann.clone()
        };
        assert!(storage.update_user(renamed.clone()).await.unwrap());
        assert_eq!(storage.all_users().await.unwrap(), vec![renamed, bob.clone()]);

        let ghost = User { id: bob.id + 1, ..bob };
        assert!(!storage.update_user(ghost).await.unwrap());
    }

    #[tokio::test]
    async fn test_search_by_title_and_director() {
        let storage = InMemoryStorage::new();
        let director = storage.add_director("Sofia Coppola".to_string()).await.unwrap();
        let mut lost = new_film("Lost in Translation");
        lost.directors = vec![IdRef { id: director.id }];
        storage.add_film(lost).await.unwrap();
        storage.add_film(new_film("The Godfather")).await.unwrap();

        let by_title = storage
            .search_films("GOD".to_string(), vec![SearchField::Title])
            .await
            .unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].name, "The Godfather");

        let by_director = storage
            .search_films("coppola".to_string(), vec![SearchField::Director])
            .await
            .unwrap();
        assert_eq!(by_director.len(), 1);
        assert_eq!(by_director[0].name, "Lost in Translation");

        let both = storage
            .search_films("o".to_string(), vec![SearchField::Title, SearchField::Director])
            .await
            .unwrap();
        assert_eq!(both.len(), 2);
    }
}
