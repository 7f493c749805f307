use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};

use crate::{
    db::{FilmStore, LikeIndex, UserStore},
    error::{AppError, AppResult},
    models::{
        Director, DirectorId, Film, FilmId, Genre, Mpa, NewFilm, NewUser, SearchField, User, UserId,
    },
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

#[derive(sqlx::FromRow)]
struct FilmRow {
    id: i64,
    name: String,
    description: String,
    release_date: NaiveDate,
    duration: i32,
    mpa_id: i32,
    mpa_name: String,
}

type UserRow = (i64, String, String, String, NaiveDate);

fn user_from_row((id, email, login, name, birthday): UserRow) -> User {
    User {
        id,
        email,
        login,
        name,
        birthday,
    }
}

/// Escapes LIKE wildcards so user input only ever matches literally
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

async fn insert_film_links(
    tx: &mut Transaction<'_, Postgres>,
    film_id: FilmId,
    film: &NewFilm,
) -> AppResult<()> {
    for genre_id in film.genre_ids() {
        sqlx::query("INSERT INTO film_genres (film_id, genre_id) VALUES ($1, $2)")
            .bind(film_id)
            .bind(genre_id)
            .execute(&mut **tx)
            .await?;
    }
    for director_id in film.director_ids() {
        sqlx::query("INSERT INTO film_directors (film_id, director_id) VALUES ($1, $2)")
            .bind(film_id)
            .bind(director_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Catalog backed by PostgreSQL
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Loads films with genres, directors and likes, in the order of `film_ids`
    async fn load_films(&self, film_ids: &[FilmId]) -> AppResult<Vec<Film>> {
        if film_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<FilmRow> = sqlx::query_as(
            r#"
            SELECT f.id, f.name, f.description, f.release_date, f.duration,
                   m.id AS mpa_id, m.name AS mpa_name
            FROM films AS f
            JOIN mpa_ratings AS m ON m.id = f.mpa_id
            WHERE f.id = ANY($1)
            "#,
        )
        .bind(film_ids)
        .fetch_all(&self.pool)
        .await?;

        let genres: Vec<(i64, i32, String)> = sqlx::query_as(
            r#"
            SELECT fg.film_id, g.id, g.name
            FROM film_genres AS fg
            JOIN genres AS g ON g.id = fg.genre_id
            WHERE fg.film_id = ANY($1)
            "#,
        )
        .bind(film_ids)
        .fetch_all(&self.pool)
        .await?;

        let directors: Vec<(i64, i64, String)> = sqlx::query_as(
            r#"
            SELECT fd.film_id, d.id, d.name
            FROM film_directors AS fd
            JOIN directors AS d ON d.id = fd.director_id
            WHERE fd.film_id = ANY($1)
            "#,
        )
        .bind(film_ids)
        .fetch_all(&self.pool)
        .await?;

        let likes: Vec<(i64, i64)> =
            sqlx::query_as("SELECT film_id, user_id FROM likes WHERE film_id = ANY($1)")
                .bind(film_ids)
                .fetch_all(&self.pool)
                .await?;

        let mut films: HashMap<FilmId, Film> = rows
            .into_iter()
            .map(|row| {
                let film = Film {
                    id: row.id,
                    name: row.name,
                    description: row.description,
                    release_date: row.release_date,
                    duration: row.duration,
                    mpa: Mpa {
                        id: row.mpa_id,
                        name: row.mpa_name,
                    },
                    genres: BTreeSet::new(),
                    directors: BTreeSet::new(),
                    likes: BTreeSet::new(),
                };
                (film.id, film)
            })
            .collect();

        for (film_id, id, name) in genres {
            if let Some(film) = films.get_mut(&film_id) {
                film.genres.insert(Genre { id, name });
            }
        }
        for (film_id, id, name) in directors {
            if let Some(film) = films.get_mut(&film_id) {
                film.directors.insert(Director { id, name });
            }
        }
        for (film_id, user_id) in likes {
            if let Some(film) = films.get_mut(&film_id) {
                film.likes.insert(user_id);
            }
        }

        Ok(film_ids.iter().filter_map(|id| films.remove(id)).collect())
    }

    async fn film_ids(&self, sql: &str, param: i64) -> AppResult<Vec<FilmId>> {
        let ids: Vec<(i64,)> = sqlx::query_as(sql).bind(param).fetch_all(&self.pool).await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}

#[async_trait::async_trait]
impl LikeIndex for PgStorage {
    async fn likes_of(&self, user_id: UserId) -> AppResult<HashSet<FilmId>> {
        let ids = self
            .film_ids("SELECT film_id FROM likes WHERE user_id = $1", user_id)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn users_who_liked(&self, film_id: FilmId) -> AppResult<HashSet<UserId>> {
        let ids: Vec<(i64,)> = sqlx::query_as("SELECT user_id FROM likes WHERE film_id = $1")
            .bind(film_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn overlap_counts(&self, user_id: UserId) -> AppResult<HashMap<UserId, usize>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT other.user_id, COUNT(*) AS shared
            FROM likes AS mine
            JOIN likes AS other ON other.film_id = mine.film_id
            WHERE mine.user_id = $1 AND other.user_id <> $1
            GROUP BY other.user_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(other, shared)| (other, shared as usize))
            .collect())
    }
}

#[async_trait::async_trait]
impl FilmStore for PgStorage {
    async fn film(&self, film_id: FilmId) -> AppResult<Option<Film>> {
        Ok(self.load_films(&[film_id]).await?.pop())
    }

    async fn all_films(&self) -> AppResult<Vec<Film>> {
        let ids: Vec<(i64,)> = sqlx::query_as("SELECT id FROM films ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        let ids: Vec<FilmId> = ids.into_iter().map(|(id,)| id).collect();
        self.load_films(&ids).await
    }

    async fn films_by_ids(&self, film_ids: Vec<FilmId>) -> AppResult<Vec<Film>> {
        self.load_films(&film_ids).await
    }

    async fn add_film(&self, film: NewFilm) -> AppResult<Film> {
        let mut tx = self.pool.begin().await?;

        let (film_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO films (name, description, release_date, duration, mpa_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&film.name)
        .bind(&film.description)
        .bind(film.release_date)
        .bind(film.duration)
        .bind(film.mpa.id)
        .fetch_one(&mut *tx)
        .await?;

        insert_film_links(&mut tx, film_id, &film).await?;

        tx.commit().await?;
        tracing::debug!(film_id, "Inserted film");

        self.film(film_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Film {} vanished", film_id)))
    }

    async fn update_film(&self, film_id: FilmId, film: NewFilm) -> AppResult<Option<Film>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE films
            SET name = $2, description = $3, release_date = $4, duration = $5, mpa_id = $6
            WHERE id = $1
            "#,
        )
        .bind(film_id)
        .bind(&film.name)
        .bind(&film.description)
        .bind(film.release_date)
        .bind(film.duration)
        .bind(film.mpa.id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("DELETE FROM film_genres WHERE film_id = $1")
            .bind(film_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM film_directors WHERE film_id = $1")
            .bind(film_id)
            .execute(&mut *tx)
            .await?;
        insert_film_links(&mut tx, film_id, &film).await?;

        tx.commit().await?;
        tracing::debug!(film_id, "Updated film");

        self.film(film_id).await
    }

    async fn add_like(&self, film_id: FilmId, user_id: UserId) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO likes (film_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(film_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_like(&self, film_id: FilmId, user_id: UserId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE film_id = $1 AND user_id = $2")
            .bind(film_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn films_ranked_by_like_count(&self, limit: usize) -> AppResult<Vec<Film>> {
        let ids = self
            .film_ids(
                r#"
                SELECT f.id
                FROM films AS f
                LEFT JOIN likes AS l ON l.film_id = f.id
                GROUP BY f.id, f.name
                ORDER BY COUNT(l.user_id) DESC, f.name COLLATE "C" ASC, f.id ASC
                LIMIT $1
                "#,
                i64::try_from(limit).unwrap_or(i64::MAX),
            )
            .await?;
        self.load_films(&ids).await
    }

    async fn common_liked_films(&self, user_a: UserId, user_b: UserId) -> AppResult<Vec<Film>> {
        let ids: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT a.film_id
            FROM likes AS a
            JOIN likes AS b ON b.film_id = a.film_id
            WHERE a.user_id = $1 AND b.user_id = $2
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<FilmId> = ids.into_iter().map(|(id,)| id).collect();
        self.load_films(&ids).await
    }

    async fn films_by_director(&self, director_id: DirectorId) -> AppResult<Vec<Film>> {
        let ids = self
            .film_ids(
                "SELECT film_id FROM film_directors WHERE director_id = $1",
                director_id,
            )
            .await?;
        self.load_films(&ids).await
    }

    async fn search_films(&self, needle: String, fields: Vec<SearchField>) -> AppResult<Vec<Film>> {
        let ids: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT f.id
            FROM films AS f
            LEFT JOIN film_directors AS fd ON fd.film_id = f.id
            LEFT JOIN directors AS d ON d.id = fd.director_id
            WHERE ($2 AND f.name ILIKE $1) OR ($3 AND d.name ILIKE $1)
            "#,
        )
        .bind(like_pattern(&needle))
        .bind(fields.contains(&SearchField::Title))
        .bind(fields.contains(&SearchField::Director))
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<FilmId> = ids.into_iter().map(|(id,)| id).collect();
        self.load_films(&ids).await
    }

    async fn genres(&self) -> AppResult<Vec<Genre>> {
        let rows: Vec<(i32, String)> = sqlx::query_as("SELECT id, name FROM genres ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id, name)| Genre { id, name }).collect())
    }

    async fn genre(&self, genre_id: i32) -> AppResult<Option<Genre>> {
        let row: Option<(i32, String)> = sqlx::query_as("SELECT id, name FROM genres WHERE id = $1")
            .bind(genre_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, name)| Genre { id, name }))
    }

    async fn mpa_ratings(&self) -> AppResult<Vec<Mpa>> {
        let rows: Vec<(i32, String)> =
            sqlx::query_as("SELECT id, name FROM mpa_ratings ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id, name)| Mpa { id, name }).collect())
    }

    async fn mpa(&self, mpa_id: i32) -> AppResult<Option<Mpa>> {
        let row: Option<(i32, String)> =
            sqlx::query_as("SELECT id, name FROM mpa_ratings WHERE id = $1")
                .bind(mpa_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, name)| Mpa { id, name }))
    }

    async fn add_director(&self, name: String) -> AppResult<Director> {
        let (id,): (i64,) = sqlx::query_as("INSERT INTO directors (name) VALUES ($1) RETURNING id")
            .bind(&name)
            .fetch_one(&self.pool)
            .await?;
        Ok(Director { id, name })
    }

    async fn director(&self, director_id: DirectorId) -> AppResult<Option<Director>> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM directors WHERE id = $1")
                .bind(director_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, name)| Director { id, name }))
    }
}

#[async_trait::async_trait]
impl UserStore for PgStorage {
    async fn add_user(&self, user: NewUser) -> AppResult<User> {
        let name = user.display_name();
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (email, login, name, birthday)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, login, name, birthday
            "#,
        )
        .bind(&user.email)
        .bind(&user.login)
        .bind(&name)
        .bind(user.birthday)
        .fetch_one(&self.pool)
        .await?;
        Ok(user_from_row(row))
    }

    async fn user(&self, user_id: UserId) -> AppResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, email, login, name, birthday FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(user_from_row))
    }

    async fn all_users(&self) -> AppResult<Vec<User>> {
        let rows: Vec<UserRow> =
            sqlx::query_as("SELECT id, email, login, name, birthday FROM users ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(user_from_row).collect())
    }

    async fn update_user(&self, user: User) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET email = $2, login = $3, name = $4, birthday = $5 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.login)
        .bind(&user.name)
        .bind(user.birthday)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
