//! Catalog operations and the existence checks that guard the ranking core.
use crate::{
    db::{FilmStore, UserStore},
    error::{AppError, AppResult},
    models::{
        Director, DirectorId, Film, FilmId, FilmUpdate, Genre, Mpa, NewFilm, NewUser, User,
        UserId, UserUpdate,
    },
};

/// Fetches a user or fails with NotFound
pub async fn require_user(users: &dyn UserStore, user_id: UserId) -> AppResult<User> {
    users.user(user_id).await?.ok_or_else(|| {
        tracing::warn!(user_id, "User not found");
        AppError::NotFound(format!("User with id {} not found", user_id))
    })
}

/// Fetches a film or fails with NotFound
pub async fn require_film(films: &dyn FilmStore, film_id: FilmId) -> AppResult<Film> {
    films.film(film_id).await?.ok_or_else(|| {
        tracing::warn!(film_id, "Film not found");
        AppError::NotFound(format!("Film with id {} not found", film_id))
    })
}

pub async fn require_director(
    films: &dyn FilmStore,
    director_id: DirectorId,
) -> AppResult<Director> {
    films.director(director_id).await?.ok_or_else(|| {
        tracing::warn!(director_id, "Director not found");
        AppError::NotFound(format!("Director with id {} not found", director_id))
    })
}

pub async fn require_genre(films: &dyn FilmStore, genre_id: i32) -> AppResult<Genre> {
    films
        .genre(genre_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", genre_id)))
}

pub async fn require_mpa(films: &dyn FilmStore, mpa_id: i32) -> AppResult<Mpa> {
    films
        .mpa(mpa_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("MPA rating with id {} not found", mpa_id)))
}

pub async fn create_user(users: &dyn UserStore, user: NewUser) -> AppResult<User> {
    let user = users.add_user(user).await?;
    tracing::info!(user_id = user.id, login = %user.login, "User created");
    Ok(user)
}

pub async fn list_users(users: &dyn UserStore) -> AppResult<Vec<User>> {
    users.all_users().await
}

/// Replaces a user's details; an unknown id is NotFound
pub async fn update_user(users: &dyn UserStore, update: UserUpdate) -> AppResult<User> {
    let user = update.into_user();
    if !users.update_user(user.clone()).await? {
        tracing::warn!(user_id = user.id, "User to update not found");
        return Err(AppError::NotFound(format!("User with id {} not found", user.id)));
    }
    tracing::info!(user_id = user.id, "User updated");
    Ok(user)
}

async fn require_references(films: &dyn FilmStore, film: &NewFilm) -> AppResult<()> {
    require_mpa(films, film.mpa.id).await?;
    for genre_id in film.genre_ids() {
        require_genre(films, genre_id).await?;
    }
    for director_id in film.director_ids() {
        require_director(films, director_id).await?;
    }
    Ok(())
}

pub async fn list_films(films: &dyn FilmStore) -> AppResult<Vec<Film>> {
    films.all_films().await
}

/// Adds a film after checking its MPA rating, genres and directors exist
pub async fn create_film(films: &dyn FilmStore, film: NewFilm) -> AppResult<Film> {
    require_references(films, &film).await?;

    let film = films.add_film(film).await?;
    tracing::info!(film_id = film.id, name = %film.name, "Film created");
    Ok(film)
}

/// Replaces a film's details, keeping its likes; an unknown id is NotFound
pub async fn update_film(films: &dyn FilmStore, update: FilmUpdate) -> AppResult<Film> {
    let film_id = update.id;
    require_film(films, film_id).await?;
    require_references(films, &update.film).await?;

    let film = films.update_film(film_id, update.film).await?.ok_or_else(|| {
        AppError::NotFound(format!("Film with id {} not found", film_id))
    })?;
    tracing::info!(film_id, "Film updated");
    Ok(film)
}

pub async fn create_director(films: &dyn FilmStore, name: String) -> AppResult<Director> {
    let director = films.add_director(name).await?;
    tracing::info!(director_id = director.id, "Director created");
    Ok(director)
}

/// Records that a user likes a film; liking twice is a conflict
pub async fn add_like(
    films: &dyn FilmStore,
    users: &dyn UserStore,
    film_id: FilmId,
    user_id: UserId,
) -> AppResult<()> {
    require_film(films, film_id).await?;
    require_user(users, user_id).await?;

    if !films.add_like(film_id, user_id).await? {
        tracing::warn!(film_id, user_id, "Duplicate like");
        return Err(AppError::AlreadyExists(format!(
            "User {} already liked film {}",
            user_id, film_id
        )));
    }

    tracing::info!(film_id, user_id, "Like added");
    Ok(())
}

/// Withdraws a like; removing a like that does not exist is NotFound
pub async fn remove_like(
    films: &dyn FilmStore,
    users: &dyn UserStore,
    film_id: FilmId,
    user_id: UserId,
) -> AppResult<()> {
    require_film(films, film_id).await?;
    require_user(users, user_id).await?;

    if !films.remove_like(film_id, user_id).await? {
        tracing::warn!(film_id, user_id, "Like to remove does not exist");
        return Err(AppError::NotFound(format!(
            "User {} has not liked film {}",
            user_id, film_id
        )));
    }

    tracing::info!(film_id, user_id, "Like removed");
    Ok(())
}
