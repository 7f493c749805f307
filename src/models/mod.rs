pub mod film;
pub mod user;

pub use film::{Director, DirectorSort, Film, FilmUpdate, Genre, Mpa, NewFilm, SearchField};
pub use user::{NewUser, User, UserUpdate};

/// Identifier of a registered user
pub type UserId = i64;

/// Identifier of a film in the catalog
pub type FilmId = i64;

/// Identifier of a film director
pub type DirectorId = i64;
