use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{DirectorId, FilmId, UserId};

/// MPA age rating attached to every film
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mpa {
    pub id: i32,
    pub name: String,
}

/// Film genre; ordered by id so a film's genre set serializes in id order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Director {
    pub id: DirectorId,
    pub name: String,
}

/// A film with its reference data and likes fully populated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id: FilmId,
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    /// Duration in minutes
    pub duration: i32,
    pub mpa: Mpa,
    pub genres: BTreeSet<Genre>,
    pub directors: BTreeSet<Director>,
    pub likes: BTreeSet<UserId>,
}

impl Film {
    /// Number of users who liked the film
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    /// Most liked first, then by name, then by id
    pub fn popularity_cmp(a: &Film, b: &Film) -> Ordering {
        b.like_count()
            .cmp(&a.like_count())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Oldest release first, then by name, then by id
    pub fn release_cmp(a: &Film, b: &Film) -> Ordering {
        a.release_date
            .cmp(&b.release_date)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Whether any director's name contains the lowercase needle
    pub fn director_matches(&self, needle: &str) -> bool {
        self.directors
            .iter()
            .any(|d| d.name.to_lowercase().contains(needle))
    }
}

/// Reference to an existing entity by id, as sent by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IdRef<T> {
    pub id: T,
}

/// Payload for adding a film to the catalog
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFilm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub release_date: NaiveDate,
    pub duration: i32,
    pub mpa: IdRef<i32>,
    #[serde(default)]
    pub genres: Vec<IdRef<i32>>,
    #[serde(default)]
    pub directors: Vec<IdRef<DirectorId>>,
}

impl NewFilm {
    /// Genre ids without duplicates, in ascending order
    pub fn genre_ids(&self) -> BTreeSet<i32> {
        self.genres.iter().map(|g| g.id).collect()
    }

    pub fn director_ids(&self) -> BTreeSet<DirectorId> {
        self.directors.iter().map(|d| d.id).collect()
    }
}

/// Payload for replacing a film's details; likes are not part of it
#[derive(Debug, Clone, Deserialize)]
pub struct FilmUpdate {
    pub id: FilmId,
    #[serde(flatten)]
    pub film: NewFilm,
}

/// Ordering for the films of one director
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectorSort {
    #[default]
    Likes,
    Year,
}

/// Film attribute a text search matches against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SearchField {
    Title,
    Director,
}

impl FromStr for SearchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "title" => Ok(SearchField::Title),
            "director" => Ok(SearchField::Director),
            other => Err(format!("unknown search field '{}'", other)),
        }
    }
}

impl Display for SearchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchField::Title => write!(f, "title"),
            SearchField::Director => write!(f, "director"),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_film(id: FilmId, name: &str, likes: &[UserId]) -> Film {
    Film {
        id,
        name: name.to_string(),
        description: String::new(),
        release_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
        duration: 120,
        mpa: Mpa {
            id: 1,
            name: "G".to_string(),
        },
        genres: BTreeSet::new(),
        directors: BTreeSet::new(),
        likes: likes.iter().copied().collect(),
    }
}
