use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::UserId;

/// A registered user of the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub login: String,
    pub name: String,
    pub birthday: NaiveDate,
}

/// Payload for registering a user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    pub birthday: NaiveDate,
}

/// Payload for replacing a registered user's details
#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdate {
    pub id: UserId,
    #[serde(flatten)]
    pub user: NewUser,
}

impl UserUpdate {
    /// The stored form of the update, with the same name fallback as on creation
    pub fn into_user(self) -> User {
        self.user.into_user(self.id)
    }
}

impl NewUser {
    /// Display name, falling back to the login when none was given
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.login.clone(),
        }
    }

    /// Builds the stored user once an identifier has been assigned
    pub fn into_user(self, id: UserId) -> User {
        let name = self.display_name();
        User {
            id,
            email: self.email,
            login: self.login,
            name,
            birthday: self.birthday,
        }
    }
}
