use serde::{Deserialize, Serialize};

use super::enums::Role;

/// An authenticated clinic user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub active: bool,
    /// Clinical specialties. Only meaningful for veterinarians.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specialties: Vec<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            role,
            active: true,
            specialties: Vec::new(),
        }
    }

    pub fn with_specialties<I, S>(mut self, specialties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.specialties = specialties.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_veterinarian(&self) -> bool {
        self.role == Role::Veterinarian
    }
}
