use chrono::{DateTime, Utc};

use crate::contract::id::Id;

/// Client model shared with other modules (no serde).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: Id,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User model; `client_ids` is sorted and free of duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub enabled: bool,
    pub client_ids: Vec<Id>,
}

/// A field in a partial update: either left alone or replaced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Unchanged,
    Set(T),
}

impl<T> Patch<T> {
    /// Writes the new value into `target` when one is present.
    pub fn apply(self, target: &mut T) {
        if let Patch::Set(value) = self {
            *target = value;
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Patch::Unchanged)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Unchanged => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Set(value) => Patch::Set(f(value)),
            Patch::Unchanged => Patch::Unchanged,
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Patch::Unchanged, Patch::Set)
    }
}

/// Data for creating a new client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClient {
    pub name: String,
}

/// Partial update data for a client
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientPatch {
    pub name: Patch<String>,
}

/// Data for creating a new user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub enabled: bool,
    pub client_ids: Vec<Id>,
}

/// Partial update data for a user
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserPatch {
    pub email: Patch<String>,
    pub enabled: Patch<bool>,
    pub client_ids: Patch<Vec<Id>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_leaves_target_alone() {
        let mut name = "Acme".to_string();
        Patch::Unchanged.apply(&mut name);
        assert_eq!(name, "Acme");
    }

    #[test]
    fn set_replaces_target() {
        let mut enabled = true;
        Patch::Set(false).apply(&mut enabled);
        assert!(!enabled);
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Patch::from(Some(3)), Patch::Set(3));
        assert_eq!(Patch::<i32>::from(None), Patch::Unchanged);
        assert!(UserPatch::default().email.is_unchanged());
        assert_eq!(Patch::Set(2).map(|v| v * 2).as_set(), Some(&4));
    }
}
