use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::{Uuid, Version};

use db::SqlValue;

/// Identifier shared by clients and users: a random (v4) UUID.
///
/// The nil UUID is the empty sentinel; [`Id::new`] never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Id(Uuid);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("'{input}' is not a valid identifier")]
    Malformed { input: String },

    #[error("'{input}' is not a random (v4) identifier")]
    WrongVersion { input: String },
}

impl Id {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn empty() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_nil()
    }

    pub fn parse(input: &str) -> Result<Self, IdError> {
        let uuid = Uuid::parse_str(input.trim()).map_err(|_| IdError::Malformed {
            input: input.to_owned(),
        })?;
        if uuid.get_version() != Some(Version::Random) {
            return Err(IdError::WrongVersion {
                input: input.to_owned(),
            });
        }
        Ok(Self(uuid))
    }

    /// Wraps a value read back from storage; no version check.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for Id {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Id> for SqlValue {
    fn from(id: Id) -> Self {
        SqlValue::Uuid(id.0)
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Id::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_v4_and_distinct() {
        let a = Id::new();
        let b = Id::new();
        assert_ne!(a, b);
        assert!(!a.is_empty());
        assert_eq!(a.as_uuid().get_version(), Some(Version::Random));
    }

    #[test]
    fn empty_is_default_and_never_generated() {
        assert!(Id::default().is_empty());
        assert_eq!(Id::empty(), Id::default());
        assert_ne!(Id::new(), Id::empty());
    }

    #[test]
    fn text_encoding_is_stable() {
        let id = Id::new();
        let text = id.to_string();
        assert_eq!(text, text.to_lowercase());
        assert_eq!(text.len(), 36);
        assert_eq!(Id::parse(&text).unwrap(), id);
        assert_eq!(text.parse::<Id>().unwrap(), id);
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(matches!(Id::parse("not-an-id"), Err(IdError::Malformed { .. })));
        assert!(matches!(Id::parse(""), Err(IdError::Malformed { .. })));
    }

    #[test]
    fn non_v4_input_is_rejected() {
        // v1 (time-based)
        let err = Id::parse("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap_err();
        assert!(matches!(err, IdError::WrongVersion { .. }));
        // nil
        let err = Id::parse("00000000-0000-0000-0000-000000000000").unwrap_err();
        assert!(matches!(err, IdError::WrongVersion { .. }));
    }

    #[test]
    fn serde_uses_text_and_validates() {
        let id = Id::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        assert_eq!(serde_json::from_str::<Id>(&json).unwrap(), id);
        assert!(serde_json::from_str::<Id>("\"nope\"").is_err());
    }
}
