use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Stable identity key for a user.
///
/// The value comes from the external sign-in provider and never changes for
/// the lifetime of the account. It is embedded in object keys
/// (`users/{id}.json`), so it must be non-empty and must not contain path
/// separators or control characters.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap a raw identity string.
    pub fn new(raw: impl Into<String>) -> Result<Self, TypeError> {
        let raw = raw.into();
        let valid = !raw.is_empty()
            && raw != "."
            && raw != ".."
            && !raw
                .chars()
                .any(|c| c == '/' || c == '\\' || c.is_control());
        if valid {
            Ok(Self(raw))
        } else {
            Err(TypeError::InvalidUserId(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Object key of this user's document.
    pub fn document_key(&self) -> String {
        format!("users/{}.json", self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::str::FromStr for UserId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

/// Profile fields reported by the sign-in provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub photo_url: String,
}

impl UserProfile {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            name: String::new(),
            email: String::new(),
            photo_url: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_provider_ids() {
        let id = UserId::new("109876543210987654321").unwrap();
        assert_eq!(id.as_str(), "109876543210987654321");
        assert_eq!(id.document_key(), "users/109876543210987654321.json");
    }

    #[test]
    fn rejects_empty_and_path_like_ids() {
        for bad in ["", ".", "..", "a/b", "a\\b", "line\nbreak"] {
            assert!(
                matches!(UserId::new(bad), Err(TypeError::InvalidUserId(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn serde_is_transparent() {
        let id = UserId::new("u-1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"u-1\"");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn deserialize_validates() {
        let err = serde_json::from_str::<UserId>("\"../etc\"");
        assert!(err.is_err());
    }

    #[test]
    fn parse_from_str() {
        let id: UserId = "abc".parse().unwrap();
        assert_eq!(id.to_string(), "abc");
        assert_eq!(format!("{id:?}"), "UserId(abc)");
    }

    #[test]
    fn profile_builder() {
        let profile = UserProfile::new(UserId::new("u").unwrap())
            .with_name("Ada")
            .with_email("ada@example.com")
            .with_photo_url("https://example.com/a.png");
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.photo_url, "https://example.com/a.png");
    }
}
