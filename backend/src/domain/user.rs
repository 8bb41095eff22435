//! User identity and profile data consumed by valuation and matching.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reputation assumed when a profile carries none.
pub const DEFAULT_REPUTATION: f64 = 50.0;

/// Validation errors for user identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// The identifier was empty.
    #[error("user id must not be empty")]
    EmptyId,
    /// The identifier was not a canonical UUID.
    #[error("user id must be a valid UUID")]
    InvalidId,
}

/// Stable user identifier stored as a UUID.
///
/// The original string form is retained so identifiers round-trip exactly
/// through logs and payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid, String);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    ///
    /// # Errors
    /// Returns [`UserValidationError`] when the input is empty, padded with
    /// whitespace, or not a UUID.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        Self::from_owned(id.as_ref().to_owned())
    }

    /// Generate a new random [`UserId`].
    #[must_use]
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Wrap a UUID read from storage.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid, uuid.to_string())
    }

    fn from_owned(id: String) -> Result<Self, UserValidationError> {
        if id.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if id.trim() != id {
            return Err(UserValidationError::InvalidId);
        }
        let parsed = Uuid::parse_str(&id).map_err(|_| UserValidationError::InvalidId)?;
        Ok(Self(parsed, id))
    }

    /// Access the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.1.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        let UserId(_, raw) = value;
        raw
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Profile facts the matching engine reads about a user.
///
/// Aggregate counters change only when a swap completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub display_name: String,
    /// Reputation on a 0–100 scale; `None` falls back to
    /// [`DEFAULT_REPUTATION`].
    pub reputation: Option<f64>,
    pub total_swaps_completed: u32,
    pub hours_taught: f64,
    pub hours_learned: f64,
}

impl UserProfile {
    /// Fresh profile with default reputation and zeroed counters.
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            reputation: None,
            total_swaps_completed: 0,
            hours_taught: 0.0,
            hours_learned: 0.0,
        }
    }

    /// Set the reputation score.
    #[must_use]
    pub const fn with_reputation(mut self, reputation: f64) -> Self {
        self.reputation = Some(reputation);
        self
    }

    /// Reputation used by the value model.
    #[must_use]
    pub fn effective_reputation(&self) -> f64 {
        self.reputation.unwrap_or(DEFAULT_REPUTATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", UserValidationError::EmptyId)]
    #[case(" 3fa85f64-5717-4562-b3fc-2c963f66afa6", UserValidationError::InvalidId)]
    #[case("not-a-uuid", UserValidationError::InvalidId)]
    fn rejects_malformed_ids(#[case] raw: &str, #[case] expected: UserValidationError) {
        assert_eq!(UserId::new(raw), Err(expected));
    }

    #[test]
    fn preserves_original_string_form() {
        let raw = "3FA85F64-5717-4562-B3FC-2C963F66AFA6";
        let id = UserId::new(raw).expect("valid uuid");
        assert_eq!(id.as_ref(), raw);
    }

    #[test]
    fn missing_reputation_uses_default() {
        let profile = UserProfile::new(UserId::random(), "Ada");
        assert!((profile.effective_reputation() - DEFAULT_REPUTATION).abs() < f64::EPSILON);
        let rated = profile.with_reputation(72.0);
        assert!((rated.effective_reputation() - 72.0).abs() < f64::EPSILON);
    }
}
