//! Driving port for browsing matches and discovery suggestions.
//!
//! Browsing is best effort: store failures are logged and surface as an
//! empty list rather than an error.

use async_trait::async_trait;

use crate::domain::{DiscoverySuggestion, Error, RankedMatch, UserId};

/// Read-only match browsing for a user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchQuery: Send + Sync {
    /// Capacity-gated fairness matches, best first.
    async fn browse_matches(&self, user_id: &UserId) -> Result<Vec<RankedMatch>, Error>;

    /// Related-skill suggestions, most relevant first.
    async fn discover(&self, user_id: &UserId) -> Result<Vec<DiscoverySuggestion>, Error>;
}

/// Fixture that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureMatchQuery;

#[async_trait]
impl MatchQuery for FixtureMatchQuery {
    async fn browse_matches(&self, _user_id: &UserId) -> Result<Vec<RankedMatch>, Error> {
        Ok(Vec::new())
    }

    async fn discover(&self, _user_id: &UserId) -> Result<Vec<DiscoverySuggestion>, Error> {
        Ok(Vec::new())
    }
}
