//! Port for the user profile cache.
//!
//! Matching reads the caller's and every candidate's reputation; the cache
//! keeps those reads off the store. Entries are dropped with
//! [`ProfileCache::invalidate`] whenever a profile's counters change.

use async_trait::async_trait;

use crate::domain::{UserId, UserProfile};

use super::define_port_error;

define_port_error! {
    /// Errors raised while filling the cache.
    pub enum ProfileCacheError {
        /// The backing profile source failed.
        Source { message: String } => "profile source failed: {message}",
    }
}

/// Read-through profile cache.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileCache: Send + Sync {
    /// Return the cached profile, fetching and caching it on a miss.
    async fn get_or_fetch(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserProfile>, ProfileCacheError>;

    /// Drop the cached entry for `user_id`.
    fn invalidate(&self, user_id: &UserId);
}

/// Fixture cache that never holds a profile.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureProfileCache;

#[async_trait]
impl ProfileCache for FixtureProfileCache {
    async fn get_or_fetch(
        &self,
        _user_id: &UserId,
    ) -> Result<Option<UserProfile>, ProfileCacheError> {
        Ok(None)
    }

    fn invalidate(&self, _user_id: &UserId) {}
}
