//! In-process profile cache backed by `dashmap`.
//!
//! Entries expire after a fixed TTL measured with the injected clock, so
//! reputation changes become visible without restarting the service. The
//! swap workflow invalidates both participants when a swap completes.
//!
//! Each user carries an invalidation generation. A fetch that started before
//! an `invalidate` does not store its result, so a profile read before a swap
//! completed cannot outlive the invalidation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use mockable::Clock;
use tracing::debug;

use crate::domain::ports::{ProfileCache, ProfileCacheError, UserProfileRepository};
use crate::domain::{UserId, UserProfile};

/// Default entry lifetime.
pub const DEFAULT_PROFILE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CachedProfile {
    profile: UserProfile,
    expires_at: DateTime<Utc>,
}

/// Read-through [`ProfileCache`] over a [`UserProfileRepository`].
///
/// Only found profiles are cached; unknown users are looked up again on the
/// next request. Invalidation generations are kept per user for the life of
/// the cache.
pub struct DashMapProfileCache<R: ?Sized> {
    source: Arc<R>,
    entries: DashMap<UserId, CachedProfile>,
    generations: DashMap<UserId, u64>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl<R: ?Sized> DashMapProfileCache<R> {
    /// Create an empty cache.
    ///
    /// A TTL too large for `chrono` saturates to the maximum.
    pub fn new(source: Arc<R>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            entries: DashMap::new(),
            generations: DashMap::new(),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
        }
    }

    /// Number of entries currently held, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn fresh(&self, user_id: &UserId, now: DateTime<Utc>) -> Option<UserProfile> {
        let entry = self.entries.get(user_id)?;
        (entry.expires_at > now).then(|| entry.profile.clone())
    }

    fn generation(&self, user_id: &UserId) -> u64 {
        self.generations.get(user_id).map_or(0, |generation| *generation)
    }

    /// Store `entry` unless `user_id` was invalidated after `seen`.
    ///
    /// The generation entry stays locked across the insert; `invalidate` takes
    /// the same lock before removing, so the two cannot interleave.
    fn store_if_current(&self, user_id: &UserId, seen: u64, entry: CachedProfile) -> bool {
        match self.generations.entry(user_id.clone()) {
            Entry::Occupied(current) => {
                if *current.get() != seen {
                    return false;
                }
                self.entries.insert(user_id.clone(), entry);
                drop(current);
            }
            Entry::Vacant(vacant) => {
                if seen != 0 {
                    return false;
                }
                self.entries.insert(user_id.clone(), entry);
                drop(vacant);
            }
        }
        true
    }
}

#[async_trait]
impl<R> ProfileCache for DashMapProfileCache<R>
where
    R: UserProfileRepository + ?Sized,
{
    async fn get_or_fetch(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserProfile>, ProfileCacheError> {
        let now = self.clock.utc();
        if let Some(profile) = self.fresh(user_id, now) {
            return Ok(Some(profile));
        }
        let seen = self.generation(user_id);
        let fetched = self
            .source
            .find_profile(user_id)
            .await
            .map_err(|err| ProfileCacheError::source(err.to_string()))?;
        match &fetched {
            Some(profile) => {
                let expires_at = now
                    .checked_add_signed(self.ttl)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                let stored = self.store_if_current(
                    user_id,
                    seen,
                    CachedProfile {
                        profile: profile.clone(),
                        expires_at,
                    },
                );
                if !stored {
                    debug!(user_id = %user_id, "profile invalidated during fetch; not cached");
                }
            }
            None => {
                self.entries.remove(user_id);
                debug!(user_id = %user_id, "profile not found");
            }
        }
        Ok(fetched)
    }

    fn invalidate(&self, user_id: &UserId) {
        let mut generation = self.generations.entry(user_id.clone()).or_insert(0);
        *generation = generation.wrapping_add(1);
        let removed = self.entries.remove(user_id).is_some();
        drop(generation);
        if removed {
            debug!(user_id = %user_id, "profile cache entry invalidated");
        }
    }
}
