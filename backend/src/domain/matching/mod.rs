//! Match browsing: the exact-skill fairness matcher plus capacity gating, and
//! the separate fuzzy discovery strategy.

mod discovery;
mod finder;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

pub use discovery::{
    DiscoveryReason, DiscoverySuggestion, NAME_OVERLAP_RELEVANCE, SAME_CATEGORY_RELEVANCE,
    relevance, suggest,
};
pub use finder::{CandidateMatch, MatchFinder};

use crate::domain::ports::{
    MatchQuery, ProfileCache, SkillRepository, SkillRepositoryError, SwapRepository,
    SwapRepositoryError,
};
use crate::domain::{
    Capacity, CapacityLedger, DEFAULT_FAIRNESS_THRESHOLD, Error, SkillId, SkillRole, UserId,
    UserProfile,
};

/// Tunables for match browsing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchingPolicy {
    /// Pairs below this fairness are discarded.
    pub fairness_threshold: u8,
    /// Both teaching sides need at least this many free hours a week.
    pub min_capacity_hours: f64,
    /// Result cap for matches and suggestions.
    pub max_matches: usize,
    /// Stand-in for unlimited capacity when reporting joint hours.
    pub unlimited_hours_ceiling: f64,
}

impl Default for MatchingPolicy {
    fn default() -> Self {
        Self {
            fairness_threshold: DEFAULT_FAIRNESS_THRESHOLD,
            min_capacity_hours: 0.5,
            max_matches: 20,
            unlimited_hours_ceiling: 10.0,
        }
    }
}

/// A fairness match that passed the capacity gate.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedMatch {
    pub candidate: CandidateMatch,
    pub caller_capacity: Capacity,
    pub partner_capacity: Capacity,
    /// Most weekly hours both sides could currently commit.
    pub max_joint_hours: f64,
}

#[derive(Debug, thiserror::Error)]
enum BrowseError {
    #[error(transparent)]
    Skills(#[from] SkillRepositoryError),
    #[error(transparent)]
    Swaps(#[from] SwapRepositoryError),
}

/// Match browsing service implementing [`MatchQuery`].
pub struct MatchingService<S: ?Sized, W: ?Sized, C: ?Sized> {
    skills: Arc<S>,
    swaps: Arc<W>,
    profiles: Arc<C>,
    ledger: CapacityLedger<S, W>,
    policy: MatchingPolicy,
}

impl<S: ?Sized, W: ?Sized, C: ?Sized> MatchingService<S, W, C> {
    /// Create the service. The ledger should share the same repositories.
    pub fn new(
        skills: Arc<S>,
        swaps: Arc<W>,
        profiles: Arc<C>,
        ledger: CapacityLedger<S, W>,
        policy: MatchingPolicy,
    ) -> Self {
        Self {
            skills,
            swaps,
            profiles,
            ledger,
            policy,
        }
    }
}

type CapacityMemo = HashMap<(UserId, SkillId), Option<Capacity>>;

impl<S, W, C> MatchingService<S, W, C>
where
    S: SkillRepository + ?Sized,
    W: SwapRepository + ?Sized,
    C: ProfileCache + ?Sized,
{
    async fn caller_profile(&self, user_id: &UserId) -> UserProfile {
        match self.profiles.get_or_fetch(user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => UserProfile::new(user_id.clone(), String::new()),
            Err(err) => {
                debug!(user_id = %user_id, error = %err, "caller profile unavailable");
                UserProfile::new(user_id.clone(), String::new())
            }
        }
    }

    async fn browse(&self, user_id: &UserId) -> Result<Vec<RankedMatch>, BrowseError> {
        let caller = self.caller_profile(user_id).await;
        let teaching = self
            .skills
            .list_user_skills(user_id, SkillRole::Teach)
            .await?;
        let mut learning = self
            .skills
            .list_user_skills(user_id, SkillRole::Learn)
            .await?;
        let in_progress = self.swaps.skills_actively_learning(user_id).await?;
        learning.retain(|wish| !in_progress.contains(&wish.skill_id()));

        let finder = MatchFinder::new(
            self.skills.as_ref(),
            self.profiles.as_ref(),
            self.policy.fairness_threshold,
        );
        let candidates = finder.find_matches(&caller, &teaching, &learning).await?;

        let mut memo = CapacityMemo::new();
        let mut ranked = Vec::new();
        for candidate in candidates {
            if ranked.len() == self.policy.max_matches {
                break;
            }
            let caller_capacity = self
                .teaching_capacity(&mut memo, user_id, candidate.caller_teaches.skill_id())
                .await;
            let partner_capacity = self
                .teaching_capacity(
                    &mut memo,
                    &candidate.partner_id,
                    candidate.partner_teaches.skill_id(),
                )
                .await;
            let (Some(caller_capacity), Some(partner_capacity)) =
                (caller_capacity, partner_capacity)
            else {
                continue;
            };
            if !self.has_room(&caller_capacity) || !self.has_room(&partner_capacity) {
                continue;
            }
            let ceiling = self.policy.unlimited_hours_ceiling;
            let max_joint_hours = caller_capacity
                .bounded_remaining(ceiling)
                .min(partner_capacity.bounded_remaining(ceiling));
            ranked.push(RankedMatch {
                candidate,
                caller_capacity,
                partner_capacity,
                max_joint_hours,
            });
        }
        info!(user_id = %user_id, matches = ranked.len(), "browsed matches");
        Ok(ranked)
    }

    fn has_room(&self, capacity: &Capacity) -> bool {
        capacity.remaining_hours() >= self.policy.min_capacity_hours
    }

    /// Memoised teaching capacity; `None` when the lookup failed.
    async fn teaching_capacity(
        &self,
        memo: &mut CapacityMemo,
        user_id: &UserId,
        skill_id: SkillId,
    ) -> Option<Capacity> {
        let key = (user_id.clone(), skill_id);
        if let Some(known) = memo.get(&key) {
            return *known;
        }
        let capacity = match self
            .ledger
            .remaining_capacity(user_id, &skill_id, SkillRole::Teach)
            .await
        {
            Ok(capacity) => Some(capacity),
            Err(err) => {
                debug!(
                    user_id = %user_id,
                    skill_id = %skill_id,
                    error = %err,
                    "dropping match without a known capacity"
                );
                None
            }
        };
        memo.insert(key, capacity);
        capacity
    }

    async fn discover_related(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<DiscoverySuggestion>, BrowseError> {
        let wishes = self
            .skills
            .list_user_skills(user_id, SkillRole::Learn)
            .await?;
        if wishes.is_empty() {
            return Ok(Vec::new());
        }
        let offers = self.skills.list_teaching_offers(user_id).await?;
        Ok(suggest(&wishes, &offers, self.policy.max_matches))
    }
}

#[async_trait]
impl<S, W, C> MatchQuery for MatchingService<S, W, C>
where
    S: SkillRepository + ?Sized,
    W: SwapRepository + ?Sized,
    C: ProfileCache + ?Sized,
{
    async fn browse_matches(&self, user_id: &UserId) -> Result<Vec<RankedMatch>, Error> {
        match self.browse(user_id).await {
            Ok(matches) => Ok(matches),
            Err(err) => {
                error!(user_id = %user_id, error = %err, "match browsing failed");
                Ok(Vec::new())
            }
        }
    }

    async fn discover(&self, user_id: &UserId) -> Result<Vec<DiscoverySuggestion>, Error> {
        match self.discover_related(user_id).await {
            Ok(suggestions) => Ok(suggestions),
            Err(err) => {
                error!(user_id = %user_id, error = %err, "discovery failed");
                Ok(Vec::new())
            }
        }
    }
}
