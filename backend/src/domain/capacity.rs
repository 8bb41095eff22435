//! Capacity ledger.
//!
//! A user's remaining capacity on a (skill, role) is their declared weekly
//! hours minus the hours already committed in active swaps. A missing or zero
//! declaration means unlimited. Proposed, cancelled and completed swaps never
//! count as allocated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::json;
use tracing::{debug, warn};

use crate::domain::ports::{
    CapacityQuery, SkillRepository, SkillRepositoryError, SwapRepository, SwapRepositoryError,
};
use crate::domain::{Error, SkillId, SkillRole, UserId, UserSkill};

/// Tolerance used when comparing hour sums.
pub const HOURS_EPSILON: f64 = 1e-9;
/// Default per-lookup timeout.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Remaining weekly capacity on one (user, skill, role).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Capacity {
    /// No cap was declared.
    Unlimited,
    /// A declared cap and the hours already committed against it.
    Limited {
        /// Declared weekly hours.
        total_hours: f64,
        /// Hours committed in active swaps.
        allocated_hours: f64,
    },
}

impl Capacity {
    /// Build from a declared cap (`None` meaning unlimited) and committed
    /// hours.
    #[must_use]
    pub fn from_declaration(weekly_cap: Option<f64>, allocated_hours: f64) -> Self {
        match weekly_cap {
            Some(total_hours) => Self::Limited {
                total_hours,
                allocated_hours: allocated_hours.max(0.0),
            },
            None => Self::Unlimited,
        }
    }

    /// Whether no cap was declared.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Declared cap, if any.
    #[must_use]
    pub const fn total_hours(&self) -> Option<f64> {
        match self {
            Self::Unlimited => None,
            Self::Limited { total_hours, .. } => Some(*total_hours),
        }
    }

    /// Hours already committed; zero when unlimited.
    #[must_use]
    pub const fn allocated_hours(&self) -> f64 {
        match self {
            Self::Unlimited => 0.0,
            Self::Limited {
                allocated_hours, ..
            } => *allocated_hours,
        }
    }

    /// Hours still free; never negative, infinite when unlimited.
    #[must_use]
    pub fn remaining_hours(&self) -> f64 {
        match self {
            Self::Unlimited => f64::INFINITY,
            Self::Limited {
                total_hours,
                allocated_hours,
            } => (total_hours - allocated_hours).max(0.0),
        }
    }

    /// Whether a capped declaration has no hours left.
    #[must_use]
    pub fn is_fully_booked(&self) -> bool {
        !self.is_unlimited() && self.remaining_hours() <= HOURS_EPSILON
    }

    /// Whether some hours are committed but not all.
    #[must_use]
    pub fn is_partially_booked(&self) -> bool {
        self.allocated_hours() > 0.0 && !self.is_fully_booked()
    }

    /// Whether `hours` more can be committed.
    #[must_use]
    pub fn can_allocate(&self, hours: f64) -> bool {
        hours <= self.remaining_hours() + HOURS_EPSILON
    }

    /// Remaining hours with unlimited shown as `ceiling`.
    #[must_use]
    pub fn bounded_remaining(&self, ceiling: f64) -> f64 {
        if self.is_unlimited() {
            ceiling
        } else {
            self.remaining_hours()
        }
    }
}

/// What to do when a capacity lookup fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupFailurePolicy {
    /// Treat the capacity as unlimited and log a warning.
    #[default]
    FailOpen,
    /// Surface the failure to the caller.
    FailClosed,
}

/// Ledger settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityPolicy {
    /// Behaviour when a declaration or allocation lookup fails.
    pub on_lookup_failure: LookupFailurePolicy,
    /// Upper bound on each lookup.
    pub lookup_timeout: Duration,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self {
            on_lookup_failure: LookupFailurePolicy::FailOpen,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }
}

/// Why a capacity lookup failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CapacityLookupError {
    /// Reading the declaration failed.
    #[error(transparent)]
    Skills(#[from] SkillRepositoryError),
    /// Summing active allocations failed.
    #[error(transparent)]
    Swaps(#[from] SwapRepositoryError),
    /// A lookup exceeded the policy timeout.
    #[error("capacity lookup timed out after {0:?}")]
    TimedOut(Duration),
}

/// Computes remaining capacity from declarations and active allocations.
pub struct CapacityLedger<S: ?Sized, W: ?Sized> {
    skills: Arc<S>,
    swaps: Arc<W>,
    policy: CapacityPolicy,
}

impl<S: ?Sized, W: ?Sized> Clone for CapacityLedger<S, W> {
    fn clone(&self) -> Self {
        Self {
            skills: Arc::clone(&self.skills),
            swaps: Arc::clone(&self.swaps),
            policy: self.policy,
        }
    }
}

impl<S: ?Sized, W: ?Sized> CapacityLedger<S, W> {
    /// Create a ledger over the given repositories.
    pub fn new(skills: Arc<S>, swaps: Arc<W>, policy: CapacityPolicy) -> Self {
        Self {
            skills,
            swaps,
            policy,
        }
    }

    /// Active policy.
    #[must_use]
    pub const fn policy(&self) -> CapacityPolicy {
        self.policy
    }
}

impl<S, W> CapacityLedger<S, W>
where
    S: SkillRepository + ?Sized,
    W: SwapRepository + ?Sized,
{
    /// Remaining capacity for (user, skill, role), honouring the failure
    /// policy.
    ///
    /// # Errors
    /// Only under [`LookupFailurePolicy::FailClosed`], when a lookup fails or
    /// times out.
    pub async fn remaining_capacity(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        role: SkillRole,
    ) -> Result<Capacity, CapacityLookupError> {
        match self.lookup(user_id, skill_id, role).await {
            Ok(capacity) => Ok(capacity),
            Err(error) => match self.policy.on_lookup_failure {
                LookupFailurePolicy::FailOpen => {
                    warn!(
                        user_id = %user_id,
                        skill_id = %skill_id,
                        role = %role,
                        error = %error,
                        "capacity lookup failed; treating capacity as unlimited"
                    );
                    Ok(Capacity::Unlimited)
                }
                LookupFailurePolicy::FailClosed => Err(error),
            },
        }
    }

    /// Capacity for each of `user_skills`, keyed by skill id. Lookups run
    /// concurrently.
    ///
    /// # Errors
    /// The first failed lookup under [`LookupFailurePolicy::FailClosed`].
    pub async fn remaining_capacities(
        &self,
        user_id: &UserId,
        user_skills: &[UserSkill],
        role: SkillRole,
    ) -> Result<HashMap<SkillId, Capacity>, CapacityLookupError> {
        let lookups = user_skills.iter().map(|user_skill| async move {
            let skill_id = user_skill.skill_id();
            self.remaining_capacity(user_id, &skill_id, role)
                .await
                .map(|capacity| (skill_id, capacity))
        });
        join_all(lookups).await.into_iter().collect()
    }

    async fn lookup(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        role: SkillRole,
    ) -> Result<Capacity, CapacityLookupError> {
        let timeout = self.policy.lookup_timeout;
        let declaration = tokio::time::timeout(
            timeout,
            self.skills.find_active_user_skill(user_id, skill_id, role),
        )
        .await
        .map_err(|_| CapacityLookupError::TimedOut(timeout))??;

        let Some(weekly_cap) = declaration.as_ref().and_then(UserSkill::weekly_cap) else {
            return Ok(Capacity::Unlimited);
        };

        let allocations = tokio::time::timeout(
            timeout,
            self.swaps.active_allocations(user_id, skill_id, role),
        )
        .await
        .map_err(|_| CapacityLookupError::TimedOut(timeout))??;
        let allocated: f64 = allocations.iter().map(|allocation| allocation.hours).sum();
        debug!(
            user_id = %user_id,
            skill_id = %skill_id,
            role = %role,
            weekly_cap,
            allocated,
            "computed capacity"
        );
        Ok(Capacity::from_declaration(Some(weekly_cap), allocated))
    }
}

#[async_trait]
impl<S, W> CapacityQuery for CapacityLedger<S, W>
where
    S: SkillRepository + ?Sized,
    W: SwapRepository + ?Sized,
{
    async fn remaining_capacity(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        role: SkillRole,
    ) -> Result<Capacity, Error> {
        Self::remaining_capacity(self, user_id, skill_id, role)
            .await
            .map_err(|err| {
                Error::service_unavailable("capacity could not be determined").with_details(
                    json!({ "code": "capacity_unavailable", "reason": err.to_string() }),
                )
            })
    }
}

#[cfg(test)]
#[path = "capacity_tests.rs"]
mod tests;
