//! Driving port for capacity reports.

use async_trait::async_trait;

use crate::domain::{Capacity, Error, SkillId, SkillRole, UserId};

/// Read a user's remaining weekly capacity on a skill.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CapacityQuery: Send + Sync {
    /// Remaining capacity for (user, skill, role).
    ///
    /// # Errors
    /// Returns [`crate::domain::ErrorCode::ServiceUnavailable`] when the
    /// lookup fails and the ledger is configured to fail closed.
    async fn remaining_capacity(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        role: SkillRole,
    ) -> Result<Capacity, Error>;
}

/// Fixture reporting unlimited capacity everywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCapacityQuery;

#[async_trait]
impl CapacityQuery for FixtureCapacityQuery {
    async fn remaining_capacity(
        &self,
        _user_id: &UserId,
        _skill_id: &SkillId,
        _role: SkillRole,
    ) -> Result<Capacity, Error> {
        Ok(Capacity::Unlimited)
    }
}
