//! Port for swap persistence.
//!
//! Writes are guarded: a proposal is inserted (swap plus both participants)
//! only if no open swap exists for the pairing and every capacity check still
//! holds, and a transition is applied only if the stored status still equals
//! the expected one. Both happen inside one atomic store operation.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{NewSwapProposal, SkillId, SkillRole, Swap, SwapId, SwapTransition, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by swap repository adapters.
    pub enum SwapRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "swap repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "swap repository query failed: {message}",
        /// An open swap already covers this pairing.
        DuplicateProposal { existing: Uuid } => "an open swap already exists: {existing}",
        /// A capacity check failed at write time.
        CapacityExceeded { user_id: String, skill_id: String, requested: f64, remaining: f64 } =>
            "user {user_id} has {remaining}h left on skill {skill_id}, {requested}h requested",
        /// The stored status moved on since the swap was read.
        StatusConflict { expected: String, actual: String } =>
            "swap status changed: expected {expected}, found {actual}",
        /// No swap with this id exists.
        NotFound { swap_id: Uuid } => "swap {swap_id} not found",
        /// The store aborted the transaction because of a concurrent write.
        Contention { message: String } => "swap write contended: {message}",
    }
}

/// Hours one active swap commits from a participant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    /// Swap holding the hours.
    pub swap_id: SwapId,
    /// Weekly hours committed.
    pub hours: f64,
}

/// Storage for swaps and their participants.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SwapRepository: Send + Sync {
    /// Hours committed by `user_id` on `skill_id` in `role` across active
    /// swaps (teaching hours for `teach`, learning hours for `learn`).
    async fn active_allocations(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        role: SkillRole,
    ) -> Result<Vec<Allocation>, SwapRepositoryError>;

    /// Skills `user_id` is currently learning in an active swap.
    async fn skills_actively_learning(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SkillId>, SwapRepositoryError>;

    /// An open swap where `first` teaches `first_teaches` and `second`
    /// teaches `second_teaches`, in either seat order.
    async fn find_open_swap(
        &self,
        first: &UserId,
        first_teaches: &SkillId,
        second: &UserId,
        second_teaches: &SkillId,
    ) -> Result<Option<SwapId>, SwapRepositoryError>;

    /// Atomically insert a proposal after re-running the duplicate and
    /// capacity checks.
    async fn create_proposal(&self, proposal: &NewSwapProposal)
    -> Result<Swap, SwapRepositoryError>;

    /// Fetch a swap by id.
    async fn find_swap(&self, swap_id: &SwapId) -> Result<Option<Swap>, SwapRepositoryError>;

    /// Compare-and-set a transition: the open-pair duplicate re-check,
    /// capacity checks, profile credits and the status write all apply
    /// together or not at all.
    async fn apply_transition(
        &self,
        transition: &SwapTransition,
    ) -> Result<Swap, SwapRepositoryError>;
}

/// Fixture implementation with no swaps that accepts every write.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSwapRepository;

#[async_trait]
impl SwapRepository for FixtureSwapRepository {
    async fn active_allocations(
        &self,
        _user_id: &UserId,
        _skill_id: &SkillId,
        _role: SkillRole,
    ) -> Result<Vec<Allocation>, SwapRepositoryError> {
        Ok(Vec::new())
    }

    async fn skills_actively_learning(
        &self,
        _user_id: &UserId,
    ) -> Result<Vec<SkillId>, SwapRepositoryError> {
        Ok(Vec::new())
    }

    async fn find_open_swap(
        &self,
        _first: &UserId,
        _first_teaches: &SkillId,
        _second: &UserId,
        _second_teaches: &SkillId,
    ) -> Result<Option<SwapId>, SwapRepositoryError> {
        Ok(None)
    }

    async fn create_proposal(
        &self,
        proposal: &NewSwapProposal,
    ) -> Result<Swap, SwapRepositoryError> {
        Ok(proposal.swap.clone())
    }

    async fn find_swap(&self, _swap_id: &SwapId) -> Result<Option<Swap>, SwapRepositoryError> {
        Ok(None)
    }

    async fn apply_transition(
        &self,
        transition: &SwapTransition,
    ) -> Result<Swap, SwapRepositoryError> {
        Ok(transition.swap.clone())
    }
}
