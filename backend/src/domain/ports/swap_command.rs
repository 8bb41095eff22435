//! Driving port for proposing swaps and moving them through their lifecycle.
//!
//! Rejections the user can act on carry a stable `details.code`:
//! `capacity_exceeded`, `duplicate_proposal` (with `existingSwapId`),
//! `skill_mismatch` and `invalid_transition`.

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{Error, FairnessScore, SkillId, SkillRole, Swap, SwapId, SwapTerms, UserId};

/// The skill the proposer selected first, which must not drift before
/// confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockedSkill {
    /// Whether the proposer locked what they teach or what they learn.
    pub role: SkillRole,
    pub skill_id: SkillId,
}

/// Free-form proposal preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalPreferences {
    /// Appended to the stored rationale.
    pub note: Option<String>,
}

/// Request to propose a swap from a chosen match.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposeSwapRequest {
    pub proposer: UserId,
    pub partner: UserId,
    /// Skill the proposer teaches (and the partner learns).
    pub proposer_teaches: SkillId,
    /// Skill the proposer learns (and the partner teaches).
    pub proposer_learns: SkillId,
    pub locked: LockedSkill,
    pub hours_per_week: f64,
    pub preferences: ProposalPreferences,
}

/// Accept, decline, complete or cancel a swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapActionRequest {
    pub swap_id: SwapId,
    pub actor: UserId,
}

/// Counter a swap by asking to learn a different skill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSwapRequest {
    pub swap_id: SwapId,
    pub actor: UserId,
    /// The skill the actor wants to learn instead.
    pub learn_skill_id: SkillId,
}

/// Swap proposal and lifecycle commands.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SwapCommand: Send + Sync {
    /// Validate and persist a new proposal.
    ///
    /// # Errors
    /// `invalid_request` for bad hours or self-swaps, `conflict` for
    /// duplicates and exceeded capacity, `data_integrity` for skill drift or
    /// missing declarations, `service_unavailable` when the store is down.
    async fn propose(&self, request: ProposeSwapRequest) -> Result<Swap, Error>;

    /// Accept the current terms; the last acceptance activates the swap.
    async fn accept(&self, request: SwapActionRequest) -> Result<Swap, Error>;

    /// Decline or withdraw before the swap starts.
    async fn decline(&self, request: SwapActionRequest) -> Result<Swap, Error>;

    /// Ask to learn a different skill from the partner.
    async fn counter(&self, request: CounterSwapRequest) -> Result<Swap, Error>;

    /// Mark an active swap as completed.
    async fn complete(&self, request: SwapActionRequest) -> Result<Swap, Error>;

    /// Cancel a swap.
    async fn cancel(&self, request: SwapActionRequest) -> Result<Swap, Error>;
}

/// Fixture that accepts proposals verbatim and knows no existing swaps.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSwapCommand;

fn unknown_swap(swap_id: SwapId) -> Error {
    Error::not_found(format!("swap {swap_id} not found"))
}

#[async_trait]
impl SwapCommand for FixtureSwapCommand {
    async fn propose(&self, request: ProposeSwapRequest) -> Result<Swap, Error> {
        Ok(Swap::propose(
            SwapId::random(),
            SwapTerms {
                proposer: request.proposer,
                partner: request.partner,
                proposer_teaches: request.proposer_teaches,
                partner_teaches: request.proposer_learns,
                hours_per_week: request.hours_per_week,
                fairness: FairnessScore::PERFECT,
                rationale: String::new(),
            },
            Utc::now(),
        ))
    }

    async fn accept(&self, request: SwapActionRequest) -> Result<Swap, Error> {
        Err(unknown_swap(request.swap_id))
    }

    async fn decline(&self, request: SwapActionRequest) -> Result<Swap, Error> {
        Err(unknown_swap(request.swap_id))
    }

    async fn counter(&self, request: CounterSwapRequest) -> Result<Swap, Error> {
        Err(unknown_swap(request.swap_id))
    }

    async fn complete(&self, request: SwapActionRequest) -> Result<Swap, Error> {
        Err(unknown_swap(request.swap_id))
    }

    async fn cancel(&self, request: SwapActionRequest) -> Result<Swap, Error> {
        Err(unknown_swap(request.swap_id))
    }
}
