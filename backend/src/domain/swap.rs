//! Swap agreements and their lifecycle.
//!
//! A [`Swap`] pairs exactly two users, each teaching the other one skill. The
//! state machine is:
//!
//! ```text
//! proposed ─┬─ accept (first) ─▶ accepted ─┐
//!           ├─ counter ────────▶ countered ├─ accept (last) ─▶ active ─┬─ complete ─▶ completed
//!           └─ decline/cancel ─▶ cancelled ┘                           └─ cancel ───▶ cancelled
//! ```
//!
//! Transitions here are pure: they mutate an in-memory copy. Persisting a
//! transition is a compare-and-set on the previous status, performed by the
//! swap repository together with any capacity re-validation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{FairnessScore, ParseEnumError, SkillId, UserId};

/// Identifier of a [`Swap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwapId(Uuid);

impl SwapId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap a UUID read from storage.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SwapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SwapId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle state of a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    Proposed,
    /// One participant has accepted.
    Accepted,
    /// A participant asked to learn a different skill.
    Countered,
    Active,
    Completed,
    Cancelled,
}

impl SwapStatus {
    /// States that block a second proposal for the same pairing.
    pub const OPEN: [Self; 4] = [Self::Proposed, Self::Accepted, Self::Countered, Self::Active];

    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Accepted => "accepted",
            Self::Countered => "countered",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// `completed` and `cancelled` have no outgoing edges.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Still being negotiated.
    #[must_use]
    pub const fn is_negotiating(self) -> bool {
        matches!(self, Self::Proposed | Self::Accepted | Self::Countered)
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwapStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proposed" => Ok(Self::Proposed),
            "accepted" => Ok(Self::Accepted),
            "countered" => Ok(Self::Countered),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseEnumError::new("swap status", s)),
        }
    }
}

/// Participant-initiated lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapAction {
    Accept,
    Decline,
    Counter,
    Complete,
    Cancel,
}

impl SwapAction {
    /// Verb used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Decline => "decline",
            Self::Counter => "counter",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for SwapAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a lifecycle event is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SwapTransitionError {
    /// The actor is not one of the two participants.
    #[error("user is not a participant in this swap")]
    NotParticipant,
    /// The action has no edge from the current status.
    #[error("cannot {action} a swap that is {from}")]
    InvalidTransition { from: SwapStatus, action: SwapAction },
    /// The actor already accepted the current terms.
    #[error("participant has already accepted this swap")]
    AlreadyAccepted,
    /// A counter must ask for a different skill.
    #[error("counter-proposal must request a different skill")]
    UnchangedCounter,
    /// A counter would have the actor learn the skill they teach.
    #[error("a participant cannot teach and learn the same skill")]
    SameSkillExchange,
}

/// One side of a swap.
///
/// Hours are symmetric across the pair: this side's teaching hours equal the
/// other side's learning hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapParticipant {
    pub user_id: UserId,
    pub teaching_skill_id: SkillId,
    pub learning_skill_id: SkillId,
    pub teaching_hours_per_week: f64,
    pub learning_hours_per_week: f64,
    pub accepted: bool,
}

/// A bilateral skill exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swap {
    pub id: SwapId,
    pub status: SwapStatus,
    /// Fairness snapshotted when the terms were last set.
    pub fairness: FairnessScore,
    pub rationale: String,
    /// Proposer first, partner second.
    pub participants: [SwapParticipant; 2],
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Terms of a new proposal, as seen from the proposer.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapTerms {
    pub proposer: UserId,
    pub partner: UserId,
    pub proposer_teaches: SkillId,
    pub partner_teaches: SkillId,
    pub hours_per_week: f64,
    pub fairness: FairnessScore,
    pub rationale: String,
}

impl Swap {
    /// Build a freshly proposed swap; nobody has accepted yet.
    #[must_use]
    pub fn propose(id: SwapId, terms: SwapTerms, now: DateTime<Utc>) -> Self {
        let hours = terms.hours_per_week;
        let side = |user_id: UserId, teaches: SkillId, learns: SkillId| SwapParticipant {
            user_id,
            teaching_skill_id: teaches,
            learning_skill_id: learns,
            teaching_hours_per_week: hours,
            learning_hours_per_week: hours,
            accepted: false,
        };
        Self {
            id,
            status: SwapStatus::Proposed,
            fairness: terms.fairness,
            rationale: terms.rationale,
            participants: [
                side(terms.proposer, terms.proposer_teaches, terms.partner_teaches),
                side(terms.partner, terms.partner_teaches, terms.proposer_teaches),
            ],
            created_at: now,
            updated_at: now,
        }
    }

    fn seat(&self, actor: &UserId) -> Result<&SwapParticipant, SwapTransitionError> {
        self.participant(actor)
            .ok_or(SwapTransitionError::NotParticipant)
    }

    /// The actor's record and the other side's, both mutable.
    fn sides_mut(
        &mut self,
        actor: &UserId,
    ) -> Result<(&mut SwapParticipant, &mut SwapParticipant), SwapTransitionError> {
        let [first, second] = &mut self.participants;
        if &first.user_id == actor {
            Ok((first, second))
        } else if &second.user_id == actor {
            Ok((second, first))
        } else {
            Err(SwapTransitionError::NotParticipant)
        }
    }

    /// The actor's own participant record.
    #[must_use]
    pub fn participant(&self, user_id: &UserId) -> Option<&SwapParticipant> {
        self.participants.iter().find(|p| &p.user_id == user_id)
    }

    /// The other side of the swap from `user_id`'s point of view.
    #[must_use]
    pub fn counterpart(&self, user_id: &UserId) -> Option<&SwapParticipant> {
        self.seat(user_id).ok()?;
        self.participants.iter().find(|p| &p.user_id != user_id)
    }

    /// Whether `user_id` takes part in this swap.
    #[must_use]
    pub fn involves(&self, user_id: &UserId) -> bool {
        self.participant(user_id).is_some()
    }

    fn require(&self, action: SwapAction, allowed: bool) -> Result<(), SwapTransitionError> {
        if allowed {
            Ok(())
        } else {
            Err(SwapTransitionError::InvalidTransition {
                from: self.status,
                action,
            })
        }
    }

    /// Record the actor's acceptance. The swap becomes active once both sides
    /// have accepted the current terms.
    ///
    /// # Errors
    /// Fails for non-participants, outside negotiation, or on a repeat accept.
    pub fn accept(&mut self, actor: &UserId, now: DateTime<Utc>) -> Result<(), SwapTransitionError> {
        self.seat(actor)?;
        self.require(SwapAction::Accept, self.status.is_negotiating())?;
        let (own, other) = self.sides_mut(actor)?;
        if own.accepted {
            return Err(SwapTransitionError::AlreadyAccepted);
        }
        own.accepted = true;
        let both_accepted = other.accepted;
        self.status = if both_accepted {
            SwapStatus::Active
        } else {
            SwapStatus::Accepted
        };
        self.updated_at = now;
        Ok(())
    }

    /// Ask to learn `learning_skill_id` instead; the other side now teaches
    /// it. Both acceptances reset.
    ///
    /// The caller rescores the new pairing with [`Swap::rescore`].
    ///
    /// # Errors
    /// Fails for non-participants, outside negotiation, or when the skill is
    /// unchanged.
    pub fn counter(
        &mut self,
        actor: &UserId,
        learning_skill_id: SkillId,
        now: DateTime<Utc>,
    ) -> Result<(), SwapTransitionError> {
        self.seat(actor)?;
        self.require(SwapAction::Counter, self.status.is_negotiating())?;
        let (own, other) = self.sides_mut(actor)?;
        if own.learning_skill_id == learning_skill_id {
            return Err(SwapTransitionError::UnchangedCounter);
        }
        if own.teaching_skill_id == learning_skill_id {
            return Err(SwapTransitionError::SameSkillExchange);
        }
        own.learning_skill_id = learning_skill_id;
        other.teaching_skill_id = learning_skill_id;
        own.accepted = false;
        other.accepted = false;
        self.status = SwapStatus::Countered;
        self.updated_at = now;
        Ok(())
    }

    /// Replace the fairness snapshot after the terms changed.
    pub fn rescore(&mut self, fairness: FairnessScore, rationale: String) {
        self.fairness = fairness;
        self.rationale = rationale;
    }

    /// Decline or withdraw before the swap starts.
    ///
    /// # Errors
    /// Fails for non-participants or once the swap is active.
    pub fn decline(&mut self, actor: &UserId, now: DateTime<Utc>) -> Result<(), SwapTransitionError> {
        self.seat(actor)?;
        self.require(SwapAction::Decline, self.status.is_negotiating())?;
        self.status = SwapStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// Mark an active swap as completed.
    ///
    /// # Errors
    /// Fails for non-participants or when the swap is not active.
    pub fn complete(&mut self, actor: &UserId, now: DateTime<Utc>) -> Result<(), SwapTransitionError> {
        self.seat(actor)?;
        self.require(SwapAction::Complete, self.status == SwapStatus::Active)?;
        self.status = SwapStatus::Completed;
        self.updated_at = now;
        Ok(())
    }

    /// Cancel a swap that has not reached a terminal state.
    ///
    /// # Errors
    /// Fails for non-participants or terminal swaps.
    pub fn cancel(&mut self, actor: &UserId, now: DateTime<Utc>) -> Result<(), SwapTransitionError> {
        self.seat(actor)?;
        self.require(SwapAction::Cancel, !self.status.is_terminal())?;
        self.status = SwapStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    /// Capacity each side needs for its teaching commitment.
    #[must_use]
    pub fn teaching_commitments(&self) -> Vec<CapacityCheck> {
        self.participants
            .iter()
            .map(|p| CapacityCheck {
                user_id: p.user_id.clone(),
                skill_id: p.teaching_skill_id,
                requested_hours: p.teaching_hours_per_week,
            })
            .collect()
    }

    /// Profile credits granted when the swap completes.
    #[must_use]
    pub fn completion_credits(&self) -> Vec<CompletionCredit> {
        self.participants
            .iter()
            .map(|p| CompletionCredit {
                user_id: p.user_id.clone(),
                hours_taught: p.teaching_hours_per_week,
                hours_learned: p.learning_hours_per_week,
            })
            .collect()
    }
}

/// Hours a user must still have free on a teaching skill for a write to
/// succeed.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityCheck {
    pub user_id: UserId,
    pub skill_id: SkillId,
    pub requested_hours: f64,
}

/// Counter increments applied to a profile on completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionCredit {
    pub user_id: UserId,
    pub hours_taught: f64,
    pub hours_learned: f64,
}

/// A proposal ready to persist.
///
/// The store inserts the swap and both participants atomically, after
/// re-checking that no open swap exists for the pairing and that every
/// capacity check still holds.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSwapProposal {
    pub swap: Swap,
    pub capacity_checks: Vec<CapacityCheck>,
}

/// A lifecycle change ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapTransition {
    /// The swap after the change.
    pub swap: Swap,
    /// Status the stored row must still have.
    pub expected_status: SwapStatus,
    pub capacity_checks: Vec<CapacityCheck>,
    pub completion_credits: Vec<CompletionCredit>,
    /// The skill pair changed, so no other open swap may hold the new pair.
    pub recheck_open_duplicates: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    struct Pair {
        ada: UserId,
        bo: UserId,
        pottery: SkillId,
        guitar: SkillId,
    }

    #[fixture]
    fn pair() -> Pair {
        Pair {
            ada: UserId::random(),
            bo: UserId::random(),
            pottery: SkillId::random(),
            guitar: SkillId::random(),
        }
    }

    fn proposed(pair: &Pair) -> Swap {
        Swap::propose(
            SwapId::random(),
            SwapTerms {
                proposer: pair.ada.clone(),
                partner: pair.bo.clone(),
                proposer_teaches: pair.pottery,
                partner_teaches: pair.guitar,
                hours_per_week: 2.0,
                fairness: FairnessScore::new(88),
                rationale: "Good match".to_owned(),
            },
            Utc::now(),
        )
    }

    #[rstest]
    fn proposal_links_symmetric_participants(pair: Pair) {
        let swap = proposed(&pair);
        let [ada, bo] = &swap.participants;
        assert_eq!(swap.status, SwapStatus::Proposed);
        assert_eq!(ada.teaching_skill_id, bo.learning_skill_id);
        assert_eq!(bo.teaching_skill_id, ada.learning_skill_id);
        assert!((ada.teaching_hours_per_week - bo.learning_hours_per_week).abs() < f64::EPSILON);
        assert!(!ada.accepted && !bo.accepted);
    }

    #[rstest]
    fn both_acceptances_activate(pair: Pair) {
        let mut swap = proposed(&pair);
        swap.accept(&pair.bo, Utc::now()).expect("first accept");
        assert_eq!(swap.status, SwapStatus::Accepted);
        swap.accept(&pair.ada, Utc::now()).expect("second accept");
        assert_eq!(swap.status, SwapStatus::Active);
    }

    #[rstest]
    fn repeat_accept_is_rejected(pair: Pair) {
        let mut swap = proposed(&pair);
        swap.accept(&pair.bo, Utc::now()).expect("first accept");
        assert_eq!(
            swap.accept(&pair.bo, Utc::now()),
            Err(SwapTransitionError::AlreadyAccepted)
        );
    }

    #[rstest]
    fn strangers_cannot_act(pair: Pair) {
        let mut swap = proposed(&pair);
        let stranger = UserId::random();
        assert_eq!(
            swap.decline(&stranger, Utc::now()),
            Err(SwapTransitionError::NotParticipant)
        );
        assert_eq!(swap.status, SwapStatus::Proposed);
    }

    #[rstest]
    fn counter_swaps_skills_and_resets_acceptance(pair: Pair) {
        let mut swap = proposed(&pair);
        swap.accept(&pair.ada, Utc::now()).expect("accept");
        let welsh = SkillId::random();
        swap.counter(&pair.ada, welsh, Utc::now()).expect("counter");

        assert_eq!(swap.status, SwapStatus::Countered);
        let ada = swap.participant(&pair.ada).expect("ada seat");
        let bo = swap.counterpart(&pair.ada).expect("bo seat");
        assert_eq!(ada.learning_skill_id, welsh);
        assert_eq!(bo.teaching_skill_id, welsh);
        assert!(swap.participants.iter().all(|p| !p.accepted));
    }

    #[rstest]
    fn counter_must_change_the_skill(pair: Pair) {
        let mut swap = proposed(&pair);
        assert_eq!(
            swap.counter(&pair.ada, pair.guitar, Utc::now()),
            Err(SwapTransitionError::UnchangedCounter)
        );
    }

    #[rstest]
    fn counter_cannot_learn_the_taught_skill(pair: Pair) {
        let mut swap = proposed(&pair);
        assert_eq!(
            swap.counter(&pair.ada, pair.pottery, Utc::now()),
            Err(SwapTransitionError::SameSkillExchange)
        );
        assert_eq!(swap.status, SwapStatus::Proposed);
        let ada = swap.participant(&pair.ada).expect("ada seat");
        assert_ne!(ada.teaching_skill_id, ada.learning_skill_id);
    }

    #[rstest]
    fn decline_is_only_allowed_before_activation(pair: Pair) {
        let mut swap = proposed(&pair);
        swap.accept(&pair.ada, Utc::now()).expect("accept");
        swap.accept(&pair.bo, Utc::now()).expect("accept");
        assert_eq!(
            swap.decline(&pair.bo, Utc::now()),
            Err(SwapTransitionError::InvalidTransition {
                from: SwapStatus::Active,
                action: SwapAction::Decline,
            })
        );
        swap.cancel(&pair.bo, Utc::now()).expect("active swaps may be cancelled");
        assert_eq!(swap.status, SwapStatus::Cancelled);
    }

    #[rstest]
    #[case(SwapStatus::Completed)]
    #[case(SwapStatus::Cancelled)]
    fn terminal_states_have_no_exits(pair: Pair, #[case] terminal: SwapStatus) {
        let mut swap = proposed(&pair);
        swap.status = terminal;
        assert!(swap.accept(&pair.ada, Utc::now()).is_err());
        assert!(swap.counter(&pair.ada, SkillId::random(), Utc::now()).is_err());
        assert!(swap.decline(&pair.ada, Utc::now()).is_err());
        assert!(swap.complete(&pair.ada, Utc::now()).is_err());
        assert!(swap.cancel(&pair.ada, Utc::now()).is_err());
        assert_eq!(swap.status, terminal);
    }

    #[rstest]
    fn completion_requires_active(pair: Pair) {
        let mut swap = proposed(&pair);
        assert!(matches!(
            swap.complete(&pair.ada, Utc::now()),
            Err(SwapTransitionError::InvalidTransition { .. })
        ));
    }

    #[rstest]
    fn completion_credits_mirror_hours(pair: Pair) {
        let swap = proposed(&pair);
        let credits = swap.completion_credits();
        assert_eq!(credits.len(), 2);
        assert!(credits.iter().all(|c| (c.hours_taught - 2.0).abs() < f64::EPSILON));
    }

    #[rstest]
    #[case("proposed", SwapStatus::Proposed)]
    #[case("countered", SwapStatus::Countered)]
    #[case("cancelled", SwapStatus::Cancelled)]
    fn statuses_parse_from_storage(#[case] raw: &str, #[case] expected: SwapStatus) {
        assert_eq!(raw.parse::<SwapStatus>(), Ok(expected));
    }
}
