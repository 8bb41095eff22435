//! Domain primitives, scoring models and services.
//!
//! Purpose: hold the marketplace rules independently of transport and
//! storage. Adapters talk to this module only through [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode — transport-agnostic error payload.
//! - UserId / UserProfile, Skill / UserSkill — identities and declarations.
//! - compute_value, compute_fairness, explain_fairness — scoring.
//! - Capacity / CapacityLedger — remaining teaching hours.
//! - Swap and its lifecycle — proposals through completion.
//! - MatchingService, SwapWorkflowService, SkillInventoryService — the
//!   driving port implementations.

pub mod error;
pub mod ports;
pub mod trace_id;
pub mod user;

mod capacity;
mod fairness;
mod matching;
mod skill;
mod skill_inventory_service;
mod swap;
mod swap_service;
mod valuation;

pub use self::capacity::{
    Capacity, CapacityLedger, CapacityLookupError, CapacityPolicy, DEFAULT_LOOKUP_TIMEOUT,
    HOURS_EPSILON, LookupFailurePolicy,
};
pub use self::error::{Error, ErrorCode};
pub use self::fairness::{
    DEFAULT_FAIRNESS_THRESHOLD, FairnessScore, FairnessTier, ValuedSkill, compute_fairness,
    explain_fairness, percentage_difference,
};
pub use self::matching::{
    CandidateMatch, DiscoveryReason, DiscoverySuggestion, MatchFinder, MatchingPolicy,
    MatchingService, RankedMatch,
};
pub use self::skill::{
    NewSkill, ParseEnumError, SKILL_NAME_MAX, Skill, SkillAssessment, SkillDeclaration, SkillId,
    SkillLevel, SkillRole, SkillValidationError, UserSkill, UserSkillDraft, normalise_skill_name,
    validate_score,
};
pub use self::skill_inventory_service::SkillInventoryService;
pub use self::swap::{
    CapacityCheck, CompletionCredit, NewSwapProposal, Swap, SwapAction, SwapId, SwapParticipant,
    SwapStatus, SwapTerms, SwapTransition, SwapTransitionError,
};
pub use self::swap_service::SwapWorkflowService;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{DEFAULT_REPUTATION, UserId, UserProfile, UserValidationError};
pub use self::valuation::{
    DEFAULT_SCORE, DEFAULT_WEEKLY_HOURS, MAX_SCORE, ValueInputs, compute_value, level_multiplier,
};

/// Convenient result alias for driving ports and handlers.
pub type ApiResult<T> = Result<T, Error>;
