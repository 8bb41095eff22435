//! In-process store implementing every driven persistence port.
//!
//! Used when no database is configured and by behaviour tests. All state
//! sits behind one mutex, so each write (including its duplicate and
//! capacity re-checks) is atomic with respect to every other write.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{
    Allocation, SkillRepository, SkillRepositoryError, SwapRepository, SwapRepositoryError,
    UserProfileRepository, UserProfileRepositoryError,
};
use crate::domain::{
    CapacityCheck, DEFAULT_SCORE, HOURS_EPSILON, NewSkill, NewSwapProposal, Skill,
    SkillAssessment, SkillId, SkillRole, Swap, SwapId, SwapParticipant, SwapStatus,
    SwapTransition, UserId, UserProfile, UserSkill, UserSkillDraft,
};

#[derive(Debug, Default)]
struct State {
    skills: HashMap<SkillId, Skill>,
    /// Every declaration ever made, active or not.
    user_skills: Vec<UserSkill>,
    swaps: HashMap<SwapId, Swap>,
    profiles: HashMap<UserId, UserProfile>,
}

/// Hours a participant commits (or receives) on `skill_id` in one swap.
fn committed_hours(participant: &SwapParticipant, skill_id: &SkillId, role: SkillRole) -> Option<f64> {
    match role {
        SkillRole::Teach => (participant.teaching_skill_id == *skill_id)
            .then_some(participant.teaching_hours_per_week),
        SkillRole::Learn => (participant.learning_skill_id == *skill_id)
            .then_some(participant.learning_hours_per_week),
    }
}

impl State {
    fn active_declaration(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        role: SkillRole,
    ) -> Option<&UserSkill> {
        self.user_skills.iter().find(|row| {
            row.active && &row.user_id == user_id && row.skill_id() == *skill_id && row.role == role
        })
    }

    fn allocations(&self, user_id: &UserId, skill_id: &SkillId, role: SkillRole) -> Vec<Allocation> {
        self.swaps
            .values()
            .filter(|swap| swap.status == SwapStatus::Active)
            .filter_map(|swap| {
                let participant = swap.participant(user_id)?;
                committed_hours(participant, skill_id, role).map(|hours| Allocation {
                    swap_id: swap.id,
                    hours,
                })
            })
            .collect()
    }

    fn open_swap(
        &self,
        first: &UserId,
        first_teaches: &SkillId,
        second: &UserId,
        second_teaches: &SkillId,
    ) -> Option<SwapId> {
        self.open_swap_other_than(None, first, first_teaches, second, second_teaches)
    }

    fn open_swap_other_than(
        &self,
        excluded: Option<&SwapId>,
        first: &UserId,
        first_teaches: &SkillId,
        second: &UserId,
        second_teaches: &SkillId,
    ) -> Option<SwapId> {
        let teaches = |swap: &Swap, user: &UserId, skill: &SkillId| {
            swap.participant(user)
                .is_some_and(|p| p.teaching_skill_id == *skill)
        };
        self.swaps
            .values()
            .filter(|swap| SwapStatus::OPEN.contains(&swap.status))
            .filter(|swap| Some(&swap.id) != excluded)
            .find(|swap| teaches(swap, first, first_teaches) && teaches(swap, second, second_teaches))
            .map(|swap| swap.id)
    }

    fn check_capacity(&self, checks: &[CapacityCheck]) -> Result<(), SwapRepositoryError> {
        for check in checks {
            let Some(cap) = self
                .active_declaration(&check.user_id, &check.skill_id, SkillRole::Teach)
                .and_then(UserSkill::weekly_cap)
            else {
                continue;
            };
            let allocated: f64 = self
                .allocations(&check.user_id, &check.skill_id, SkillRole::Teach)
                .iter()
                .map(|a| a.hours)
                .sum();
            let remaining = (cap - allocated).max(0.0);
            if check.requested_hours > remaining + HOURS_EPSILON {
                return Err(SwapRepositoryError::capacity_exceeded(
                    check.user_id.to_string(),
                    check.skill_id.to_string(),
                    check.requested_hours,
                    remaining,
                ));
            }
        }
        Ok(())
    }
}

/// Mutex-guarded in-memory implementation of the skill, swap and profile
/// repositories.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, String> {
        self.state
            .lock()
            .map_err(|_| "in-memory store lock poisoned".to_owned())
    }

    /// Insert or replace a profile.
    ///
    /// # Errors
    /// Fails only if the store lock was poisoned.
    pub fn put_profile(&self, profile: UserProfile) -> Result<(), UserProfileRepositoryError> {
        let mut state = self.lock().map_err(UserProfileRepositoryError::query)?;
        state.profiles.insert(profile.user_id.clone(), profile);
        Ok(())
    }

    /// Insert or replace a swap without any checks.
    ///
    /// # Errors
    /// Fails only if the store lock was poisoned.
    pub fn put_swap(&self, swap: Swap) -> Result<(), SwapRepositoryError> {
        let mut state = self.lock().map_err(SwapRepositoryError::query)?;
        state.swaps.insert(swap.id, swap);
        Ok(())
    }
}

#[async_trait]
impl SkillRepository for InMemoryStore {
    async fn find_skill(&self, skill_id: &SkillId) -> Result<Option<Skill>, SkillRepositoryError> {
        let state = self.lock().map_err(SkillRepositoryError::query)?;
        Ok(state.skills.get(skill_id).cloned())
    }

    async fn find_skill_by_name(&self, name: &str) -> Result<Option<Skill>, SkillRepositoryError> {
        let state = self.lock().map_err(SkillRepositoryError::query)?;
        Ok(state
            .skills
            .values()
            .find(|skill| skill.name.eq_ignore_ascii_case(name.trim()))
            .cloned())
    }

    async fn insert_skill(&self, skill: &NewSkill) -> Result<Skill, SkillRepositoryError> {
        let mut state = self.lock().map_err(SkillRepositoryError::query)?;
        if let Some(existing) = state
            .skills
            .values()
            .find(|known| known.name.eq_ignore_ascii_case(&skill.name))
        {
            return Ok(existing.clone());
        }
        let created = Skill {
            id: SkillId::random(),
            name: skill.name.clone(),
            category: skill.category.clone(),
            demand_score: Some(DEFAULT_SCORE),
            base_difficulty: Some(DEFAULT_SCORE),
        };
        state.skills.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_user_skills(
        &self,
        user_id: &UserId,
        role: SkillRole,
    ) -> Result<Vec<UserSkill>, SkillRepositoryError> {
        let state = self.lock().map_err(SkillRepositoryError::query)?;
        let mut rows: Vec<UserSkill> = state
            .user_skills
            .iter()
            .filter(|row| row.active && &row.user_id == user_id && row.role == role)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.skill.name.cmp(&b.skill.name));
        Ok(rows)
    }

    async fn find_active_user_skill(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        role: SkillRole,
    ) -> Result<Option<UserSkill>, SkillRepositoryError> {
        let state = self.lock().map_err(SkillRepositoryError::query)?;
        Ok(state.active_declaration(user_id, skill_id, role).cloned())
    }

    async fn find_teachers(
        &self,
        skill_id: &SkillId,
        exclude: &UserId,
    ) -> Result<Vec<UserSkill>, SkillRepositoryError> {
        let state = self.lock().map_err(SkillRepositoryError::query)?;
        Ok(state
            .user_skills
            .iter()
            .filter(|row| {
                row.active
                    && row.role == SkillRole::Teach
                    && row.skill_id() == *skill_id
                    && &row.user_id != exclude
            })
            .cloned()
            .collect())
    }

    async fn list_teaching_offers(
        &self,
        exclude: &UserId,
    ) -> Result<Vec<UserSkill>, SkillRepositoryError> {
        let state = self.lock().map_err(SkillRepositoryError::query)?;
        Ok(state
            .user_skills
            .iter()
            .filter(|row| row.active && row.role == SkillRole::Teach && &row.user_id != exclude)
            .cloned()
            .collect())
    }

    async fn upsert_user_skill(
        &self,
        draft: &UserSkillDraft,
    ) -> Result<UserSkill, SkillRepositoryError> {
        let mut state = self.lock().map_err(SkillRepositoryError::query)?;
        let skill = state
            .skills
            .get(&draft.skill_id)
            .cloned()
            .ok_or_else(|| SkillRepositoryError::unknown_skill(draft.skill_id.to_string()))?;
        let existing = state.user_skills.iter_mut().find(|row| {
            row.user_id == draft.user_id && row.skill_id() == draft.skill_id && row.role == draft.role
        });
        let row = match existing {
            Some(row) => {
                if !row.active {
                    debug!(user_id = %draft.user_id, skill_id = %draft.skill_id, "reactivating declaration");
                }
                row.level = draft.level;
                row.difficulty_score = draft.difficulty_score;
                row.weekly_hours_available = draft.weekly_hours_available;
                row.active = true;
                row.clone()
            }
            None => {
                let row = UserSkill {
                    id: Uuid::new_v4(),
                    user_id: draft.user_id.clone(),
                    skill,
                    role: draft.role,
                    level: draft.level,
                    difficulty_score: draft.difficulty_score,
                    weekly_hours_available: draft.weekly_hours_available,
                    active: true,
                };
                state.user_skills.push(row.clone());
                row
            }
        };
        Ok(row)
    }

    async fn deactivate_user_skill(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        role: SkillRole,
    ) -> Result<bool, SkillRepositoryError> {
        let mut state = self.lock().map_err(SkillRepositoryError::query)?;
        let row = state.user_skills.iter_mut().find(|row| {
            row.active && &row.user_id == user_id && row.skill_id() == *skill_id && row.role == role
        });
        match row {
            Some(row) => {
                row.active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn apply_assessment(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        assessment: &SkillAssessment,
    ) -> Result<Option<UserSkill>, SkillRepositoryError> {
        let mut state = self.lock().map_err(SkillRepositoryError::query)?;
        let row = state.user_skills.iter_mut().find(|row| {
            row.active
                && &row.user_id == user_id
                && row.skill_id() == *skill_id
                && row.role == SkillRole::Teach
        });
        Ok(row.map(|row| {
            row.level = Some(assessment.level);
            row.difficulty_score = Some(assessment.difficulty);
            row.clone()
        }))
    }
}

#[async_trait]
impl SwapRepository for InMemoryStore {
    async fn active_allocations(
        &self,
        user_id: &UserId,
        skill_id: &SkillId,
        role: SkillRole,
    ) -> Result<Vec<Allocation>, SwapRepositoryError> {
        let state = self.lock().map_err(SwapRepositoryError::query)?;
        Ok(state.allocations(user_id, skill_id, role))
    }

    async fn skills_actively_learning(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SkillId>, SwapRepositoryError> {
        let state = self.lock().map_err(SwapRepositoryError::query)?;
        Ok(state
            .swaps
            .values()
            .filter(|swap| swap.status == SwapStatus::Active)
            .filter_map(|swap| swap.participant(user_id))
            .map(|p| p.learning_skill_id)
            .collect())
    }

    async fn find_open_swap(
        &self,
        first: &UserId,
        first_teaches: &SkillId,
        second: &UserId,
        second_teaches: &SkillId,
    ) -> Result<Option<SwapId>, SwapRepositoryError> {
        let state = self.lock().map_err(SwapRepositoryError::query)?;
        Ok(state.open_swap(first, first_teaches, second, second_teaches))
    }

    async fn create_proposal(
        &self,
        proposal: &NewSwapProposal,
    ) -> Result<Swap, SwapRepositoryError> {
        let mut state = self.lock().map_err(SwapRepositoryError::query)?;
        let [first, second] = &proposal.swap.participants;
        if let Some(existing) = state.open_swap(
            &first.user_id,
            &first.teaching_skill_id,
            &second.user_id,
            &second.teaching_skill_id,
        ) {
            return Err(SwapRepositoryError::duplicate_proposal(*existing.as_uuid()));
        }
        state.check_capacity(&proposal.capacity_checks)?;
        state.swaps.insert(proposal.swap.id, proposal.swap.clone());
        Ok(proposal.swap.clone())
    }

    async fn find_swap(&self, swap_id: &SwapId) -> Result<Option<Swap>, SwapRepositoryError> {
        let state = self.lock().map_err(SwapRepositoryError::query)?;
        Ok(state.swaps.get(swap_id).cloned())
    }

    async fn apply_transition(
        &self,
        transition: &SwapTransition,
    ) -> Result<Swap, SwapRepositoryError> {
        let mut state = self.lock().map_err(SwapRepositoryError::query)?;
        let swap_id = transition.swap.id;
        let stored = state
            .swaps
            .get(&swap_id)
            .ok_or_else(|| SwapRepositoryError::not_found(*swap_id.as_uuid()))?;
        if stored.status != transition.expected_status {
            return Err(SwapRepositoryError::status_conflict(
                transition.expected_status.as_str(),
                stored.status.as_str(),
            ));
        }
        if transition.recheck_open_duplicates {
            let [first, second] = &transition.swap.participants;
            if let Some(existing) = state.open_swap_other_than(
                Some(&swap_id),
                &first.user_id,
                &first.teaching_skill_id,
                &second.user_id,
                &second.teaching_skill_id,
            ) {
                return Err(SwapRepositoryError::duplicate_proposal(*existing.as_uuid()));
            }
        }
        state.check_capacity(&transition.capacity_checks)?;
        for credit in &transition.completion_credits {
            let profile = state
                .profiles
                .entry(credit.user_id.clone())
                .or_insert_with(|| UserProfile::new(credit.user_id.clone(), String::new()));
            profile.total_swaps_completed = profile.total_swaps_completed.saturating_add(1);
            profile.hours_taught += credit.hours_taught;
            profile.hours_learned += credit.hours_learned;
        }
        state.swaps.insert(swap_id, transition.swap.clone());
        Ok(transition.swap.clone())
    }
}

#[async_trait]
impl UserProfileRepository for InMemoryStore {
    async fn find_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserProfile>, UserProfileRepositoryError> {
        let state = self.lock().map_err(UserProfileRepositoryError::query)?;
        Ok(state.profiles.get(user_id).cloned())
    }
}
