//! Exact-skill fairness matcher.
//!
//! For every skill the caller wants to learn, find other users teaching it,
//! keep those who in turn want to learn something the caller teaches, value
//! both sides and keep pairs whose fairness reaches the threshold.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::ports::{ProfileCache, SkillRepository, SkillRepositoryError};
use crate::domain::{
    FairnessScore, SkillRole, UserId, UserProfile, UserSkill, ValuedSkill, compute_fairness,
    compute_value, explain_fairness,
};

/// A fairness-scored pairing before capacity gating.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMatch {
    pub partner_id: UserId,
    /// What the caller would teach (the partner's matching learn wish is the
    /// same skill).
    pub caller_teaches: UserSkill,
    /// What the caller would learn (the partner's matching teach offer).
    pub partner_teaches: UserSkill,
    /// Value the caller gives.
    pub value_given: f64,
    /// Value the caller receives.
    pub value_received: f64,
    pub fairness: FairnessScore,
    pub explanation: String,
}

/// Exact-skill matcher over the skill store and profile cache.
pub struct MatchFinder<'a, S: ?Sized, C: ?Sized> {
    skills: &'a S,
    profiles: &'a C,
    fairness_threshold: u8,
}

impl<'a, S, C> MatchFinder<'a, S, C>
where
    S: SkillRepository + ?Sized,
    C: ProfileCache + ?Sized,
{
    /// Borrow the collaborators for one matching run.
    pub const fn new(skills: &'a S, profiles: &'a C, fairness_threshold: u8) -> Self {
        Self {
            skills,
            profiles,
            fairness_threshold,
        }
    }

    /// Find fairness-qualified pairings, best first.
    ///
    /// An empty teach or learn list yields no matches.
    ///
    /// # Errors
    /// Propagates skill store failures; the caller decides how to degrade.
    pub async fn find_matches(
        &self,
        caller: &UserProfile,
        teaching: &[UserSkill],
        learning: &[UserSkill],
    ) -> Result<Vec<CandidateMatch>, SkillRepositoryError> {
        if teaching.is_empty() || learning.is_empty() {
            return Ok(Vec::new());
        }

        let mut wishlists: HashMap<UserId, Vec<UserSkill>> = HashMap::new();
        let mut reputations: HashMap<UserId, Option<f64>> = HashMap::new();
        let mut matches = Vec::new();

        for wanted in learning {
            let teachers = self
                .skills
                .find_teachers(&wanted.skill_id(), &caller.user_id)
                .await?;
            for offer in teachers {
                let partner = offer.user_id.clone();
                if !wishlists.contains_key(&partner) {
                    let wishes = self
                        .skills
                        .list_user_skills(&partner, SkillRole::Learn)
                        .await?;
                    wishlists.insert(partner.clone(), wishes);
                }
                let Some(wishes) = wishlists.get(&partner) else {
                    continue;
                };
                let reputation = match reputations.get(&partner) {
                    Some(reputation) => *reputation,
                    None => {
                        let reputation = self.reputation_of(&partner).await;
                        reputations.insert(partner.clone(), reputation);
                        reputation
                    }
                };
                for teach in teaching
                    .iter()
                    .filter(|teach| wishes.iter().any(|w| w.skill_id() == teach.skill_id()))
                {
                    let candidate = Self::score(caller, teach, &offer, reputation);
                    if candidate.fairness.meets(self.fairness_threshold) {
                        matches.push(candidate);
                    } else {
                        debug!(
                            partner_id = %partner,
                            fairness = candidate.fairness.value(),
                            "discarding pairing below fairness threshold"
                        );
                    }
                }
            }
        }

        matches.sort_by(|a, b| b.fairness.cmp(&a.fairness));
        Ok(matches)
    }

    fn score(
        caller: &UserProfile,
        caller_teaches: &UserSkill,
        partner_teaches: &UserSkill,
        partner_reputation: Option<f64>,
    ) -> CandidateMatch {
        let value_given = compute_value(caller_teaches, caller.reputation);
        let value_received = compute_value(partner_teaches, partner_reputation);
        let fairness = compute_fairness(value_given, value_received);
        let explanation = explain_fairness(
            ValuedSkill {
                name: &caller_teaches.skill.name,
                value: value_given,
            },
            ValuedSkill {
                name: &partner_teaches.skill.name,
                value: value_received,
            },
            fairness,
        );
        CandidateMatch {
            partner_id: partner_teaches.user_id.clone(),
            caller_teaches: caller_teaches.clone(),
            partner_teaches: partner_teaches.clone(),
            value_given,
            value_received,
            fairness,
            explanation,
        }
    }

    async fn reputation_of(&self, user_id: &UserId) -> Option<f64> {
        match self.profiles.get_or_fetch(user_id).await {
            Ok(profile) => profile.and_then(|p| p.reputation),
            Err(error) => {
                debug!(
                    user_id = %user_id,
                    error = %error,
                    "profile lookup failed; using default reputation"
                );
                None
            }
        }
    }
}
