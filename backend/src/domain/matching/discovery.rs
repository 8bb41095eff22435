//! Fuzzy discovery suggestions.
//!
//! A looser strategy than the fairness matcher: it suggests teachers of
//! *related* skills (overlapping names or the same category) so a user can
//! find adjacent offers. Exact skill matches are left to the matcher.

use std::cmp::Ordering;

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Skill, UserId, UserSkill};

/// Relevance of a name overlap (one name contains the other).
pub const NAME_OVERLAP_RELEVANCE: f64 = 0.8;
/// Relevance of sharing a category.
pub const SAME_CATEGORY_RELEVANCE: f64 = 0.5;

/// Why an offer was suggested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryReason {
    NameOverlap,
    SameCategory,
}

/// A related teaching offer for one of the caller's learning wishes.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverySuggestion {
    pub partner_id: UserId,
    pub wanted: Skill,
    pub offered: UserSkill,
    pub relevance: f64,
    pub reason: DiscoveryReason,
}

/// Relevance of `offered` to `wanted`, or `None` when unrelated or identical.
#[must_use]
pub fn relevance(wanted: &Skill, offered: &Skill) -> Option<(f64, DiscoveryReason)> {
    if wanted.id == offered.id {
        return None;
    }
    let wanted_name = wanted.name.to_lowercase();
    let offered_name = offered.name.to_lowercase();
    if wanted_name.contains(&offered_name) || offered_name.contains(&wanted_name) {
        return Some((NAME_OVERLAP_RELEVANCE, DiscoveryReason::NameOverlap));
    }
    if wanted.category.trim().eq_ignore_ascii_case(offered.category.trim()) {
        return Some((SAME_CATEGORY_RELEVANCE, DiscoveryReason::SameCategory));
    }
    None
}

/// Rank related offers for each wish, best first, at most `limit`.
#[must_use]
pub fn suggest(wishes: &[UserSkill], offers: &[UserSkill], limit: usize) -> Vec<DiscoverySuggestion> {
    let mut suggestions: Vec<DiscoverySuggestion> = wishes
        .iter()
        .flat_map(|wish| {
            offers.iter().filter_map(move |offer| {
                relevance(&wish.skill, &offer.skill).map(|(relevance, reason)| {
                    DiscoverySuggestion {
                        partner_id: offer.user_id.clone(),
                        wanted: wish.skill.clone(),
                        offered: offer.clone(),
                        relevance,
                        reason,
                    }
                })
            })
        })
        .collect();
    suggestions.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.offered.skill.name.cmp(&b.offered.skill.name))
    });
    suggestions.truncate(limit);
    suggestions
}
