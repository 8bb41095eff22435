//! Tests for the swap workflow service.

use std::sync::Arc;

use chrono::Utc;
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use uuid::Uuid;

use super::*;
use crate::domain::ports::{
    Allocation, LockedSkill, MockProfileCache, MockSkillRepository, MockSwapRepository,
    ProposalPreferences,
};
use crate::domain::{CapacityPolicy, ErrorCode, Skill, SkillLevel};

struct Pair {
    ada: UserId,
    bo: UserId,
    pottery: Skill,
    guitar: Skill,
    drums: Skill,
}

#[fixture]
fn pair() -> Pair {
    let skill = |name: &str| Skill {
        id: SkillId::random(),
        name: name.to_owned(),
        category: "Hobbies".to_owned(),
        demand_score: Some(60.0),
        base_difficulty: None,
    };
    Pair {
        ada: UserId::random(),
        bo: UserId::random(),
        pottery: skill("Pottery"),
        guitar: skill("Guitar"),
        drums: skill("Drums"),
    }
}

fn offer(user: &UserId, skill: &Skill, hours: Option<f64>) -> UserSkill {
    UserSkill {
        id: Uuid::new_v4(),
        user_id: user.clone(),
        skill: skill.clone(),
        role: SkillRole::Teach,
        level: Some(SkillLevel::Intermediate),
        difficulty_score: Some(60.0),
        weekly_hours_available: hours,
        active: true,
    }
}

fn skills_with(offers: Vec<UserSkill>) -> MockSkillRepository {
    let mut repo = MockSkillRepository::new();
    repo.expect_find_active_user_skill()
        .returning(move |user, skill_id, role| {
            Ok(offers
                .iter()
                .find(|o| &o.user_id == user && o.skill_id() == *skill_id && o.role == role)
                .cloned())
        });
    repo
}

fn allocating(swaps: &mut MockSwapRepository, allocations: Vec<(UserId, SkillId, f64)>) {
    swaps
        .expect_active_allocations()
        .returning(move |user, skill_id, _| {
            Ok(allocations
                .iter()
                .filter(|(u, s, _)| u == user && s == skill_id)
                .map(|(_, _, hours)| Allocation {
                    swap_id: SwapId::random(),
                    hours: *hours,
                })
                .collect())
        });
}

fn anonymous_profiles() -> MockProfileCache {
    let mut cache = MockProfileCache::new();
    cache.expect_get_or_fetch().returning(|_| Ok(None));
    cache
}

type Service = SwapWorkflowService<MockSkillRepository, MockSwapRepository, MockProfileCache>;

fn service(skills: MockSkillRepository, swaps: MockSwapRepository, profiles: MockProfileCache) -> Service {
    let skills = Arc::new(skills);
    let swaps = Arc::new(swaps);
    let ledger = CapacityLedger::new(
        Arc::clone(&skills),
        Arc::clone(&swaps),
        CapacityPolicy::default(),
    );
    SwapWorkflowService::new(skills, swaps, Arc::new(profiles), ledger, Arc::new(DefaultClock))
}

fn request(p: &Pair, hours: f64) -> ProposeSwapRequest {
    ProposeSwapRequest {
        proposer: p.ada.clone(),
        partner: p.bo.clone(),
        proposer_teaches: p.pottery.id,
        proposer_learns: p.guitar.id,
        locked: LockedSkill {
            role: SkillRole::Learn,
            skill_id: p.guitar.id,
        },
        hours_per_week: hours,
        preferences: ProposalPreferences::default(),
    }
}

fn proposed(p: &Pair) -> Swap {
    Swap::propose(
        SwapId::random(),
        SwapTerms {
            proposer: p.ada.clone(),
            partner: p.bo.clone(),
            proposer_teaches: p.pottery.id,
            partner_teaches: p.guitar.id,
            hours_per_week: 2.0,
            fairness: FairnessScore::PERFECT,
            rationale: String::new(),
        },
        Utc::now(),
    )
}

fn stored(swap: Swap) -> MockSwapRepository {
    let mut swaps = MockSwapRepository::new();
    swaps
        .expect_find_swap()
        .returning(move |_| Ok(Some(swap.clone())));
    swaps
}

#[rstest]
#[tokio::test]
async fn proposal_beyond_remaining_capacity_is_rejected(pair: Pair) {
    let skills = skills_with(vec![
        offer(&pair.ada, &pair.pottery, None),
        offer(&pair.bo, &pair.guitar, Some(5.0)),
    ]);
    let mut swaps = MockSwapRepository::new();
    swaps.expect_find_open_swap().returning(|_, _, _, _| Ok(None));
    allocating(&mut swaps, vec![(pair.bo.clone(), pair.guitar.id, 3.0)]);
    swaps.expect_create_proposal().never();
    let service = service(skills, swaps, anonymous_profiles());

    let err = service
        .propose(request(&pair, 3.0))
        .await
        .expect_err("3h requested with 2h left");

    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(err.detail_code(), Some("capacity_exceeded"));
    let details = err.details().expect("details");
    assert_eq!(details["requestedHours"], 3.0);
    assert_eq!(details["remainingHours"], 2.0);
}

#[rstest]
#[tokio::test]
async fn proposal_within_capacity_is_persisted(pair: Pair) {
    let skills = skills_with(vec![
        offer(&pair.ada, &pair.pottery, Some(5.0)),
        offer(&pair.bo, &pair.guitar, Some(5.0)),
    ]);
    let mut swaps = MockSwapRepository::new();
    swaps.expect_find_open_swap().returning(|_, _, _, _| Ok(None));
    allocating(&mut swaps, vec![(pair.bo.clone(), pair.guitar.id, 3.0)]);
    swaps
        .expect_create_proposal()
        .times(1)
        .withf(|proposal| proposal.capacity_checks.len() == 2)
        .returning(|proposal| Ok(proposal.swap.clone()));
    let service = service(skills, swaps, anonymous_profiles());
    let mut req = request(&pair, 2.0);
    req.preferences.note = Some("  weekends only ".to_owned());

    let swap = service.propose(req).await.expect("proposal stored");

    assert_eq!(swap.status, SwapStatus::Proposed);
    assert_eq!(swap.fairness, FairnessScore::PERFECT);
    assert!(swap.participants.iter().all(|p| !p.accepted));
    assert!(swap.rationale.starts_with("Excellent match (100/100)"));
    assert!(swap.rationale.ends_with("Note: weekends only"));
    assert_eq!(swap.participants[1].teaching_skill_id, pair.guitar.id);
}

#[rstest]
#[case::zero(0.0)]
#[case::negative(-1.0)]
#[case::not_a_number(f64::NAN)]
#[tokio::test]
async fn proposal_hours_must_be_positive(pair: Pair, #[case] hours: f64) {
    let service = service(
        MockSkillRepository::new(),
        MockSwapRepository::new(),
        MockProfileCache::new(),
    );

    let err = service
        .propose(request(&pair, hours))
        .await
        .expect_err("invalid hours");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn drifted_locked_skill_is_a_data_integrity_error(pair: Pair) {
    let service = service(
        MockSkillRepository::new(),
        MockSwapRepository::new(),
        MockProfileCache::new(),
    );
    let mut req = request(&pair, 1.0);
    req.locked.skill_id = pair.drums.id;

    let err = service.propose(req).await.expect_err("skill drift");

    assert_eq!(err.code(), ErrorCode::DataIntegrity);
    assert_eq!(err.detail_code(), Some("skill_mismatch"));
}

#[rstest]
#[tokio::test]
async fn duplicate_open_swap_is_rejected(pair: Pair) {
    let existing = SwapId::random();
    let mut swaps = MockSwapRepository::new();
    swaps
        .expect_find_open_swap()
        .times(1)
        .returning(move |_, _, _, _| Ok(Some(existing)));
    swaps.expect_create_proposal().never();
    let service = service(MockSkillRepository::new(), swaps, MockProfileCache::new());

    let err = service
        .propose(request(&pair, 1.0))
        .await
        .expect_err("duplicate");

    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(err.detail_code(), Some("duplicate_proposal"));
    let details = err.details().expect("details");
    assert_eq!(details["existingSwapId"], existing.to_string());
}

#[rstest]
#[tokio::test]
async fn lost_capacity_race_surfaces_as_capacity_exceeded(pair: Pair) {
    let skills = skills_with(vec![
        offer(&pair.ada, &pair.pottery, None),
        offer(&pair.bo, &pair.guitar, Some(5.0)),
    ]);
    let bo = pair.bo.clone();
    let guitar = pair.guitar.id;
    let mut swaps = MockSwapRepository::new();
    swaps.expect_find_open_swap().returning(|_, _, _, _| Ok(None));
    allocating(&mut swaps, Vec::new());
    swaps.expect_create_proposal().times(1).returning(move |_| {
        Err(SwapRepositoryError::capacity_exceeded(
            bo.to_string(),
            guitar.to_string(),
            4.0,
            1.0,
        ))
    });
    let service = service(skills, swaps, anonymous_profiles());

    let err = service
        .propose(request(&pair, 4.0))
        .await
        .expect_err("concurrent booking won");

    assert_eq!(err.detail_code(), Some("capacity_exceeded"));
}

#[rstest]
#[tokio::test]
async fn missing_partner_offer_is_a_data_integrity_error(pair: Pair) {
    let skills = skills_with(vec![offer(&pair.ada, &pair.pottery, None)]);
    let mut swaps = MockSwapRepository::new();
    swaps.expect_find_open_swap().returning(|_, _, _, _| Ok(None));
    let service = service(skills, swaps, anonymous_profiles());

    let err = service
        .propose(request(&pair, 1.0))
        .await
        .expect_err("partner stopped teaching guitar");

    assert_eq!(err.code(), ErrorCode::DataIntegrity);
    assert_eq!(err.detail_code(), Some("missing_declaration"));
}

#[rstest]
#[tokio::test]
async fn second_acceptance_activates_with_capacity_checks(pair: Pair) {
    let mut swap = proposed(&pair);
    swap.accept(&pair.ada, Utc::now()).expect("first accept");
    let mut swaps = stored(swap);
    swaps
        .expect_apply_transition()
        .times(1)
        .withf(|t| {
            t.expected_status == SwapStatus::Accepted
                && t.swap.status == SwapStatus::Active
                && t.capacity_checks.len() == 2
                && t.completion_credits.is_empty()
        })
        .returning(|t| Ok(t.swap.clone()));
    let service = service(MockSkillRepository::new(), swaps, MockProfileCache::new());

    let active = service
        .accept(SwapActionRequest {
            swap_id: SwapId::random(),
            actor: pair.bo.clone(),
        })
        .await
        .expect("accepted");

    assert_eq!(active.status, SwapStatus::Active);
}

#[rstest]
#[tokio::test]
async fn completion_credits_profiles_and_refreshes_cache(pair: Pair) {
    let mut swap = proposed(&pair);
    swap.accept(&pair.ada, Utc::now()).expect("ada accepts");
    swap.accept(&pair.bo, Utc::now()).expect("bo accepts");
    let mut swaps = stored(swap);
    swaps
        .expect_apply_transition()
        .times(1)
        .withf(|t| t.completion_credits.len() == 2 && t.capacity_checks.is_empty())
        .returning(|t| Ok(t.swap.clone()));
    let mut profiles = MockProfileCache::new();
    profiles.expect_invalidate().times(2).return_const(());
    let service = service(MockSkillRepository::new(), swaps, profiles);

    let done = service
        .complete(SwapActionRequest {
            swap_id: SwapId::random(),
            actor: pair.ada.clone(),
        })
        .await
        .expect("completed");

    assert_eq!(done.status, SwapStatus::Completed);
}

#[rstest]
#[tokio::test]
async fn strangers_cannot_act_on_a_swap(pair: Pair) {
    let mut swaps = stored(proposed(&pair));
    swaps.expect_apply_transition().never();
    let service = service(MockSkillRepository::new(), swaps, MockProfileCache::new());

    let err = service
        .cancel(SwapActionRequest {
            swap_id: SwapId::random(),
            actor: UserId::random(),
        })
        .await
        .expect_err("not a participant");

    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn completing_a_proposal_is_an_invalid_transition(pair: Pair) {
    let service = service(
        MockSkillRepository::new(),
        stored(proposed(&pair)),
        MockProfileCache::new(),
    );

    let err = service
        .complete(SwapActionRequest {
            swap_id: SwapId::random(),
            actor: pair.ada.clone(),
        })
        .await
        .expect_err("not active");

    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(err.detail_code(), Some("invalid_transition"));
}

#[rstest]
#[tokio::test]
async fn unknown_swap_is_not_found(pair: Pair) {
    let mut swaps = MockSwapRepository::new();
    swaps.expect_find_swap().returning(|_| Ok(None));
    let service = service(MockSkillRepository::new(), swaps, MockProfileCache::new());

    let err = service
        .decline(SwapActionRequest {
            swap_id: SwapId::random(),
            actor: pair.bo.clone(),
        })
        .await
        .expect_err("missing");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn counter_rescores_the_new_pairing(pair: Pair) {
    let mut drums = offer(&pair.bo, &pair.drums, None);
    drums.level = Some(SkillLevel::Beginner);
    let skills = skills_with(vec![offer(&pair.ada, &pair.pottery, None), drums]);
    let mut swaps = stored(proposed(&pair));
    swaps
        .expect_find_open_swap()
        .returning(|_, _, _, _| Ok(None));
    swaps
        .expect_apply_transition()
        .times(1)
        .withf(|t| t.expected_status == SwapStatus::Proposed && t.recheck_open_duplicates)
        .returning(|t| Ok(t.swap.clone()));
    let service = service(skills, swaps, anonymous_profiles());

    let countered = service
        .counter(CounterSwapRequest {
            swap_id: SwapId::random(),
            actor: pair.ada.clone(),
            learn_skill_id: pair.drums.id,
        })
        .await
        .expect("countered");

    assert_eq!(countered.status, SwapStatus::Countered);
    assert_eq!(countered.participants[1].teaching_skill_id, pair.drums.id);
    assert!(countered.fairness < FairnessScore::PERFECT);
    assert!(countered.rationale.contains("Drums"));
}

#[rstest]
#[tokio::test]
async fn counter_requires_the_partner_to_teach_the_skill(pair: Pair) {
    let skills = skills_with(vec![offer(&pair.ada, &pair.pottery, None)]);
    let mut swaps = stored(proposed(&pair));
    swaps
        .expect_find_open_swap()
        .returning(|_, _, _, _| Ok(None));
    swaps.expect_apply_transition().never();
    let service = service(skills, swaps, anonymous_profiles());

    let err = service
        .counter(CounterSwapRequest {
            swap_id: SwapId::random(),
            actor: pair.ada.clone(),
            learn_skill_id: pair.drums.id,
        })
        .await
        .expect_err("bo does not teach drums");

    assert_eq!(err.code(), ErrorCode::DataIntegrity);
}

#[rstest]
#[tokio::test]
async fn counter_into_an_already_open_pair_is_a_duplicate(pair: Pair) {
    let skills = skills_with(vec![
        offer(&pair.ada, &pair.pottery, None),
        offer(&pair.bo, &pair.drums, None),
    ]);
    let mut swaps = stored(proposed(&pair));
    let existing = SwapId::random();
    let (ada, bo) = (pair.ada.clone(), pair.bo.clone());
    let (pottery, drums) = (pair.pottery.id, pair.drums.id);
    swaps
        .expect_find_open_swap()
        .times(1)
        .withf(move |first, first_teaches, second, second_teaches| {
            *first == ada && *first_teaches == pottery && *second == bo && *second_teaches == drums
        })
        .returning(move |_, _, _, _| Ok(Some(existing)));
    swaps.expect_apply_transition().never();
    let service = service(skills, swaps, anonymous_profiles());

    let err = service
        .counter(CounterSwapRequest {
            swap_id: SwapId::random(),
            actor: pair.ada.clone(),
            learn_skill_id: pair.drums.id,
        })
        .await
        .expect_err("pottery for drums is already open");

    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(err.detail_code(), Some("duplicate_proposal"));
}

#[rstest]
#[tokio::test]
async fn counter_cannot_learn_the_skill_the_actor_teaches(pair: Pair) {
    let skills = MockSkillRepository::new();
    let mut swaps = stored(proposed(&pair));
    swaps.expect_find_open_swap().never();
    swaps.expect_apply_transition().never();
    let service = service(skills, swaps, anonymous_profiles());

    let err = service
        .counter(CounterSwapRequest {
            swap_id: SwapId::random(),
            actor: pair.ada.clone(),
            learn_skill_id: pair.pottery.id,
        })
        .await
        .expect_err("ada teaches pottery");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.detail_code(), Some("same_skill"));
}
