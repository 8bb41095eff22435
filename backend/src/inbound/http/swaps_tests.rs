//! Tests for swap HTTP handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use chrono::Utc;
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::{
    FixtureProfileCache, FixtureSkillRepository, FixtureSwapRepository, MockSwapCommand,
};
use crate::domain::{
    CapacityLedger, CapacityPolicy, ErrorCode, FairnessScore, SkillId, SkillRole, SwapTerms,
    SwapWorkflowService,
};
use crate::inbound::http::test_utils::{as_caller, test_app};

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

fn proposed(pair: &Pair, hours: f64) -> Swap {
    Swap::propose(
        SwapId::random(),
        SwapTerms {
            proposer: pair.ada.clone(),
            partner: pair.bo.clone(),
            proposer_teaches: pair.pottery,
            partner_teaches: pair.guitar,
            hours_per_week: hours,
            fairness: FairnessScore::new(80),
            rationale: "Good match".to_owned(),
        },
        Utc::now(),
    )
}

fn state_with(swaps: MockSwapCommand) -> HttpState {
    HttpState::default().with_swaps(Arc::new(swaps))
}

#[rstest]
#[actix_web::test]
async fn propose_uses_caller_and_forwards_the_lock(pair: Pair) {
    let swap = proposed(&pair, 2.0);
    let (ada, bo, pottery, guitar) = (pair.ada.clone(), pair.bo.clone(), pair.pottery, pair.guitar);
    let mut swaps = MockSwapCommand::new();
    swaps
        .expect_propose()
        .withf(move |request| {
            request.proposer == ada
                && request.partner == bo
                && request.proposer_teaches == pottery
                && request.proposer_learns == guitar
                && request.locked
                    == LockedSkill {
                        role: SkillRole::Learn,
                        skill_id: guitar,
                    }
                && request.preferences.note.as_deref() == Some("weekday evenings")
        })
        .times(1)
        .returning(move |_| Ok(swap.clone()));
    let app = actix_test::init_service(test_app(state_with(swaps))).await;
    let req = as_caller(actix_test::TestRequest::post().uri("/api/v1/swaps"), &pair.ada)
        .set_json(json!({
            "partnerId": pair.bo.to_string(),
            "teachSkillId": pair.pottery.to_string(),
            "learnSkillId": pair.guitar.to_string(),
            "lockedSkill": {"role": "learn", "skillId": pair.guitar.to_string()},
            "hoursPerWeek": 2.0,
            "note": "weekday evenings"
        }))
        .to_request();

    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: SwapBody = actix_test::read_body_json(res).await;

    assert_eq!(body.status, SwapStatus::Proposed);
    assert_eq!(body.fairness_score, 80);
    assert_eq!(body.fairness_tier, "good");
    assert_eq!(body.participants.len(), 2);
    assert!(body.participants.iter().all(|side| !side.accepted));
}

#[rstest]
#[actix_web::test]
async fn explicit_lock_is_forwarded(pair: Pair) {
    let swap = proposed(&pair, 1.0);
    let pottery = pair.pottery;
    let mut swaps = MockSwapCommand::new();
    swaps
        .expect_propose()
        .withf(move |request| {
            request.locked.role == SkillRole::Teach && request.locked.skill_id == pottery
        })
        .times(1)
        .returning(move |_| Ok(swap.clone()));
    let app = actix_test::init_service(test_app(state_with(swaps))).await;
    let req = as_caller(actix_test::TestRequest::post().uri("/api/v1/swaps"), &pair.ada)
        .set_json(json!({
            "partnerId": pair.bo.to_string(),
            "teachSkillId": pair.pottery.to_string(),
            "learnSkillId": pair.guitar.to_string(),
            "lockedSkill": {"role": "teach", "skillId": pair.pottery.to_string()},
            "hoursPerWeek": 1.0
        }))
        .to_request();

    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::CREATED);
}

#[rstest]
#[actix_web::test]
async fn capacity_rejection_surfaces_as_conflict(pair: Pair) {
    let mut swaps = MockSwapCommand::new();
    swaps.expect_propose().returning(|_| {
        Err(Error::conflict("requested 3 hours but only 2 remain")
            .with_details(json!({"code": "capacity_exceeded", "remainingHours": 2.0})))
    });
    let app = actix_test::init_service(test_app(state_with(swaps))).await;
    let req = as_caller(actix_test::TestRequest::post().uri("/api/v1/swaps"), &pair.ada)
        .set_json(json!({
            "partnerId": pair.bo.to_string(),
            "teachSkillId": pair.pottery.to_string(),
            "learnSkillId": pair.guitar.to_string(),
            "lockedSkill": {"role": "learn", "skillId": pair.guitar.to_string()},
            "hoursPerWeek": 3.0
        }))
        .to_request();

    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = actix_test::read_body_json(res).await;

    assert_eq!(body["details"]["code"], "capacity_exceeded");
    assert_eq!(body["details"]["remainingHours"], 2.0);
}

#[rstest]
#[actix_web::test]
async fn drifted_learn_skill_is_unprocessable(pair: Pair) {
    let skills = Arc::new(FixtureSkillRepository);
    let swaps = Arc::new(FixtureSwapRepository);
    let ledger = CapacityLedger::new(
        Arc::clone(&skills),
        Arc::clone(&swaps),
        CapacityPolicy::default(),
    );
    let workflow = SwapWorkflowService::new(
        skills,
        swaps,
        Arc::new(FixtureProfileCache),
        ledger,
        Arc::new(DefaultClock),
    );
    let state = HttpState::default().with_swaps(Arc::new(workflow));
    let app = actix_test::init_service(test_app(state)).await;
    let drums = SkillId::random();
    let req = as_caller(actix_test::TestRequest::post().uri("/api/v1/swaps"), &pair.ada)
        .set_json(json!({
            "partnerId": pair.bo.to_string(),
            "teachSkillId": pair.pottery.to_string(),
            "learnSkillId": pair.guitar.to_string(),
            "lockedSkill": {"role": "learn", "skillId": drums.to_string()},
            "hoursPerWeek": 1.0
        }))
        .to_request();

    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = actix_test::read_body_json(res).await;

    assert_eq!(body["code"], "data_integrity");
    assert_eq!(body["details"]["code"], "skill_mismatch");
    assert_eq!(body["details"]["lockedSkillId"], drums.to_string());
}

#[rstest]
#[actix_web::test]
async fn missing_lock_is_rejected_before_port(pair: Pair) {
    let mut swaps = MockSwapCommand::new();
    swaps.expect_propose().never();
    let app = actix_test::init_service(test_app(state_with(swaps))).await;
    let req = as_caller(actix_test::TestRequest::post().uri("/api/v1/swaps"), &pair.ada)
        .set_json(json!({
            "partnerId": pair.bo.to_string(),
            "teachSkillId": pair.pottery.to_string(),
            "learnSkillId": pair.guitar.to_string(),
            "hoursPerWeek": 1.0
        }))
        .to_request();

    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(res).await;

    assert_eq!(body["details"]["field"], "lockedSkill");
    assert_eq!(body["details"]["code"], "missing_field");
}

#[rstest]
#[actix_web::test]
async fn malformed_partner_is_rejected_before_port(pair: Pair) {
    let mut swaps = MockSwapCommand::new();
    swaps.expect_propose().never();
    let app = actix_test::init_service(test_app(state_with(swaps))).await;
    let req = as_caller(actix_test::TestRequest::post().uri("/api/v1/swaps"), &pair.ada)
        .set_json(json!({
            "partnerId": "bo",
            "teachSkillId": pair.pottery.to_string(),
            "learnSkillId": pair.guitar.to_string(),
            "lockedSkill": {"role": "learn", "skillId": pair.guitar.to_string()},
            "hoursPerWeek": 1.0
        }))
        .to_request();

    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Error = actix_test::read_body_json(res).await;

    assert_eq!(body.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        body.details(),
        Some(&json!({"field": "partnerId", "value": "bo", "code": "invalid_uuid"}))
    );
}

#[rstest]
#[case("accept")]
#[case("decline")]
#[case("complete")]
#[case("cancel")]
#[actix_web::test]
async fn lifecycle_actions_route_to_matching_command(#[case] verb: &'static str, pair: Pair) {
    let swap = proposed(&pair, 2.0);
    let swap_id = swap.id;
    let actor = pair.bo.clone();
    let matches_request = move |request: &SwapActionRequest| {
        request.swap_id == swap_id && request.actor == actor
    };
    let mut swaps = MockSwapCommand::new();
    let reply = swap.clone();
    match verb {
        "accept" => {
            swaps
                .expect_accept()
                .withf(matches_request)
                .times(1)
                .returning(move |_| Ok(reply.clone()));
        }
        "decline" => {
            swaps
                .expect_decline()
                .withf(matches_request)
                .times(1)
                .returning(move |_| Ok(reply.clone()));
        }
        "complete" => {
            swaps
                .expect_complete()
                .withf(matches_request)
                .times(1)
                .returning(move |_| Ok(reply.clone()));
        }
        _ => {
            swaps
                .expect_cancel()
                .withf(matches_request)
                .times(1)
                .returning(move |_| Ok(reply.clone()));
        }
    }
    let app = actix_test::init_service(test_app(state_with(swaps))).await;
    let req = as_caller(
        actix_test::TestRequest::post().uri(&format!("/api/v1/swaps/{swap_id}/{verb}")),
        &pair.bo,
    )
    .to_request();

    let body: SwapBody = actix_test::call_and_read_body_json(&app, req).await;

    assert_eq!(body.id, swap_id.to_string());
}

#[rstest]
#[actix_web::test]
async fn counter_forwards_new_learn_skill(pair: Pair) {
    let swap = proposed(&pair, 2.0);
    let swap_id = swap.id;
    let replacement = SkillId::random();
    let mut swaps = MockSwapCommand::new();
    swaps
        .expect_counter()
        .withf(move |request| request.swap_id == swap_id && request.learn_skill_id == replacement)
        .times(1)
        .returning(move |_| {
            let mut countered = swap.clone();
            countered.status = SwapStatus::Countered;
            Ok(countered)
        });
    let app = actix_test::init_service(test_app(state_with(swaps))).await;
    let req = as_caller(
        actix_test::TestRequest::post().uri(&format!("/api/v1/swaps/{swap_id}/counter")),
        &pair.bo,
    )
    .set_json(json!({"learnSkillId": replacement.to_string()}))
    .to_request();

    let body: SwapBody = actix_test::call_and_read_body_json(&app, req).await;

    assert_eq!(body.status, SwapStatus::Countered);
}

#[rstest]
#[actix_web::test]
async fn outsiders_are_forbidden(pair: Pair) {
    let mut swaps = MockSwapCommand::new();
    swaps
        .expect_accept()
        .returning(|_| Err(Error::forbidden("only participants may act on a swap")));
    let app = actix_test::init_service(test_app(state_with(swaps))).await;
    let req = as_caller(
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/swaps/{}/accept", SwapId::random())),
        &pair.ada,
    )
    .to_request();

    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[rstest]
#[actix_web::test]
async fn unknown_swap_is_not_found_with_fixture_port(pair: Pair) {
    let app = actix_test::init_service(test_app(HttpState::default())).await;
    let req = as_caller(
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/swaps/{}/complete", SwapId::random())),
        &pair.ada,
    )
    .to_request();

    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
