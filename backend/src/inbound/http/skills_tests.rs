//! Tests for skill inventory HTTP handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::domain::ports::MockSkillInventoryCommand;
use crate::domain::{ErrorCode, SkillId, UserId};
use crate::inbound::http::test_utils::{as_caller, skill, teaching, test_app};

#[fixture]
fn ada() -> UserId {
    UserId::random()
}

fn state_with(skills: MockSkillInventoryCommand) -> HttpState {
    HttpState::default().with_skills(Arc::new(skills))
}

#[rstest]
#[actix_web::test]
async fn add_skill_returns_created_declaration(ada: UserId) {
    let mut skills = MockSkillInventoryCommand::new();
    let expected_user = ada.clone();
    skills
        .expect_add_skill()
        .withf(move |user, declaration| {
            user == &expected_user
                && declaration.role == SkillRole::Teach
                && declaration.level == Some(SkillLevel::Advanced)
                && declaration.weekly_hours_available == Some(5.0)
        })
        .times(1)
        .returning(|user, declaration| {
            let shared = skill(&declaration.name, &declaration.category);
            let mut row = teaching(user, shared, declaration.weekly_hours_available);
            row.level = declaration.level;
            Ok(row)
        });
    let app = actix_test::init_service(test_app(state_with(skills))).await;
    let req = as_caller(actix_test::TestRequest::post().uri("/api/v1/skills"), &ada)
        .set_json(json!({
            "name": "Pottery",
            "category": "Crafts",
            "role": "teach",
            "level": "advanced",
            "weeklyHoursAvailable": 5.0
        }))
        .to_request();

    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(res).await;

    assert_eq!(body["name"], "Pottery");
    assert_eq!(body["role"], "teach");
    assert_eq!(body["level"], "advanced");
    assert_eq!(body["weeklyHoursAvailable"], 5.0);
}

#[rstest]
#[actix_web::test]
async fn add_skill_rejects_unknown_role_before_calling_port(ada: UserId) {
    let mut skills = MockSkillInventoryCommand::new();
    skills.expect_add_skill().never();
    let app = actix_test::init_service(test_app(state_with(skills))).await;
    let req = as_caller(actix_test::TestRequest::post().uri("/api/v1/skills"), &ada)
        .set_json(json!({"name": "Pottery", "category": "Crafts", "role": "mentor"}))
        .to_request();

    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Error = actix_test::read_body_json(res).await;

    assert_eq!(body.code(), ErrorCode::InvalidRequest);
    assert_eq!(body.detail_code(), Some("invalid_enum"));
}

#[rstest]
#[actix_web::test]
async fn requests_without_identity_are_unauthorised() {
    let app = actix_test::init_service(test_app(HttpState::default())).await;
    let req = actix_test::TestRequest::get()
        .uri("/api/v1/skills?role=teach")
        .to_request();

    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[actix_web::test]
async fn list_skills_hides_non_positive_caps(ada: UserId) {
    let mut skills = MockSkillInventoryCommand::new();
    skills
        .expect_list_skills()
        .withf(|_, role| *role == SkillRole::Teach)
        .returning(|user, _| {
            Ok(vec![
                teaching(user, skill("Guitar", "Music"), Some(0.0)),
                teaching(user, skill("Welsh", "Languages"), Some(3.0)),
            ])
        });
    let app = actix_test::init_service(test_app(state_with(skills))).await;
    let req = as_caller(
        actix_test::TestRequest::get().uri("/api/v1/skills?role=teach"),
        &ada,
    )
    .to_request();

    let body: Vec<UserSkillBody> = actix_test::call_and_read_body_json(&app, req).await;

    let caps: Vec<_> = body
        .iter()
        .map(|row| (row.name.as_str(), row.weekly_hours_available))
        .collect();
    assert_eq!(caps, vec![("Guitar", None), ("Welsh", Some(3.0))]);
}

#[rstest]
#[actix_web::test]
async fn list_skills_requires_role(ada: UserId) {
    let app = actix_test::init_service(test_app(HttpState::default())).await;
    let req = as_caller(actix_test::TestRequest::get().uri("/api/v1/skills"), &ada).to_request();

    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Error = actix_test::read_body_json(res).await;

    assert_eq!(body.detail_code(), Some("missing_field"));
}

#[rstest]
#[actix_web::test]
async fn remove_skill_returns_no_content(ada: UserId) {
    let target = SkillId::random();
    let mut skills = MockSkillInventoryCommand::new();
    skills
        .expect_remove_skill()
        .withf(move |_, skill_id, role| *skill_id == target && *role == SkillRole::Learn)
        .times(1)
        .returning(|_, _, _| Ok(()));
    let app = actix_test::init_service(test_app(state_with(skills))).await;
    let req = as_caller(
        actix_test::TestRequest::delete().uri(&format!("/api/v1/skills/{target}?role=learn")),
        &ada,
    )
    .to_request();

    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[rstest]
#[actix_web::test]
async fn remove_unknown_skill_is_not_found(ada: UserId) {
    let app = actix_test::init_service(test_app(HttpState::default())).await;
    let req = as_caller(
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/skills/{}?role=teach", SkillId::random())),
        &ada,
    )
    .to_request();

    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[rstest]
#[actix_web::test]
async fn assessment_is_forwarded_to_port(ada: UserId) {
    let target = SkillId::random();
    let mut skills = MockSkillInventoryCommand::new();
    skills
        .expect_apply_assessment()
        .withf(move |_, skill_id, assessment| {
            *skill_id == target
                && assessment.level == SkillLevel::Advanced
                && assessment.difficulty == 85.0
        })
        .times(1)
        .returning(|user, _, assessment| {
            let mut row = teaching(user, skill("Pottery", "Crafts"), Some(5.0));
            row.level = Some(assessment.level);
            row.difficulty_score = Some(assessment.difficulty);
            Ok(row)
        });
    let app = actix_test::init_service(test_app(state_with(skills))).await;
    let req = as_caller(
        actix_test::TestRequest::put().uri(&format!("/api/v1/skills/{target}/assessment")),
        &ada,
    )
    .set_json(json!({"level": "advanced", "difficulty": 85.0, "explanation": "portfolio"}))
    .to_request();

    let body: UserSkillBody = actix_test::call_and_read_body_json(&app, req).await;

    assert_eq!(body.level, Some(SkillLevel::Advanced));
    assert_eq!(body.difficulty_score, Some(85.0));
}

#[rstest]
#[actix_web::test]
async fn malformed_skill_id_is_rejected(ada: UserId) {
    let app = actix_test::init_service(test_app(HttpState::default())).await;
    let req = as_caller(
        actix_test::TestRequest::delete().uri("/api/v1/skills/pottery?role=teach"),
        &ada,
    )
    .to_request();

    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Error = actix_test::read_body_json(res).await;

    assert_eq!(body.detail_code(), Some("invalid_uuid"));
}
