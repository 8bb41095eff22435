//! Test helpers for inbound HTTP components.

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::test::TestRequest;
use actix_web::{App, web};
use uuid::Uuid;

use crate::domain::{Skill, SkillId, SkillLevel, SkillRole, UserId, UserSkill};
use crate::inbound::http::configure_api;
use crate::inbound::http::identity::USER_ID_HEADER;
use crate::inbound::http::state::HttpState;

/// Build an app serving every API route under `/api/v1` with `state`.
pub fn test_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .service(web::scope("/api/v1").configure(configure_api))
}

/// Attach the caller identity header.
pub fn as_caller(request: TestRequest, user: &UserId) -> TestRequest {
    request.insert_header((USER_ID_HEADER, user.to_string()))
}

/// A shared skill with neutral scores.
pub fn skill(name: &str, category: &str) -> Skill {
    Skill {
        id: SkillId::random(),
        name: name.to_owned(),
        category: category.to_owned(),
        demand_score: Some(50.0),
        base_difficulty: Some(50.0),
    }
}

/// An active teaching declaration with the given weekly cap.
pub fn teaching(user: &UserId, skill: Skill, weekly_hours: Option<f64>) -> UserSkill {
    UserSkill {
        id: Uuid::new_v4(),
        user_id: user.clone(),
        skill,
        role: SkillRole::Teach,
        level: Some(SkillLevel::Intermediate),
        difficulty_score: Some(60.0),
        weekly_hours_available: weekly_hours,
        active: true,
    }
}
