//! HTTP inbound adapter exposing the marketplace REST endpoints.
//!
//! Every route except the health checks requires an `x-user-id` header; see
//! [`identity::Caller`].

use actix_web::web;

pub mod capacity;
pub mod error;
pub mod health;
pub mod identity;
pub mod matches;
pub mod skills;
pub mod state;
pub mod swaps;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

pub use error::ApiResult;

/// Register every authenticated API handler on `cfg`.
///
/// Mount it under `/api/v1` and provide [`state::HttpState`] as app data.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(matches::list_matches)
        .service(matches::list_discovery)
        .service(capacity::get_capacity)
        .service(skills::list_skills)
        .service(skills::add_skill)
        .service(skills::remove_skill)
        .service(skills::apply_assessment)
        .service(swaps::propose_swap)
        .service(swaps::accept_swap)
        .service(swaps::decline_swap)
        .service(swaps::counter_swap)
        .service(swaps::complete_swap)
        .service(swaps::cancel_swap);
}
