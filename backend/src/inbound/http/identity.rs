//! Caller identity supplied by the upstream auth provider.
//!
//! Authentication happens before requests reach this service; the gateway
//! forwards the authenticated user's UUID in [`USER_ID_HEADER`]. Handlers
//! take a [`Caller`] argument and never read the header themselves.

use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpRequest, dev::Payload};
use serde_json::json;
use tracing::warn;

use crate::domain::{Error, UserId};

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(UserId);

impl Caller {
    /// The caller's user id.
    pub const fn user_id(&self) -> &UserId {
        &self.0
    }

    /// Consume the extractor and return the user id.
    pub fn into_user_id(self) -> UserId {
        self.0
    }
}

fn caller_from_request(req: &HttpRequest) -> Result<Caller, Error> {
    let raw = req
        .headers()
        .get(USER_ID_HEADER)
        .ok_or_else(|| Error::unauthorized("missing caller identity"))?;
    let value = raw
        .to_str()
        .map_err(|_| invalid_user_id("header is not valid ASCII"))?;
    UserId::new(value).map(Caller).map_err(|error| {
        warn!(%error, "rejecting request with malformed caller identity");
        invalid_user_id(&error.to_string())
    })
}

fn invalid_user_id(reason: &str) -> Error {
    Error::unauthorized(format!("invalid caller identity: {reason}")).with_details(json!({
        "header": USER_ID_HEADER,
        "code": "invalid_user_id",
    }))
}

impl FromRequest for Caller {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(caller_from_request(req))
    }
}
