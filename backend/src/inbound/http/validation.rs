//! Shared validation helpers for inbound HTTP adapters.
//!
//! Failures become `invalid_request` errors whose details name the field and
//! a stable `code`, so clients can highlight the offending input.

use std::str::FromStr;

use serde_json::json;
use uuid::Uuid;

use crate::domain::{Error, SkillId, SkillLevel, SkillRole, SwapId};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUuid,
    InvalidEnum,
    InvalidNumber,
}

impl ErrorCode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidUuid => "invalid_uuid",
            Self::InvalidEnum => "invalid_enum",
            Self::InvalidNumber => "invalid_number",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    const fn as_str(self) -> &'static str {
        self.0
    }
}

/// Builder for validation errors with field context.
struct ValidationError {
    field: &'static str,
    message: String,
}

impl ValidationError {
    fn new(field: FieldName, message: impl Into<String>) -> Self {
        Self {
            field: field.as_str(),
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "code": code.as_str(),
        }))
    }

    fn with_value(self, code: ErrorCode, value: impl Into<String>) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "value": value.into(),
            "code": code.as_str(),
        }))
    }
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    ValidationError::new(field, format!("missing required field: {name}"))
        .with_code(ErrorCode::MissingField)
}

pub(crate) fn invalid_uuid_error(field: FieldName, value: &str) -> Error {
    let name = field.as_str();
    ValidationError::new(field, format!("{name} must be a valid UUID"))
        .with_value(ErrorCode::InvalidUuid, value)
}

pub(crate) fn parse_uuid(value: &str, field: FieldName) -> Result<Uuid, Error> {
    Uuid::parse_str(value).map_err(|_| invalid_uuid_error(field, value))
}

pub(crate) fn parse_skill_id(value: &str, field: FieldName) -> Result<SkillId, Error> {
    parse_uuid(value, field).map(SkillId::from_uuid)
}

pub(crate) fn parse_swap_id(value: &str, field: FieldName) -> Result<SwapId, Error> {
    parse_uuid(value, field).map(SwapId::from_uuid)
}

fn parse_enum<T: FromStr>(value: &str, field: FieldName, allowed: &str) -> Result<T, Error> {
    value.parse().map_err(|_| {
        let name = field.as_str();
        ValidationError::new(field, format!("{name} must be one of: {allowed}"))
            .with_value(ErrorCode::InvalidEnum, value)
    })
}

/// Parse a required `teach` / `learn` value.
pub(crate) fn parse_role(value: Option<&str>, field: FieldName) -> Result<SkillRole, Error> {
    let raw = value.ok_or_else(|| missing_field_error(field))?;
    parse_enum(raw, field, "teach, learn")
}

/// Parse an optional skill level; absent stays absent.
pub(crate) fn parse_level(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<SkillLevel>, Error> {
    value
        .map(|raw| parse_enum(raw, field, "beginner, intermediate, advanced"))
        .transpose()
}

/// Reject NaN and infinities before they reach the domain.
pub(crate) fn finite_number(value: f64, field: FieldName) -> Result<f64, Error> {
    if value.is_finite() {
        Ok(value)
    } else {
        let name = field.as_str();
        Err(ValidationError::new(field, format!("{name} must be a finite number"))
            .with_code(ErrorCode::InvalidNumber))
    }
}
