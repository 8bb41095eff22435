//! Skill swap marketplace backend library.
//!
//! The domain (valuation, fairness, capacity, matching and the swap
//! workflow) lives in [`domain`]; [`inbound`] and [`outbound`] hold the HTTP
//! and storage adapters.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
