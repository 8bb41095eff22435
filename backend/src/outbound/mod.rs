//! Outbound adapters implementing the driven domain ports.
//!
//! - **persistence**: PostgreSQL repositories using Diesel
//! - **memory**: mutex-guarded store used when no database is configured
//! - **cache**: TTL-bounded profile cache in front of either store
//!
//! Adapters translate between domain types and storage representations.
//! Their only rules are the atomic re-checks the repository ports require.

pub mod cache;
pub mod memory;
pub mod persistence;
