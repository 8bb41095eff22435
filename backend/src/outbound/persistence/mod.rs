//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repositories run on `diesel-async` over a `bb8` pool. Row structs
//! (`models.rs`) and table definitions (`schema.rs`) stay private to this
//! module; only domain types cross the boundary, and database errors are
//! mapped to each port's error enum with raw messages logged, not returned.
//!
//! # Example
//!
//! ```no_run
//! # async fn wire() -> Result<(), Box<dyn std::error::Error>> {
//! use skillswap::outbound::persistence::{
//!     DbPool, DieselSwapRepository, PoolConfig, run_pending_migrations,
//! };
//!
//! let url = "postgres://localhost/skillswap";
//! run_pending_migrations(url).await?;
//! let pool = DbPool::new(PoolConfig::new(url)).await?;
//! let swaps = DieselSwapRepository::new(pool);
//! # let _ = swaps;
//! # Ok(())
//! # }
//! ```

mod diesel_basic_error_mapping;
mod diesel_skill_repository;
mod diesel_swap_repository;
mod diesel_user_profile_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_skill_repository::DieselSkillRepository;
pub use diesel_swap_repository::DieselSwapRepository;
pub use diesel_user_profile_repository::DieselUserProfileRepository;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
