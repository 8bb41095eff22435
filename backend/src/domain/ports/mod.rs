//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`, [`ProfileCache`]) describe what the domain
//! needs from storage; driving ports (`*Query`, `*Command`) are what inbound
//! adapters call. Every port ships a `Fixture*` implementation and, under
//! `cfg(test)`, a mockall mock.

mod macros;
pub(crate) use macros::define_port_error;

mod capacity_query;
mod match_query;
mod profile_cache;
mod skill_inventory_command;
mod skill_repository;
mod swap_command;
mod swap_repository;
mod user_profile_repository;

#[cfg(test)]
pub use capacity_query::MockCapacityQuery;
pub use capacity_query::{CapacityQuery, FixtureCapacityQuery};
#[cfg(test)]
pub use match_query::MockMatchQuery;
pub use match_query::{FixtureMatchQuery, MatchQuery};
#[cfg(test)]
pub use profile_cache::MockProfileCache;
pub use profile_cache::{FixtureProfileCache, ProfileCache, ProfileCacheError};
#[cfg(test)]
pub use skill_inventory_command::MockSkillInventoryCommand;
pub use skill_inventory_command::{FixtureSkillInventoryCommand, SkillInventoryCommand};
#[cfg(test)]
pub use skill_repository::MockSkillRepository;
pub use skill_repository::{FixtureSkillRepository, SkillRepository, SkillRepositoryError};
#[cfg(test)]
pub use swap_command::MockSwapCommand;
pub use swap_command::{
    CounterSwapRequest, FixtureSwapCommand, LockedSkill, ProposalPreferences, ProposeSwapRequest,
    SwapActionRequest, SwapCommand,
};
#[cfg(test)]
pub use swap_repository::MockSwapRepository;
pub use swap_repository::{
    Allocation, FixtureSwapRepository, SwapRepository, SwapRepositoryError,
};
#[cfg(test)]
pub use user_profile_repository::MockUserProfileRepository;
pub use user_profile_repository::{
    FixtureUserProfileRepository, UserProfileRepository, UserProfileRepositoryError,
};
