//! Builders wiring repositories and domain services into HTTP state.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::info;

use skillswap::domain::ports::{
    ProfileCache, SkillRepository, SwapRepository, UserProfileRepository,
};
use skillswap::domain::{
    CapacityLedger, MatchingService, SkillInventoryService, SwapWorkflowService,
};
use skillswap::inbound::http::state::HttpState;
use skillswap::outbound::cache::DashMapProfileCache;
use skillswap::outbound::memory::InMemoryStore;
use skillswap::outbound::persistence::{
    DbPool, DieselSkillRepository, DieselSwapRepository, DieselUserProfileRepository,
};

use super::ServerSettings;

/// The three driven repositories, backed by one store.
#[derive(Clone)]
pub(crate) struct Repositories {
    pub(crate) skills: Arc<dyn SkillRepository>,
    pub(crate) swaps: Arc<dyn SwapRepository>,
    pub(crate) profiles: Arc<dyn UserProfileRepository>,
}

impl Repositories {
    /// Diesel repositories sharing one pool.
    pub(crate) fn postgres(pool: &DbPool) -> Self {
        Self {
            skills: Arc::new(DieselSkillRepository::new(pool.clone())),
            swaps: Arc::new(DieselSwapRepository::new(pool.clone())),
            profiles: Arc::new(DieselUserProfileRepository::new(pool.clone())),
        }
    }

    /// A fresh in-memory store implementing all three ports.
    pub(crate) fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            skills: store.clone(),
            swaps: store.clone(),
            profiles: store,
        }
    }
}

/// Build the driving ports over `repositories` using the configured policies.
pub(crate) fn build_http_state(settings: &ServerSettings, repositories: Repositories) -> HttpState {
    let Repositories {
        skills,
        swaps,
        profiles,
    } = repositories;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let cache: Arc<dyn ProfileCache> = Arc::new(DashMapProfileCache::new(
        profiles,
        settings.profile_cache_ttl(),
        Arc::clone(&clock),
    ));
    let ledger = CapacityLedger::new(
        Arc::clone(&skills),
        Arc::clone(&swaps),
        settings.capacity_policy(),
    );
    let matching = MatchingService::new(
        Arc::clone(&skills),
        Arc::clone(&swaps),
        Arc::clone(&cache),
        ledger.clone(),
        settings.matching_policy(),
    );
    let workflow = SwapWorkflowService::new(
        Arc::clone(&skills),
        swaps,
        cache,
        ledger.clone(),
        clock,
    );
    info!(
        fairness_threshold = settings.fairness_threshold,
        max_matches = settings.max_matches,
        capacity_fail_open = settings.capacity_fail_open,
        "marketplace services wired"
    );
    HttpState::new(
        Arc::new(matching),
        Arc::new(ledger),
        Arc::new(workflow),
        Arc::new(SkillInventoryService::new(skills)),
    )
}
