//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on driving ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    CapacityQuery, FixtureCapacityQuery, FixtureMatchQuery, FixtureSkillInventoryCommand,
    FixtureSwapCommand, MatchQuery, SkillInventoryCommand, SwapCommand,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub matches: Arc<dyn MatchQuery>,
    pub capacity: Arc<dyn CapacityQuery>,
    pub swaps: Arc<dyn SwapCommand>,
    pub skills: Arc<dyn SkillInventoryCommand>,
}

impl HttpState {
    /// Construct state from the four driving ports.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use skillswap::domain::ports::{
    ///     FixtureCapacityQuery, FixtureMatchQuery, FixtureSkillInventoryCommand,
    ///     FixtureSwapCommand,
    /// };
    /// use skillswap::inbound::http::state::HttpState;
    ///
    /// let state = HttpState::new(
    ///     Arc::new(FixtureMatchQuery),
    ///     Arc::new(FixtureCapacityQuery),
    ///     Arc::new(FixtureSwapCommand),
    ///     Arc::new(FixtureSkillInventoryCommand),
    /// );
    /// let _swaps = state.swaps.clone();
    /// ```
    pub fn new(
        matches: Arc<dyn MatchQuery>,
        capacity: Arc<dyn CapacityQuery>,
        swaps: Arc<dyn SwapCommand>,
        skills: Arc<dyn SkillInventoryCommand>,
    ) -> Self {
        Self {
            matches,
            capacity,
            swaps,
            skills,
        }
    }

    /// Replace the match query port.
    #[must_use]
    pub fn with_matches(mut self, matches: Arc<dyn MatchQuery>) -> Self {
        self.matches = matches;
        self
    }

    /// Replace the capacity query port.
    #[must_use]
    pub fn with_capacity(mut self, capacity: Arc<dyn CapacityQuery>) -> Self {
        self.capacity = capacity;
        self
    }

    /// Replace the swap command port.
    #[must_use]
    pub fn with_swaps(mut self, swaps: Arc<dyn SwapCommand>) -> Self {
        self.swaps = swaps;
        self
    }

    /// Replace the skill inventory port.
    #[must_use]
    pub fn with_skills(mut self, skills: Arc<dyn SkillInventoryCommand>) -> Self {
        self.skills = skills;
        self
    }
}

impl Default for HttpState {
    /// Fixture-backed state for tests and the OpenAPI smoke checks.
    fn default() -> Self {
        Self::new(
            Arc::new(FixtureMatchQuery),
            Arc::new(FixtureCapacityQuery),
            Arc::new(FixtureSwapCommand),
            Arc::new(FixtureSkillInventoryCommand),
        )
    }
}
