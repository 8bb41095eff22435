//! Server settings loaded via OrthoConfig.
//!
//! Every key can come from the CLI, a config file or a `SKILLSWAP_*`
//! environment variable. The matching and capacity keys feed the domain
//! policies directly.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use skillswap::domain::{CapacityPolicy, LookupFailurePolicy, MatchingPolicy};

const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 8080);

/// Invalid combinations of settings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("fairness_threshold must be at most 100, got {0}")]
    FairnessThreshold(u8),
    #[error("{field} must be a finite, non-negative number, got {value}")]
    Hours { field: &'static str, value: f64 },
    #[error("max_matches must be at least 1")]
    MaxMatches,
}

/// Runtime settings for the marketplace server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SKILLSWAP")]
pub struct ServerSettings {
    /// PostgreSQL connection string; the in-memory store is used when unset.
    pub database_url: Option<String>,
    /// Listen address, `0.0.0.0:8080` by default.
    pub bind_addr: Option<SocketAddr>,
    /// Minimum fairness score a match must reach.
    #[ortho_config(default = 60)]
    pub fairness_threshold: u8,
    /// Remaining hours both sides need for a match to be shown.
    #[ortho_config(default = 0.5)]
    pub min_capacity_hours: f64,
    #[ortho_config(default = 20)]
    pub max_matches: usize,
    /// Stand-in for unlimited capacity when bounding joint hours.
    #[ortho_config(default = 10.0)]
    pub unlimited_hours_ceiling: f64,
    /// Treat failed capacity lookups as unlimited.
    #[ortho_config(default = true)]
    pub capacity_fail_open: bool,
    #[ortho_config(default = 2000)]
    pub lookup_timeout_ms: u64,
    #[ortho_config(default = 300)]
    pub profile_cache_ttl_secs: u64,
}

impl ServerSettings {
    /// Listen address with the default applied.
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr.unwrap_or(DEFAULT_BIND_ADDR)
    }

    /// Reject settings the domain policies cannot honour.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.fairness_threshold > 100 {
            return Err(SettingsError::FairnessThreshold(self.fairness_threshold));
        }
        for (field, value) in [
            ("min_capacity_hours", self.min_capacity_hours),
            ("unlimited_hours_ceiling", self.unlimited_hours_ceiling),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SettingsError::Hours { field, value });
            }
        }
        if self.max_matches == 0 {
            return Err(SettingsError::MaxMatches);
        }
        Ok(())
    }

    /// Matcher settings derived from this configuration.
    pub fn matching_policy(&self) -> MatchingPolicy {
        MatchingPolicy {
            fairness_threshold: self.fairness_threshold,
            min_capacity_hours: self.min_capacity_hours,
            max_matches: self.max_matches,
            unlimited_hours_ceiling: self.unlimited_hours_ceiling,
        }
    }

    /// Ledger settings derived from this configuration.
    pub fn capacity_policy(&self) -> CapacityPolicy {
        CapacityPolicy {
            on_lookup_failure: if self.capacity_fail_open {
                LookupFailurePolicy::FailOpen
            } else {
                LookupFailurePolicy::FailClosed
            },
            lookup_timeout: Duration::from_millis(self.lookup_timeout_ms),
        }
    }

    /// Profile cache entry lifetime.
    pub const fn profile_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_cache_ttl_secs)
    }
}
