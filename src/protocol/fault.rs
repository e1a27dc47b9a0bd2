//! # Fault Emulator
//!
//! Probabilistic failure injection that makes the simulated acquirer behave
//! like a real network: dropped requests, service outages, issuer declines,
//! database faults, and corrupted data.
//!
//! Each fault kind is an independent Bernoulli trial per request; the
//! processor consults them in its fixed order, so an earlier-triggered
//! fault pre-empts evaluation of later ones. The policy is an explicit,
//! injectable object with a seedable random source, which keeps tests
//! deterministic.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::warn;

use crate::config::FaultConfig;
use crate::protocol::transaction::DeclineReason;

/// The failure modes the acquirer can emulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Drop the request without responding (emulated packet loss).
    Timeout,
    /// Reject with SERVICE_UNAVAILABLE before touching the body.
    ServiceUnavailable,
    /// Issuer declines the transaction; a normal business outcome.
    BankRejection,
    /// Persistence fails after authorization.
    DatabaseFailure,
    /// Generic corruption after the integrity check passes.
    DataCorruption,
}

impl FaultKind {
    pub const ALL: [FaultKind; 5] = [
        FaultKind::Timeout,
        FaultKind::ServiceUnavailable,
        FaultKind::BankRejection,
        FaultKind::DatabaseFailure,
        FaultKind::DataCorruption,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            FaultKind::Timeout => "timeout",
            FaultKind::ServiceUnavailable => "service_unavailable",
            FaultKind::BankRejection => "bank_rejection",
            FaultKind::DatabaseFailure => "database_failure",
            FaultKind::DataCorruption => "data_corruption",
        }
    }
}

/// Injectable fault policy: a fault-kind to probability mapping plus a
/// seedable random source.
pub struct FaultPolicy {
    config: FaultConfig,
    rng: Mutex<StdRng>,
}

impl FaultPolicy {
    /// Policy from configuration; honors `config.seed` when present.
    pub fn new(config: FaultConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Deterministic policy for tests, overriding any configured seed.
    pub fn seeded(config: FaultConfig, seed: u64) -> Self {
        Self {
            config,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Policy that never injects anything.
    pub fn disabled() -> Self {
        Self::new(FaultConfig::disabled())
    }

    /// Configured probability for a fault kind.
    pub fn probability(&self, kind: FaultKind) -> f64 {
        match kind {
            FaultKind::Timeout => self.config.timeout,
            FaultKind::ServiceUnavailable => self.config.service_unavailable,
            FaultKind::BankRejection => self.config.bank_rejection,
            FaultKind::DatabaseFailure => self.config.database_failure,
            FaultKind::DataCorruption => self.config.data_corruption,
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    /// Run one Bernoulli trial for the given fault kind.
    pub fn triggers(&self, kind: FaultKind) -> bool {
        let p = self.probability(kind);
        if p <= 0.0 {
            return false;
        }
        let hit = self.with_rng(|rng| rng.random::<f64>()) < p;
        if hit {
            warn!(fault = kind.name(), probability = p, "emulating fault");
        }
        hit
    }

    /// Uniform network delay in 0..=max_delay_ms. Always applied before any
    /// trial; not itself a failure.
    pub fn network_delay(&self) -> Duration {
        if self.config.max_delay_ms == 0 {
            return Duration::ZERO;
        }
        let ms = self.with_rng(|rng| rng.random_range(0..=self.config.max_delay_ms));
        Duration::from_millis(ms)
    }

    /// Decline reason drawn uniformly over all reasons.
    pub fn decline_reason(&self) -> DeclineReason {
        let idx = self.with_rng(|rng| rng.random_range(0..DeclineReason::ALL.len()));
        DeclineReason::ALL[idx]
    }
}
