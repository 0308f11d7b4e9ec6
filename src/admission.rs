//! Load-average admission control.
//!
//! # Responsibilities
//! - Sample the OS load average before compute-heavy handlers run
//! - Reject with 503 when load-per-core exceeds the configured ceiling
//!
//! # Design Decisions
//! - Cooperative backpressure: reads an OS counter, no locking
//! - Sampler is a trait so tests can inject a deterministic load
//! - A sampler failure admits the request; admission control must never
//!   turn a metrics hiccup into an outage

use std::sync::Arc;

use crate::error::ApiError;

/// One load-average observation.
#[derive(Debug, Clone, Copy)]
pub struct LoadSample {
    /// One-minute load average.
    pub one_minute: f64,
    /// Logical core count used to normalize the load.
    pub cores: usize,
}

/// Source of load observations.
pub trait LoadSampler: Send + Sync {
    fn sample(&self) -> Option<LoadSample>;
}

/// Production sampler reading `/proc/loadavg`.
pub struct ProcLoadSampler;

impl LoadSampler for ProcLoadSampler {
    fn sample(&self) -> Option<LoadSample> {
        let content = std::fs::read_to_string("/proc/loadavg").ok()?;
        let one_minute: f64 = content.split_whitespace().next()?.parse().ok()?;
        let cores = std::thread::available_parallelism().map_or(1, usize::from);
        Some(LoadSample { one_minute, cores })
    }
}

/// Gate applied before compute-heavy handlers.
pub struct AdmissionControl {
    sampler: Arc<dyn LoadSampler>,
    enabled: bool,
    max_load_per_core: f64,
}

impl AdmissionControl {
    pub fn new(sampler: Arc<dyn LoadSampler>, enabled: bool, max_load_per_core: f64) -> Self {
        Self {
            sampler,
            enabled,
            max_load_per_core,
        }
    }

    /// Admit or reject the request, before any expensive work.
    pub fn admit(&self) -> Result<(), ApiError> {
        if !self.enabled {
            return Ok(());
        }
        let Some(sample) = self.sampler.sample() else {
            return Ok(());
        };
        let cores = sample.cores.max(1) as f64;
        let per_core = sample.one_minute / cores;
        if per_core > self.max_load_per_core {
            tracing::warn!(
                load = sample.one_minute,
                cores = sample.cores,
                per_core = per_core,
                ceiling = self.max_load_per_core,
                "Admission control rejecting compute-heavy request"
            );
            return Err(ApiError::Overloaded);
        }
        Ok(())
    }
}
