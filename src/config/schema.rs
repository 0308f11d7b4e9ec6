//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API
//! facade. All types derive Serde traits for deserialization from config
//! files.

use serde::{Deserialize, Serialize};

/// Root configuration for the API facade.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Computation engine selection (country package, reforms, debug).
    pub engine: EngineConfig,

    /// Locale catalog configuration.
    pub translations: TranslationsConfig,

    /// Load-average admission control.
    pub admission: AdmissionConfig,

    /// Validated-scenario cache.
    pub scenario_cache: ScenarioCacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request hardening.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:2000").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:2000".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Computation engine selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Country package identifier.
    pub country_package: String,

    /// Reform identifiers applied on top of the country package.
    pub reforms: Vec<String>,

    /// Surface internal error detail to clients.
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            country_package: "demo-fr".to_string(),
            reforms: Vec::new(),
            debug: false,
        }
    }
}

/// Locale catalog configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationsConfig {
    /// Default language tags, most specific first.
    pub languages: Vec<String>,

    /// Translation domains in declared order: library, country package,
    /// application. Lookup consults the most specific (last) first.
    pub domains: Vec<TranslationDomainConfig>,
}

impl Default for TranslationsConfig {
    fn default() -> Self {
        Self {
            languages: vec!["fr-FR".to_string(), "fr".to_string()],
            domains: Vec::new(),
        }
    }
}

/// One translation domain: a named directory of `<tag>.json` catalogs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslationDomainConfig {
    pub name: String,
    pub dir: String,
}

/// Load-average admission control.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Enable the gate for compute-heavy endpoints.
    pub enabled: bool,

    /// Load-average-per-core ceiling above which requests are rejected.
    pub max_load_per_core: f64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_load_per_core: 1.0,
        }
    }
}

/// Validated-scenario cache.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScenarioCacheConfig {
    /// Maximum cached scenarios; 0 disables caching.
    pub capacity: usize,
}

impl Default for ScenarioCacheConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Request hardening.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
