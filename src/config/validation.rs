//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, parsable bind address)
//! - Check translation domains point at existing directories
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ApiConfig -> Result<(), Vec<ValidationError>>
//! - Runs before the config is accepted into the system

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ApiConfig;

/// One semantic problem found in a configuration.
#[derive(Debug, Error)]
#[error("{section}: {message}")]
pub struct ValidationError {
    pub section: &'static str,
    pub message: String,
}

fn problem(errors: &mut Vec<ValidationError>, section: &'static str, message: String) {
    errors.push(ValidationError { section, message });
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &ApiConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        problem(
            &mut errors,
            "listener",
            format!("bind_address {:?} is not a socket address", config.listener.bind_address),
        );
    }
    if config.listener.max_connections == 0 {
        problem(&mut errors, "listener", "max_connections must be > 0".to_string());
    }

    if config.engine.country_package.is_empty() {
        problem(&mut errors, "engine", "country_package must not be empty".to_string());
    }

    if config.translations.languages.is_empty() {
        problem(&mut errors, "translations", "languages must not be empty".to_string());
    }
    for domain in &config.translations.domains {
        if domain.name.is_empty() {
            problem(&mut errors, "translations", "domain name must not be empty".to_string());
        }
        if !Path::new(&domain.dir).is_dir() {
            problem(
                &mut errors,
                "translations",
                format!("domain {:?}: {:?} is not a directory", domain.name, domain.dir),
            );
        }
    }

    if config.admission.max_load_per_core <= 0.0 {
        problem(&mut errors, "admission", "max_load_per_core must be > 0".to_string());
    }

    if config.timeouts.request_secs == 0 {
        problem(&mut errors, "timeouts", "request_secs must be > 0".to_string());
    }
    if config.security.max_body_size == 0 {
        problem(&mut errors, "security", "max_body_size must be > 0".to_string());
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        problem(
            &mut errors,
            "observability",
            format!(
                "metrics_address {:?} is not a socket address",
                config.observability.metrics_address
            ),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TranslationDomainConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ApiConfig::default()).is_ok());
    }

    #[test]
    fn test_all_errors_are_collected() {
        let mut config = ApiConfig::default();
        config.listener.bind_address = "not-an-address".to_string();
        config.engine.country_package = String::new();
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        let sections: Vec<&str> = errors.iter().map(|error| error.section).collect();
        assert!(sections.contains(&"listener"));
        assert!(sections.contains(&"engine"));
        assert!(sections.contains(&"timeouts"));
    }

    #[test]
    fn test_missing_catalog_dir_is_reported() {
        let mut config = ApiConfig::default();
        config.translations.domains.push(TranslationDomainConfig {
            name: "country".to_string(),
            dir: "/nonexistent/i18n".to_string(),
        });
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|error| error.section == "translations"));
    }
}
