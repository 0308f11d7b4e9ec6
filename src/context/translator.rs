//! Locale catalog resolution.
//!
//! # Responsibilities
//! - Load per-domain message catalogs from disk (JSON, one file per tag)
//! - Resolve a language tag list against the available catalogs
//! - Compose domains into a single fallback chain
//!
//! # Design Decisions
//! - Lookup consults the most specific domain first (application, then
//!   country package, then library); the ultimate fallback is the identity
//!   translation, so a missing message never errors
//! - Catalog parse failures degrade to an empty catalog and log once at
//!   build time
//! - Built translators are cached process-wide, keyed by the resolved
//!   language list; catalogs are immutable after load

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Deserialize;

/// A translation domain: a named directory of `<tag>.json` catalogs.
///
/// Domains are declared least specific first (library, country package,
/// application).
#[derive(Debug, Clone)]
pub struct TranslationDomain {
    pub name: String,
    pub dir: PathBuf,
}

/// On-disk catalog format: `{"messages": {"key": "translation"}}`.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    messages: HashMap<String, String>,
}

/// One domain's catalog resolved for a concrete language list.
#[derive(Debug, Default)]
struct Catalog {
    messages: HashMap<String, String>,
}

impl Catalog {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }
}

/// A locale-specific message resolver with a domain fallback chain.
#[derive(Debug)]
pub struct Translator {
    languages: Vec<String>,
    /// Most specific domain first.
    layers: Vec<(String, Catalog)>,
}

impl Translator {
    /// A translator with no catalogs: every key translates to itself.
    pub fn identity(languages: Vec<String>) -> Self {
        Self {
            languages,
            layers: Vec::new(),
        }
    }

    /// The language tags this translator was resolved for.
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Translate a message key, degrading layer by layer down to the key
    /// itself.
    pub fn translate<'a>(&'a self, key: &'a str) -> &'a str {
        for (_, catalog) in &self.layers {
            if let Some(message) = catalog.lookup(key) {
                return message;
            }
        }
        key
    }
}

/// Process-wide factory and cache for [`Translator`] instances.
///
/// The underlying catalogs are loaded from disk once per (domain, language
/// list) and shared read-only across requests.
pub struct TranslatorRegistry {
    domains: Vec<TranslationDomain>,
    cache: DashMap<String, Arc<Translator>>,
}

impl TranslatorRegistry {
    pub fn new(domains: Vec<TranslationDomain>) -> Self {
        Self {
            domains,
            cache: DashMap::new(),
        }
    }

    /// Get or build the translator for a language tag list.
    pub fn translator(&self, languages: &[String]) -> Arc<Translator> {
        let key = languages.join(",");
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }
        let built = Arc::new(self.build(languages));
        self.cache.insert(key, built.clone());
        built
    }

    /// Layer catalogs in declared domain order, then reverse so lookup
    /// starts at the most specific domain.
    fn build(&self, languages: &[String]) -> Translator {
        let mut layers: Vec<(String, Catalog)> = self
            .domains
            .iter()
            .map(|domain| {
                (
                    domain.name.clone(),
                    load_catalog(&domain.dir, &domain.name, languages),
                )
            })
            .collect();
        layers.reverse();
        Translator {
            languages: languages.to_vec(),
            layers,
        }
    }
}

/// Resolve the first language tag with a catalog file in `dir`.
fn load_catalog(dir: &Path, domain: &str, languages: &[String]) -> Catalog {
    for tag in languages {
        let path = dir.join(format!("{tag}.json"));
        if !path.exists() {
            continue;
        }
        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<CatalogFile>(&content) {
                Ok(file) => {
                    return Catalog {
                        messages: file.messages,
                    };
                }
                Err(error) => {
                    tracing::error!(
                        domain = %domain,
                        path = %path.display(),
                        error = %error,
                        "Catalog parse failed, degrading to empty catalog"
                    );
                    return Catalog::default();
                }
            },
            Err(error) => {
                tracing::error!(
                    domain = %domain,
                    path = %path.display(),
                    error = %error,
                    "Catalog read failed, degrading to empty catalog"
                );
                return Catalog::default();
            }
        }
    }
    Catalog::default()
}
