//! Per-request context chain.
//!
//! # Data Flow
//! ```text
//! request arrives
//!     → Ctx::child(null context) with languages from Accept-Language
//!     → handler reads/overrides ambient values (language, correlation token)
//!     → translator built lazily on first access, cached on the node
//!     → resolved locale round-tripped into the request's ambient store
//!     → Ctx dropped at end of request
//! ```
//!
//! # Design Decisions
//! - Explicit `resolve(key)` over an immutable parent chain; the first node
//!   defining a value wins, no reflection-style fallback
//! - Parents are shared via `Arc` and never mutated by children; only the
//!   chain head (owned by the current request) is writable
//! - Setting a language invalidates that node's cached translator only;
//!   the translator is rebuilt lazily on next access
//! - The null context always resolves languages to the default tag list
//!   and never has a parent

pub mod translator;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::context::translator::{Translator, TranslatorRegistry};

/// Default locale tag list, most specific first.
pub const DEFAULT_LANGUAGES: &[&str] = &["fr-FR", "fr"];

/// Well-known key under which the locale tag list is stored.
pub const LANGUAGES_KEY: &str = "languages";

/// A node in the per-request context chain.
pub struct Ctx {
    parent: Option<Arc<Ctx>>,
    vars: HashMap<String, Value>,
    /// Lazily built, invalidated when this node's language changes.
    translator: Mutex<Option<Arc<Translator>>>,
    registry: Arc<TranslatorRegistry>,
}

impl Ctx {
    /// The well-known root: no parent, default languages.
    pub fn null(registry: Arc<TranslatorRegistry>) -> Arc<Self> {
        let mut vars = HashMap::new();
        vars.insert(LANGUAGES_KEY.to_string(), default_languages_value());
        Arc::new(Self {
            parent: None,
            vars,
            translator: Mutex::new(None),
            registry,
        })
    }

    /// A writable child scope delegating lookups to `parent`.
    pub fn child(parent: &Arc<Self>) -> Self {
        Self {
            parent: Some(parent.clone()),
            vars: HashMap::new(),
            translator: Mutex::new(None),
            registry: parent.registry.clone(),
        }
    }

    /// Resolve a key against this node and its parent chain.
    pub fn resolve(&self, key: &str) -> Option<&Value> {
        self.get_containing(key, 0).and_then(|node| node.vars.get(key))
    }

    /// The Nth ancestor (skipping `depth` matches) defining `key`.
    ///
    /// `depth == 0` finds the nearest defining node; `depth == 1` the next
    /// enclosing one. Used to distinguish a value set on the current request
    /// scope from one inherited from an enclosing scope.
    pub fn get_containing(&self, key: &str, depth: usize) -> Option<&Self> {
        let mut node = self;
        let mut remaining = depth;
        loop {
            if node.vars.contains_key(key) {
                if remaining == 0 {
                    return Some(node);
                }
                remaining -= 1;
            }
            node = node.parent.as_deref()?;
        }
    }

    /// Set an ambient value on this node, shadowing the parent chain.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.vars.insert(key.into(), value);
    }

    /// The resolved locale tag list.
    pub fn languages(&self) -> Vec<String> {
        self.resolve(LANGUAGES_KEY)
            .and_then(languages_from_value)
            .unwrap_or_else(|| DEFAULT_LANGUAGES.iter().map(|t| (*t).to_string()).collect())
    }

    /// True when a language was set on this node rather than inherited.
    pub fn has_local_languages(&self) -> bool {
        self.vars.contains_key(LANGUAGES_KEY)
    }

    /// Override the locale on this node and invalidate its cached
    /// translator. Parents' caches are untouched.
    pub fn set_languages(&mut self, languages: Vec<String>) {
        let tags = Value::Array(languages.into_iter().map(Value::String).collect());
        self.vars.insert(LANGUAGES_KEY.to_string(), tags);
        if let Ok(mut cached) = self.translator.lock() {
            *cached = None;
        }
    }

    /// The translator for the resolved locale, built on first access.
    pub fn translator(&self) -> Arc<Translator> {
        if let Ok(mut cached) = self.translator.lock() {
            if let Some(translator) = cached.as_ref() {
                return translator.clone();
            }
            let built = self.registry.translator(&self.languages());
            *cached = Some(built.clone());
            return built;
        }
        // Poisoned lock: rebuild without caching.
        self.registry.translator(&self.languages())
    }

    /// Snapshot of the resolved locale for the request's ambient store, so
    /// nested requests observe the same locale without re-resolving it.
    pub fn ambient(&self) -> AmbientLocale {
        AmbientLocale {
            languages: self.languages(),
            translator: self.translator(),
        }
    }

    /// A child scope seeded from a previously captured ambient locale.
    pub fn from_ambient(parent: &Arc<Self>, ambient: &AmbientLocale) -> Self {
        let mut ctx = Self::child(parent);
        ctx.set_languages(ambient.languages.clone());
        if let Ok(mut cached) = ctx.translator.lock() {
            *cached = Some(ambient.translator.clone());
        }
        ctx
    }
}

/// Locale snapshot stored in the request's extension map.
#[derive(Clone)]
pub struct AmbientLocale {
    pub languages: Vec<String>,
    pub translator: Arc<Translator>,
}

fn default_languages_value() -> Value {
    Value::Array(
        DEFAULT_LANGUAGES
            .iter()
            .map(|tag| Value::String((*tag).to_string()))
            .collect(),
    )
}

fn languages_from_value(value: &Value) -> Option<Vec<String>> {
    let tags: Vec<String> = value
        .as_array()?
        .iter()
        .filter_map(|tag| tag.as_str().map(str::to_string))
        .collect();
    if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}
