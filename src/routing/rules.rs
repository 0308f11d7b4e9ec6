//! Route rule definitions.
//!
//! # Responsibilities
//! - Compile path patterns into anchored regexes
//! - Declare allowed methods and static extra variables per rule
//! - Point at the handler invoked on a successful match
//!
//! # Design Decisions
//! - Patterns are anchored at the start (`^` prepended when missing) so a
//!   rule can never match mid-path
//! - `methods == None` means "match any method, let the handler decide"
//! - Extra variables must not collide with capture names; the route table
//!   is trusted configuration, so this is asserted at build time rather
//!   than checked per request

use axum::http::Method;
use regex::Regex;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::request::RequestEnv;
use crate::http::server::AppState;

/// A request handler: pure with respect to the HTTP layer, errors are data.
pub type HandlerFn = fn(&mut RequestEnv, &AppState) -> Result<Value, ApiError>;

/// One entry of the ordered route table.
#[derive(Debug)]
pub struct RouteRule {
    /// Identifier for logging and metrics.
    pub name: &'static str,
    /// Allowed methods; `None` matches any method.
    pub methods: Option<Vec<Method>>,
    /// Compiled pattern, anchored at the path start.
    pub pattern: Regex,
    /// Handler invoked on a successful match.
    pub handler: HandlerFn,
    /// Statically declared variables merged into the per-request bag.
    pub extra_vars: Vec<(&'static str, &'static str)>,
    /// Human-readable path template (captures as `{name}`), used by the
    /// machine-readable API description.
    pub template: Option<&'static str>,
    /// Whether the handler delegates CPU-bound work to the engine and is
    /// therefore subject to load-average admission control.
    pub compute_heavy: bool,
}

impl RouteRule {
    /// Compile a rule matching any method.
    ///
    /// Panics on an invalid pattern: the route table is static and a bad
    /// pattern is a programming error caught at startup.
    pub fn new(name: &'static str, pattern: &str, handler: HandlerFn) -> Self {
        let anchored = if pattern.starts_with('^') {
            pattern.to_string()
        } else {
            format!("^{pattern}")
        };
        let pattern = Regex::new(&anchored)
            .unwrap_or_else(|error| panic!("route pattern {anchored:?} failed to compile: {error}"));
        Self {
            name,
            methods: None,
            pattern,
            handler,
            extra_vars: Vec::new(),
            template: None,
            compute_heavy: false,
        }
    }

    /// Human-readable path template for the API description.
    pub fn template(mut self, template: &'static str) -> Self {
        self.template = Some(template);
        self
    }

    /// Restrict the rule to the given methods.
    pub fn methods(mut self, methods: &[Method]) -> Self {
        self.methods = Some(methods.to_vec());
        self
    }

    /// Declare a static variable added to the per-request bag.
    pub fn extra_var(mut self, name: &'static str, value: &'static str) -> Self {
        debug_assert!(
            !self.pattern.capture_names().flatten().any(|capture| capture == name),
            "extra var {name:?} collides with a capture of rule {:?}",
            self.name
        );
        self.extra_vars.push((name, value));
        self
    }

    /// Gate the rule behind admission control.
    pub fn compute_heavy(mut self) -> Self {
        self.compute_heavy = true;
        self
    }
}
