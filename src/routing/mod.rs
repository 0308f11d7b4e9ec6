//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (method, path)
//!     → router.rs (scan rule table in declaration order)
//!     → rules.rs (compiled pattern, allowed methods, extra vars)
//!     → Return: RouteMatch (handler + variable bag + remainder)
//!               or a structured 400/404/405
//! ```
//!
//! # Design Decisions
//! - Rules are compiled at startup and immutable at runtime
//! - Patterns are anchored at the path start; first structural match is
//!   authoritative, including for method mismatches (a 405 never falls
//!   through to a later rule)
//! - Dispatch errors are values, never raised past the dispatch boundary

pub mod router;
pub mod rules;

pub use router::{RouteMatch, Router};
pub use rules::{HandlerFn, RouteRule};
