//! Observability subsystem.
//!
//! # Responsibilities
//! - Prometheus metrics exposition (optional, from config)
//! - Structured logging is initialized in `main` via `tracing-subscriber`;
//!   handlers and the dispatch pipeline emit `tracing` events with
//!   request_id/method/path/status fields

pub mod metrics;
