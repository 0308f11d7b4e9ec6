//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch pipeline)
//!     → cors.rs (preflight short-circuit or allow headers)
//!     → [routing layer picks the handler]
//!     → request.rs (query, route vars, JSON body, context chain)
//!     → envelope.rs (uniform JSON wrapper, status, headers)
//!     → Send to client
//! ```

pub mod cors;
pub mod envelope;
pub mod request;
pub mod server;

pub use server::{AppState, HttpServer};
