//! JSON HTTP facade over an external tax/benefit microsimulation engine.

pub mod admission;
pub mod cache;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod http;
pub mod observability;
pub mod routing;

pub use config::ApiConfig;
pub use error::ApiError;
pub use http::HttpServer;
