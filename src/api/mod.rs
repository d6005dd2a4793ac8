//! HTTP layer for the live redirect path.
//!
//! Translates unmatched requests into resolver calls and exposes service
//! health.
//!
//! # Modules
//!
//! - [`dto`] - Response serialization types
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Request tracing

pub mod dto;
pub mod handlers;
pub mod middleware;
