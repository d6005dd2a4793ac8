//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for data persistence, caching and outbound HTTP.
//!
//! # Modules
//!
//! - [`cache`] - Lookup cache backends (memory, Redis, no-op)
//! - [`http`] - reqwest-based redirect prober
//! - [`persistence`] - PostgreSQL and in-memory repositories

pub mod cache;
pub mod http;
pub mod persistence;
