//! Domain layer containing redirect entities and ports.
//!
//! Defines the data model and the interfaces the application layer depends
//! on, independent of storage, caching and HTTP concerns.
//!
//! # Architecture
//!
//! - [`entities`] - Core data structures
//! - [`repositories`] - Data access trait definitions
//! - [`prober`] - Outbound redirect probing port
//!
//! # Design Principles
//!
//! - Domain layer has no dependencies on infrastructure or presentation layers
//! - Traits define contracts implemented by the infrastructure layer
//! - Orchestration lives in services (see [`crate::application::services`])

pub mod entities;
pub mod prober;
pub mod repositories;
