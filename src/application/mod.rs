//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating repository,
//! cache and prober calls. Services consume trait objects and provide a
//! clean API for HTTP handlers and the admin CLI.
//!
//! # Available Services
//!
//! - [`services::redirect_service::RedirectService`] - Live resolution, rule creation and import
//! - [`services::rule_validator::RuleValidator`] - Destination allow-listing and post checks
//! - [`services::verification_service::VerificationService`] - Batch verification passes

pub mod services;
