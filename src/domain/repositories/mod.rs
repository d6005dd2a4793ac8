//! Repository trait definitions for the domain layer.
//!
//! These traits abstract the record store following the Repository pattern.
//! They are implemented by concrete repositories in the infrastructure layer.
//!
//! # Architecture
//!
//! - Traits define the contract for data operations
//! - Implementations live in `crate::infrastructure::persistence`
//! - Mock implementations are auto-generated via `mockall` for testing
//!
//! # Available Repositories
//!
//! - [`RedirectRepository`] - Redirect rule storage, lookup and paging
//! - [`PostRepository`] - Read access to content-system posts

pub mod post_repository;
pub mod redirect_repository;

pub use post_repository::PostRepository;
pub use redirect_repository::{RedirectRepository, StatusFilter};

#[cfg(test)]
pub use post_repository::MockPostRepository;
#[cfg(test)]
pub use redirect_repository::MockRedirectRepository;
