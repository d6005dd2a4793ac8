//! Repository implementations.
//!
//! Concrete implementations of domain repository traits. The PostgreSQL
//! repositories use SQLx with bound parameters; the memory repositories back
//! development setups and tests.
//!
//! # Repositories
//!
//! - [`PgRedirectRepository`] / [`MemoryRedirectRepository`] - Redirect rules
//! - [`PgPostRepository`] / [`MemoryPostRepository`] - Content-system posts

pub mod memory_post_repository;
pub mod memory_redirect_repository;
pub mod pg_post_repository;
pub mod pg_redirect_repository;

pub use memory_post_repository::MemoryPostRepository;
pub use memory_redirect_repository::MemoryRedirectRepository;
pub use pg_post_repository::PgPostRepository;
pub use pg_redirect_repository::PgRedirectRepository;
