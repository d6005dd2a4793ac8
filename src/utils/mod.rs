//! Utility functions for URL processing.
//!
//! - [`url_normalizer`] - Reduction of request URLs to lookup keys
//! - [`url_hash`] - Fixed-width digests of normalized paths
//! - [`csv_pairs`] - `from,to` CSV reading for bulk import
//! - [`query_args`] - Extraction and re-attachment of preserved query parameters

pub mod csv_pairs;
pub mod query_args;
pub mod url_hash;
pub mod url_normalizer;
