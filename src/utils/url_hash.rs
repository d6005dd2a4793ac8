//! Fixed-width lookup keys for normalized paths.

use sha2::{Digest, Sha256};

/// Hashes a normalized path into the indexed lookup key.
///
/// Returns the lowercase hex SHA-256 digest (64 characters), so arbitrarily
/// long legacy paths fit a fixed-width indexed column.
pub fn url_hash(normalized_path: &str) -> String {
    hex::encode(Sha256::digest(normalized_path.as_bytes()))
}
