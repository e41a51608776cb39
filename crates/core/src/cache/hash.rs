//! Request cache key generation.

use sha2::{Digest, Sha256};

/// Compute the storage key for a request.
///
/// Two requests share an entry when method and URL match exactly. The method
/// is length-prefixed so no split of the same bytes yields the same key.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update((method.len() as u64).to_le_bytes());
    hasher.update(method.as_bytes());
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
