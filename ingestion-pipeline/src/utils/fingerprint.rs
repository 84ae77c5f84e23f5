use sha2::{Digest, Sha256};

/// Content identity of an article: hex SHA-256 of the normalized body only.
pub fn fingerprint(body: &str) -> String {
    let digest = Sha256::digest(body.as_bytes());
    format!("{digest:x}")
}
