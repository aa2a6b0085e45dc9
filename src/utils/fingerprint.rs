/// Content fingerprints for published batches
use sha2::{Digest, Sha256};

/// Short SHA-256 hex digest of a serialized batch, for log correlation
pub fn batch_fingerprint(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)[..16].to_string()
}
