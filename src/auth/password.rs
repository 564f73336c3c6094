use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Salted digest pair as stored alongside a user or reset request.
#[derive(Debug, Clone)]
pub struct Credential {
    pub digest: String,
    pub salt: String,
}

/// Hash a secret with a fresh random salt. The digest is the hex SHA-256 of
/// `secret || salt`; the salt is stored next to it so verification can
/// recompute the same function.
pub fn hash_secret(secret: &str) -> Credential {
    let mut raw = [0u8; 16];
    OsRng.fill_bytes(&mut raw);
    let salt = hex::encode(raw);
    let digest = digest_with_salt(secret, &salt);
    Credential { digest, salt }
}

pub fn verify_secret(digest: &str, salt: &str, candidate: &str) -> bool {
    digest_with_salt(candidate, salt) == digest
}

fn digest_with_salt(secret: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let cred = hash_secret("Secur3P@ssw0rd!");
        assert!(verify_secret(&cred.digest, &cred.salt, "Secur3P@ssw0rd!"));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let cred = hash_secret("correct-horse-battery-staple");
        assert!(!verify_secret(&cred.digest, &cred.salt, "wrong-password"));
    }

    #[test]
    fn same_secret_hashes_differently_each_time() {
        let a = hash_secret("secret1");
        let b = hash_secret("secret1");
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn verify_is_deterministic() {
        let cred = hash_secret("secret1");
        assert!(verify_secret(&cred.digest, &cred.salt, "secret1"));
        assert!(verify_secret(&cred.digest, &cred.salt, "secret1"));
    }
}
