//! Password hashing (spec §4.D: 8-72 characters, never stored in plain
//! text). Salted HMAC-SHA256 rather than a dedicated password-hashing
//! crate, consistent with this codebase's pattern of reaching for the
//! `sha2`/`hmac` primitives already in the dependency tree for one-off
//! crypto.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// `salt_hex$digest_hex`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::rng().fill_bytes(&mut salt);

    let mut mac = HmacSha256::new_from_slice(&salt).expect("HMAC accepts any key length");
    mac.update(password.as_bytes());
    let digest = mac.finalize().into_bytes();

    format!("{}${}", hex::encode(salt), hex::encode(digest))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected_digest) = hex::decode(digest_hex) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(&salt) else {
        return false;
    };
    mac.update(password.as_bytes());
    mac.verify_slice(&expected_digest).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_correct_password() {
        let hashed = hash_password("correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &hashed));
    }

    #[test]
    fn rejects_an_incorrect_password() {
        let hashed = hash_password("correct horse battery staple");
        assert!(!verify_password("wrong password entirely", &hashed));
    }

    #[test]
    fn two_hashes_of_the_same_password_differ_by_salt() {
        assert_ne!(hash_password("same input"), hash_password("same input"));
    }
}
