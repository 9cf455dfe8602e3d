//! Single-use tokens with >=128 bits of entropy (spec §3: `SupplierInvitation`).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

/// Generate a URL-safe, base64-encoded random token with 256 bits of
/// entropy (comfortably above the spec's 128-bit floor).
pub fn generate_invite_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_have_at_least_128_bits_of_entropy_and_are_unique() {
        let a = generate_invite_token();
        let b = generate_invite_token();
        assert_ne!(a, b);
        // 32 raw bytes -> 256 bits, encoded without '=' padding.
        assert!(a.len() >= 32);
    }
}
