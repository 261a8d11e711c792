//! Signing helpers for outbound notification webhooks and key comparison.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the request body.
pub const SIGNATURE_HEADER: &str = "x-gym-signature";

/// Compute HMAC-SHA256 of `message` and return it hex-encoded.
///
/// # Errors
///
/// Returns `InvalidLength` if the key is rejected. HMAC accepts keys of any
/// length, so this only surfaces a broken implementation.
pub fn hmac_sha256_hex(
    secret: &str,
    message: &[u8],
) -> Result<String, hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a hex signature against `message` in constant time.
#[cfg(test)]
#[must_use]
pub fn verify_signature(secret: &str, message: &[u8], signature: &str) -> bool {
    hmac_sha256_hex(secret, message).is_ok_and(|expected| constant_time_eq(&expected, signature))
}

/// Constant-time string comparison, for API keys and signatures.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha256_known_vector() {
        // RFC 4231 test case 2.
        let result = hmac_sha256_hex("Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            result,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn signature_round_trip() {
        let body = br#"{"event":"booking_cancelled"}"#;
        let sig = hmac_sha256_hex("secret", body).unwrap();
        assert!(verify_signature("secret", body, &sig));
        assert!(!verify_signature("other", body, &sig));
        assert!(!verify_signature("secret", b"{}", &sig));
    }

    #[test]
    fn constant_time_eq_cases() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(constant_time_eq("", ""));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
        assert!(!constant_time_eq("abc", "ABC"));
    }
}
