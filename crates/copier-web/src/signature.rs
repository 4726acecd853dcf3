//! `X-Hub-Signature-256` verification (§4.8 step 3).

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compares `header_value` (expected form `sha256=<hex>`) against the
/// HMAC-SHA256 of `body` under `secret`, in constant time.
///
/// Returns `false` for a missing `sha256=` prefix or invalid hex, the same
/// outcome as a real mismatch, so no extra branch leaks timing information
/// about *why* verification failed.
pub fn verify(secret: &[u8], body: &[u8], header_value: &str) -> bool {
    let Some(hex_digest) = header_value.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &[u8], body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_correct_signature() {
        let secret = b"top-secret";
        let body = b"{\"action\":\"closed\"}";
        let header = sign(secret, body);
        assert!(verify(secret, body, &header));
    }

    #[test]
    fn rejects_incorrect_signature() {
        let secret = b"top-secret";
        let body = b"{\"action\":\"closed\"}";
        assert!(!verify(secret, body, "sha256=deadbeef"));
    }

    #[test]
    fn rejects_missing_prefix() {
        let secret = b"top-secret";
        let body = b"{}";
        let header = hex::encode(b"not-a-real-mac");
        assert!(!verify(secret, body, &header));
    }

    #[test]
    fn rejects_tampered_body() {
        let secret = b"top-secret";
        let body = b"{\"action\":\"closed\"}";
        let header = sign(secret, body);
        assert!(!verify(secret, b"{\"action\":\"opened\"}", &header));
    }
}
