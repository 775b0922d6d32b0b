//! Razorpay payment signature checks.
//!
//! Checkout creates a gateway order reference; the client completes payment
//! with Razorpay and posts back `(order_id, payment_id, signature)`. The
//! signature is `hex(HMAC-SHA256(key_secret, "{order_id}|{payment_id}"))`.
//! No outbound call is made.

use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;
use uuid::Uuid;

use crate::config::RazorpayConfig;

type HmacSha256 = Hmac<Sha256>;

/// New gateway order reference for an online order.
#[must_use]
pub fn new_gateway_order_id() -> String {
    format!("order_{}", Uuid::new_v4().simple())
}

/// Check a payment signature posted back by the checkout client.
#[must_use]
pub fn verify_signature(
    config: &RazorpayConfig,
    gateway_order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    let Ok(provided) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(config.key_secret.expose_secret().as_bytes())
    else {
        return false;
    };
    mac.update(format!("{gateway_order_id}|{payment_id}").as_bytes());
    mac.verify_slice(&provided).is_ok()
}

/// Constant-time string comparison for shared tokens.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn sign(secret: &str, gateway_order_id: &str, payment_id: &str) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
        mac.update(format!("{gateway_order_id}|{payment_id}").as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    fn config() -> RazorpayConfig {
        RazorpayConfig {
            key_id: "rzp_test_key".to_owned(),
            key_secret: SecretString::from("rzp-test-secret"),
        }
    }

    #[test]
    fn test_signature_roundtrip() {
        let signature = sign("rzp-test-secret", "order_abc", "pay_123").unwrap();
        assert!(verify_signature(&config(), "order_abc", "pay_123", &signature));
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let signature = sign("rzp-test-secret", "order_abc", "pay_123").unwrap();
        assert!(!verify_signature(&config(), "order_abc", "pay_999", &signature));
        assert!(!verify_signature(&config(), "order_abc", "pay_123", "not-hex"));
        assert!(!verify_signature(&config(), "order_abc", "pay_123", ""));
    }

    #[test]
    fn test_gateway_order_id_shape() {
        let id = new_gateway_order_id();
        assert!(id.starts_with("order_"));
        assert_eq!(id.len(), "order_".len() + 32);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("token", "token"));
        assert!(!constant_time_eq("token", "tokem"));
        assert!(!constant_time_eq("token", "token2"));
    }
}
