//! Webhook Verification
//!
//! Subscription handshake and `X-Hub-Signature-256` body signature checks.

use crate::config::WebhookConfig;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

/// `hub.mode` value sent when the platform confirms a subscription
pub const SUBSCRIBE_MODE: &str = "subscribe";

/// Checks inbound callbacks against the configured app secret and verify token.
///
/// Failures are reported as `None`/`false`; the HTTP layer picks the response.
#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    config: WebhookConfig,
}

impl SignatureVerifier {
    pub fn new(config: WebhookConfig) -> Self {
        Self { config }
    }

    /// Answer the subscription handshake.
    ///
    /// Returns the challenge only when a verify token is configured, `mode`
    /// is `subscribe` and `token` matches.
    pub fn verify_handshake(&self, mode: &str, token: &str, challenge: &str) -> Option<String> {
        let expected = self.config.verify_token.as_deref()?;

        if mode == SUBSCRIBE_MODE && token == expected {
            Some(challenge.to_string())
        } else {
            None
        }
    }

    /// Check an `algorithm=hexdigest` header against the raw request body.
    ///
    /// Always passes when no app secret is configured. Fails closed on a
    /// missing or malformed header and on unsupported algorithms.
    pub fn validate_signature(&self, signature_header: Option<&str>, raw_body: &[u8]) -> bool {
        let Some(secret) = self.config.app_secret.as_deref() else {
            return true;
        };

        let Some((algorithm, digest)) = signature_header.and_then(|h| h.split_once('=')) else {
            return false;
        };

        match hmac_hex(algorithm, secret.as_bytes(), raw_body) {
            Some(expected) => timing_safe_eq(expected.as_bytes(), digest.as_bytes()),
            None => false,
        }
    }
}

/// Header value for `body` signed with `secret`, in `sha256=<hex>` form
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    let digest = hmac_hex("sha256", secret.as_bytes(), body).unwrap_or_default();
    format!("sha256={}", digest)
}

/// Lowercase hex HMAC of `body` for a supported algorithm name
fn hmac_hex(algorithm: &str, key: &[u8], body: &[u8]) -> Option<String> {
    match algorithm {
        "sha256" => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key).ok()?;
            mac.update(body);
            Some(hex::encode(mac.finalize().into_bytes()))
        }
        "sha512" => {
            let mut mac = Hmac::<Sha512>::new_from_slice(key).ok()?;
            mac.update(body);
            Some(hex::encode(mac.finalize().into_bytes()))
        }
        _ => None,
    }
}

/// Constant-time comparison for equal-length inputs
fn timing_safe_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
