//! Webhook signature verification.
//!
//! Paystack signs every delivery with HMAC-SHA512 over the raw request body
//! and sends the lowercase hex digest in the `X-Paystack-Signature` header.
//! The comparison happens on the hex text itself, so a signature that differs
//! only in letter case is rejected.

use crate::secret::SecretValue;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;
use tracing::{error, warn};

type HmacSha512 = Hmac<Sha512>;

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "X-Paystack-Signature";

/// Behaviour when no webhook secret is configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureMode {
    /// Accept every request and warn (development setups)
    #[default]
    Open,
    /// Reject every request
    Strict,
}

/// Verifies webhook signatures against a configured secret
///
/// # Examples
///
/// ```rust
/// use paystack_webhooks_core::signature::{compute_signature, SignatureMode, SignatureVerifier};
///
/// let verifier = SignatureVerifier::new("whsec_test".into(), SignatureMode::Strict);
/// let body = br#"{"event":"charge.success","data":{}}"#;
/// let signature = compute_signature(body, b"whsec_test");
///
/// assert!(verifier.verify(body, &signature));
/// assert!(!verifier.verify(body, "deadbeef"));
/// ```
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: SecretValue,
    mode: SignatureMode,
}

impl SignatureVerifier {
    pub fn new(secret: SecretValue, mode: SignatureMode) -> Self {
        if secret.is_empty() {
            match mode {
                SignatureMode::Open => warn!(
                    "No webhook secret configured; signature verification is disabled \
                     and every request will be accepted"
                ),
                SignatureMode::Strict => error!(
                    "No webhook secret configured in strict mode; every webhook will be rejected"
                ),
            }
        }

        Self { secret, mode }
    }

    pub fn mode(&self) -> SignatureMode {
        self.mode
    }

    /// Check `signature` against the HMAC of `raw_body`
    pub fn verify(&self, raw_body: &[u8], signature: &str) -> bool {
        if self.secret.is_empty() {
            return match self.mode {
                SignatureMode::Open => {
                    warn!("Webhook secret not configured, skipping signature verification");
                    true
                }
                SignatureMode::Strict => {
                    error!("Webhook secret not configured, rejecting webhook");
                    false
                }
            };
        }

        verify_signature(raw_body, signature, self.secret.expose_bytes())
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<REDACTED>")
            .field("mode", &self.mode)
            .finish()
    }
}

/// Compare `signature` to the HMAC-SHA512 of `raw_body` in constant time
///
/// The secret must be non-empty; callers decide what an empty secret means.
pub fn verify_signature(raw_body: &[u8], signature: &str, secret: &[u8]) -> bool {
    let expected = compute_signature(raw_body, secret);
    if expected.is_empty() || signature.is_empty() {
        return false;
    }

    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

/// Lowercase hex HMAC-SHA512 of `raw_body`, as a sender would compute it
pub fn compute_signature(raw_body: &[u8], secret: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha512::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(raw_body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
