//! Webhook payload signatures (`X-Hub-Signature-256`).
//!
//! The header carries `sha256=<hex>` where the digest is HMAC-SHA256 of the
//! raw request body keyed with the shared secret. Comparison goes through
//! `Mac::verify_slice`, which is constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header GitHub uses for SHA-256 signatures.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const ALGORITHM: &str = "sha256";

// HMAC accepts keys of any length, so this only fails for broken digests.
fn keyed(secret: &[u8], body: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(body);
    Some(mac)
}

/// Hex HMAC-SHA256 of `body` keyed with `secret`.
pub fn hmac_hex(secret: &[u8], body: &[u8]) -> String {
    keyed(secret, body)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default()
}

/// Header value for `body`, e.g. `sha256=3f1c...`.
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    format!("{ALGORITHM}={}", hmac_hex(secret, body))
}

/// Check `signature_header` against `body`.
///
/// False when the secret is empty, the header is not `<algo>=<hex>` with a
/// `sha256` algorithm and valid hex, or the digest differs.
pub fn verify(secret: &[u8], body: &[u8], signature_header: &str) -> bool {
    if secret.is_empty() {
        tracing::warn!("Webhook secret is empty, rejecting signature");
        return false;
    }

    let Some((algorithm, supplied_hex)) = signature_header.trim().split_once('=') else {
        tracing::warn!("Malformed signature header");
        return false;
    };
    if !algorithm.eq_ignore_ascii_case(ALGORITHM) {
        tracing::warn!(algorithm, "Unsupported signature algorithm");
        return false;
    }
    let Ok(supplied) = hex::decode(supplied_hex) else {
        tracing::warn!("Signature digest is not hex");
        return false;
    };

    let Some(mac) = keyed(secret, body) else {
        return false;
    };
    let computed = mac.clone().finalize().into_bytes();

    if mac.verify_slice(&supplied).is_ok() {
        true
    } else {
        tracing::warn!(
            supplied = %supplied_hex,
            computed = %hex::encode(computed),
            "Signature mismatch"
        );
        false
    }
}
