//! Nightfall webhook signature verification.
//!
//! Nightfall signs each webhook delivery with HMAC-SHA256 over
//! `"<timestamp>:<raw body>"` using the account's signing secret, and sends
//! the hex digest in `X-Nightfall-Signature` alongside the Unix timestamp in
//! `X-Nightfall-Timestamp`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC digest.
pub const SIGNATURE_HEADER: &str = "X-Nightfall-Signature";

/// Header carrying the Unix timestamp the signature covers.
pub const TIMESTAMP_HEADER: &str = "X-Nightfall-Timestamp";

/// Verify a Nightfall webhook signature.
///
/// # Arguments
///
/// * `signing_secret` - The account's webhook signing secret
/// * `signature` - Value of the `X-Nightfall-Signature` header, if present
/// * `timestamp` - Value of the `X-Nightfall-Timestamp` header, if present
/// * `body` - The raw request body, exactly as received
/// * `max_age_seconds` - Maximum allowed distance between the timestamp and now
///
/// # Returns
///
/// `true` if the signature is valid and not stale, `false` otherwise.
pub fn verify_nightfall_signature(
    signing_secret: &str,
    signature: Option<&str>,
    timestamp: Option<&str>,
    body: &[u8],
    max_age_seconds: u64,
) -> bool {
    let signature = signature.unwrap_or_default();
    let timestamp = timestamp.unwrap_or_default();

    if signing_secret.is_empty() || signature.is_empty() || timestamp.is_empty() {
        warn!(
            has_signing_secret = !signing_secret.is_empty(),
            has_signature = !signature.is_empty(),
            has_timestamp = !timestamp.is_empty(),
            "webhook_signature_missing_fields"
        );
        return false;
    }

    let webhook_time: u64 = match timestamp.parse() {
        Ok(t) => t,
        Err(_) => {
            warn!(timestamp = %timestamp, "webhook_signature_invalid_timestamp");
            return false;
        }
    };

    let current_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let age = current_time.abs_diff(webhook_time);
    if age > max_age_seconds {
        warn!(
            webhook_time = webhook_time,
            current_time = current_time,
            age_seconds = age,
            max_age_seconds = max_age_seconds,
            "webhook_signature_stale"
        );
        return false;
    }

    let expected_signature = match sign(signing_secret, timestamp, body) {
        Some(s) => s,
        None => {
            warn!("webhook_signature_invalid_key");
            return false;
        }
    };
    let valid = constant_time_compare(&expected_signature, signature);

    if !valid {
        warn!(
            expected_length = expected_signature.len(),
            actual_length = signature.len(),
            "webhook_signature_mismatch"
        );
    }

    valid
}

/// Compute the hex signature Nightfall sends for a body and timestamp.
pub fn sign(signing_secret: &str, timestamp: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
