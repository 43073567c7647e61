//! Webhook signature verification.
//!
//! Payment processors sign each delivery with a shared secret. The header
//! carries a timestamp and one or more signatures:
//!
//! `t=1700000000,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd`
//!
//! Each `v1` value is `HMAC-SHA256("{t}.{raw body}", secret)` in lowercase hex.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "v1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature header")]
    MalformedHeader,
    #[error("no {SCHEME} signature in header")]
    NoSignatures,
    #[error("timestamp outside tolerance")]
    TimestampOutsideTolerance,
    #[error("signature mismatch")]
    Mismatch,
    #[error("invalid signing key")]
    InvalidKey,
}

/// Parsed form of a signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or(SignatureError::MalformedHeader)?;
            match key {
                "t" => {
                    timestamp = Some(
                        value
                            .parse::<i64>()
                            .map_err(|_| SignatureError::MalformedHeader)?,
                    )
                }
                SCHEME => signatures.push(value.to_string()),
                // Other schemes (e.g. test-mode v0) are ignored.
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
        if signatures.is_empty() {
            return Err(SignatureError::NoSignatures);
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

/// Compute the hex signature for a payload signed at `timestamp`.
pub fn compute_webhook_signature(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build a complete header value, as the processor would send it.
pub fn generate_webhook_header(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, SignatureError> {
    let signature = compute_webhook_signature(secret, timestamp, payload)?;
    Ok(format!("t={},{}={}", timestamp, SCHEME, signature))
}

/// Verify a signature header against the raw payload.
///
/// `now` is the verifier's clock in unix seconds; a `tolerance_seconds` of 0
/// disables the replay window check.
pub fn verify_webhook_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    tolerance_seconds: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let parsed = SignatureHeader::parse(header)?;
    let expected = compute_webhook_signature(secret, parsed.timestamp, payload)?;

    let matched = parsed.signatures.iter().any(|candidate| {
        candidate.len() == expected.len()
            && bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()))
    });
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    if tolerance_seconds > 0 && (now - parsed.timestamp).abs() > tolerance_seconds {
        return Err(SignatureError::TimestampOutsideTolerance);
    }

    Ok(())
}
