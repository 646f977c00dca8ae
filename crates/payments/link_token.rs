use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a billing link token: which tenant granted it, which
/// charge it points at, and when it stops working. Tokens are never persisted;
/// they are reconstructed from their encoded form on every request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BillingLinkClaims {
    pub tenant_id: Uuid,
    pub reference_id: Uuid,
    pub expires_at_epoch_ms: i64,
}

impl BillingLinkClaims {
    pub fn new(tenant_id: Uuid, reference_id: Uuid, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id,
            reference_id,
            expires_at_epoch_ms: (now + ttl).timestamp_millis(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkTokenError {
    #[error("malformed billing link token")]
    Malformed,
    #[error("billing link token signature mismatch")]
    InvalidSignature,
    #[error("billing link token expired")]
    Expired,
}

/// Encodes and signs the claims: `base64url(json) + "." + base64url(hmac)`.
pub fn encode(claims: &BillingLinkClaims, secret: &str) -> String {
    let payload = serde_json::to_vec(claims).expect("billing link claims serialize to json");
    let encoded_payload = URL_SAFE_NO_PAD.encode(payload);
    let signature = URL_SAFE_NO_PAD.encode(sign(encoded_payload.as_bytes(), secret));

    format!("{encoded_payload}.{signature}")
}

/// Validates a token against the verification instant `Utc::now()`.
pub fn decode(token: &str, secret: &str) -> Result<BillingLinkClaims, LinkTokenError> {
    decode_at(token, secret, Utc::now())
}

/// Validates a token against an explicit verification instant. The signature
/// is recomputed and compared in constant time; expiry is checked even when
/// the signature verifies.
pub fn decode_at(
    token: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<BillingLinkClaims, LinkTokenError> {
    let (encoded_payload, encoded_signature) =
        token.split_once('.').ok_or(LinkTokenError::Malformed)?;
    if encoded_payload.is_empty() || encoded_signature.is_empty() {
        return Err(LinkTokenError::Malformed);
    }

    let expected = sign(encoded_payload.as_bytes(), secret);
    let provided = URL_SAFE_NO_PAD
        .decode(encoded_signature)
        .map_err(|_| LinkTokenError::InvalidSignature)?;

    if provided.len() != expected.len() {
        return Err(LinkTokenError::InvalidSignature);
    }
    if expected.ct_eq(&provided).unwrap_u8() != 1 {
        return Err(LinkTokenError::InvalidSignature);
    }

    let payload = URL_SAFE_NO_PAD
        .decode(encoded_payload)
        .map_err(|_| LinkTokenError::Malformed)?;
    let claims: BillingLinkClaims =
        serde_json::from_slice(&payload).map_err(|_| LinkTokenError::Malformed)?;

    if now.timestamp_millis() > claims.expires_at_epoch_ms {
        return Err(LinkTokenError::Expired);
    }

    Ok(claims)
}

fn sign(encoded_payload: &[u8], secret: &str) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
    mac.update(encoded_payload);
    mac.finalize().into_bytes().to_vec()
}
