//! Signed session tokens.
//!
//! Format: `hex(payload_json).hex(hmac_sha256(secret, payload_hex))`.

use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the bearer.
    pub sub: String,
    /// Expiry as a unix timestamp (seconds).
    pub exp: i64,
}

fn signer(secret: &str) -> AppResult<HmacSha256> {
    if secret.is_empty() {
        return Err(AppError::MissingSecret);
    }
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AppError::MissingSecret)
}

/// Issue a token for `username` valid for `ttl`.
pub fn issue(secret: &str, username: &str, ttl: Duration) -> AppResult<String> {
    let claims = Claims {
        sub: username.to_string(),
        exp: (Utc::now() + ttl).timestamp(),
    };
    let payload = hex::encode(serde_json::to_vec(&claims)?);

    let mut mac = signer(secret)?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", payload, signature))
}

/// Check signature and expiry, returning the claims.
pub fn verify(secret: &str, token: &str) -> AppResult<Claims> {
    let mut mac = signer(secret)?;

    let (payload, signature) = token.split_once('.').ok_or(AppError::InvalidToken)?;
    let signature = hex::decode(signature).map_err(|_| AppError::InvalidToken)?;

    mac.update(payload.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::InvalidToken)?;

    let raw = hex::decode(payload).map_err(|_| AppError::InvalidToken)?;
    let claims: Claims = serde_json::from_slice(&raw).map_err(|_| AppError::InvalidToken)?;

    if claims.exp <= Utc::now().timestamp() {
        return Err(AppError::InvalidToken);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let token = issue("s3cret", "ada", Duration::minutes(30)).unwrap();
        let claims = verify("s3cret", &token).unwrap();
        assert_eq!(claims.sub, "ada");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue("s3cret", "ada", Duration::minutes(30)).unwrap();
        assert!(matches!(verify("other", &token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let token = issue("s3cret", "ada", Duration::minutes(30)).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let forged_claims = Claims {
            sub: "admin".to_string(),
            exp: Utc::now().timestamp() + 3600,
        };
        let forged = format!(
            "{}.{}",
            hex::encode(serde_json::to_vec(&forged_claims).unwrap()),
            signature
        );
        assert!(matches!(verify("s3cret", &forged), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue("s3cret", "ada", Duration::minutes(-1)).unwrap();
        assert!(matches!(verify("s3cret", &token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(verify("s3cret", "nodot"), Err(AppError::InvalidToken)));
        assert!(matches!(verify("s3cret", "ab.zz"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_missing_secret() {
        assert!(matches!(
            issue("", "ada", Duration::minutes(1)),
            Err(AppError::MissingSecret)
        ));
        assert!(matches!(verify("", "a.b"), Err(AppError::MissingSecret)));
    }
}
