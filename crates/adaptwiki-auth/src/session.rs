use crate::AuthError;
use adaptwiki_model::UserId;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_SESSION_TTL_SECS: i64 = 8 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TokenPayload {
    user_id: i64,
    exp: i64,
}

/// Issues and verifies `payload.signature` bearer tokens: URL-safe base64
/// JSON payload signed with HMAC-SHA256. Stateless on purpose: the user's
/// capability is re-derived from group membership on every request, not
/// embedded in the token.
#[derive(Clone)]
pub struct SessionSigner {
    secret: Vec<u8>,
    ttl_secs: i64,
}

impl SessionSigner {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Result<Self, AuthError> {
        if secret.len() < 16 {
            return Err(AuthError(
                "session secret must be at least 16 bytes".to_string(),
            ));
        }
        Ok(Self {
            secret: secret.to_vec(),
            ttl_secs,
        })
    }

    pub fn issue(&self, user: UserId, now_secs: i64) -> Result<String, AuthError> {
        let payload = TokenPayload {
            user_id: user.0,
            exp: now_secs + self.ttl_secs,
        };
        let payload_bytes =
            serde_json::to_vec(&payload).map_err(|e| AuthError(e.to_string()))?;
        let payload_part = URL_SAFE_NO_PAD.encode(payload_bytes);
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AuthError(e.to_string()))?;
        mac.update(payload_part.as_bytes());
        let sig_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{payload_part}.{sig_part}"))
    }

    pub fn verify(&self, token: &str, now_secs: i64) -> Result<UserId, AuthError> {
        let (payload_part, sig_part) = token
            .split_once('.')
            .ok_or_else(|| AuthError("invalid session token format".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AuthError(e.to_string()))?;
        mac.update(payload_part.as_bytes());
        let expected = URL_SAFE_NO_PAD
            .decode(sig_part)
            .map_err(|e| AuthError(e.to_string()))?;
        mac.verify_slice(&expected)
            .map_err(|_| AuthError("session token signature mismatch".to_string()))?;

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload_part)
            .map_err(|e| AuthError(e.to_string()))?;
        let payload: TokenPayload =
            serde_json::from_slice(&payload_bytes).map_err(|e| AuthError(e.to_string()))?;

        if payload.exp <= now_secs {
            return Err(AuthError("session token expired".to_string()));
        }
        Ok(UserId(payload.user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> SessionSigner {
        SessionSigner::new(b"unit-test-session-secret", 3600).expect("signer")
    }

    #[test]
    fn round_trip_resolves_the_user() {
        let s = signer();
        let token = s.issue(UserId(42), 1_000).expect("issue");
        assert_eq!(s.verify(&token, 1_500).expect("verify"), UserId(42));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let s = signer();
        let token = s.issue(UserId(42), 1_000).expect("issue");
        assert!(s.verify(&token, 1_000 + 3600).is_err());
    }

    #[test]
    fn tampered_payloads_fail_the_signature_check() {
        let s = signer();
        let token = s.issue(UserId(42), 1_000).expect("issue");
        let (_, sig) = token.split_once('.').expect("two parts");
        let forged_payload =
            URL_SAFE_NO_PAD.encode(serde_json::json!({"user_id": 1, "exp": 9_999_999}).to_string());
        assert!(s.verify(&format!("{forged_payload}.{sig}"), 1_500).is_err());
    }

    #[test]
    fn short_secrets_are_refused() {
        assert!(SessionSigner::new(b"short", 3600).is_err());
    }
}
