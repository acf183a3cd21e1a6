//! # Access Gate
//!
//! Signed, time-limited bearer tokens gating the mutating endpoints.
//!
//! A token is `base64url(claims_json) . base64url(mac)` where the MAC is a
//! keyed BLAKE3 hash of the claims bytes. The key is derived from the
//! configured secret (or, failing that, the admin password itself). All
//! secret comparisons are constant-time.
//!
//! Token lifecycle: issued -> valid -> expired (terminal) or rejected
//! (signature mismatch, terminal). There is no revocation list; expiry is
//! the only invalidation path.

use crate::api::{ApiError, AppState};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Token lifetime: 24 hours.
pub const TOKEN_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Domain separation for the BLAKE3 key derivation.
const KEY_CONTEXT: &str = "cpudex 2026-01 bearer token mac key";

/// Authentication failures. All map to 401 except `NotConfigured`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid password")]
    InvalidCredentials,
    #[error("missing or malformed Authorization header")]
    MissingToken,
    #[error("invalid authentication token")]
    Unauthorized,
    #[error("authentication token expired")]
    TokenExpired,
    #[error("admin password not configured")]
    NotConfigured,
}

/// The authenticated principal carried inside a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    /// Expiry as unix seconds.
    pub exp: u64,
}

/// Issues and verifies bearer tokens against a shared admin password.
pub struct AccessGate {
    key: [u8; 32],
    password: String,
}

impl AccessGate {
    /// Build a gate for `password`, deriving the MAC key from `secret` when
    /// provided, otherwise from the password itself.
    #[must_use]
    pub fn new(password: impl Into<String>, secret: Option<&str>) -> Self {
        let password = password.into();
        let material = secret.unwrap_or(password.as_str());
        Self {
            key: blake3::derive_key(KEY_CONTEXT, material.as_bytes()),
            password,
        }
    }

    /// Check the presented password and mint a token valid for [`TOKEN_TTL`].
    pub fn issue(&self, password: &str) -> Result<String, AuthError> {
        self.issue_at(password, unix_now())
    }

    /// Clock-injected variant of [`Self::issue`], used by tests.
    pub fn issue_at(&self, password: &str, now: u64) -> Result<String, AuthError> {
        let matches: bool = password
            .as_bytes()
            .ct_eq(self.password.as_bytes())
            .into();
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }
        let claims = Claims {
            sub: "admin".to_string(),
            exp: now + TOKEN_TTL.as_secs(),
        };
        self.sign(&claims)
    }

    /// Check signature then expiry; return the principal on success.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, unix_now())
    }

    /// Clock-injected variant of [`Self::verify`], used by tests.
    pub fn verify_at(&self, token: &str, now: u64) -> Result<Claims, AuthError> {
        let (payload_b64, mac_b64) = token.split_once('.').ok_or(AuthError::Unauthorized)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AuthError::Unauthorized)?;
        let mac = URL_SAFE_NO_PAD
            .decode(mac_b64)
            .map_err(|_| AuthError::Unauthorized)?;

        let expected = blake3::keyed_hash(&self.key, &payload);
        let matches: bool = mac.as_slice().ct_eq(expected.as_bytes()).into();
        if !matches {
            return Err(AuthError::Unauthorized);
        }

        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| AuthError::Unauthorized)?;
        if claims.exp <= now {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        // Claims serialization cannot realistically fail; treat a failure as
        // a refusal to issue rather than panicking.
        let payload = serde_json::to_vec(claims).map_err(|_| AuthError::Unauthorized)?;
        let mac = blake3::keyed_hash(&self.key, &payload);
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(mac.as_bytes())
        ))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// =============================================================================
// EXTRACTOR
// =============================================================================

/// Extractor guarding mutating handlers.
///
/// Rejects the request before the handler body runs - and therefore before
/// any storage call - when no valid bearer token is presented.
pub struct AuthClaims(pub Claims);

impl FromRequestParts<AppState> for AuthClaims {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(gate) = state.gate.as_deref() else {
            // No password configured: nothing can ever verify.
            return Err(ApiError::Auth(AuthError::Unauthorized));
        };
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Auth(AuthError::MissingToken))?;
        let claims = gate.verify(token).map_err(ApiError::Auth)?;
        Ok(Self(claims))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn gate() -> AccessGate {
        AccessGate::new("hunter2", None)
    }

    #[test]
    fn issue_rejects_wrong_password() {
        assert_eq!(
            gate().issue_at("letmein", NOW).unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[test]
    fn issued_token_verifies_before_expiry() {
        let gate = gate();
        let token = gate.issue_at("hunter2", NOW).unwrap();
        let claims = gate.verify_at(&token, NOW + 60).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.exp, NOW + TOKEN_TTL.as_secs());
    }

    #[test]
    fn token_expires_after_ttl() {
        let gate = gate();
        let token = gate.issue_at("hunter2", NOW).unwrap();
        let err = gate
            .verify_at(&token, NOW + TOKEN_TTL.as_secs() + 1)
            .unwrap_err();
        assert_eq!(err, AuthError::TokenExpired);
    }

    #[test]
    fn tampered_payload_is_rejected_not_expired() {
        let gate = gate();
        let token = gate.issue_at("hunter2", NOW).unwrap();

        // Flip a character in the payload half.
        let mut bytes = token.into_bytes();
        bytes[2] = if bytes[2] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert_eq!(
            gate.verify_at(&tampered, NOW).unwrap_err(),
            AuthError::Unauthorized
        );
    }

    #[test]
    fn token_from_another_key_is_rejected() {
        let token = AccessGate::new("hunter2", Some("key-a"))
            .issue_at("hunter2", NOW)
            .unwrap();
        let other = AccessGate::new("hunter2", Some("key-b"));
        assert_eq!(
            other.verify_at(&token, NOW).unwrap_err(),
            AuthError::Unauthorized
        );
    }

    #[test]
    fn structurally_broken_tokens_are_rejected() {
        let gate = gate();
        for bad in ["", "nodot", "a.b", "!!!.???"] {
            assert_eq!(gate.verify_at(bad, NOW).unwrap_err(), AuthError::Unauthorized);
        }
    }
}
