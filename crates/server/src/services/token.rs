//! Session token service.
//!
//! Tokens are compact HS256 JSON Web Tokens: `header.payload.signature`, each
//! segment URL-safe base64 without padding. The payload is a
//! [`SessionClaims`] with `iat` and `exp` in Unix seconds.
//!
//! There is no server-side revocation list. Logging out clears the cookie in
//! the browser, but a copied token stays valid until `exp`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::models::{SessionClaims, SessionIdentity};

type HmacSha256 = Hmac<Sha256>;

/// Token lifetime: one hour.
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

const ALGORITHM: &str = "HS256";

/// Errors from issuing or verifying a session token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Not three dot-separated segments, or a segment is not valid base64/JSON.
    #[error("malformed token")]
    Malformed,

    /// The header names an algorithm other than HS256.
    #[error("unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The signature does not match the header and payload.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The token's `exp` is not in the future.
    #[error("token expired")]
    Expired,

    /// Claims could not be serialized.
    #[error("token encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Signs and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    secret: SecretString,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl TokenService {
    /// Create a token service signing with `secret`.
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// MAC keyed with the secret and fed `signing_input`.
    ///
    /// HMAC takes keys of any length. On `None` callers neither sign nor accept
    /// tokens.
    fn mac_over(&self, signing_input: &str) -> Option<HmacSha256> {
        let Ok(mut mac) = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes()) else {
            return None;
        };
        mac.update(signing_input.as_bytes());
        Some(mac)
    }

    /// Issue a token for `identity`, valid for [`TOKEN_LIFETIME_SECS`].
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be encoded.
    pub fn issue(&self, identity: SessionIdentity) -> Result<String, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be encoded.
    pub fn issue_at(
        &self,
        identity: SessionIdentity,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let claims = SessionClaims {
            identity,
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
        };
        let header = Header {
            alg: ALGORITHM.to_owned(),
            typ: Some("JWT".to_owned()),
        };

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );

        let mac = self
            .mac_over(&signing_input)
            .ok_or(TokenError::InvalidSignature)?;
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, uses another algorithm,
    /// carries a bad signature, or has expired.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// See [`TokenService::verify`].
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let (signing_input, signature) =
            token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (header, payload) = signing_input
            .split_once('.')
            .ok_or(TokenError::Malformed)?;
        if payload.contains('.') {
            return Err(TokenError::Malformed);
        }

        let header: Header = decode_segment(header)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        let Some(mac) = self.mac_over(signing_input) else {
            return Err(TokenError::InvalidSignature);
        };
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: SessionClaims = decode_segment(payload)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}
