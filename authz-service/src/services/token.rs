//! Session token service - HS256 JWTs bound to a session row.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::JwtConfig;

const MIN_SECRET_BYTES: usize = 32;

/// Claims carried by a session token.
///
/// The triple (user, organization, session) is fixed at issuance; validation
/// re-reads the session row, so these claims are a locator, not an
/// authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Organization the session was minted for
    pub org: Uuid,
    /// Session row ID
    pub sid: Uuid,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Token decode failures, classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Signature did not verify or the token is malformed.
    InvalidSignature,
    /// Signature verified but the token is past its expiry.
    Expired,
}

/// JWT mint/verify service.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_minutes: i64,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        if config.secret.len() < MIN_SECRET_BYTES {
            anyhow::bail!(
                "JWT secret must be at least {} bytes, got {}",
                MIN_SECRET_BYTES,
                config.secret.len()
            );
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl_minutes: config.session_ttl_minutes,
        })
    }

    /// Mint a token for a session.
    pub fn mint(&self, user_id: Uuid, org_id: Uuid, session_id: Uuid) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id,
            org: org_id,
            sid: session_id,
            exp: (now + Duration::minutes(self.ttl_minutes)).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))
    }

    /// Verify a token's signature and expiry, returning its claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        match decode::<SessionClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                _ => Err(TokenError::InvalidSignature),
            },
        }
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_minutes * 60
    }
}

/// SHA-256 hex digest of a token, stored on the session row so the row and
/// the presented token stay bound to each other.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
