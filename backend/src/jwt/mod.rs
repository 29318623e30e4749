//! Access token verification and issuance (HS256 with a shared secret).
//!
//! Tokens carry `iss = "tubely-access"`, `sub = <user UUID>`, `iat` and `exp`.
//! Verification checks the signature, the issuer and expiry (no leeway) and
//! yields the owner identifier used by the ownership gate.

pub mod error;
mod types;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use uuid::Uuid;

pub use types::{Claims, TOKEN_ISSUER};

use error::JwtError;

/// Token expiration time in seconds (1 hour)
pub const TOKEN_EXPIRATION_SECS: i64 = 60 * 60;

/// JWT manager backed by a shared HMAC secret
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtManager {
    /// Creates a new JWT manager from the shared secret
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;

        tracing::info!("JWT manager initialized");

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issues a compact HS256 token for `user_id`, valid for `ttl_secs`
    ///
    /// # Errors
    /// Returns `JwtError::EncodingError` if signing fails.
    pub fn issue_token(&self, user_id: Uuid, ttl_secs: i64) -> Result<String, JwtError> {
        self.encode_claims(&Claims::for_user(user_id, ttl_secs))
    }

    /// Signs arbitrary claims
    ///
    /// # Errors
    /// Returns `JwtError::EncodingError` if signing fails.
    pub fn encode_claims(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(JwtError::EncodingError)
    }

    /// Verifies `token` and returns the user ID in its subject
    ///
    /// # Errors
    /// - `JwtError::Expired` if the token is past its `exp`
    /// - `JwtError::InvalidToken` for bad signatures, wrong issuer or malformed tokens
    /// - `JwtError::InvalidSubject` if `sub` is not a UUID
    pub fn validate(&self, token: &str) -> Result<Uuid, JwtError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            if matches!(e.kind(), ErrorKind::ExpiredSignature) {
                JwtError::Expired
            } else {
                JwtError::InvalidToken(e)
            }
        })?;

        Uuid::parse_str(&data.claims.sub).map_err(|_| JwtError::InvalidSubject(data.claims.sub))
    }
}
