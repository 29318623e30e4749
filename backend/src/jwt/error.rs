//! JWT-related error types

use thiserror::Error;

/// Errors that can occur during JWT operations
#[derive(Error, Debug)]
pub enum JwtError {
    /// JWT encoding failed
    #[error("Failed to encode JWT token: {0}")]
    EncodingError(jsonwebtoken::errors::Error),

    /// Signature, issuer or structure check failed
    #[error("Invalid token: {0}")]
    InvalidToken(jsonwebtoken::errors::Error),

    /// Token is past its `exp` claim
    #[error("Token has expired")]
    Expired,

    /// The `sub` claim is not a user ID
    #[error("Invalid token subject: {0}")]
    InvalidSubject(String),
}
